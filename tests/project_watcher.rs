// tests/project_watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use syncwatch::config::{Settings, SettingsStore, load_from_path, save_to_path};
use syncwatch::fs::mock::MockFileSystem;
use syncwatch::types::{PlatformKey, ProjectContext};
use syncwatch::watch::{ProjectWatcher, RawChange, RawKind, WatchTarget};
use syncwatch_test_utils::builders::SettingsBuilder;
use syncwatch_test_utils::fakes::{FakeEventSource, RecordingRefresher};
use syncwatch_test_utils::init_tracing;
use tokio::sync::broadcast::error::TryRecvError;

const SETTINGS_FILE: &str = "/proj/Syncwatch.toml";

struct Harness {
    watcher: ProjectWatcher,
    settings: Arc<SettingsStore>,
    fs: Arc<MockFileSystem>,
    source: FakeEventSource,
    refresher: RecordingRefresher,
}

fn harness(settings: Settings) -> Harness {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_dir("/proj/tools");
    let settings = Arc::new(SettingsStore::with_settings(SETTINGS_FILE, fs.clone(), settings));
    let source = FakeEventSource::new();
    let refresher = RecordingRefresher::default();
    let watcher = ProjectWatcher::new(
        settings.clone(),
        ProjectContext::new("/proj", None, PlatformKey::Linux),
        fs.clone(),
        Arc::new(source.clone()),
        Arc::new(refresher.clone()),
    );
    Harness {
        watcher,
        settings,
        fs,
        source,
        refresher,
    }
}

fn with_tools_root() -> Settings {
    SettingsBuilder::new()
        .interpreter("/usr/bin/python3")
        .script_root("$PROJECT_DIR$/tools")
        .build()
}

fn registered(settings: &Settings) -> Vec<(String, Option<String>)> {
    settings
        .script_groups
        .iter()
        .flat_map(|g| g.scripts.iter())
        .map(|s| (s.path.clone(), s.description.clone()))
        .collect()
}

#[test]
fn watches_settings_dir_flat_and_script_root_recursively() {
    let h = harness(with_tools_root());
    assert!(h.watcher.update_configuration());
    assert_eq!(
        h.source.last_targets(),
        vec![
            WatchTarget {
                path: PathBuf::from("/proj"),
                recursive: false,
            },
            WatchTarget {
                path: PathBuf::from("/proj/tools"),
                recursive: true,
            },
        ]
    );

    h.watcher.stop();
    assert!(!h.watcher.is_running());
    assert_eq!(h.source.active_count(), 0);
}

#[test]
fn script_root_at_project_dir_collapses_to_one_recursive_target() {
    let h = harness(
        SettingsBuilder::new()
            .script_root("$PROJECT_DIR$")
            .build(),
    );
    assert!(h.watcher.update_configuration());
    assert_eq!(
        h.source.last_targets(),
        vec![WatchTarget {
            path: PathBuf::from("/proj"),
            recursive: true,
        }]
    );
}

#[test]
fn missing_script_root_still_follows_the_settings_file() {
    let h = harness(
        SettingsBuilder::new()
            .script_root("$PROJECT_DIR$/gone")
            .build(),
    );
    assert!(h.watcher.update_configuration());
    assert_eq!(
        h.source.last_targets(),
        vec![WatchTarget {
            path: PathBuf::from("/proj"),
            recursive: false,
        }]
    );
}

#[test]
fn new_python_files_are_registered_sorted_and_deduplicated() {
    let mut initial = with_tools_root();
    initial.register_scripts(["b.py"], None);
    let h = harness(initial);
    for file in ["b.py", "B.py", "A.py", "sub/c.py", "notes.txt"] {
        h.fs.add_file(format!("/proj/tools/{file}"), b"".to_vec());
    }
    let mut changed = h.settings.subscribe_changed();
    assert!(h.watcher.update_configuration());

    h.source.emit(vec![
        RawChange::new(RawKind::Created, "/proj/tools/A.py"),
        RawChange::new(RawKind::Created, "/proj/tools/B.py"),
        RawChange::new(RawKind::Created, "/proj/tools/sub/c.py"),
        RawChange::new(RawKind::Created, "/proj/tools/notes.txt"),
    ]);

    let auto = Some("Auto-added by watcher".to_string());
    let expected = vec![
        ("A.py".to_string(), auto.clone()),
        ("b.py".to_string(), None),
        ("sub/c.py".to_string(), auto),
    ];
    assert_eq!(registered(&h.settings.snapshot()), expected);
    let persisted = load_from_path(h.fs.as_ref(), Path::new(SETTINGS_FILE)).unwrap();
    assert_eq!(registered(&persisted), expected);
    assert_eq!(h.refresher.paths(), vec![PathBuf::from("/proj/tools")]);

    // Our own write comes back as a settings file event.
    h.source
        .emit(vec![RawChange::new(RawKind::ContentChanged, SETTINGS_FILE)]);
    assert!(matches!(changed.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn script_edits_are_ignored_but_removals_refresh_the_view() {
    let h = harness(with_tools_root());
    h.fs.add_file("/proj/tools/a.py", b"".to_vec());
    assert!(h.watcher.update_configuration());

    h.source
        .emit(vec![RawChange::new(RawKind::ContentChanged, "/proj/tools/a.py")]);
    h.source
        .emit(vec![RawChange::new(RawKind::Deleted, "/proj/tools/readme.md")]);
    assert!(h.refresher.paths().is_empty());

    h.source
        .emit(vec![RawChange::new(RawKind::Deleted, "/proj/tools/pkg")]);
    h.source
        .emit(vec![RawChange::new(RawKind::Renamed, "/proj/tools/b.py")]);
    assert_eq!(
        h.refresher.paths(),
        vec![PathBuf::from("/proj/tools"), PathBuf::from("/proj/tools")]
    );
    assert!(registered(&h.settings.snapshot()).is_empty());
}

#[test]
fn settings_file_edit_reloads_and_publishes_once() {
    let h = harness(with_tools_root());
    save_to_path(h.fs.as_ref(), Path::new(SETTINGS_FILE), &with_tools_root()).unwrap();
    let mut changed = h.settings.subscribe_changed();
    assert!(h.watcher.update_configuration());

    // Identical content: nothing to publish.
    h.source
        .emit(vec![RawChange::new(RawKind::ContentChanged, SETTINGS_FILE)]);
    assert!(matches!(changed.try_recv(), Err(TryRecvError::Empty)));

    let edited = SettingsBuilder::new()
        .interpreter("/opt/py/bin/python3")
        .script_root("$PROJECT_DIR$/tools")
        .watch("$PROJECT_DIR$/assets", "build.py")
        .build();
    save_to_path(h.fs.as_ref(), Path::new(SETTINGS_FILE), &edited).unwrap();
    h.source
        .emit(vec![RawChange::new(RawKind::ContentChanged, SETTINGS_FILE)]);

    assert!(changed.try_recv().is_ok());
    assert!(matches!(changed.try_recv(), Err(TryRecvError::Empty)));
    let current = h.settings.snapshot();
    assert_eq!(current.interpreter_path.as_deref(), Some("/opt/py/bin/python3"));
    assert_eq!(current.watch_entries.len(), 1);
}

#[test]
fn unreadable_settings_edit_keeps_current_settings() {
    let h = harness(with_tools_root());
    let mut changed = h.settings.subscribe_changed();
    assert!(h.watcher.update_configuration());

    h.fs.add_file(SETTINGS_FILE, b"interpreter_path = [".to_vec());
    h.source
        .emit(vec![RawChange::new(RawKind::ContentChanged, SETTINGS_FILE)]);

    assert!(matches!(changed.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(
        h.settings.snapshot().interpreter_path.as_deref(),
        Some("/usr/bin/python3")
    );
}

#[test]
fn stopped_watcher_ignores_an_in_flight_batch() {
    let h = harness(with_tools_root());
    h.fs.add_file("/proj/tools/late.py", b"".to_vec());
    assert!(h.watcher.update_configuration());
    let handler = h.source.current_handler().unwrap();
    h.watcher.stop();

    handler(vec![RawChange::new(RawKind::Created, "/proj/tools/late.py")]);
    assert!(registered(&h.settings.snapshot()).is_empty());
    assert!(h.refresher.paths().is_empty());
}
