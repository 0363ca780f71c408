// tests/runtime_loop.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use syncwatch::config::{Settings, SettingsStore, save_to_path};
use syncwatch::engine::{AppEvent, Runtime};
use syncwatch::exec::Dispatcher;
use syncwatch::fs::mock::MockFileSystem;
use syncwatch::types::{PlatformKey, ProjectContext};
use syncwatch::watch::{ProjectWatcher, RawChange, RawKind, WatchService};
use syncwatch::workflow::{DiscoveryEnv, WorkflowOrchestrator};
use syncwatch_test_utils::builders::{DescriptorBuilder, SettingsBuilder};
use syncwatch_test_utils::fake_executor::RecordingExecutor;
use syncwatch_test_utils::fakes::{
    FakeEventSource, FakeSync, RecordingAdvisories, RecordingRefresher,
};
use syncwatch_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

async fn wait_until(mut cond: impl FnMut() -> bool) {
    with_timeout(async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn workflow_completion_reloads_watch_and_shutdown_stops_it() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_dir("/proj/assets");
    fs.add_file("/opt/py/bin/python3", b"".to_vec());
    fs.add_file("/proj/.tools/scripts/zeta.py", b"".to_vec());

    let ctx = ProjectContext::new("/proj", None, PlatformKey::Linux);
    let settings = Arc::new(SettingsStore::with_settings(
        "/proj/Syncwatch.toml",
        fs.clone(),
        Settings::default(),
    ));

    let executor = RecordingExecutor::new();
    let dispatcher = Arc::new(Dispatcher::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(executor.clone()),
    ));
    let source = FakeEventSource::new();
    let watch = Arc::new(WatchService::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(source.clone()),
        dispatcher,
    ));
    assert!(!watch.update_configuration());

    let project_source = FakeEventSource::new();
    let project = Arc::new(ProjectWatcher::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(project_source.clone()),
        Arc::new(RecordingRefresher::default()),
    ));
    let sync = FakeSync::new();
    let orchestrator = Arc::new(WorkflowOrchestrator::new(
        settings.clone(),
        ctx,
        fs.clone(),
        Arc::new(sync.clone()),
        Arc::new(RecordingAdvisories::new()),
        DiscoveryEnv {
            path_dirs: vec![PathBuf::from("/opt/py/bin")],
            virtual_env: None,
            platform: Some(PlatformKey::Linux),
        },
    ));

    let (app_tx, app_rx) = mpsc::channel(8);
    let runtime = Runtime::new(
        app_rx,
        orchestrator.subscribe_config_changed(),
        orchestrator.clone(),
        watch.clone(),
        project.clone(),
    );
    let running = tokio::spawn(runtime.run());

    orchestrator
        .prepare(
            &DescriptorBuilder::new("linux")
                .source_url("file:///srv/tools")
                .target_dir("$PROJECT_DIR$/.tools")
                .watch("$PROJECT_DIR$/assets", "zeta.py")
                .build(),
        )
        .unwrap();
    assert_eq!(sync.started().len(), 1);

    app_tx.send(AppEvent::SyncFinished).await.unwrap();
    wait_until(|| source.active_count() == 1).await;
    assert!(watch.is_running());
    wait_until(|| project_source.active_count() == 1).await;
    assert!(
        project_source
            .last_targets()
            .iter()
            .any(|t| t.recursive && t.path == Path::new("/proj/.tools/scripts"))
    );

    source.emit(vec![RawChange::new(RawKind::Created, "/proj/assets")]);
    assert_eq!(
        executor.summary(),
        vec![(
            "Change New".to_string(),
            "/proj/assets".to_string(),
            "/proj/.tools/scripts/zeta.py".to_string()
        )]
    );

    app_tx.send(AppEvent::ShutdownRequested).await.unwrap();
    with_timeout(running).await.unwrap().unwrap();
    assert!(!watch.is_running());
    assert_eq!(source.active_count(), 0);
    assert_eq!(project_source.active_count(), 0);
}

#[tokio::test]
async fn runtime_exits_when_every_sender_is_gone() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    let ctx = ProjectContext::new("/proj", None, PlatformKey::Linux);
    let settings = Arc::new(SettingsStore::with_settings(
        "/proj/Syncwatch.toml",
        fs.clone(),
        Settings::default(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(RecordingExecutor::new()),
    ));
    let watch = Arc::new(WatchService::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(FakeEventSource::new()),
        dispatcher,
    ));
    let project = Arc::new(ProjectWatcher::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(FakeEventSource::new()),
        Arc::new(RecordingRefresher::default()),
    ));
    let orchestrator = Arc::new(WorkflowOrchestrator::new(
        settings,
        ctx,
        fs,
        Arc::new(FakeSync::new()),
        Arc::new(RecordingAdvisories::new()),
        DiscoveryEnv::default(),
    ));

    let (app_tx, app_rx) = mpsc::channel(1);
    let runtime = Runtime::new(
        app_rx,
        orchestrator.subscribe_config_changed(),
        orchestrator,
        watch,
        project,
    );
    drop(app_tx);
    with_timeout(runtime.run()).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn editing_the_settings_file_restarts_the_watch() {
    init_tracing();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_dir("/proj/assets");
    fs.add_file("/usr/bin/python3", b"".to_vec());
    fs.add_file("/proj/tools/build.py", b"".to_vec());

    let ctx = ProjectContext::new("/proj", None, PlatformKey::Linux);
    let settings = Arc::new(SettingsStore::with_settings(
        "/proj/Syncwatch.toml",
        fs.clone(),
        Settings::default(),
    ));
    let source = FakeEventSource::new();
    let watch = Arc::new(WatchService::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(source.clone()),
        Arc::new(Dispatcher::new(
            settings.clone(),
            ctx.clone(),
            fs.clone(),
            Arc::new(RecordingExecutor::new()),
        )),
    ));
    let project_source = FakeEventSource::new();
    let project = Arc::new(ProjectWatcher::new(
        settings.clone(),
        ctx.clone(),
        fs.clone(),
        Arc::new(project_source.clone()),
        Arc::new(RecordingRefresher::default()),
    ));
    assert!(!watch.update_configuration());
    assert!(project.update_configuration());

    let orchestrator = Arc::new(WorkflowOrchestrator::new(
        settings.clone(),
        ctx,
        fs.clone(),
        Arc::new(FakeSync::new()),
        Arc::new(RecordingAdvisories::new()),
        DiscoveryEnv::default(),
    ));
    let (app_tx, app_rx) = mpsc::channel(8);
    let runtime = Runtime::new(
        app_rx,
        settings.subscribe_changed(),
        orchestrator,
        watch.clone(),
        project,
    );
    let running = tokio::spawn(runtime.run());

    let edited = SettingsBuilder::new()
        .interpreter("/usr/bin/python3")
        .watch("$PROJECT_DIR$/assets", "/proj/tools/build.py")
        .build();
    save_to_path(fs.as_ref(), Path::new("/proj/Syncwatch.toml"), &edited).unwrap();
    project_source.emit(vec![RawChange::new(
        RawKind::ContentChanged,
        "/proj/Syncwatch.toml",
    )]);

    wait_until(|| source.active_count() == 1).await;
    assert!(watch.is_running());

    app_tx.send(AppEvent::ShutdownRequested).await.unwrap();
    with_timeout(running).await.unwrap().unwrap();
}
