// tests/notify_source.rs

use std::sync::Arc;
use std::time::Duration;

use syncwatch::fs::RealFileSystem;
use syncwatch::types::slash_string;
use syncwatch::watch::{
    BatchHandler, EventKind, EventSource, NotifyEventSource, RawChange, WatchEntry, WatchTarget,
    normalize, watch_targets,
};
use syncwatch_test_utils::{init_tracing, with_timeout};
use tempfile::TempDir;
use tokio::sync::mpsc;

#[tokio::test]
async fn created_file_is_delivered_as_a_batch() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<RawChange>>();
    let handler: BatchHandler = Arc::new(move |batch| {
        let _ = tx.send(batch);
    });

    let source = NotifyEventSource::new(tokio::runtime::Handle::current());
    let subscription = source
        .subscribe(
            &[WatchTarget {
                path: root.clone(),
                recursive: true,
            }],
            handler,
        )
        .unwrap();
    assert_eq!(subscription.targets().len(), 1);

    let file = root.join("new.txt");
    std::fs::write(&file, "x").unwrap();
    let expected = file.to_string_lossy().replace('\\', "/");

    let seen_create = with_timeout(async {
        while let Some(batch) = rx.recv().await {
            let created = batch
                .iter()
                .filter_map(normalize)
                .any(|e| e.kind == EventKind::Create && e.affected_path == expected);
            if created {
                return true;
            }
        }
        false
    })
    .await;
    assert!(seen_create);

    drop(subscription);
}

#[tokio::test]
async fn removal_deep_below_a_recursive_watch_is_seen_despite_nested_file_rule() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("sub")).unwrap();
    std::fs::write(root.join("sub/file.txt"), "x").unwrap();

    let rules = vec![
        WatchEntry::new(slash_string(&root), "/s.py"),
        WatchEntry::new(slash_string(&root.join("sub/file.txt")), "/s.py"),
    ];
    let targets = watch_targets(&rules, &RealFileSystem);
    assert_eq!(
        targets,
        vec![WatchTarget {
            path: root.clone(),
            recursive: true,
        }]
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<RawChange>>();
    let handler: BatchHandler = Arc::new(move |batch| {
        let _ = tx.send(batch);
    });
    let source = NotifyEventSource::new(tokio::runtime::Handle::current());
    let subscription = source.subscribe(&targets, handler).unwrap();

    let new_dir = root.join("sub/newdir");
    std::fs::create_dir(&new_dir).unwrap();
    // Give the backend time to register the new directory.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let deep = new_dir.join("x.txt");
    std::fs::write(&deep, "x").unwrap();
    std::fs::remove_file(&deep).unwrap();
    let expected = slash_string(&deep);

    let seen_remove = with_timeout(async {
        while let Some(batch) = rx.recv().await {
            let removed = batch
                .iter()
                .filter_map(normalize)
                .any(|e| e.kind == EventKind::Remove && e.affected_path == expected);
            if removed {
                return true;
            }
        }
        false
    })
    .await;
    assert!(seen_remove);

    drop(subscription);
}
