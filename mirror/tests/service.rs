//! End-to-end runs of the mirror service with the OS watcher and a local
//! destination.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use treemirror_mirror::{CancellationToken, MirrorConfig, MirrorError, MirrorService};
use treemirror_remote::LocalRemote;

async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn read(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_service_mirrors_initial_tree_and_later_changes() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(src.path().join("a.txt"), "alpha").unwrap();
    fs::create_dir_all(src.path().join("skip")).unwrap();
    fs::write(src.path().join("skip/secret.txt"), "x").unwrap();

    let config = MirrorConfig::new(src.path(), "unused").exclude("skip");
    let remote = Arc::new(LocalRemote::new(dest.path()));
    let service = MirrorService::with_remote(config, remote).unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(service.serve(cancel.clone()));

    let out = dest.path().to_path_buf();
    eventually("initial sync", || read(&out.join("a.txt")).as_deref() == Some("alpha")).await;
    assert!(!out.join("skip").exists());

    // Give the watcher a moment to be draining before changing things.
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::create_dir_all(src.path().join("new/deeper")).unwrap();
    fs::write(src.path().join("new/deeper/file.txt"), "beta").unwrap();
    eventually("new subtree", || {
        read(&out.join("new/deeper/file.txt")).as_deref() == Some("beta")
    })
    .await;

    fs::write(src.path().join("a.txt"), "alpha v2").unwrap();
    eventually("modification", || {
        read(&out.join("a.txt")).as_deref() == Some("alpha v2")
    })
    .await;

    fs::remove_dir_all(src.path().join("new")).unwrap();
    eventually("directory removal", || !out.join("new").exists()).await;

    fs::write(src.path().join("skip/other.txt"), "x").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!out.join("skip").exists());

    cancel.cancel();
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_missing_watch_root_is_fatal() {
    let dest = TempDir::new().unwrap();
    let config = MirrorConfig::new("/definitely/not/here", "unused");
    let service =
        MirrorService::with_remote(config, Arc::new(LocalRemote::new(dest.path()))).unwrap();

    let result = service.serve(CancellationToken::new()).await;

    assert!(matches!(result, Err(MirrorError::Watcher(_))));
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected_before_starting() {
    let result = MirrorService::run(MirrorConfig::default(), CancellationToken::new()).await;
    assert!(matches!(result, Err(MirrorError::Config(_))));

    let src = TempDir::new().unwrap();
    let config = MirrorConfig::new(src.path(), "gopher://host/dir");
    assert!(matches!(
        MirrorService::new(config),
        Err(MirrorError::Remote(_))
    ));
}

#[tokio::test]
async fn test_cancelled_service_stops_after_initial_sync() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(src.path().join("only.txt"), "x").unwrap();

    let config = MirrorConfig::new(src.path(), format!("file://{}", dest.path().display()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    MirrorService::run(config, cancel).await.unwrap();

    assert_eq!(read(&dest.path().join("only.txt")).as_deref(), Some("x"));
}
