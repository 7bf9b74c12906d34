//! Integration tests for moving snapshot stores between machines
//!
//! Two `TestHome`s stand in for two devices sharing one directory object
//! store.

use super::common::store_fixtures::{read_store, TestHome};
use std::fs;
use std::sync::Arc;
use tapedeck::archive;
use tapedeck::{ArchiveGateway, DirectoryObjectStore, LocalStorage, Mode, SnapshotGateway};
use tempfile::TempDir;

fn shared_gateway(remote: &TempDir) -> ArchiveGateway<DirectoryObjectStore> {
    ArchiveGateway::new(
        DirectoryObjectStore::new(remote.path()),
        Arc::new(LocalStorage::new()),
    )
}

#[tokio::test]
async fn test_export_then_import_on_another_device() {
    let remote = TempDir::new().unwrap();
    let gateway = shared_gateway(&remote);

    let recorder = TestHome::new();
    let engine = recorder.engine(Mode::Recording, false).await;
    engine.capture_or_serve(b"a1".to_vec(), "articles").await;
    engine.capture_or_serve(b"p1".to_vec(), "profile").await;
    let snapshot = engine.export_snapshot(&gateway).await.unwrap();
    assert_eq!(snapshot.file_list, vec!["articles", "profile"]);

    let player = TestHome::new();
    let replay = player.engine(Mode::Replaying, false).await;
    replay.register("feed", ["articles", "profile"]).unwrap();
    replay.refresh_registry().await;
    assert!(!replay.module("feed").unwrap().is_complete());

    let listed = gateway.list().await.unwrap();
    assert_eq!(listed, vec![snapshot.clone()]);
    replay.import_snapshot(&gateway, &listed[0]).await.unwrap();

    assert!(replay.module("feed").unwrap().is_complete());
    assert_eq!(
        replay.capture_or_serve(b"live".to_vec(), "articles").await,
        b"a1"
    );
    assert_eq!(
        read_store(&player.snapshots_dir()),
        read_store(&recorder.snapshots_dir())
    );
}

#[tokio::test]
async fn test_import_discards_files_not_in_snapshot() {
    let home = TestHome::new();
    let gateway = home.gateway();
    let engine = home.engine(Mode::Recording, false).await;

    engine.capture_or_serve(b"v1".to_vec(), "articles").await;
    let snapshot = engine.export_snapshot(&gateway).await.unwrap();

    engine.capture_or_serve(b"v2".to_vec(), "articles").await;
    engine.capture_or_serve(b"later".to_vec(), "settings").await;

    engine.import_snapshot(&gateway, &snapshot).await.unwrap();

    assert_eq!(
        read_store(&home.snapshots_dir()),
        vec![("articles".to_string(), b"v1".to_vec())]
    );
    assert_eq!(engine.file_inventory().await.len(), 1);
}

#[tokio::test]
async fn test_uploads_get_unique_names_and_can_be_removed() {
    let home = TestHome::new();
    let gateway = home.gateway();
    let engine = home.engine(Mode::Recording, false).await;
    engine.capture_or_serve(b"v1".to_vec(), "articles").await;

    let first = engine.export_snapshot(&gateway).await.unwrap();
    let second = engine.export_snapshot(&gateway).await.unwrap();
    assert_ne!(first.name, second.name);
    assert_eq!(gateway.list().await.unwrap().len(), 2);

    gateway.remove(&first).await.unwrap();

    assert_eq!(gateway.list().await.unwrap(), vec![second]);
}

#[tokio::test]
async fn test_export_of_empty_store() {
    let home = TestHome::new();
    let gateway = home.gateway();
    let engine = home.engine(Mode::Disabled, false).await;

    let snapshot = engine.export_snapshot(&gateway).await.unwrap();
    assert!(snapshot.file_list.is_empty());

    let listed = gateway.list().await.unwrap();
    assert!(listed[0].file_list.is_empty());
}

#[test]
fn test_pack_unpack_nested_tree() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("source");
    fs::create_dir_all(source.join("nested/deeper")).unwrap();
    fs::create_dir_all(source.join("empty")).unwrap();
    fs::write(source.join("top"), b"top").unwrap();
    fs::write(source.join("nested/deeper/leaf"), b"leaf").unwrap();

    let packed = work.path().join("store.zip");
    let entries = archive::pack_to_path(&source, &packed).unwrap();
    assert_eq!(entries, 5);

    let restored = work.path().join("restored");
    let summary = archive::unpack(&packed, &restored).unwrap();

    assert_eq!(summary.files, 2);
    assert_eq!(summary.directories, 3);
    assert!(summary.skipped.is_empty());
    assert!(restored.join("empty").is_dir());
    assert_eq!(
        fs::read(restored.join("nested/deeper/leaf")).unwrap(),
        b"leaf"
    );
}
