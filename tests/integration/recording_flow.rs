//! Integration tests for the record/replay flow
//!
//! Engines here run on the local filesystem with a JSON preferences file, and
//! "restarting" means dropping the engine and initializing a new one on the
//! same data directory.

use super::common::store_fixtures::{read_store, TestHome};
use std::fs;
use tapedeck::{Mode, UNKNOWN_MODULE};

#[tokio::test]
async fn test_record_restart_replay() {
    let home = TestHome::new();

    {
        let engine = home.engine(Mode::Disabled, true).await;
        engine.set_mode(Mode::Recording).unwrap();
        let returned = engine
            .capture_or_serve(br#"{"items":[1,2]}"#.to_vec(), "articles")
            .await;
        assert_eq!(returned, br#"{"items":[1,2]}"#);
        engine.set_mode(Mode::Replaying).unwrap();
    }

    let engine = home.engine(Mode::Disabled, true).await;
    assert_eq!(engine.mode(), Mode::Replaying);

    let served = engine
        .capture_or_serve(br#"{"items":[]}"#.to_vec(), "articles")
        .await;
    assert_eq!(served, br#"{"items":[1,2]}"#);
}

#[tokio::test]
async fn test_restart_without_restore_uses_default_mode() {
    let home = TestHome::new();
    home.engine(Mode::Disabled, true)
        .await
        .set_mode(Mode::Replaying)
        .unwrap();

    let engine = home.engine(Mode::Recording, false).await;
    assert_eq!(engine.mode(), Mode::Recording);
}

#[tokio::test]
async fn test_initialize_does_not_persist_mode() {
    let home = TestHome::new();
    let _engine = home.engine(Mode::Recording, true).await;

    assert!(!home.preferences_path().exists());
}

#[tokio::test]
async fn test_mode_is_persisted_as_json() {
    let home = TestHome::new();
    let engine = home.engine(Mode::Disabled, true).await;
    engine.set_mode(Mode::Recording).unwrap();

    let raw = fs::read_to_string(home.preferences_path()).unwrap();
    let values: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(values["recording_mode"], "recording");
}

#[tokio::test]
async fn test_corrupt_preferences_fall_back_to_default() {
    let home = TestHome::new();
    fs::write(home.preferences_path(), b"{not json").unwrap();

    let engine = home.engine(Mode::Replaying, true).await;
    assert_eq!(engine.mode(), Mode::Replaying);
}

#[tokio::test]
async fn test_unknown_persisted_mode_falls_back_to_default() {
    let home = TestHome::new();
    fs::write(home.preferences_path(), br#"{"recording_mode":"paused"}"#).unwrap();

    let engine = home.engine(Mode::Recording, true).await;
    assert_eq!(engine.mode(), Mode::Recording);
}

#[tokio::test]
async fn test_uncreatable_store_disables_engine() {
    let home = TestHome::new();
    let blocked = home.path.join("blocked");
    fs::write(&blocked, b"a file, not a directory").unwrap();

    let engine = home
        .engine_at(blocked.join("snapshots"), Mode::Recording, false)
        .await;

    assert_eq!(engine.mode(), Mode::Disabled);
    let returned = engine.capture_or_serve(b"live".to_vec(), "articles").await;
    assert_eq!(returned, b"live");
}

#[tokio::test]
async fn test_recording_overwrites_previous_capture() {
    let home = TestHome::new();
    let engine = home.engine(Mode::Recording, false).await;

    engine.capture_or_serve(b"first".to_vec(), "articles").await;
    engine.capture_or_serve(b"second".to_vec(), "articles").await;

    assert_eq!(
        read_store(&home.snapshots_dir()),
        vec![("articles".to_string(), b"second".to_vec())]
    );
}

#[tokio::test]
async fn test_replay_of_missing_identifier_passes_through() {
    let home = TestHome::new();
    let engine = home.engine(Mode::Replaying, false).await;

    let returned = engine.capture_or_serve(b"live".to_vec(), "never-recorded").await;

    assert_eq!(returned, b"live");
    assert!(read_store(&home.snapshots_dir()).is_empty());
}

#[tokio::test]
async fn test_modules_track_recorded_files() {
    let home = TestHome::new();
    let engine = home.engine(Mode::Recording, false).await;
    engine.register("feed", ["articles", "profile"]).unwrap();
    engine.refresh_registry().await;

    engine.capture_or_serve(b"a".to_vec(), "articles").await;
    let feed = engine.module("feed").unwrap();
    assert!(!feed.is_complete());
    assert_eq!(feed.missing(), vec!["profile"]);

    engine.capture_or_serve(b"p".to_vec(), "profile").await;
    engine.capture_or_serve(b"x".to_vec(), "settings").await;

    assert!(engine.module("feed").unwrap().is_complete());
    let unknown = engine.module(UNKNOWN_MODULE).unwrap();
    assert_eq!(
        unknown.file_list.into_iter().collect::<Vec<_>>(),
        vec!["settings".to_string()]
    );
}

#[tokio::test]
async fn test_registry_reflects_files_present_at_startup() {
    let home = TestHome::new();
    fs::create_dir_all(home.snapshots_dir()).unwrap();
    fs::write(home.snapshots_dir().join("articles"), b"a").unwrap();

    let engine = home.engine(Mode::Disabled, false).await;
    assert_eq!(engine.file_inventory().await.len(), 1);

    engine.register("feed", ["articles"]).unwrap();
    assert!(!engine.module("feed").unwrap().is_complete());

    engine.refresh_registry().await;
    assert!(engine.module("feed").unwrap().is_complete());
}
