//! End-to-end tests for the `tapedeck` binary
//!
//! Every invocation gets `--data-dir` pointing at a `TestHome`, so config,
//! preferences, logs and the store all live in a temp directory.

use super::common::store_fixtures::TestHome;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn tapedeck(home: &TestHome) -> Command {
    let mut cmd = Command::cargo_bin("tapedeck").unwrap();
    cmd.arg("--data-dir").arg(&home.path);
    cmd
}

#[test]
fn test_mode_defaults_to_disabled_and_persists() {
    let home = TestHome::new();

    tapedeck(&home)
        .arg("mode")
        .assert()
        .success()
        .stdout("disabled\n");

    tapedeck(&home)
        .args(["mode", "set", "recording"])
        .assert()
        .success()
        .stdout("recording\n");

    tapedeck(&home)
        .arg("mode")
        .assert()
        .success()
        .stdout("recording\n");
}

#[test]
fn test_mode_set_rejects_unknown_mode() {
    let home = TestHome::new();

    tapedeck(&home)
        .args(["mode", "set", "paused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("paused"));
}

#[test]
fn test_first_run_writes_example_config_and_log() {
    let home = TestHome::new();

    tapedeck(&home).arg("status").assert().success();

    let config = fs::read_to_string(home.path.join("config.toml")).unwrap();
    assert!(config.contains("[engine]"));
    assert!(home.path.join("logs").join("tapedeck.log").exists());
    assert!(home.snapshots_dir().is_dir());
}

#[test]
fn test_capture_records_then_replays() {
    let home = TestHome::new();

    tapedeck(&home).args(["mode", "set", "recording"]).assert().success();
    tapedeck(&home)
        .args(["capture", "articles"])
        .write_stdin("recorded body")
        .assert()
        .success()
        .stdout("recorded body");

    tapedeck(&home).args(["mode", "set", "replaying"]).assert().success();
    tapedeck(&home)
        .args(["capture", "articles"])
        .write_stdin("live body")
        .assert()
        .success()
        .stdout("recorded body");

    assert_eq!(
        fs::read(home.snapshots_dir().join("articles")).unwrap(),
        b"recorded body"
    );
}

#[test]
fn test_capture_reads_input_file() {
    let home = TestHome::new();
    let input = home.path.join("response.json");
    fs::write(&input, br#"{"ok":true}"#).unwrap();

    tapedeck(&home).args(["mode", "set", "recording"]).assert().success();
    tapedeck(&home)
        .args(["capture", "profile", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(r#"{"ok":true}"#);

    assert!(home.snapshots_dir().join("profile").exists());
}

#[test]
fn test_capture_with_invalid_identifier_passes_through() {
    let home = TestHome::new();

    tapedeck(&home).args(["mode", "set", "recording"]).assert().success();
    tapedeck(&home)
        .args(["capture", "a,b"])
        .write_stdin("body")
        .assert()
        .success()
        .stdout("body");

    assert_eq!(fs::read_dir(home.snapshots_dir()).unwrap().count(), 0);
}

#[test]
fn test_status_reports_configured_modules() {
    let home = TestHome::new();
    home.write_config("[modules]\nfeed = [\"articles\", \"profile\"]\n");

    tapedeck(&home).args(["mode", "set", "recording"]).assert().success();
    for identifier in ["articles", "stray"] {
        tapedeck(&home)
            .args(["capture", identifier])
            .write_stdin("x")
            .assert()
            .success();
    }

    tapedeck(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("mode: recording"))
        .stdout(predicate::str::contains("files: 2"))
        .stdout(predicate::str::contains(
            "module feed: 1/2 recorded, missing profile",
        ))
        .stdout(predicate::str::contains("module Unknown: 1 unclaimed files"));
}

#[test]
fn test_pack_and_unpack() {
    let home = TestHome::new();
    let source = home.path.join("tree");
    fs::create_dir_all(source.join("sub")).unwrap();
    fs::write(source.join("sub").join("leaf"), b"leaf").unwrap();
    let archive = home.path.join("tree.zip");
    let restored = home.path.join("restored");

    tapedeck(&home)
        .arg("pack")
        .arg(&source)
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("packed 2 entries"));

    tapedeck(&home)
        .arg("unpack")
        .arg(&archive)
        .arg(&restored)
        .arg("--strict")
        .assert()
        .success()
        .stdout(predicate::str::contains("unpacked 1 files and 1 directories"));

    assert_eq!(fs::read(restored.join("sub").join("leaf")).unwrap(), b"leaf");
}

#[test]
fn test_unpack_garbage_fails() {
    let home = TestHome::new();
    let garbage = home.path.join("garbage.zip");
    fs::write(&garbage, b"definitely not a zip").unwrap();

    tapedeck(&home)
        .arg("unpack")
        .arg(&garbage)
        .arg(home.path.join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: unpacking"));
}

#[test]
fn test_snapshot_upload_download_remove() {
    let home = TestHome::new();

    tapedeck(&home).args(["mode", "set", "recording"]).assert().success();
    tapedeck(&home)
        .args(["capture", "articles"])
        .write_stdin("v1")
        .assert()
        .success();

    let output = tapedeck(&home)
        .args(["snapshots", "upload"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let name = String::from_utf8(output).unwrap().trim().to_string();
    assert!(name.ends_with(".zip"));

    tapedeck(&home)
        .args(["snapshots", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(name.as_str()))
        .stdout(predicate::str::contains("articles"));

    tapedeck(&home)
        .args(["capture", "articles"])
        .write_stdin("v2")
        .assert()
        .success();

    tapedeck(&home)
        .args(["snapshots", "download", name.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed"));
    assert_eq!(
        fs::read(home.snapshots_dir().join("articles")).unwrap(),
        b"v1"
    );

    tapedeck(&home)
        .args(["snapshots", "remove", name.as_str()])
        .assert()
        .success();
    tapedeck(&home)
        .args(["snapshots", "list"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_download_unknown_snapshot_fails() {
    let home = TestHome::new();

    tapedeck(&home)
        .args(["snapshots", "download", "missing.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no remote snapshot named missing.zip"));
}
