//! CLI integration tests for omni-connect

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();

    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("posts.db");

    let config_content = format!(
        r#"
[database]
path = "{}"
"#,
        db_path.to_string_lossy()
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

#[test]
fn test_help_shows_commands() {
    let mut cmd = Command::cargo_bin("omni-connect").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("import"));
}

// SET TESTS

#[test]
fn test_set_and_list_round_trip() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("twitter")
        .arg("--token")
        .arg("tw-secret-token-123")
        .arg("--identity")
        .arg("jane|9001")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored twitter connection"))
        .stdout(predicate::str::contains("jane"));

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("twitter"))
        .stdout(predicate::str::contains("jane"))
        .stdout(predicate::str::contains("tw-secret-token-123").not());
}

#[test]
fn test_set_reads_token_from_stdin() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("threads")
        .arg("--stdin")
        .write_stdin("th-token-from-stdin\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored threads connection"));
}

#[test]
fn test_set_empty_token_is_rejected() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("twitter")
        .arg("--token")
        .arg("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Access token cannot be empty"));
}

#[test]
fn test_set_unknown_platform_is_rejected() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("myspace")
        .arg("--token")
        .arg("tok")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown platform: myspace"));
}

#[test]
fn test_set_token_and_stdin_conflict() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("twitter")
        .arg("--token")
        .arg("tok")
        .arg("--stdin")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Cannot use --token and --stdin together",
        ));
}

#[test]
fn test_set_without_tty_requires_stdin_flag() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("twitter")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a TTY"));
}

// REMOVE TESTS

#[test]
fn test_remove_deactivates_connection() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("twitter")
        .arg("--token")
        .arg("tok")
        .assert()
        .success();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("remove")
        .arg("twitter")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deactivated twitter connection"));

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("remove")
        .arg("twitter")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active connection for twitter"));
}

// IMPORT TESTS

#[test]
fn test_import_from_file() {
    let (temp_dir, config_path) = setup_test_env();

    let export_path = temp_dir.path().join("export.json");
    fs::write(
        &export_path,
        r#"[
  {
    "platform": "twitter",
    "access_token": "tw-token-123",
    "identity": "jane|9001"
  },
  {
    "platform": "linkedin",
    "access_token": "li-token-456",
    "username": "jane",
    "account_id": "AbC123"
  }
]"#,
    )
    .unwrap();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("import")
        .arg(export_path.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 connection(s)"))
        .stdout(predicate::str::contains("twitter"))
        .stdout(predicate::str::contains("linkedin"));

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("twitter"))
        .stdout(predicate::str::contains("linkedin"));
}

#[test]
fn test_import_from_stdin() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("import")
        .arg("-")
        .write_stdin(r#"[{"platform": "threads", "access_token": "th-tok"}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 connection(s)"));
}

#[test]
fn test_import_invalid_json_is_rejected() {
    let (temp_dir, config_path) = setup_test_env();

    let export_path = temp_dir.path().join("bad.json");
    fs::write(&export_path, "{not json").unwrap();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("import")
        .arg(export_path.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid connection export"));
}

#[test]
fn test_import_missing_file() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("import")
        .arg("/no/such/export.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read export file"));
}

// LIST TESTS

#[test]
fn test_list_empty() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No connections stored"));
}

#[test]
fn test_list_json_never_shows_tokens() {
    let (_temp_dir, config_path) = setup_test_env();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("set")
        .arg("instagram")
        .arg("--token")
        .arg("ig-secret-token")
        .arg("--identity")
        .arg("brand|17841400|99887")
        .assert()
        .success();

    Command::cargo_bin("omni-connect")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("list")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"platform\""))
        .stdout(predicate::str::contains("\"instagram\""))
        .stdout(predicate::str::contains("ig-secret-token").not());
}
