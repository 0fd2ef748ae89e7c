//! Integration tests for the omni-send daemon

use assert_cmd::Command;
use libomnipost::{Database, PlatformKind, Post, PostStatus};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Setup test environment with config and database
async fn setup_test_env() -> (TempDir, String, String) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("test.db");

    let config_content = format!(
        r#"
[database]
path = "{}"

[defaults]
platforms = ["twitter"]
"#,
        db_path.display().to_string().replace('\\', "/")
    );

    fs::write(&config_path, config_content).unwrap();

    // Initialize database
    let _db = Database::new(db_path.to_str().unwrap()).await.unwrap();

    (
        temp_dir,
        config_path.to_str().unwrap().to_string(),
        db_path.to_str().unwrap().to_string(),
    )
}

/// Create a scheduled post that is due for publishing
async fn create_due_post(db_path: &str) -> String {
    let db = Database::new(db_path).await.unwrap();
    let now = chrono::Utc::now().timestamp();

    let mut post = Post::new(
        "Test scheduled post".to_string(),
        vec![PlatformKind::Twitter],
    );
    post.scheduled_at = Some(now - 10);
    post.status = PostStatus::Scheduled;

    let post_id = post.id.clone();
    db.create_post(&post).await.unwrap();
    post_id
}

// BASIC FUNCTIONALITY TESTS

#[tokio::test]
async fn test_daemon_starts_with_config() {
    let (_temp_dir, config_path, _db_path) = setup_test_env().await;

    let mut cmd = Command::cargo_bin("omni-send").unwrap();

    cmd.env("OMNIPOST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success();
}

#[tokio::test]
async fn test_daemon_requires_valid_config() {
    let temp_dir = TempDir::new().unwrap();
    let invalid_config = temp_dir.path().join("invalid.toml");

    fs::write(&invalid_config, "invalid toml content [[[").unwrap();

    let mut cmd = Command::cargo_bin("omni-send").unwrap();

    cmd.env("OMNIPOST_CONFIG", invalid_config.to_str().unwrap())
        .arg("--once")
        .assert()
        .failure();
}

#[tokio::test]
async fn test_once_flag_exits_immediately() {
    let (_temp_dir, config_path, _db_path) = setup_test_env().await;

    let mut cmd = Command::cargo_bin("omni-send").unwrap();

    cmd.env("OMNIPOST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success()
        .stderr(predicate::str::contains("omni-send daemon starting"))
        .stderr(predicate::str::contains("processed posts once, exiting"));
}

#[tokio::test]
async fn test_verbose_logging() {
    let (_temp_dir, config_path, _db_path) = setup_test_env().await;

    let mut cmd = Command::cargo_bin("omni-send").unwrap();

    cmd.env("OMNIPOST_CONFIG", &config_path)
        .arg("--once")
        .arg("--verbose")
        .assert()
        .success();
}

#[tokio::test]
async fn test_custom_poll_interval() {
    let (_temp_dir, config_path, _db_path) = setup_test_env().await;

    let mut cmd = Command::cargo_bin("omni-send").unwrap();

    cmd.env("OMNIPOST_CONFIG", &config_path)
        .arg("--once")
        .arg("--poll-interval")
        .arg("30")
        .assert()
        .success()
        .stderr(predicate::str::contains("Poll interval: 30s"));
}

// POST PROCESSING TESTS

#[tokio::test]
async fn test_due_post_is_picked_up() {
    let (_temp_dir, config_path, db_path) = setup_test_env().await;
    let post_id = create_due_post(&db_path).await;

    let mut cmd = Command::cargo_bin("omni-send").unwrap();

    cmd.env("OMNIPOST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success()
        .stderr(predicate::str::contains("Found 1 post(s) due"))
        .stderr(predicate::str::contains(&post_id));
}

#[tokio::test]
async fn test_due_post_without_connection_is_marked_failed() {
    let (_temp_dir, config_path, db_path) = setup_test_env().await;
    let post_id = create_due_post(&db_path).await;

    Command::cargo_bin("omni-send")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success();

    let db = Database::new(&db_path).await.unwrap();
    let post = db.get_post(&post_id).await.unwrap().unwrap();

    assert_eq!(post.status, PostStatus::Failed);
    let error = post.error_message.unwrap();
    assert!(
        error.contains("No active connection"),
        "unexpected error: {}",
        error
    );
}

#[tokio::test]
async fn test_future_post_is_left_alone() {
    let (_temp_dir, config_path, db_path) = setup_test_env().await;

    let db = Database::new(&db_path).await.unwrap();
    let mut post = Post::new("Not yet".to_string(), vec![PlatformKind::Twitter]);
    post.scheduled_at = Some(chrono::Utc::now().timestamp() + 3600);
    post.status = PostStatus::Scheduled;
    let post_id = post.id.clone();
    db.create_post(&post).await.unwrap();

    Command::cargo_bin("omni-send")
        .unwrap()
        .env("OMNIPOST_CONFIG", &config_path)
        .arg("--once")
        .assert()
        .success();

    let post = db.get_post(&post_id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Scheduled);
}
