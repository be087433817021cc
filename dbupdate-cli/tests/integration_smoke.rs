//! Smoke tests for the dbupdate binary (no database server required)

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DESCRIPTOR: &str = r#"[
    {"events": {
        "eventTitle": "title",
        "eventDescription": "description",
        "eventCategory": "category",
        "eventStartDate": "start_date",
        "eventEndDate": "end_date"
    }},
    {"events": {
        "eventTitle": "title;",
        "eventDescription": "description",
        "eventCategory": "category",
        "eventStartDate": "start_date",
        "eventEndDate": "end_date"
    }}
]"#;

fn base_dir_with_descriptor() -> TempDir {
    let dir = TempDir::new().unwrap();
    let update = dir.path().join("update");
    std::fs::create_dir_all(&update).unwrap();
    std::fs::write(update.join("config.json"), DESCRIPTOR).unwrap();
    dir
}

fn dbupdate(base_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dbupdate").unwrap();
    cmd.arg("--base-dir").arg(base_dir);
    for key in ["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_PORT", "DB_NAME", "DB_CONNECT_TIMEOUT"] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("dbupdate").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Validate the descriptor"));
}

#[test]
fn test_dry_run_prints_statements() {
    let dir = base_dir_with_descriptor();

    dbupdate(dir.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "CREATE TABLE IF NOT EXISTS crs_event (`id` INT AUTO_INCREMENT PRIMARY KEY",
        ))
        .stdout(predicate::str::contains("-- entry 1 skipped"));
}

#[test]
fn test_dry_run_strict_fails_on_bad_entry() {
    let dir = base_dir_with_descriptor();

    dbupdate(dir.path())
        .arg("--dry-run")
        .arg("--strict")
        .assert()
        .code(4);
}

#[test]
fn test_dry_run_missing_descriptor() {
    let dir = TempDir::new().unwrap();

    dbupdate(dir.path())
        .arg("--dry-run")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("LOOKING FOR:"))
        .stdout(predicate::str::contains("config.json"));
}

#[test]
fn test_unreachable_server_reports_settings() {
    let dir = base_dir_with_descriptor();

    dbupdate(dir.path())
        .env("DB_HOST", "127.0.0.1")
        .env("DB_PORT", "1")
        .env("DB_USER", "deploy")
        .env("DB_NAME", "events")
        .arg("--connect-timeout")
        .arg("2")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("DATABASE CONNECTION ERROR"))
        .stdout(predicate::str::contains("HOST: 127.0.0.1"))
        .stdout(predicate::str::contains("USER: deploy"))
        .stdout(predicate::str::contains("PORT: 1"))
        .stdout(predicate::str::contains("DATABASE: events"))
        .stdout(predicate::str::contains("LOCATING DATABASE").not());
}

#[test]
fn test_settings_read_from_dotenv() {
    let dir = base_dir_with_descriptor();
    std::fs::write(
        dir.path().join(".env"),
        "DB_HOST=127.0.0.1\nDB_PORT=1\nDB_NAME=from_dotenv\n",
    )
    .unwrap();

    dbupdate(dir.path())
        .arg("--connect-timeout")
        .arg("2")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("DATABASE: from_dotenv"))
        .stdout(predicate::str::contains("USER: root"));
}
