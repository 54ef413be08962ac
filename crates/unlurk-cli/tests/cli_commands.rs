#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn unlurk() -> Command {
    let mut cmd = Command::cargo_bin("unlurk").unwrap();
    cmd.env_remove("UNLURK_SNAPSHOT")
        .env_remove("UNLURK_FRONT_PAGE_URL")
        .env("RUST_LOG", "warn");
    cmd
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Snapshot with one busy thread, one quiet thread and one stale story.
fn write_live_snapshot(dir: &TempDir) -> PathBuf {
    let now = now();
    let items = serde_json::json!([
        {"id": 1, "type": "story", "by": "op", "time": now - 7200, "title": "Busy thread"},
        {"id": 2, "type": "comment", "by": "alice", "time": now - 600, "parent": 1, "text": "first &amp; fresh"},
        {"id": 3, "type": "comment", "by": "bob", "time": now - 300, "parent": 2, "text": "reply"},
        {"id": 4, "type": "comment", "by": "carol", "time": now - 3 * 3600, "parent": 1, "text": "old news"},
        {"id": 5, "type": "comment", "by": "dave", "time": now - 120, "parent": 1, "text": "<i>also</i> fresh"},
        {"id": 10, "type": "story", "by": "op2", "time": now - 1800, "title": "Quiet thread"},
        {"id": 11, "type": "comment", "by": "erin", "time": now - 60, "parent": 10, "text": "alone"},
        {"id": 20, "type": "story", "by": "op3", "time": now - 3 * 86400, "title": "Stale story"},
        {"id": 21, "type": "comment", "by": "frank", "time": now - 60, "parent": 20, "text": "a"},
        {"id": 22, "type": "comment", "by": "grace", "time": now - 60, "parent": 20, "text": "b"},
        {"id": 23, "type": "comment", "by": "heidi", "time": now - 60, "parent": 20, "text": "c"}
    ]);
    let path = dir.path().join("items.json");
    std::fs::write(&path, items.to_string()).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_active_offline_json() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_live_snapshot(&dir);

    let output = unlurk()
        .args(["active", "--offline", "--snapshot"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json["second_chance_failed"], false);

    let rows = json["rows"].as_array().unwrap();
    let ids: Vec<u64> = rows.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    // Quiet thread lacks authors, stale story is past max-age
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    assert_eq!(rows[0]["text"], "Busy thread");
    assert_eq!(rows[1]["text"], "first & fresh");
    assert_eq!(rows[1]["active"], true);
    assert_eq!(rows[2]["depth"], 2);
    // Inert leaf keeps its slot without text
    assert!(rows[3].get("text").is_none());
    assert_eq!(rows[4]["text"], "also fresh");
}

#[test]
fn test_active_min_by_and_hide_authors() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_live_snapshot(&dir);

    let output = unlurk()
        .args(["active", "--offline", "--min-by", "1", "--hide-authors", "--snapshot"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    let rows = json["rows"].as_array().unwrap();
    let roots: Vec<u64> = rows
        .iter()
        .filter(|r| r["depth"] == 0)
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(roots, vec![10, 1]);
    assert!(rows.iter().all(|r| r.get("by").is_none()));
}

#[test]
fn test_active_text_format() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_live_snapshot(&dir);

    unlurk()
        .args(["active", "--offline", "--format", "text", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("op: Busy thread"))
        .stdout(predicate::str::contains("    * ").and(predicate::str::contains("bob: reply")));
}

#[test]
fn test_active_missing_snapshot() {
    let dir = TempDir::new().unwrap();

    unlurk()
        .args(["active", "--offline", "--snapshot"])
        .arg(dir.path().join("missing.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load item snapshot"));
}

#[test]
fn test_active_rejects_zero_window() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_live_snapshot(&dir);

    unlurk()
        .args(["active", "--offline", "--window", "0s", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("window must be positive"));
}

#[test]
fn test_active_front_page_unreachable_degrades() {
    let dir = TempDir::new().unwrap();
    let snapshot = write_live_snapshot(&dir);

    // Nothing listens on port 9 on the loopback interface
    let output = unlurk()
        .args(["active", "--front-page-url", "http://127.0.0.1:9", "--snapshot"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["second_chance_failed"], true);
    assert_eq!(json["rows"][0]["id"], 1);
}

#[test]
fn test_tree_fixture() {
    let output = unlurk()
        .args(["tree", "--snapshot"])
        .arg(fixture("items.json"))
        .arg("8863")
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows = stdout_json(&output);
    let shape: Vec<(u64, u64)> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["id"].as_u64().unwrap(), r["depth"].as_u64().unwrap()))
        .collect();
    assert_eq!(shape, vec![(8863, 0), (8917, 1), (8952, 1), (9224, 2), (9000, 1)]);

    assert_eq!(rows[1]["text"], "[deleted]");
    assert_eq!(rows[3]["text"], "good points -- thanks & welcome");
    assert_eq!(rows[4]["text"], "Nice work.");
}

#[test]
fn test_tree_unknown_item() {
    unlurk()
        .args(["tree", "--snapshot"])
        .arg(fixture("items.json"))
        .arg("1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_version_flag() {
    unlurk()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
