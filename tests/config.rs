mod support;

use assert_cmd::Command;
use serde_json::{json, Value};
use support::TaskDump;

fn dump() -> TaskDump {
    TaskDump::new(&json!([
        { "id": "E-1", "title": "Epic" },
        { "id": "S-1", "title": "Story", "story_points": 4.0, "parent_id": "E-1" },
        { "id": "T-1", "title": "Subtask", "parent_id": "S-1" }
    ]))
}

fn run_json(dump: &TaskDump, args: &[&str]) -> Value {
    let output = Command::cargo_bin("taskcast")
        .expect("binary")
        .current_dir(dump.dir())
        .env_remove("TASKCAST_CONFIG")
        .env_remove("RUST_LOG")
        .args(args)
        .arg("--tasks")
        .arg(dump.tasks_path())
        .arg("--json")
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn config_in_working_directory_bounds_hierarchy() {
    let dump = dump();
    dump.write_config("[hierarchy]\nmax_depth = 2\n");

    let value = run_json(&dump, &["hierarchy", "E-1"]);
    assert_eq!(value["data"]["max_depth"], 2);
    assert!(value["data"]["tasks"][0]["child_tasks"][0]
        .get("child_tasks")
        .is_none());
}

#[test]
fn cli_max_depth_overrides_config() {
    let dump = dump();
    dump.write_config("[hierarchy]\nmax_depth = 2\n");

    let value = run_json(&dump, &["hierarchy", "E-1", "--max-depth", "3"]);
    assert_eq!(value["data"]["tasks"][0]["child_tasks"][0]["child_tasks"][0]["id"], "T-1");
}

#[test]
fn ideal_velocity_follows_member_seniority() {
    let dump = dump();
    dump.write_config(
        r#"
[estimation]
ideal_hours_per_day = 4.0

[members.alice]
level = "senior"
"#,
    );

    // senior: one ideal hour per point; 4 points => 4 hours => one 4h ideal day
    let value = run_json(
        &dump,
        &[
            "forecast",
            "S-1",
            "--subject",
            "alice",
            "--velocity-strategy",
            "ideal",
            "--unit",
            "hour",
            "--start",
            "2024-02-05T00:00:00Z",
        ],
    );

    let forecast = &value["data"]["tasks"][0]["forecast"];
    assert_eq!(forecast["estimation_time"]["amount"], 4.0);
    assert!(forecast["end_date"]
        .as_str()
        .expect("end date")
        .starts_with("2024-02-06T00:00:00"));
}

#[test]
fn invalid_config_fails_with_user_error() {
    let dump = dump();
    dump.write_config("[hierarchy]\nmax_depth = 0\n");

    Command::cargo_bin("taskcast")
        .expect("binary")
        .current_dir(dump.dir())
        .env_remove("TASKCAST_CONFIG")
        .args(["hierarchy", "E-1", "--tasks"])
        .arg(dump.tasks_path())
        .assert()
        .code(2);
}
