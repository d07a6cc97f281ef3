mod support;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{json, Value};
use support::TaskDump;

fn dump() -> TaskDump {
    TaskDump::new(&json!([
        { "id": "E-1", "title": "Checkout epic", "original_status": "In Progress" },
        { "id": "S-1", "title": "Payment form", "story_points": 4.0, "parent_id": "E-1", "assignee": "alice" },
        { "id": "S-2", "title": "Receipt mail", "story_points": 2.0, "parent_id": "E-1" },
        { "id": "S-3", "title": "Old spike", "status": "done", "parent_id": "E-1" },
        { "id": "T-1", "title": "Validate card", "parent_id": "S-1", "original_status": "Closed" }
    ]))
}

fn taskcast(dump: &TaskDump) -> Command {
    let mut cmd = Command::cargo_bin("taskcast").expect("binary");
    cmd.current_dir(dump.dir())
        .env_remove("TASKCAST_CONFIG")
        .env_remove("TASKCAST_TASKS")
        .env_remove("RUST_LOG");
    cmd
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn taskcast_help_works() {
    Command::cargo_bin("taskcast")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("task hierarchies"));
}

#[test]
fn subcommand_help_works() {
    for cmd in ["hierarchy", "forecast"] {
        Command::cargo_bin("taskcast")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn hierarchy_json_excludes_done_branches() {
    let dump = dump();
    let output = taskcast(&dump)
        .args(["hierarchy", "E-1", "--tasks"])
        .arg(dump.tasks_path())
        .arg("--json")
        .output()
        .expect("run");
    assert!(output.status.success());

    let value = json_stdout(&output);
    assert_eq!(value["schema_version"], "taskcast.v1");
    assert_eq!(value["command"], "hierarchy");
    assert_eq!(value["status"], "success");

    let root = &value["data"]["tasks"][0];
    assert_eq!(root["id"], "E-1");
    assert_eq!(root["status"], "in_progress");
    let children: Vec<&str> = root["child_tasks"]
        .as_array()
        .expect("children")
        .iter()
        .filter_map(|child| child["id"].as_str())
        .collect();
    assert_eq!(children, vec!["S-1", "S-2"]);
    // T-1 maps to done and is dropped
    assert!(root["child_tasks"][0].get("child_tasks").is_none());
}

#[test]
fn hierarchy_human_output_lists_tree() {
    let dump = dump();
    taskcast(&dump)
        .args(["hierarchy", "E-1", "--include-done", "--tasks"])
        .arg(dump.tasks_path())
        .assert()
        .success()
        .stdout(contains("E-1 Checkout epic"))
        .stdout(contains("    T-1 Validate card <done>"));
}

#[test]
fn forecast_json_schedules_cumulative_tree() {
    let dump = dump();
    let output = taskcast(&dump)
        .args([
            "forecast",
            "E-1",
            "--subject",
            "alice",
            "--velocity",
            "2",
            "--story-points",
            "cumulative",
            "--start",
            "2024-02-05T00:00:00Z",
            "--json",
            "--tasks",
        ])
        .arg(dump.tasks_path())
        .output()
        .expect("run");
    assert!(output.status.success());

    let value = json_stdout(&output);
    let data = &value["data"];
    assert_eq!(data["forecasted"], 3);

    let root = &data["tasks"][0]["forecast"];
    assert_eq!(root["estimation_time"]["amount"], 3.0);
    assert_eq!(root["estimation_time"]["unit"], "day");
    assert!(root["end_date"]
        .as_str()
        .expect("end date")
        .starts_with("2024-02-08T00:00:00"));
    assert!(root["target"].get("health_status").is_none());

    let first = &data["tasks"][0]["child_tasks"][0]["forecast"];
    assert_eq!(first["target"]["health_status"], "GREEN");
}

#[test]
fn missing_task_dump_is_a_user_error() {
    let dump = dump();
    let output = taskcast(&dump)
        .args(["hierarchy", "E-1", "--tasks", "nope.json", "--json"])
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(2));
    let value = json_stdout(&output);
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["kind"], "user_error");
}

#[test]
fn invalid_strategy_is_rejected() {
    let dump = dump();
    taskcast(&dump)
        .args(["forecast", "E-1", "--subject", "alice", "--velocity-strategy", "guess", "--tasks"])
        .arg(dump.tasks_path())
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Invalid velocity strategy"));
}
