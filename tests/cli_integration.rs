//! Integration tests for the prdtask CLI

use assert_cmd::cargo;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the prdtask binary
fn prdtask() -> Command {
    Command::new(cargo::cargo_bin!("prdtask"))
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(temp.path().join(name), content).unwrap();
    }
    temp
}

fn read(temp: &TempDir, name: &str) -> String {
    std::fs::read_to_string(temp.path().join(name)).unwrap()
}

#[test]
fn test_help() {
    prdtask()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Markdown-embedded task tracking"));
}

#[test]
fn test_version() {
    prdtask()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_list_tasks() {
    let temp = workspace(&[(
        "prd.md",
        "- [ ] first task PRD-100001\n- [x] second task @alice PRD-100002",
    )]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("first task"))
        .stdout(predicate::str::contains("PRD-100002"))
        .stdout(predicate::str::contains("1 / 2 completed"));
}

#[test]
fn test_list_uncompleted_filter() {
    let temp = workspace(&[(
        "prd.md",
        "- [ ] open task PRD-100001\n- [x] done task PRD-100002",
    )]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("list")
        .arg("--filter")
        .arg("uncompleted")
        .assert()
        .success()
        .stdout(predicate::str::contains("open task"))
        .stdout(predicate::str::contains("done task").not());
}

#[test]
fn test_show_task() {
    let temp = workspace(&[(
        "prd.md",
        "# Auth\n## Login\n- [ ] add session cookie @alice PRD-100001",
    )]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("show")
        .arg("PRD-100001")
        .assert()
        .success()
        .stdout(predicate::str::contains("add session cookie"))
        .stdout(predicate::str::contains("@alice"))
        .stdout(predicate::str::contains("Auth > Login"));
}

#[test]
fn test_show_unknown_task_exit_code() {
    let temp = workspace(&[("prd.md", "- [ ] a PRD-100001")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("show")
        .arg("PRD-999999")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("PRD-999999"));
}

#[test]
fn test_toggle_rewrites_file() {
    let temp = workspace(&[("prd.md", "- [ ] flip me PRD-100001\nprose below")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("toggle")
        .arg("PRD-100001")
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    assert_eq!(read(&temp, "prd.md"), "- [x] flip me PRD-100001\nprose below");
}

#[test]
fn test_add_task_appends_with_id() {
    let temp = workspace(&[("prd.md", "- [ ] existing PRD-100001")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("add")
        .arg("a new task")
        .arg("--assignee")
        .arg("alice")
        .assert()
        .success()
        .stdout(predicate::str::contains("PRD-100002"));

    assert_eq!(
        read(&temp, "prd.md"),
        "- [ ] existing PRD-100001\n- [ ] a new task @alice PRD-100002"
    );
}

#[test]
fn test_add_subtask_under_parent() {
    let temp = workspace(&[("prd.md", "- [ ] parent PRD-100001")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("add")
        .arg("child task")
        .arg("--parent")
        .arg("PRD-100001")
        .assert()
        .success();

    assert_eq!(
        read(&temp, "prd.md"),
        "- [ ] parent PRD-100001\n  - [ ] child task PRD-100002"
    );
}

#[test]
fn test_add_without_documents_fails() {
    let temp = TempDir::new().unwrap();

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("add")
        .arg("orphan")
        .assert()
        .failure()
        .code(6)
        .stderr(predicate::str::contains("No task documents"));
}

#[test]
fn test_assign_task() {
    let temp = workspace(&[("prd.md", "- [ ] review @bob PRD-100001")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("assign")
        .arg("PRD-100001")
        .arg("alice")
        .assert()
        .success()
        .stdout(predicate::str::contains("@alice"));

    assert_eq!(read(&temp, "prd.md"), "- [ ] review @alice PRD-100001");
}

#[test]
fn test_opening_workspace_repairs_formatting() {
    let temp = workspace(&[("prd.md", "- [] needs repair PRD-100001\n- [ ] needs an id")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("list")
        .assert()
        .success();

    assert_eq!(
        read(&temp, "prd.md"),
        "- [ ] needs repair PRD-100001\n- [ ] needs an id PRD-100002"
    );
}

#[test]
fn test_convert_all_list_items() {
    let temp = workspace(&[("prd.md", "- alpha\n- beta")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("convert")
        .arg("prd.md")
        .arg("--all")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 list item(s)"));

    assert_eq!(
        read(&temp, "prd.md"),
        "- [ ] alpha PRD-100001\n- [ ] beta PRD-100002"
    );
}

#[test]
fn test_duplicates_report_and_fix() {
    let temp = workspace(&[("prd.md", "- [ ] a PRD-100001\n- [ ] b PRD-100001")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("duplicates")
        .arg("prd.md")
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("PRD-100001"))
        .stdout(predicate::str::contains("lines 1, 2"));

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("duplicates")
        .arg("prd.md")
        .arg("--fix")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 duplicate line(s)"));

    assert_eq!(
        read(&temp, "prd.md"),
        "- [ ] a PRD-100001\n- [ ] b PRD-100002"
    );
}

#[test]
fn test_report_output() {
    let temp = workspace(&[(
        "prd.md",
        "- [x] done @alice PRD-100001\n- [ ] open PRD-100002",
    )]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Task Progress Report"))
        .stdout(predicate::str::contains("1 / 2 tasks completed"));
}

#[test]
fn test_settings_file_changes_prefix() {
    let temp = workspace(&[
        ("prdtask.json", r#"{"idPrefix": "SPEC"}"#),
        ("prd.md", "- [ ] custom prefix task"),
    ]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("SPEC-100001"));

    assert_eq!(read(&temp, "prd.md"), "- [ ] custom prefix task SPEC-100001");
}

#[test]
fn test_invalid_settings_exit_code() {
    let temp = workspace(&[
        ("prdtask.json", r#"{"idPrefix": ""}"#),
        ("prd.md", "- [ ] a PRD-100001"),
    ]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("list")
        .assert()
        .failure()
        .code(7)
        .stderr(predicate::str::contains("idPrefix"));
}

#[test]
fn test_serve_round_trip() {
    let temp = workspace(&[("prd.md", "- [ ] served PRD-100001")]);

    prdtask()
        .arg("--project")
        .arg(temp.path())
        .arg("serve")
        .write_stdin(r#"{"id":1,"method":"get_task","params":{"taskId":"PRD-100001"}}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""text":"served""#));
}
