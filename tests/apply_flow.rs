use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use assert_cmd::Command;

mod util;
use util::{make_project, replace_reply};

fn edict() -> Command {
    Command::cargo_bin("edict").expect("edict binary")
}

#[test]
fn preview_shows_diff_and_leaves_files_alone() {
    let tmp = make_project();

    edict()
        .current_dir(tmp.path())
        .args(["--no-color", "apply"])
        .write_stdin(replace_reply(0, 0, "test.txt", "const foo = 3"))
        .assert()
        .success()
        .stdout(predicate::str::contains("-const foo = 2"))
        .stdout(predicate::str::contains("+const foo = 3"))
        .stdout(predicate::str::contains("--apply"));

    tmp.child("test.txt").assert("const foo = 2");
}

#[test]
fn apply_writes_replace_create_and_delete() {
    let tmp = make_project();
    let reply = "\
REPLACE 1-1 src/lib.rs
```rust
pub fn b() { println!(\"b\"); }
```
CREATE docs/notes.md
```markdown
# Notes
```
DELETE test.txt
";

    edict()
        .current_dir(tmp.path())
        .args(["apply", "--apply", "--no-color"])
        .write_stdin(reply)
        .assert()
        .success()
        .stdout(predicate::str::contains("[src/lib.rs 1-1] File updated"))
        .stdout(predicate::str::contains("[docs/notes.md] File created"))
        .stdout(predicate::str::contains("[test.txt] File deleted"));

    tmp.child("src/lib.rs")
        .assert("pub fn a() {}\npub fn b() { println!(\"b\"); }\npub fn c() {}\n");
    tmp.child("docs/notes.md").assert("# Notes");
    tmp.child("test.txt").assert(predicate::path::missing());
}

#[test]
fn dry_run_overrides_apply() {
    let tmp = make_project();

    edict()
        .current_dir(tmp.path())
        .args(["apply", "--apply", "--dry-run"])
        .write_stdin("DELETE test.txt\n")
        .assert()
        .success();

    tmp.child("test.txt").assert(predicate::path::exists());
}

#[test]
fn complete_skips_later_commands() {
    let tmp = make_project();

    let assert = edict()
        .current_dir(tmp.path())
        .args(["apply", "--apply", "--json", "--order", "response"])
        .write_stdin("COMPLETE\nDELETE test.txt\n")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let v: Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(v["completed"], true);
    assert_eq!(v["skipped"], 1);
    tmp.child("test.txt").assert(predicate::path::exists());
}

#[test]
fn create_over_existing_file_is_rejected() {
    let tmp = make_project();

    edict()
        .current_dir(tmp.path())
        .args(["apply", "--apply"])
        .write_stdin("CREATE test.txt\n```\nclobber\n```\n")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("File test.txt already exists"));

    tmp.child("test.txt").assert("const foo = 2");
}

#[test]
fn create_outside_root_is_a_project_error() {
    let tmp = make_project();

    edict()
        .current_dir(tmp.path())
        .args(["apply", "--apply"])
        .write_stdin("CREATE ../escape.txt\n```\nx\n```\n")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("boundary"));
}

#[test]
fn failure_midway_still_reports_finished_writes() {
    let tmp = make_project();
    let reply = "\
CREATE first.txt
```
1
```
CREATE test.txt/inner.txt
```
x
```
CREATE third.txt
```
3
```
";

    let assert = edict()
        .current_dir(tmp.path())
        .args(["apply", "--apply", "--json"])
        .write_stdin(reply)
        .assert()
        .code(4);

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let v: Value = serde_json::from_str(stdout.trim()).expect("json report");
    assert_eq!(v["outcomes"].as_array().expect("outcomes").len(), 1);
    assert_eq!(v["outcomes"][0]["path"], "first.txt");
    assert_eq!(v["error"]["kind"], "io");
    assert_eq!(v["error"]["path"], "test.txt/inner.txt");
    assert_eq!(v["skipped"], 1);

    tmp.child("first.txt").assert("1");
    tmp.child("third.txt").assert(predicate::path::missing());
}
