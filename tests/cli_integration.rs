//! Integration tests for the `td` CLI.
//!
//! Each test points `td` at a data file in a temp directory, runs it as a
//! subprocess, and checks stdout and/or the file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Get the path to the built `td` binary.
fn td_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("td");
    path
}

const FIXTURE: &str = r#"{
  "Inbox": [
    {
      "id": "aaaa1111-0000-0000-0000-000000000001",
      "title": "Plan trip",
      "completed": false,
      "collapsed": false,
      "created_at": "2026-01-01T09:00:00",
      "description": "flights and hotel",
      "children": [
        {
          "id": "bbbb2222-0000-0000-0000-000000000002",
          "title": "Book flights",
          "completed": false,
          "collapsed": false,
          "created_at": "2026-01-01T09:01:00",
          "description": "",
          "children": []
        },
        {
          "id": "cccc3333-0000-0000-0000-000000000003",
          "title": "Renew passport",
          "completed": true,
          "collapsed": false,
          "created_at": "2026-01-01T09:02:00",
          "description": "",
          "children": []
        }
      ]
    },
    {
      "id": "dddd4444-0000-0000-0000-000000000004",
      "title": "Buy milk",
      "completed": false,
      "collapsed": false,
      "created_at": "2026-01-01T10:00:00",
      "description": "",
      "children": []
    }
  ],
  "Later": []
}"#;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Env {
            dir: TempDir::new().unwrap(),
        }
    }

    fn with_fixture() -> Self {
        let env = Env::new();
        fs::write(env.data_file(), FIXTURE).unwrap();
        env
    }

    fn data_file(&self) -> PathBuf {
        self.dir.path().join("tasks.json")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(td_bin())
            .arg("--file")
            .arg(self.data_file())
            .args(args)
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env_remove("TLTD_LOG")
            .output()
            .expect("failed to run td")
    }

    fn stdout(&self, args: &[&str]) -> String {
        let out = self.run(args);
        assert!(
            out.status.success(),
            "td {:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).unwrap()
    }

    fn saved(&self) -> serde_json::Value {
        read_json(&self.data_file())
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[test]
fn list_shows_the_inbox_tree() {
    let env = Env::with_fixture();
    insta::assert_snapshot!(env.stdout(&["list"]), @r"
    [Inbox]
    aaaa1111  ▼ ☐ Plan trip
                  flights and hotel
    bbbb2222      ☐ Book flights
    dddd4444    ☐ Buy milk
    ");
}

#[test]
fn list_all_includes_completed() {
    let env = Env::with_fixture();
    let out = env.stdout(&["list", "inbox", "--all"]);
    assert!(out.contains("cccc3333      ☑ Renew passport"));
}

#[test]
fn list_json_nests_children() {
    let env = Env::with_fixture();
    let value: serde_json::Value = serde_json::from_str(&env.stdout(&["list", "--json"])).unwrap();
    assert_eq!(value["basket"], "Inbox");
    assert_eq!(value["tasks"][0]["title"], "Plan trip");
    assert_eq!(value["tasks"][0]["children"].as_array().unwrap().len(), 1);
    assert_eq!(value["tasks"][1]["id"], "dddd4444-0000-0000-0000-000000000004");
}

#[test]
fn empty_basket_lists_no_tasks() {
    let env = Env::with_fixture();
    assert_eq!(env.stdout(&["list", "later"]), "[Later]\nNo tasks\n");
}

#[test]
fn baskets_json_counts_inbox() {
    let env = Env::with_fixture();
    let value: serde_json::Value =
        serde_json::from_str(&env.stdout(&["baskets", "--json"])).unwrap();
    let baskets = value["baskets"].as_array().unwrap();
    assert_eq!(baskets.len(), 9);
    assert_eq!(baskets[0]["key"], "Inbox");
    assert_eq!(baskets[0]["open"], 3);
    assert_eq!(baskets[0]["total"], 4);
    assert_eq!(baskets[8]["key"], "Later");
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[test]
fn quick_add_splits_title_and_description() {
    let env = Env::new();
    let out = env.stdout(&["Call", "the", "bank", "\\\\", "about", "the", "card"]);
    assert_eq!(
        out,
        "Added to Inbox: Call the bank\n  Description: about the card\n"
    );

    let saved = env.saved();
    let inbox = saved["Inbox"].as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["title"], "Call the bank");
    assert_eq!(inbox[0]["description"], "about the card");
    assert_eq!(inbox[0]["completed"], false);
}

#[test]
fn double_dash_quick_adds_command_words() {
    let env = Env::new();
    let out = env.stdout(&["--", "list", "of", "groceries"]);
    assert_eq!(out, "Added to Inbox: list of groceries\n");
    assert_eq!(env.saved()["Inbox"][0]["title"], "list of groceries");
}

#[test]
fn bare_td_is_an_error() {
    let env = Env::new();
    let out = env.run(&[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("error: "));
    assert!(!env.data_file().exists());
}

#[test]
fn add_under_a_parent_by_prefix() {
    let env = Env::with_fixture();
    env.stdout(&["add", "Pick seats", "--under", "bbbb"]);
    let saved = env.saved();
    let flights = &saved["Inbox"][0]["children"][0];
    assert_eq!(flights["children"][0]["title"], "Pick seats");
}

#[test]
fn add_to_later() {
    let env = Env::with_fixture();
    let out = env.stdout(&["add", "Learn", "piano", "--to", "later"]);
    assert_eq!(out, "Added to Later: Learn piano\n");
    assert_eq!(env.saved()["Later"][0]["title"], "Learn piano");
}

#[test]
fn done_toggles_completion() {
    let env = Env::with_fixture();
    assert_eq!(env.stdout(&["done", "dddd"]), "Completed: Buy milk\n");
    assert_eq!(env.saved()["Inbox"][1]["completed"], true);
    assert_eq!(env.stdout(&["done", "dddd"]), "Reopened: Buy milk\n");
    assert_eq!(env.saved()["Inbox"][1]["completed"], false);
}

#[test]
fn mv_carries_the_subtree() {
    let env = Env::with_fixture();
    assert_eq!(env.stdout(&["mv", "aaaa", "Later"]), "Moved to Later: Plan trip\n");
    let saved = env.saved();
    assert_eq!(saved["Inbox"].as_array().unwrap().len(), 1);
    assert_eq!(saved["Later"][0]["children"].as_array().unwrap().len(), 2);
}

#[test]
fn rm_reports_subtasks() {
    let env = Env::with_fixture();
    assert_eq!(
        env.stdout(&["rm", "aaaa"]),
        "Deleted: Plan trip (and 2 subtasks)\n"
    );
    let saved = env.saved();
    assert_eq!(saved["Inbox"].as_array().unwrap().len(), 1);
}

#[test]
fn ambiguous_prefix_is_rejected() {
    let env = Env::new();
    fs::write(
        env.data_file(),
        r#"{"Inbox": [{"id": "abc1", "title": "One"}, {"id": "abc2", "title": "Two"}]}"#,
    )
    .unwrap();
    let out = env.run(&["done", "abc"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("ambiguous"));
}

#[test]
fn rollover_moves_stale_open_tasks() {
    let env = Env::new();
    fs::write(
        env.data_file(),
        r#"{
  "Inbox": [],
  "2020-01-06": [
    {"id": "open", "title": "Still open"},
    {"id": "done", "title": "Finished", "completed": true}
  ],
  "2020-01-07": [{"id": "gone", "title": "Done too", "completed": true}]
}"#,
    )
    .unwrap();
    assert_eq!(env.stdout(&["rollover"]), "Moved 1 task to Inbox\n");

    let saved = env.saved();
    assert_eq!(saved["Inbox"][0]["id"], "open");
    assert_eq!(saved["2020-01-06"][0]["id"], "done");
    assert_eq!(saved["2020-01-07"][0]["id"], "gone");
    assert_eq!(env.stdout(&["rollover"]), "Nothing to roll over\n");
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[test]
fn corrupt_file_is_set_aside() {
    let env = Env::new();
    fs::write(env.data_file(), "{ not json").unwrap();

    let out = env.run(&["list"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "[Inbox]\nNo tasks\n");
    assert!(String::from_utf8_lossy(&out.stderr).contains("warning: could not parse"));

    let backup = env.dir.path().join("tasks.json.backup");
    assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");

    let log = env.stdout(&["recovery"]);
    assert!(log.contains("corrupt: data file could not be parsed"));
}

#[test]
fn recovery_is_empty_by_default() {
    let env = Env::new();
    assert_eq!(env.stdout(&["recovery"]), "No recovery entries.\n");
    assert_eq!(env.stdout(&["recovery", "--json"]), "[]\n");
}
