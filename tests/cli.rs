mod common;

use std::{
    fs,
    process::{Command as StdCommand, Stdio},
    thread,
    time::{Duration, Instant},
};

use assert_cmd::Command;
use finpulse::config::DashboardConfig;
use predicates::str::contains;

use common::{SALES_CSV, TestWorkspace};

fn finpulse() -> Command {
    let mut cmd = Command::cargo_bin("finpulse").expect("binary exists");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn summary_prints_every_section() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    finpulse()
        .args(["summary", "--source", workspace.path_str(), "--table", "sales"])
        .assert()
        .success()
        .stdout(contains("sales: 3 row(s)"))
        .stdout(contains("Jan 24"))
        .stdout(contains("Feb 24"))
        .stdout(contains("Marketing"))
        .stdout(contains("-20.0%"))
        .stdout(contains("70.0%"))
        .stdout(contains("Top categories by expense"))
        .stdout(contains("A-2"));
}

#[test]
fn summary_json_exposes_aggregates() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    let output = finpulse()
        .args([
            "summary",
            "-s",
            workspace.path_str(),
            "-t",
            "sales",
            "--format",
            "json",
        ])
        .output()
        .expect("run summary");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    let categories = &report["snapshot"]["aggregates"]["categories"];
    assert_eq!(categories[0]["name"], "Marketing");
    assert_eq!(categories[0]["margin_percent"], -20.0);
    assert_eq!(categories[1]["name"], "Sales");
    assert_eq!(categories[1]["color"], "#10b981");
    let monthly = &report["snapshot"]["rankings"]["monthly"];
    assert_eq!(monthly[0]["month_label"], "Jan 24");
    assert_eq!(monthly[1]["profit"], 150.0);
    assert_eq!(report["insights"]["state"], "not_requested");
}

#[test]
fn unknown_table_fails_with_recovery_hint() {
    let workspace = TestWorkspace::new();
    finpulse()
        .args(["summary", "--source", workspace.path_str(), "--table", "ghost"])
        .assert()
        .failure()
        .stderr(contains("Table 'ghost' was not found"))
        .stderr(contains("Choose a different table name."));
}

#[test]
fn summary_requires_a_table() {
    let workspace = TestWorkspace::new();
    finpulse()
        .args(["summary", "--source", workspace.path_str()])
        .assert()
        .failure()
        .stderr(contains("--table"));
}

#[test]
fn empty_table_reports_no_data() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", "id,revenue,cost\n");
    finpulse()
        .args(["summary", "--source", workspace.path_str(), "--table", "sales"])
        .assert()
        .success()
        .stdout(contains("No data in 'sales'."));
}

#[test]
fn roles_lists_resolved_columns() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    finpulse()
        .args(["roles", "--source", workspace.path_str(), "--table", "sales"])
        .assert()
        .success()
        .stdout(contains("expense"))
        .stdout(contains("cost"))
        .stdout(contains("created_at"))
        .stdout(contains("inferred"))
        .stdout(contains("profit    profit"));
}

#[test]
fn config_init_then_summary_uses_file_settings() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    let config_path = workspace.path().join("finpulse.yml");
    finpulse()
        .args([
            "config",
            "init",
            "-o",
            config_path.to_str().expect("utf-8 path"),
            "--table",
            "sales",
        ])
        .assert()
        .success();

    let mut config = DashboardConfig::load(&config_path).expect("load config");
    assert_eq!(config.table.as_deref(), Some("sales"));
    config.source_dir = Some(workspace.path().to_path_buf());
    config.roles.revenue = Some("cost".to_string());
    config.save(&config_path).expect("save config");

    finpulse()
        .args([
            "summary",
            "--config",
            config_path.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success()
        .stdout(contains("revenue 150.00"));

    finpulse()
        .args([
            "config",
            "init",
            "-o",
            config_path.to_str().expect("utf-8 path"),
        ])
        .assert()
        .failure()
        .stderr(contains("--force"));
}

#[test]
fn invalid_config_is_rejected() {
    let workspace = TestWorkspace::new();
    let config_path = workspace.write("finpulse.yml", "row_limit: 0\n");
    finpulse()
        .args([
            "summary",
            "--config",
            config_path.to_str().expect("utf-8 path"),
            "--table",
            "sales",
        ])
        .assert()
        .failure()
        .stderr(contains("row_limit"));
}

#[test]
fn insights_without_api_key_fails() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    finpulse()
        .env_remove("OPENAI_API_KEY")
        .args(["insights", "--source", workspace.path_str(), "--table", "sales"])
        .assert()
        .failure()
        .stderr(contains("OPENAI_API_KEY"));
}

#[test]
fn semicolon_delimited_file_is_read() {
    let workspace = TestWorkspace::new();
    fs::write(
        workspace.path().join("ledger.csv"),
        SALES_CSV.replace(',', ";"),
    )
    .expect("write ledger");
    finpulse()
        .args([
            "summary",
            "--source",
            workspace.path_str(),
            "--table",
            "ledger",
            "--delimiter",
            ";",
        ])
        .assert()
        .success()
        .stdout(contains("revenue 350.00"));
}

#[test]
fn watch_renders_appended_rows_and_stops() {
    let workspace = TestWorkspace::new();
    workspace.write("sales.csv", SALES_CSV);
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("finpulse"))
        .args([
            "watch",
            "--source",
            workspace.path_str(),
            "--table",
            "sales",
            "--interval-ms",
            "20",
            "--max-updates",
            "1",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn watch");

    // Keep appending until the watcher has seen one live row and exits.
    let deadline = Instant::now() + Duration::from_secs(20);
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll watch") {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("watch did not stop after a live row");
        }
        workspace.append("sales.csv", "A-9,10,1,Ops,2024-03-02\n");
        thread::sleep(Duration::from_millis(300));
    };
    assert!(status.success());
    let output = child.wait_with_output().expect("collect output");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Monthly"));
    assert!(stdout.contains("Ops"));
}
