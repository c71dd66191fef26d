//! Integration tests for the range-picker CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

const NOW: &str = "2024-06-15T10:00:00Z";

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_range-picker"))
}

fn pick_json(args: &[&str]) -> Value {
    let output = cli()
        .arg("pick")
        .args(["--now", NOW])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============ RESOLVE ============

#[test]
fn test_resolve_day_end() {
    cli()
        .args(["resolve", "offset:-1days/end", "--now", NOW])
        .assert()
        .success()
        .stdout("2024-06-14T23:59:59.999Z\n");
}

#[test]
fn test_resolve_linear_shift() {
    cli()
        .args(["resolve", "offset:-1days", "--now", NOW])
        .assert()
        .success()
        .stdout("2024-06-14T10:00:00.000Z\n");
}

#[test]
fn test_resolve_period_span_as_end() {
    cli()
        .args(["resolve", "offset:-1weeks/week", "--as", "end", "--now", NOW])
        .assert()
        .success()
        .stdout("2024-06-09T23:59:59.999Z\n");
}

#[test]
fn test_resolve_sunday_week_start() {
    cli()
        .args(["resolve", "startof:week", "--week-start", "sunday", "--now", NOW])
        .assert()
        .success()
        .stdout("2024-06-09T00:00:00.000Z\n");
}

#[test]
fn test_resolve_keeps_offset_of_now() {
    cli()
        .args(["resolve", "offset:today", "--now", "2024-06-15T01:00:00+02:00"])
        .assert()
        .success()
        .stdout("2024-06-15T00:00:00.000+02:00\n");
}

#[test]
fn test_resolve_rejects_bad_expression() {
    cli()
        .args(["resolve", "offset:-7fortnights", "--now", NOW])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid expression"));
}

#[test]
fn test_resolve_rejects_bad_now() {
    cli()
        .args(["resolve", "offset:now", "--now", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --now"));
}

// ============ PRESETS ============

#[test]
fn test_presets_table() {
    cli()
        .args(["presets", "--now", NOW])
        .assert()
        .success()
        .stdout(predicate::str::contains("Last 5 minutes"))
        .stdout(predicate::str::contains("Previous month"))
        .stdout(predicate::str::contains("Next 1 day").not());
}

#[test]
fn test_presets_json() {
    let output = cli()
        .args(["presets", "--json", "--future", "--now", NOW])
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let find = |label: &str| {
        entries
            .iter()
            .find(|entry| entry["label"] == label)
            .unwrap_or_else(|| panic!("missing {label}"))
    };

    let yesterday = find("Yesterday");
    assert_eq!(yesterday["start"], "2024-06-14T00:00:00.000Z");
    assert_eq!(yesterday["end"], "2024-06-14T23:59:59.999Z");

    let previous_month = find("Previous month");
    assert_eq!(previous_month["start"], "2024-05-01T00:00:00.000Z");
    assert_eq!(previous_month["end"], "2024-05-31T23:59:59.999Z");

    let next_week = find("Next 1 week");
    assert_eq!(next_week["start"], "2024-06-15T10:00:00.000Z");
    assert_eq!(next_week["end"], "2024-06-22T10:00:00.000Z");
}

// ============ PICK ============

#[test]
fn test_pick_calendar_range() {
    let value = pick_json(&["--from", "2024-06-10", "--to", "2024-06-05"]);
    assert_eq!(value["start"], "2024-06-05T00:00:00.000Z");
    assert_eq!(value["end"], "2024-06-10T23:59:59.999Z");
    assert!(value.get("week_days").is_none());
    assert!(value.get("start_hour").is_none());
}

#[test]
fn test_pick_preset_unix_encoding() {
    let value = pick_json(&["--preset", "Last 7 days", "--encoding", "unix"]);
    assert_eq!(value["start"], 1_717_840_800_i64);
    assert_eq!(value["end"], 1_718_445_600_i64);
}

#[test]
fn test_pick_with_filters() {
    let value = pick_json(&[
        "--from",
        "2024-06-05",
        "--to",
        "2024-06-10",
        "--days",
        "working",
        "--hours",
        "09:00-17:30",
    ]);
    assert_eq!(value["start"], "2024-06-05T09:00:00.000Z");
    assert_eq!(value["end"], "2024-06-10T17:30:00.000Z");
    assert_eq!(
        value["week_days"],
        serde_json::json!(["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"])
    );
    assert_eq!(value["start_hour"], 9);
    assert_eq!(value["end_minute"], 30);
}

#[test]
fn test_pick_no_optional_drops_filters() {
    let value = pick_json(&[
        "--from",
        "2024-06-05",
        "--to",
        "2024-06-10",
        "--days",
        "sat,sun",
        "--hours",
        "busy",
        "--no-optional",
    ]);
    assert!(value.get("week_days").is_none());
    assert!(value.get("start_hour").is_none());
    assert_eq!(value["start"], "2024-06-05T20:00:00.000Z");
}

#[test]
fn test_pick_prior_from_stdin() {
    let output = cli()
        .args(["pick", "--now", NOW, "--prior", "-"])
        .write_stdin(
            r#"{"start": "2024-06-01", "end": "2024-06-07T23:59:59.999Z",
                "week_days": ["Sunday", "Saturday"]}"#,
        )
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["start"], "2024-06-01T00:00:00.000Z");
    assert_eq!(value["end"], "2024-06-07T23:59:59.999Z");
    assert_eq!(value["week_days"], serde_json::json!(["Saturday", "Sunday"]));
}

#[test]
fn test_pick_output_reads_back_in_each_encoding() {
    for encoding in ["iso", "unix", "unix-ms"] {
        let first = pick_json(&[
            "--from",
            "2024-06-05",
            "--to",
            "2024-06-10",
            "--encoding",
            encoding,
        ]);

        let output = cli()
            .args(["pick", "--now", NOW, "--prior", "-", "--encoding", encoding])
            .write_stdin(first.to_string())
            .output()
            .unwrap();
        assert!(output.status.success(), "{encoding}");
        let second: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(second["start"], first["start"], "{encoding}");
        assert_eq!(second["end"], first["end"], "{encoding}");
    }
}

#[test]
fn test_pick_prior_encoding_overrides_output_encoding() {
    let value = {
        let output = cli()
            .args(["pick", "--now", NOW, "--prior", "-", "--prior-encoding", "unix"])
            .write_stdin(r#"{"start": 1717545600, "end": 1718063999}"#)
            .output()
            .unwrap();
        assert!(output.status.success());
        serde_json::from_slice::<Value>(&output.stdout).unwrap()
    };
    assert_eq!(value["start"], "2024-06-05T00:00:00.000Z");
    assert_eq!(value["end"], "2024-06-10T23:59:59.000Z");
}

#[test]
fn test_pick_incomplete_range_fails() {
    cli()
        .args(["pick", "--now", NOW, "--from", "2024-06-10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Incomplete range"));
}

#[test]
fn test_pick_unknown_preset_fails() {
    cli()
        .args(["pick", "--now", NOW, "--preset", "Last 9 days"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown preset"));
}

#[test]
fn test_pick_invalid_prior_fails() {
    cli()
        .args(["pick", "--now", NOW, "--prior", "-"])
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid prior value"));
}
