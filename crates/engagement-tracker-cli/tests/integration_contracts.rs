use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use jsonschema::JSONSchema;
use serde_json::Value;

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .unwrap_or_else(|err| panic!("failed to canonicalize repo root: {err}"))
}

fn read_json(path: &Path) -> Value {
    let body = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    serde_json::from_str(&body)
        .unwrap_or_else(|err| panic!("failed to parse {}: {err}", path.display()))
}

fn assert_schema(schema_path: &Path, value: &Value) {
    let schema = read_json(schema_path);
    let compiled = JSONSchema::compile(&schema)
        .unwrap_or_else(|err| panic!("failed to compile {}: {err}", schema_path.display()));
    if let Some(errors) = compiled
        .validate(value)
        .err()
        .map(|iter| iter.map(|err| err.to_string()).collect::<Vec<_>>())
    {
        panic!(
            "schema validation failed for {}:\n{}",
            schema_path.display(),
            errors.join("\n")
        );
    }
}

fn etrack_json(db_path: &Path, args: &[&str]) -> Value {
    let output = Command::new(env!("CARGO_BIN_EXE_etrack"))
        .arg("--db")
        .arg(db_path)
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("failed to run etrack {args:?}: {err}"));
    assert!(
        output.status.success(),
        "etrack {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|err| panic!("failed to parse etrack {args:?} output: {err}"))
}

#[test]
fn report_json_matches_contract_schema_for_every_kind() {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("failed to create temp dir: {err}"));
    let db_path = dir.path().join("tracker.sqlite3");
    let schema_path = repo_root().join("contracts/v1/schemas/report.schema.json");

    etrack_json(&db_path, &["unit", "add", "--name", "Navy", "--type", "Research Unit"]);
    etrack_json(&db_path, &["researcher", "add", "--name", "Dana"]);
    etrack_json(&db_path, &["project", "add", "--name", "Sensor Trial"]);
    etrack_json(
        &db_path,
        &[
            "engagement",
            "add",
            "--date",
            "2026-01-05",
            "--type",
            "Meeting",
            "--unit-id",
            "1",
            "--project-id",
            "1",
            "--participant",
            "1",
        ],
    );
    etrack_json(
        &db_path,
        &["review", "add", "--week-start", "2026-01-05", "--highlights", "First demo"],
    );

    for kind in [
        "unit-engagement-summary",
        "researcher-activity",
        "project-status",
        "weekly-review-summary",
    ] {
        let report = etrack_json(
            &db_path,
            &[
                "report",
                "run",
                "--kind",
                kind,
                "--from",
                "2026-01-01",
                "--to",
                "2026-01-31",
                "--json",
            ],
        );
        assert_eq!(report["kind"], Value::from(kind));
        assert_eq!(report["period"]["start"], Value::from("2026-01-01"));
        assert_eq!(report["rows"].as_array().map(Vec::len), Some(1));
        assert_schema(&schema_path, &report);
    }
}

#[test]
fn report_schema_rejects_mismatched_rows() {
    let schema_path = repo_root().join("contracts/v1/schemas/report.schema.json");
    let schema = read_json(&schema_path);
    let compiled = JSONSchema::compile(&schema)
        .unwrap_or_else(|err| panic!("failed to compile {}: {err}", schema_path.display()));

    let invalid = serde_json::json!({
        "period": { "start": "2026-01-01", "end": "2026-01-31" },
        "kind": "unit-engagement-summary",
        "rows": [ { "researcher": "Dana", "engagement_count": 1, "units": [], "projects": [] } ]
    });
    assert!(!compiled.is_valid(&invalid));
}
