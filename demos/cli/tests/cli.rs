use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BUNDLE: &str = r#"{
  "resourceType": "Bundle",
  "type": "searchset",
  "entry": [
    {
      "resource": {
        "resourceType": "Patient",
        "id": "pat-1",
        "gender": "female",
        "birthDate": "1984-2-9",
        "telecom": [{"system": "email", "value": "anna@example.org"}]
      }
    },
    {
      "resource": {
        "resourceType": "Observation",
        "id": "broken-1",
        "subject": {"reference": 42}
      }
    },
    {
      "resource": {
        "resourceType": "Condition",
        "id": "cond-1",
        "code": {"coding": [{"system": "http://snomed.info/sct", "code": "44054006", "display": "Diabetes mellitus type 2"}]}
      }
    }
  ]
}"#;

#[allow(deprecated)]
fn cli() -> Command {
    Command::cargo_bin("healthview-cli").unwrap()
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bundle.json"), BUNDLE).unwrap();
    dir
}

#[test]
fn summary_reports_resources_and_failures() {
    let dir = workspace();

    cli()
        .arg("--input")
        .arg(dir.path().join("bundle.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Resources: 2"))
        .stdout(predicate::str::contains("Failures: 1"))
        .stdout(predicate::str::contains("Patient/pat-1: 6 rows"))
        .stdout(predicate::str::contains("Condition/cond-1: 2 rows (Diabetes mellitus type 2)"))
        .stdout(predicate::str::contains("failed Observation/broken-1"));
}

#[test]
fn json_output_uses_terminology_and_labels() {
    let dir = workspace();
    fs::write(
        dir.path().join("terminology.json"),
        r#"[{"system": "snomed", "code": "44054006", "description": "Diabetes type 2"}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("labels.json"),
        r#"{"generic": {"Patient.gender": "Geslacht"}}"#,
    )
    .unwrap();

    let output = cli()
        .arg("--input")
        .arg(dir.path().join("bundle.json"))
        .arg("--terminology")
        .arg(dir.path().join("terminology.json"))
        .arg("--labels")
        .arg(dir.path().join("labels.json"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rendered: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let resources = rendered["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[1]["title"], "Diabetes type 2");

    let patient_rows = resources[0]["rows"].as_array().unwrap();
    assert!(patient_rows.contains(&serde_json::json!({
        "kind": "row",
        "data": {"label": "Geslacht", "value": "female"}
    })));
    assert!(patient_rows.contains(&serde_json::json!({
        "kind": "row",
        "data": {"label": "Birth date", "value": "1984-02-09"}
    })));
}

#[test]
fn html_output_is_written_to_file() {
    let dir = workspace();
    let target = dir.path().join("out.html");

    cli()
        .arg("--input")
        .arg(dir.path().join("bundle.json"))
        .args(["--format", "html", "--title", "Anna <test>"])
        .arg("--output")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let html = fs::read_to_string(&target).unwrap();
    assert!(html.contains("<title>Anna &lt;test&gt;</title>"));
    assert!(html.contains("<a href=\"mailto:anna@example.org\">anna@example.org</a>"));
    assert!(html.contains("healthview-failures"));
}

#[test]
fn config_can_disable_date_normalization() {
    let dir = workspace();
    fs::write(dir.path().join("config.json"), r#"{"normalize_dates": false}"#).unwrap();

    cli()
        .arg("--input")
        .arg(dir.path().join("bundle.json"))
        .arg("--config")
        .arg(dir.path().join("config.json"))
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1984-2-9"));
}

#[test]
fn missing_input_fails_with_context() {
    let dir = TempDir::new().unwrap();

    cli()
        .arg("--input")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not read file"));
}

#[test]
fn invalid_json_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.json"), "{ not json").unwrap();

    cli()
        .arg("--input")
        .arg(dir.path().join("bad.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not render"));
}
