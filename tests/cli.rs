//! End-to-end tests for the fern-junit-client binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="calc" timestamp="2024-03-01T10:00:00" time="1.5">
  <testcase name="adds" time="0.5"/>
  <testcase name="divides" time="1.0">
    <failure message="division by zero">stack</failure>
  </testcase>
</testsuite>
"#;

fn fern(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fern-junit-client").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

#[test]
fn test_send_requires_project() {
    let dir = TempDir::new().unwrap();

    fern(&dir)
        .args(["send", "-u", "http://127.0.0.1:1", "-f", "*.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "a projectId or a projectName must be specified",
        ));
}

#[test]
fn test_send_rejects_non_http_url() {
    let dir = TempDir::new().unwrap();

    fern(&dir)
        .args(["send", "-u", "fern.example.com", "-n", "proj", "-f", "*.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with 'http'"));
}

#[test]
fn test_send_missing_reports_fails_fast() {
    let dir = TempDir::new().unwrap();

    fern(&dir)
        .args(["send", "-u", "http://127.0.0.1:1", "-n", "proj"])
        .args(["-f", "missing/*.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse reports from missing/*.xml"))
        .stderr(predicate::str::contains("No files found for pattern"));
}

#[test]
fn test_send_keep_going_with_nothing_to_publish() {
    let dir = TempDir::new().unwrap();

    fern(&dir)
        .args(["send", "-u", "http://127.0.0.1:1", "-n", "proj"])
        .args(["-f", "missing/*.xml", "--keep-going"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to publish"));
}

#[test]
fn test_validate_reads_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("fern.toml"),
        "[fern]\nurl = \"http://localhost:8080\"\nproject_id = \"42\"\nreport_paths = [\"*.xml\"]\n",
    )
    .unwrap();

    fern(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_validate_command_line_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("fern.toml"),
        "[fern]\nurl = \"http://localhost:8080\"\nproject_id = \"42\"\nreport_paths = [\"*.xml\"]\n",
    )
    .unwrap();

    fern(&dir)
        .args(["validate", "-u", "ftp://elsewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with 'http'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_publishes_reports() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/testrun/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("reports")).unwrap();
    std::fs::write(dir.path().join("reports/TEST-calc.xml"), REPORT).unwrap();

    let url = format!("{}/", server.uri());
    tokio::task::spawn_blocking(move || {
        fern(&dir)
            .args(["send", "-u", url.as_str(), "-n", "proj", "-t", "ci,linux"])
            .args(["-f", "reports/*.xml"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Found 1 test suites with a total of 2 test specs",
            ))
            .stdout(predicate::str::contains(
                "Successfully published test results to Fern",
            ));
    })
    .await
    .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["test_project_name"], "proj");
    let specs = body["suite_runs"][0]["spec_runs"].as_array().unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[1]["status"], "failed");
    assert_eq!(specs[1]["tags"].as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_keep_going_ignores_publish_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/testrun/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("report.xml"), REPORT).unwrap();

    let url = server.uri();
    tokio::task::spawn_blocking(move || {
        fern(&dir)
            .args(["send", "-u", url.as_str(), "-n", "proj", "-f", "*.xml"])
            .args(["--keep-going", "--max-attempts", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Failed to publish test results to Fern",
            ));
    })
    .await
    .unwrap();
}
