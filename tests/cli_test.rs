//! CLI tests for the `gcs-uploadr` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &Path, endpoint: &str) -> std::path::PathBuf {
    let config_path = dir.join("config.yaml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"
storage:
  project_id: "demo-project"
  bucket_id: "user-uploads"
  directory_prefix: "attachments"
  credentials_file: "/unused/sa.json"
  endpoint: "{}"
  timeout_seconds: 5
upload:
  temp_dir: "{}"
logging:
  level: "warn"
"#,
        endpoint,
        dir.display()
    )
    .unwrap();
    config_path
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help() {
    Command::cargo_bin("gcs-uploadr")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--content-type"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "hello.png", b"png");

    Command::cargo_bin("gcs-uploadr")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn test_unsupported_file_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1");
    let file = write_file(dir.path(), "malware.exe", b"MZ");

    Command::cargo_bin("gcs-uploadr")
        .unwrap()
        .env("GCS_ACCESS_TOKEN", "cli-token")
        .arg("--config")
        .arg(&config)
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a permitted file type"));
}

#[test]
fn test_print_metrics_after_failed_upload() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1");
    let file = write_file(dir.path(), "malware.exe", b"MZ");

    Command::cargo_bin("gcs-uploadr")
        .unwrap()
        .env("GCS_ACCESS_TOKEN", "cli-token")
        .arg("--config")
        .arg(&config)
        .arg("--print-metrics")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            r#"gcs_uploadr_errors_total{type="unsupported_file_type"} 1"#,
        ))
        .stderr(predicate::str::contains(
            r#"gcs_uploadr_uploads_total{bucket="user-uploads",status="failure"} 1"#,
        ));
}

#[test]
fn test_startup_logs_resolved_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1/");
    let file = write_file(dir.path(), "malware.exe", b"MZ");

    Command::cargo_bin("gcs-uploadr")
        .unwrap()
        .env("GCS_ACCESS_TOKEN", "cli-token")
        .arg("--config")
        .arg(&config)
        .arg("--log-level")
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Upload service ready"))
        .stderr(predicate::str::contains(r#""endpoint":"http://127.0.0.1:1""#))
        .stderr(predicate::str::contains(r#""bucket":"user-uploads""#));
}

#[tokio::test]
async fn test_upload_prints_descriptor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b/user-uploads"))
        .and(header("Authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "user-uploads"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/storage/v1/b/user-uploads/o"))
        .and(query_param("uploadType", "media"))
        .and(header("Content-Type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "attachments/cv.pdf-00000000000000000000000000000000.pdf",
            "mediaLink": "https://storage.test/cv?alt=media"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &mock_server.uri());
    let file = write_file(dir.path(), "resume.pdf", b"%PDF-1.7");

    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("gcs-uploadr")
            .unwrap()
            .env("GCS_ACCESS_TOKEN", "cli-token")
            .arg("--config")
            .arg(&config)
            .arg("--name")
            .arg("cv.pdf")
            .arg("--content-type")
            .arg("application/pdf")
            .arg(&file)
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("\"access_link\": \"https://storage.test/cv?alt=media\""));
}
