//! End-to-end tests of the `docupipe` binary.

mod common;

use assert_cmd::Command;
use common::{Response, StubServer};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// Binary with an isolated config dir and no ambient credentials.
fn docupipe(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docupipe").unwrap();
    cmd.env("DOCUPIPE_CONFIG_DIR", config_dir.path())
        .env_remove("DOCUPIPE_API_KEY")
        .env_remove("DOCUPIPE_API_URL")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("GITHUB_SHA")
        .env_remove("GITHUB_REF")
        .env_remove("GITHUB_EVENT_NAME")
        .env_remove("RUST_LOG");
    cmd
}

/// Runs the assertion on a blocking thread so the stub server keeps serving.
async fn run_blocking<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap();
}

#[test]
fn help_lists_commands() {
    let config = TempDir::new().unwrap();
    docupipe(&config)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("publish"));
}

#[test]
fn set_key_then_show_masks_it() {
    let config = TempDir::new().unwrap();
    docupipe(&config)
        .args(["config", "set-key", "  sk-test-abcd1234  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("API key saved"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.path().join("config.json")).unwrap()).unwrap();
    assert_eq!(saved, json!({"api_key": "sk-test-abcd1234"}));

    docupipe(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("************1234 (config file)"))
        .stdout(predicate::str::contains("sk-test").not());
}

#[test]
fn blank_key_is_rejected() {
    let config = TempDir::new().unwrap();
    docupipe(&config)
        .args(["config", "set-key", "   "])
        .assert()
        .code(1);
    assert!(!config.path().join("config.json").exists());
}

#[test]
fn missing_key_suggests_set_key() {
    let config = TempDir::new().unwrap();
    docupipe(&config)
        .arg("datasets")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No API key configured"))
        .stderr(predicate::str::contains("config set-key"));
}

#[test]
fn every_run_writes_a_log_file() {
    let config = TempDir::new().unwrap();
    docupipe(&config).args(["config", "show"]).assert().success();

    let logs: Vec<_> = std::fs::read_dir(config.path().join("logs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(logs.len(), 1);
    let contents = std::fs::read_to_string(logs[0].path()).unwrap();
    assert!(contents.contains("starting"), "{}", contents);
}

#[test]
fn invalid_arguments_are_usage_errors() {
    let config = TempDir::new().unwrap();
    docupipe(&config)
        .args(["upload", "--dataset", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--folder"));
    docupipe(&config)
        .args(["download", "-d", "x", "-o", "out", "--workers", "0"])
        .assert()
        .failure();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn datasets_are_listed_sorted() {
    let server = StubServer::start(|req| match req.path.as_str() {
        "/dataset-names" if req.header("x-api-key") == Some("env-key") => {
            Response::json(json!({"datasetNames": ["receipts", "Invoices", "contracts"]}))
        }
        _ => Response::status(401),
    })
    .await;
    let base_url = server.base_url.clone();
    let config = TempDir::new().unwrap();

    run_blocking(move || {
        docupipe(&config)
            .env("DOCUPIPE_API_KEY", "env-key")
            .args(["datasets", "--api-url", &base_url])
            .assert()
            .success()
            .stdout("contracts\nInvoices\nreceipts\n");
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn partial_upload_failure_exits_with_two() {
    let server = StubServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/document") => {
            let filename = req.json()["document"]["file"]["filename"].as_str().unwrap().to_string();
            if filename == "bad.pdf" {
                Response::status(400)
            } else {
                Response::json(json!({"documentId": "d-good"}))
            }
        }
        ("GET", "/document/d-good") => Response::json(json!({"status": "completed"})),
        _ => Response::status(404),
    })
    .await;
    let base_url = server.base_url.clone();
    let config = TempDir::new().unwrap();
    let folder = TempDir::new().unwrap();
    std::fs::write(folder.path().join("good.pdf"), b"1").unwrap();
    std::fs::write(folder.path().join("bad.pdf"), b"2").unwrap();
    let folder_path = folder.path().to_path_buf();

    run_blocking(move || {
        docupipe(&config)
            .args(["upload", "--api-key", "k", "--api-url", &base_url, "--poll-interval", "1", "-d", "invoices"])
            .arg("-f")
            .arg(&folder_path)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("bad.pdf"));
    })
    .await;

    assert_eq!(server.requests_to("POST", "/document").len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn download_writes_results() {
    let server = StubServer::start(|req| match req.path.as_str() {
        "/documents" if req.query["offset"] == "0" => {
            Response::json(json!([{"documentId": "d1", "filename": "scan.png"}]))
        }
        "/documents" => Response::json(json!([])),
        "/document/d1/download/ocr-url" => Response::json(json!({"url": format!("{}/f/d1", req.origin())})),
        "/f/d1" => Response::bytes(b"%PDF"),
        "/standardizations" => Response::json(json!([{"data": {"a": 1}}])),
        _ => Response::status(404),
    })
    .await;
    let base_url = server.base_url.clone();
    let config = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let out_path = out.path().join("results");
    let out_arg = out_path.clone();

    run_blocking(move || {
        docupipe(&config)
            .args(["download", "--api-key", "k", "--api-url", &base_url, "-d", "invoices"])
            .arg("-o")
            .arg(&out_arg)
            .assert()
            .success();
    })
    .await;

    assert_eq!(std::fs::read(out_path.join("scan.png.pdf")).unwrap(), b"%PDF");
    assert!(out_path.join("scan.png.json").exists());
}

#[cfg(unix)]
#[test]
fn publish_dry_run_builds_and_reports() {
    let config = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join("release.toml"),
        r#"
artifact_dir = "dist"

[build]
command = "sh"
args = ["-c", "mkdir -p out/{platform} && echo app > out/{platform}/app.txt"]
output_dir = "out/{platform}"
env = {}

[archive]
name = "app-{platform}"
"#,
    )
    .unwrap();

    docupipe(&config)
        .env("GITHUB_EVENT_NAME", "workflow_dispatch")
        .args(["publish", "--dry-run", "--platform", "linux", "--commit", "cafef00d"])
        .arg("--workspace")
        .arg(workspace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Published app-linux.zip"))
        .stdout(predicate::str::contains(
            "would hold release 'latest' (published) with assets: app-linux.zip",
        ));

    assert!(workspace.path().join("dist/app-linux.zip").exists());
    assert!(workspace.path().join("dist/app-linux.zip.sha256").exists());
}

#[cfg(unix)]
#[test]
fn publish_push_to_feature_branch_is_skipped() {
    let config = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    docupipe(&config)
        .env("GITHUB_EVENT_NAME", "push")
        .env("GITHUB_REF", "refs/heads/feature")
        .args(["publish", "--dry-run", "--platform", "linux"])
        .arg("--workspace")
        .arg(workspace.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Nothing published"));
}
