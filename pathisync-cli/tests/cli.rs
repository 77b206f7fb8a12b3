use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pathisync_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pathisync"));
    cmd.env_remove("PATHIFY_TOKEN")
        .env_remove("FLOW_SERVER_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn root_arg(root: &Path) -> String {
    root.display().to_string()
}

#[test]
fn init_creates_project_layout() {
    let tmp = TempDir::new().expect("tmp");

    pathisync_cmd()
        .args(["init", "shop", "--parent", &root_arg(tmp.path())])
        .args(["--server-url", "https://flows.example.com"])
        .assert()
        .success()
        .stdout(contains("Created project 'shop'"));

    let project = tmp.path().join("shop");
    for topic in ["flows", "sharedConfigs", "triggers", "resources"] {
        assert!(project.join(topic).is_dir(), "missing {topic}");
    }
    let env = fs::read_to_string(project.join(".env")).expect(".env");
    assert!(env.contains("PATHIFY_TOKEN="));
    assert!(env.contains("FLOW_SERVER_URL=https://flows.example.com"));
    assert!(project.join("README.md").is_file());
    assert!(project.join(".gitignore").is_file());
}

#[test]
fn init_refuses_existing_folder() {
    let tmp = TempDir::new().expect("tmp");
    fs::create_dir_all(tmp.path().join("shop")).expect("existing");

    pathisync_cmd()
        .args(["init", "shop", "--parent", &root_arg(tmp.path())])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("already exists"));
}

#[test]
fn sync_without_token_fails_before_any_request() {
    let tmp = TempDir::new().expect("tmp");

    pathisync_cmd()
        .args(["sync", "--root", &root_arg(tmp.path())])
        .args(["--server-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("PATHIFY_TOKEN"));
}

#[test]
fn sync_rejects_relative_server_url() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(
        tmp.path().join(".env"),
        "PATHIFY_TOKEN=secret\nFLOW_SERVER_URL=flows.example.com\n",
    )
    .expect(".env");

    pathisync_cmd()
        .args(["sync", "--root", &root_arg(tmp.path())])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("not a valid absolute URL"));
}

#[test]
fn unknown_kind_is_a_usage_error() {
    pathisync_cmd()
        .args(["sync", "--kind", "widgets"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unknown kind 'widgets'"));
}

#[test]
fn watch_needs_topic_folders() {
    let tmp = TempDir::new().expect("tmp");

    pathisync_cmd()
        .args(["watch", "--root", &root_arg(tmp.path())])
        .args(["--token", "secret", "--server-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("nothing to watch"));
}

#[tokio::test(flavor = "multi_thread")]
async fn forced_sync_creates_remote_flows_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repository/flows"))
        .and(header("flow-token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "checkout", "steps": ["pay"], "metadata": {"version": 3}}
        ])))
        .mount(&server)
        .await;
    for listing in [
        "/repository/sharedConfig",
        "/repository/flowTriggerers",
        "/repository/resourceCollections",
    ] {
        Mock::given(method("GET"))
            .and(path(listing))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
    }

    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path().to_path_buf();
    let uri = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        pathisync_cmd()
            .args(["sync", "--local", "--default-folder"])
            .args(["--root", &root_arg(&root), "--token", "secret", "--server-url", &uri])
            .output()
            .expect("run pathisync")
    })
    .await
    .expect("join");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let written = fs::read_to_string(tmp.path().join("flows/checkout.json")).expect("flow file");
    let value: serde_json::Value = serde_json::from_str(&written).expect("json");
    assert_eq!(value, json!({"name": "checkout", "steps": ["pay"]}));
    assert!(String::from_utf8_lossy(&output.stdout).contains("checkout"));
}
