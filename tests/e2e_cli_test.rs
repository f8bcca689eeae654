//! E2E tests for the azcap binary.
//!
//! Covers:
//! - Help output and argument errors
//! - Configuration errors and their exit codes
//! - `config check`
//! - Query, table, summary and export against a mock endpoint
//! - Partial and authentication failure exit codes

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use azcap::test_utils::{
    TEST_SUBSCRIPTION, TestDir, make_test_capacity_entry, make_test_capacity_response,
    make_test_config_json,
};

mod common;

use common::logger::TestLogger;

/// Command with a scrubbed environment, run from `dir`.
#[allow(deprecated)]
fn azcap(dir: &TestDir) -> Command {
    let mut cmd = Command::cargo_bin("azcap").unwrap();
    cmd.current_dir(dir.path())
        .env("AZURE_ACCESS_TOKEN", "test-token")
        .env("NO_COLOR", "1")
        .env_remove("AZURE_ACCESS_TOKEN_EXPIRES_ON")
        .env_remove("AZURE_SUBSCRIPTION_ID")
        .env_remove("AZCAP_CONFIG")
        .env_remove("AZCAP_LOG")
        .env_remove("AZCAP_LOG_FILE");
    cmd
}

fn capacity_path(subscription: &str) -> String {
    format!("/subscriptions/{subscription}/providers/Microsoft.CognitiveServices/modelCapacities")
}

async fn mount_model(server: &MockServer, model: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(capacity_path(TEST_SUBSCRIPTION)))
        .and(query_param("modelName", model))
        .respond_with(template)
        .mount(server)
        .await;
}

fn capacity(entries: &[(&str, &str, &str, u64)]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(make_test_capacity_response(
        entries
            .iter()
            .map(|(model, location, sku, cap)| make_test_capacity_entry(model, location, sku, *cap))
            .collect(),
    ))
}

// =============================================================================
// Arguments and Configuration
// =============================================================================

#[test]
fn help_lists_commands() {
    let dir = TestDir::new();
    azcap(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("query")
                .and(predicate::str::contains("table"))
                .and(predicate::str::contains("summary"))
                .and(predicate::str::contains("export")),
        );
}

#[test]
fn invalid_command_is_rejected() {
    let dir = TestDir::new();
    azcap(&dir)
        .arg("notacommand")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized").or(predicate::str::contains("error")));
}

#[test]
fn missing_config_exits_with_config_code() {
    let log = TestLogger::new("missing_config_exits_with_config_code");
    let dir = TestDir::new();

    azcap(&dir)
        .args(["--config", "nope.json", "query"])
        .assert()
        .code(3)
        .stderr(
            predicate::str::contains("configuration file not found")
                .and(predicate::str::contains("Hint:")),
        );

    log.finish_ok();
}

#[test]
fn config_from_environment_variable() {
    let dir = TestDir::new();
    let config = dir.create_file(
        "elsewhere/azcap.json",
        &make_test_config_json("http://127.0.0.1:9", &["gpt-4o"]),
    );

    azcap(&dir)
        .env("AZCAP_CONFIG", &config)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Configuration is valid")
                .and(predicate::str::contains("environment variable")),
        );
}

#[test]
fn config_check_reports_working_dir_config() {
    let dir = TestDir::new();
    dir.write_config(&make_test_config_json("http://127.0.0.1:9", &["gpt-4o", "o3"]));

    azcap(&dir)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Configuration is valid")
                .and(predicate::str::contains("working directory"))
                .and(predicate::str::contains("Models (2)")),
        );
}

#[test]
fn config_check_applies_subscription_override() {
    let dir = TestDir::new();
    dir.write_config(&make_test_config_json("http://127.0.0.1:9", &["gpt-4o"]));

    let output = azcap(&dir)
        .env("AZURE_SUBSCRIPTION_ID", "override-sub")
        .args(["--json", "config", "check"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["command"], "config-check");
    assert_eq!(value["data"]["azure"]["subscription_id"], "override-sub");
}

#[test]
fn config_missing_section_is_rejected() {
    let dir = TestDir::new();
    dir.write_config(
        r#"{"azure": {"subscription_id": "s", "api_version": "v", "base_url": "https://x"}}"#,
    );

    azcap(&dir)
        .args(["config", "check"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("models"));
}

// =============================================================================
// Queries Against a Mock Endpoint
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn query_json_envelope() {
    let log = TestLogger::new("query_json_envelope");
    log.phase("setup");

    let server = MockServer::start().await;
    mount_model(&server, "gpt-4o", capacity(&[("gpt-4o", "eastus", "GlobalStandard", 500)])).await;

    let dir = TestDir::new();
    dir.write_config(&make_test_config_json(&server.uri(), &["gpt-4o"]));

    log.phase("execute");
    let output = azcap(&dir).args(["query", "--json"]).output().unwrap();

    log.phase("verify");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["schemaVersion"], "azcap.v1");
    assert_eq!(value["command"], "query");
    assert_eq!(value["data"]["results"]["gpt-4o"][0]["location"], "eastus");
    assert_eq!(value["errors"], serde_json::json!([]));
    log.finish_ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_model_flag_is_config_error() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    dir.write_config(&make_test_config_json(&server.uri(), &["gpt-4o"]));

    azcap(&dir)
        .args(["query", "--model", "gpt-5"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("gpt-5"));
}

#[tokio::test(flavor = "multi_thread")]
async fn table_renders_and_partial_failure_exits_5() {
    let log = TestLogger::new("table_renders_and_partial_failure_exits_5");
    let server = MockServer::start().await;
    mount_model(
        &server,
        "gpt-4o",
        capacity(&[
            ("gpt-4o", "eastus", "Standard", 300),
            ("gpt-4o", "eastus", "Standard", 200),
            ("gpt-4o", "westeurope", "GlobalStandard", 1000),
        ]),
    )
    .await;
    mount_model(&server, "o3", ResponseTemplate::new(500)).await;

    let dir = TestDir::new();
    dir.write_config(&make_test_config_json(&server.uri(), &["gpt-4o", "o3"]));

    azcap(&dir)
        .args(["table", "--sku", "Standard"])
        .assert()
        .code(5)
        .stdout(
            predicate::str::contains("Standard - Model Capacity by Region")
                .and(predicate::str::contains("gpt-4o (2024-05-13)"))
                .and(predicate::str::contains("o3 (N/A)"))
                .and(predicate::str::contains("500"))
                .and(predicate::str::contains("westeurope").not()),
        )
        .stderr(predicate::str::contains("partial failure"));

    log.finish_ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn all_models_unauthorized_exits_2() {
    let server = MockServer::start().await;
    mount_model(&server, "gpt-4o", ResponseTemplate::new(401)).await;
    mount_model(&server, "o3", ResponseTemplate::new(403)).await;

    let dir = TestDir::new();
    dir.write_config(&make_test_config_json(&server.uri(), &["gpt-4o", "o3"]));

    azcap(&dir)
        .arg("summary")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("az login"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_credential_exits_2_before_querying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TestDir::new();
    dir.write_config(&make_test_config_json(&server.uri(), &["gpt-4o", "o3"]));

    // No token in the environment and no `az` on PATH.
    azcap(&dir)
        .env_remove("AZURE_ACCESS_TOKEN")
        .env("PATH", dir.path())
        .arg("query")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(
            predicate::str::contains("AZCAP-A001")
                .and(predicate::str::contains("no usable credential source")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn summary_markdown_lists_top_regions() {
    let server = MockServer::start().await;
    mount_model(
        &server,
        "gpt-4o",
        capacity(&[
            ("gpt-4o", "eastus", "Standard", 100),
            ("gpt-4o", "swedencentral", "Standard", 400),
            ("gpt-4o", "japaneast", "Standard", 50),
        ]),
    )
    .await;

    let dir = TestDir::new();
    dir.write_config(&make_test_config_json(&server.uri(), &["gpt-4o"]));

    azcap(&dir)
        .args(["--format", "md", "summary", "--top", "2"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("- total_capacity: 550")
                .and(predicate::str::contains("- top_1: swedencentral (400)"))
                .and(predicate::str::contains("- top_2: eastus (100)"))
                .and(predicate::str::contains("top_3").not()),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn export_writes_records_file() {
    let server = MockServer::start().await;
    mount_model(&server, "gpt-4o", capacity(&[("gpt-4o", "eastus", "GlobalStandard", 42)])).await;

    let dir = TestDir::new();
    dir.write_config(&make_test_config_json(&server.uri(), &["gpt-4o"]));

    azcap(&dir)
        .args(["export", "--output", "out/capacity.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 record(s)"));

    let content = std::fs::read_to_string(dir.path().join("out/capacity.json")).unwrap();
    let value: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["subscription_id"], TEST_SUBSCRIPTION);
    assert_eq!(value["models"]["gpt-4o"][0]["available_capacity"], 42);
}
