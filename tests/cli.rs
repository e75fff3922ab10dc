use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use mockito::Matcher;

const FALLBACK: &str =
    "We couldn't automatically identify this issue. Please contact your DevOps team: devops@example.com";

/// A command with a scrubbed environment so host credentials never leak in.
fn smartstream(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_smartstream"));
    cmd.env_clear().current_dir(dir);
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let mut stdin = child.stdin.take().unwrap();
        // The process may exit before reading; a broken pipe is fine here.
        let _ = stdin.write_all(input.as_bytes());
    }
    child.wait_with_output().unwrap()
}

fn chat_reply(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

#[test]
fn missing_api_key_exits_one_and_names_variable() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_with_stdin(smartstream(dir.path()), "BUILD FAILED");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OPENAI_API_KEY"), "stderr: {stderr}");
    assert!(!dir.path().join("ai_suggestion.txt").exists());
}

#[test]
fn missing_log_file_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = smartstream(dir.path())
        .env("OPENAI_API_KEY", "sk-test")
        .arg("does-not-exist.log")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
}

#[test]
fn empty_stdin_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    cmd.env("OPENAI_API_KEY", "sk-test");
    let output = run_with_stdin(cmd, "  \n");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("empty"));
}

#[test]
fn oversized_stdin_is_truncated_and_suggestion_saved() {
    let mut server = mockito::Server::new();
    let head = "H".repeat(1000);
    let tail = "T".repeat(4000);
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::Regex(r"-\\nT{4000}\\n-".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(
            "Analysis of the failure:\n- Add a test script to package.json\n- Verify npm version",
        ))
        .create();

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    cmd.env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", server.url());
    let output = run_with_stdin(cmd, &format!("{head}{tail}"));

    mock.assert();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SmartStream Suggestion"));
    assert!(stdout.contains("- Add a test script to package.json"));

    let filtered =
        std::fs::read_to_string(dir.path().join("ai_suggestion_filtered.txt")).unwrap();
    assert_eq!(
        filtered,
        "- Add a test script to package.json\n- Verify npm version\n"
    );
    assert!(dir.path().join("ai_suggestion.txt").exists());
}

#[test]
fn unreachable_backend_prints_fallback_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("build.log");
    std::fs::write(&log, "ERROR: linking with `cc` failed: exit status 1\n").unwrap();

    let output = smartstream(dir.path())
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", "http://127.0.0.1:1")
        .args(["--format", "json"])
        .arg(&log)
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["suggestion"], FALLBACK);
    assert_eq!(report["fallbackDetected"], true);
    assert_eq!(report["origin"]["kind"], "degraded");
    assert_eq!(report["notification"]["status"], "skipped");

    let full = std::fs::read_to_string(dir.path().join("ai_suggestion.txt")).unwrap();
    assert_eq!(full, format!("{FALLBACK}\n"));
}

#[test]
fn fallback_answer_alerts_slack() {
    let mut server = mockito::Server::new();
    let _chat = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(FALLBACK))
        .create();
    let slack = server
        .mock("POST", "/chat.postMessage")
        .match_header("authorization", "Bearer xoxb-test")
        .match_body(Matcher::PartialJson(serde_json::json!({ "channel": "#builds" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    cmd.env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", server.url())
        .env("SLACK_BOT_TOKEN", "xoxb-test")
        .env("SLACK_CHANNEL", "#builds")
        .env("SLACK_API_BASE", server.url())
        .arg("--no-files");
    let output = run_with_stdin(cmd, "Segmentation fault (core dumped)");

    slack.assert();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(FALLBACK));
    assert!(!dir.path().join("ai_suggestion.txt").exists());
}

#[test]
fn no_notify_suppresses_slack() {
    let mut server = mockito::Server::new();
    let _chat = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(FALLBACK))
        .create();
    let slack = server
        .mock("POST", "/chat.postMessage")
        .expect(0)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    cmd.env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", server.url())
        .env("SLACK_BOT_TOKEN", "xoxb-test")
        .env("SLACK_API_BASE", server.url())
        .arg("--no-notify");
    let output = run_with_stdin(cmd, "Segmentation fault (core dumped)");

    slack.assert();
    assert!(output.status.success());
}

#[test]
fn endpoint_backend_uses_url_override() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/invocations")
        .match_body(Matcher::Regex(r#""inputs":"#.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"generated_text":"- Pin the JDK to 17"}]"#)
        .create();

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    cmd.env("SAGEMAKER_ENDPOINT_URL", format!("{}/invocations", server.url()))
        .args(["--backend", "endpoint", "--format", "markdown"]);
    let output = run_with_stdin(cmd, "error: release version 17 not supported");

    mock.assert();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("# "));
    assert!(stdout.contains("- Pin the JDK to 17"));
}

#[test]
fn endpoint_backend_without_name_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    cmd.args(["--backend", "endpoint"]);
    let output = run_with_stdin(cmd, "log");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("SAGEMAKER_ENDPOINT"));
}

#[test]
fn extra_positional_argument_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.log"), "BUILD FAILED").unwrap();
    std::fs::write(dir.path().join("b.log"), "BUILD FAILED").unwrap();

    let output = smartstream(dir.path())
        .env("OPENAI_API_KEY", "sk-test")
        .args(["a.log", "b.log"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("ai_suggestion.txt").exists());
}

#[test]
fn unknown_backend_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = smartstream(dir.path())
        .env("OPENAI_API_KEY", "sk-test")
        .args(["--backend", "bedrock", "a.log"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("bedrock"));
}

#[test]
fn help_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = smartstream(dir.path()).arg("--help").output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("LOG_FILE"));
}

#[test]
fn named_endpoint_without_static_keys_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    // No keys and no instance metadata: credential lookup fails at call
    // time, which degrades to the fallback instead of a configuration error.
    cmd.env("SAGEMAKER_ENDPOINT", "log-analyzer-endpoint")
        .env("AWS_REGION", "us-east-2")
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env("HOME", dir.path())
        .args(["--backend", "endpoint", "--no-files", "--format", "json"]);
    let output = run_with_stdin(cmd, "error: release version 17 not supported");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["backend"], "endpoint");
    assert_eq!(report["suggestion"], FALLBACK);
    assert!(!String::from_utf8_lossy(&output.stderr).contains("AWS_ACCESS_KEY_ID"));
}

#[test]
fn json_report_omits_upstream_error_body() {
    let mut server = mockito::Server::new();
    let _chat = server
        .mock("POST", "/v1/chat/completions")
        .with_status(503)
        .with_body("upstream-trace-id=9b1e overloaded")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = smartstream(dir.path());
    cmd.env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", server.url())
        .args(["--format", "json", "--no-files", "--no-notify"]);
    let output = run_with_stdin(cmd, "BUILD FAILED");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("upstream-trace-id"), "stdout: {stdout}");
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["origin"]["reason"], "transport");
}
