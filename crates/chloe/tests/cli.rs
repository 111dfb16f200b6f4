// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the compiled binary against temporary configuration files.

use std::io::Write;
use std::process::{Command, Output};

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn chloe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chloe"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap()
}

#[test]
fn check_prints_redacted_summary() {
    let file = config_file(
        r#"
[agent]
name = "Ava"

[openai]
api_key = "sk-very-secret-9876"
"#,
    );
    let out = chloe(&["check", "--config", file.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&out.stdout);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("configuration ok"));
    assert!(stdout.contains("Ava"));
    assert!(stdout.contains("****9876"));
    assert!(!stdout.contains("very-secret"));
}

#[test]
fn check_rejects_invalid_config() {
    let file = config_file("[pool]\nworkers = 0\n");
    let out = chloe(&["check", "--config", file.path().to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("pool.workers"));
}

#[test]
fn check_reports_missing_file() {
    let out = chloe(&["check", "--config", "/nonexistent/chloe.toml"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("does not exist"));
}

#[test]
fn serve_without_sources_fails() {
    let file = config_file("[openai]\napi_key = \"sk-test-0000\"\n");
    let out = chloe(&["serve", "--config", file.path().to_str().unwrap()]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no message source enabled"));
}
