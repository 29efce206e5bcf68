use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use tempfile::NamedTempFile;

/// An endpoint nothing listens on
fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn temp_file(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(contents.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Run the binary to completion with the given config path
async fn run_cli(config_path: &Path) -> Output {
    let mut command = tokio::process::Command::new(env!("CARGO_BIN_EXE_mediaflow"));
    command
        .env("MEDIAFLOW_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true);
    tokio::time::timeout(Duration::from_secs(30), command.output())
        .await
        .expect("CLI did not exit in time")
        .expect("Failed to run CLI")
}

fn valid_config(endpoint: &str, source: &str) -> String {
    format!(
        r#"
[processing]
endpoint = "{endpoint}"
account_name = "acct"
account_key = "key"
timeout_secs = 2

[storage]
endpoint = "{endpoint}"
account_name = "acct"
account_key = "key"
timeout_secs = 2

[workflow]
source = "{source}"
"#
    )
}

#[tokio::test]
async fn test_missing_config_file_fails() {
    let output = run_cli(Path::new("/nonexistent/mediaflow.toml")).await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_empty_account_fails_validation() {
    let config = temp_file(
        r#"
[processing]
endpoint = "http://127.0.0.1:1"
account_name = ""
account_key = "key"

[storage]
endpoint = "http://127.0.0.1:1"
account_name = "acct"
account_key = "key"
"#,
    );

    let output = run_cli(config.path()).await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_missing_source_file_fails() {
    let endpoint = closed_endpoint();
    let config = temp_file(&valid_config(&endpoint, "/nonexistent/clip.mp4"));

    let output = run_cli(config.path()).await;
    assert_eq!(output.status.code(), Some(1));
}

#[tokio::test]
async fn test_unreachable_store_fails() {
    let media = temp_file("fake media");
    let endpoint = closed_endpoint();
    let config = temp_file(&valid_config(
        &endpoint,
        &media.path().display().to_string(),
    ));

    let output = run_cli(config.path()).await;
    assert_eq!(output.status.code(), Some(1));
}
