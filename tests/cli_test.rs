//! `file` command-line integration tests

use std::path::Path;
use std::process::Output;

use file_relay::{Server, ServerConfig};
use tokio::process::Command;

async fn run_file(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_file"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .await
        .expect("file binary runs")
}

#[tokio::test]
async fn test_push_prints_confirmation() {
    let mut server = Server::new(ServerConfig::new(
        "127.0.0.1:0".parse().unwrap(),
        "127.0.0.1:0".parse().unwrap(),
    ));
    server.start().await.unwrap();
    let api = server.grpc_addr().unwrap().to_string();

    let dir = tempfile::tempdir().unwrap();
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/id_rsa.crt");
    std::fs::copy(&fixture, dir.path().join("id_rsa.crt")).unwrap();

    let output = run_file(
        &["--api-address", &api, "push", "./id_rsa.crt", "prod:certs/web.crt"],
        dir.path(),
    )
    .await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("./id_rsa.crt has been pushed to prod:certs/web.crt"),
        "stdout: {}",
        stdout
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_push_with_invalid_locator_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("id_rsa.crt"), "irrelevant").unwrap();

    // Nothing listens on port 1; the locator check fails before any dial.
    let output = run_file(
        &["--api-address", "127.0.0.1:1", "push", "./id_rsa.crt", "Prod:certs/web.crt"],
        dir.path(),
    )
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid locator"), "stderr: {}", stderr);
}

#[tokio::test]
async fn test_cat_is_a_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_file(&["cat", "prod:certs/web.crt"], dir.path()).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not implemented"), "stdout: {}", stdout);
}
