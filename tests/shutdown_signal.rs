#![cfg(unix)]

use std::{process::Command, time::Duration};

use tokio_util::sync::CancellationToken;

use backpack_client::volume::spawn_signal_listener;

#[tokio::test]
async fn test_sigterm_cancels_shutdown_token() {
    let shutdown = CancellationToken::new();
    let listener = spawn_signal_listener(shutdown.clone()).unwrap();

    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    tokio::time::timeout(Duration::from_secs(5), shutdown.cancelled())
        .await
        .expect("SIGTERM did not reach the token");
    listener.await.unwrap();
}

#[tokio::test]
async fn test_listener_exits_once_token_is_cancelled() {
    let shutdown = CancellationToken::new();
    let listener = spawn_signal_listener(shutdown.clone()).unwrap();

    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .expect("listener kept running after shutdown")
        .unwrap();
}
