use std::time::Duration;

use clap::Parser as _;
use rama::telemetry::tracing;

use crate::Args;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_bind_failure_is_fatal() {
    // keep the port occupied for the duration of the test
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap().to_string();
    tracing::info!("occupied address used for bind failure: {addr}");

    let args = Args::try_parse_from([
        crate::utils::env::project_name(),
        "--bind",
        addr.as_str(),
        "--graceful",
        "0.42",
    ])
    .unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(30),
        crate::run_with_args(std::future::pending::<()>(), args, None),
    )
    .await
    .expect("run to finish instead of waiting for a signal");

    let err = result.expect_err("bind failure to be returned as error");
    tracing::info!("responder exited with expected error: {err}");

    drop(occupied);
}
