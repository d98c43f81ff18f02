use std::{sync::Arc, sync::OnceLock, time::Duration};

use clap::Parser;
use rama::{
    Layer as _, Service,
    error::BoxError,
    http::{Request, Response, client::EasyHttpWebClient},
    layer::MapErrLayer,
    net::address::SocketAddress,
    rt::Executor,
};

use crate::Args;

pub(super) struct Runtime {
    addr: SocketAddress,
}

impl Runtime {
    #[inline(always)]
    pub fn socket_addr(&self) -> SocketAddress {
        self.addr
    }

    #[inline(always)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    #[inline(always)]
    pub fn client(&self) -> impl Service<Request, Output = Response, Error = BoxError> {
        MapErrLayer::new(BoxError::from)
            .into_layer(EasyHttpWebClient::default_with_executor(Executor::default()))
    }
}

/// Spawn a latency responder bound to a random local port,
/// running on its own thread until the test process exits.
pub(super) async fn spawn_with_args(extra_args: &[&str]) -> Runtime {
    let mut argv: Vec<&str> = vec![
        crate::utils::env::project_name(),
        "--bind",
        "127.0.0.1:0",
        "--graceful",
        "0.42",
    ];
    argv.extend(extra_args);

    let args = Args::try_parse_from(argv).unwrap();

    let (addr_tx, addr_rx) = tokio::sync::oneshot::channel();

    let wait_server_ready = Arc::new(OnceLock::new());
    let notify_server_ready = wait_server_ready.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let server_future =
            crate::run_with_args(std::future::pending::<()>(), args, Some(addr_tx));

        notify_server_ready.set(()).expect("waiter to be notified");

        rt.block_on(server_future).expect("serve without errors");
    });

    wait_server_ready.wait();

    let addr = tokio::time::timeout(Duration::from_secs(30), addr_rx)
        .await
        .unwrap()
        .unwrap();

    let runtime = Runtime { addr };
    assert!(runtime.socket_addr().ip_addr.is_loopback());
    assert_ne!(0, runtime.socket_addr().port);

    runtime
}
