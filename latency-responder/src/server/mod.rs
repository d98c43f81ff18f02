use std::sync::Arc;

use rama::{
    Layer as _,
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
    },
    net::{address::SocketAddress, socket::Interface},
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use crate::{config::ResponderConfig, utils};

pub mod responder;

/// Bind the responder to the given interface and serve
/// until the shutdown (guard) is triggered.
///
/// The actual bound address is sent over `bound_addr_tx` if given,
/// which is useful in case the interface uses port `0`.
pub async fn run_responder_server(
    bind: Interface,
    guard: ShutdownGuard,
    cfg: ResponderConfig,
    bound_addr_tx: Option<tokio::sync::oneshot::Sender<SocketAddress>>,
) -> Result<(), BoxError> {
    let exec = Executor::graceful(guard);

    let tcp_listener = TcpListener::bind(bind, exec.clone())
        .await
        .context("bind latency responder http server")?;

    let server_addr: SocketAddress = tcp_listener
        .local_addr()
        .context("get bound address for latency responder http server")?
        .into();

    tracing::info!(
        app_name = %cfg.app_name,
        latency.ms = cfg.latency_ms,
        "latency responder http server bound to: {server_addr}"
    );

    if let Some(tx) = bound_addr_tx
        && tx.send(server_addr).is_err()
    {
        tracing::debug!("bound address receiver dropped; continue serving");
    }

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(utils::env::server_identifier())),
    )
        .into_layer(responder::new_responder_http_svc(cfg));

    let http_server = HttpServer::auto(exec).service(Arc::new(http_svc));

    tcp_listener.serve(http_server).await;

    Ok(())
}
