use std::{convert::Infallible, sync::Arc};

use rama::{
    Service,
    http::{
        Request, Response,
        service::web::{
            Router,
            extract::State,
            response::IntoResponse,
        },
    },
    telemetry::tracing,
};

use crate::config::ResponderConfig;

/// Http service exposing the single `GET /` route,
/// responding with the configured identity after the configured latency.
pub fn new_responder_http_svc(
    cfg: ResponderConfig,
) -> impl Service<Request, Output = Response, Error = Infallible> + Clone {
    Arc::new(Router::new_with_state(Arc::new(cfg)).with_get("/", respond_after_latency))
}

async fn respond_after_latency(State(cfg): State<Arc<ResponderConfig>>) -> impl IntoResponse {
    let delay = cfg.latency();
    if !delay.is_zero() {
        // only suspends this request's task
        tokio::time::sleep(delay).await;
    }
    tracing::debug!(latency.ms = cfg.latency_ms, "respond after artificial latency");
    cfg.response_body()
}
