use axum::{
    Router,
    extract::{ConnectInfo, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use uuid::Uuid;

use std::{net::SocketAddr, sync::Arc, time::Instant};

use crate::{balance, transactions};
use engine::Engine;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Identifier assigned to every inbound request.
///
/// Stored in the request extensions and echoed in the `X-Request-ID` response
/// header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

async fn set_request_id(mut request: Request, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;
    match HeaderValue::from_str(&id.0.to_string()) {
        Ok(value) => {
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER.clone(), value);
        }
        Err(_) => tracing::error!("failed to encode x-request-id header"),
    }
    response
}

async fn log_request(request: Request, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.to_string())
        .unwrap_or_default();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let uri = request.uri().clone();

    tracing::info!(%remote_addr, %request_id, "started {method} {uri}");
    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("");
    if status.is_server_error() {
        tracing::error!(%remote_addr, %request_id, "completed with {} {reason} in {elapsed:?}", status.as_u16());
    } else if status.is_client_error() {
        tracing::warn!(%remote_addr, %request_id, "completed with {} {reason} in {elapsed:?}", status.as_u16());
    } else {
        tracing::info!(%remote_addr, %request_id, "completed with {} {reason} in {elapsed:?}", status.as_u16());
    }
    response
}

async fn health() -> &'static str {
    "ok"
}

/// Builds the HTTP router over a shared engine.
pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };
    Router::new()
        .route("/balance", get(balance::get))
        .route("/balance/verify", get(balance::verify))
        .route("/transactions", get(transactions::list))
        .route("/deposit", post(transactions::deposit))
        .route("/withdraw", post(transactions::withdraw))
        .route("/transfer", post(transactions::transfer))
        .route("/health", get(health))
        .layer(middleware::from_fn(log_request))
        .layer(middleware::from_fn(set_request_id))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        router(Arc::new(engine)).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
