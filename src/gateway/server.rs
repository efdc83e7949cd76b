//! Axum wiring for the dispatcher.
//!
//! Every path is handled by the dispatcher. CORS headers are set on every
//! response by the outermost layers, so rejected, failed and panicked
//! requests carry them too.

use std::any::Any;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::gateway::dispatcher::{Dispatcher, GatewayResponse};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Build the gateway router with all middleware.
pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(dispatcher)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Serve until the listener fails or the process receives Ctrl-C.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> Result<()> {
    info!("Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(dispatcher))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn handle(State(dispatcher): State<Arc<Dispatcher>>, method: Method, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("dispatch", %request_id, %method);

    dispatcher
        .dispatch(&method, &body)
        .instrument(span)
        .await
        .into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Request handler panicked: {}", detail);

    GatewayResponse::internal_fault().into_response()
}
