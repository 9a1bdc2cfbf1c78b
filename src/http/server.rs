//! HTTP front end.
//!
//! # Responsibilities
//! - Accept connections and parse HTTP/1.1 through axum/hyper
//! - Snapshot each request and push it onto the dispatch queue
//! - Wait for the dispatch loop's answer and write it back
//! - Answer 503 when the queue is full or the service is going away
//! - Wire up middleware (tracing, timeout, body limit)
//!
//! # Design Decisions
//! - No routing: every method and path lands in one handler
//! - The request body is never read; only its size is bounded
//! - Every response carries the request's correlation id as `X-Request-Id`

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::http::request::IncomingRequest;
use crate::http::response::OutgoingResponse;
use crate::lifecycle::control::wait_for_stop;
use crate::net::queue::{EnqueueError, QueueSender};
use crate::observability::metrics;

/// Header carrying the correlation id back to the client.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub queue: QueueSender,
    pub header_budget: usize,
}

/// HTTP front end feeding the dispatch queue.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a front end that enqueues onto `queue`.
    pub fn new(config: &ListenerConfig, queue: QueueSender) -> Self {
        let state = AppState {
            queue,
            header_budget: config.header_buffer_bytes,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(enqueue_handler)
            .with_state(state)
            // Timeout wraps the router directly; it needs a `Default` response body.
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// Serve on `listener` until `shutdown` turns true.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP front end starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_stop(shutdown))
            .await?;

        tracing::info!("HTTP front end stopped");
        Ok(())
    }
}

/// Snapshot the request, queue it, and relay the dispatch loop's response.
async fn enqueue_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let snapshot = IncomingRequest::snapshot(
        request.method(),
        request.uri().path(),
        request.headers(),
        state.header_budget,
    );
    let correlation_id = snapshot.correlation_id;

    tracing::debug!(
        request_id = %snapshot.id,
        correlation_id = %correlation_id,
        method = %snapshot.method,
        path = %snapshot.path,
        "Queueing request"
    );

    let response = match state.queue.enqueue(snapshot) {
        Ok(reply) => match reply.await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(correlation_id = %correlation_id, "Request dropped before dispatch");
                OutgoingResponse::unavailable()
            }
        },
        Err(e) => {
            let reason = match e {
                EnqueueError::Full => "full",
                EnqueueError::Closed => "closed",
            };
            tracing::warn!(correlation_id = %correlation_id, error = %e, "Request refused");
            metrics::record_queue_rejection(reason);
            OutgoingResponse::unavailable()
        }
    };

    let mut response = response.into_response();
    match HeaderValue::from_str(&correlation_id.to_string()) {
        Ok(value) => {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        Err(_) => {
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    response
}
