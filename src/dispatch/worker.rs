//! The request dispatch loop.
//!
//! One task, one request at a time, in queue order:
//!
//! ```text
//! loop:
//!     stopping?  → exit
//!     paused?    → sleep(pause_poll), re-check
//!     receive    → (stop cancels a pending receive)
//!     authenticate (blocking pool; never cancelled)
//!         Failed      → 401 challenge
//!         Established → 200 echo
//!     send       → transport errors logged, never fatal
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::auth::{AuthOutcome, Authenticator, FailureReason};
use crate::http::echo;
use crate::http::request::IncomingRequest;
use crate::http::response::OutgoingResponse;
use crate::lifecycle::control::ServiceControl;
use crate::net::queue::{RequestQueue, TransportError};
use crate::observability::metrics;

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Stop was requested.
    Stopped,
    /// The queue closed; no request can arrive any more.
    QueueClosed,
}

/// Single-worker request dispatch loop.
pub struct DispatchLoop<Q> {
    queue: Q,
    authenticator: Arc<Authenticator>,
    control: ServiceControl,
    pause_poll: Duration,
}

impl<Q: RequestQueue> DispatchLoop<Q> {
    pub fn new(
        queue: Q,
        authenticator: Authenticator,
        control: ServiceControl,
        pause_poll: Duration,
    ) -> Self {
        Self {
            queue,
            authenticator: Arc::new(authenticator),
            control,
            pause_poll,
        }
    }

    /// Run until stopped or the queue closes.
    ///
    /// The authenticator, and with it the credential handle, is released when
    /// this returns.
    pub async fn run(mut self) -> LoopExit {
        tracing::info!(pause_poll = ?self.pause_poll, "Dispatch loop started");

        let exit = loop {
            if self.control.is_stopping() {
                break LoopExit::Stopped;
            }
            if self.control.is_paused() {
                tokio::time::sleep(self.pause_poll).await;
                continue;
            }

            let received = tokio::select! {
                biased;
                _ = self.control.stopped() => None,
                received = self.queue.receive() => Some(received),
            };
            let Some(received) = received else {
                break LoopExit::Stopped;
            };

            match received {
                Ok(request) => self.process(request).await,
                Err(TransportError::ConnectionInvalid) => {
                    tracing::debug!("Client disconnected before dispatch");
                }
                Err(TransportError::Closed) => break LoopExit::QueueClosed,
                Err(e) => {
                    tracing::warn!(error = %e, "Receiving request failed");
                    metrics::record_transport_error("receive");
                }
            }
        };

        tracing::info!(exit = ?exit, "Dispatch loop finished");
        exit
    }

    /// Authenticate one request and send its response.
    async fn process(&mut self, request: IncomingRequest) {
        let span = tracing::info_span!(
            "request",
            request_id = %request.id,
            correlation_id = %request.correlation_id,
            method = %request.method,
            path = %request.path,
        );
        self.respond(request).instrument(span).await
    }

    async fn respond(&mut self, request: IncomingRequest) {
        let start = Instant::now();
        let authorization = request.authorization().map(str::to_owned);
        let outcome = authenticate_blocking(Arc::clone(&self.authenticator), authorization).await;
        let response = match &outcome {
            AuthOutcome::Established { .. } => {
                metrics::record_auth_outcome("established");
                OutgoingResponse::echo(echo::render_request(&request))
            }
            AuthOutcome::Failed(reason) => {
                tracing::debug!(
                    reason = %reason,
                    reached_package = reason.reached_package(),
                    truncated = request.truncated,
                    "Sending Negotiate challenge"
                );
                metrics::record_auth_outcome(reason.as_label());
                OutgoingResponse::challenge()
            }
        };

        let status = response.status;
        match self.queue.send(request.id, response) {
            Ok(()) => {
                tracing::debug!(status, "Response sent");
                metrics::record_request(status, start);
            }
            Err(TransportError::ConnectionInvalid) => {
                tracing::debug!("Client disconnected before response");
            }
            Err(e) => {
                tracing::warn!(error = %e, status, "Sending response failed");
                metrics::record_transport_error("send");
            }
        }
    }
}

/// Run the handshake on the blocking pool.
///
/// Package calls may block on KDC round trips; they stay off runtime workers.
async fn authenticate_blocking(
    authenticator: Arc<Authenticator>,
    authorization: Option<String>,
) -> AuthOutcome {
    let span = tracing::Span::current();
    let handshake = tokio::task::spawn_blocking(move || {
        span.in_scope(|| authenticator.authenticate(authorization.as_deref()))
    });
    match handshake.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Authentication task failed");
            AuthOutcome::Failed(FailureReason::PackageFault)
        }
    }
}
