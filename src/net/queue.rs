//! Request queue between the HTTP front end and the dispatch loop.
//!
//! # Responsibilities
//! - Define the listener boundary the dispatch loop consumes ([`RequestQueue`])
//! - Bound the number of requests waiting for the loop
//! - Correlate each response with its waiting client by [`RequestId`]
//! - Report a vanished client as [`TransportError::ConnectionInvalid`]
//!
//! # Design Decisions
//! - The front end holds only the sending half; the loop owns the receiver and
//!   the table of pending replies, so no lock is needed
//! - A full queue is refused immediately instead of applying backpressure to
//!   the accepting side

use std::collections::HashMap;
use std::future::Future;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::http::request::{IncomingRequest, RequestId};
use crate::http::response::OutgoingResponse;

/// Errors raised while receiving or sending through a queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The client went away; expected and not worth reporting.
    #[error("connection no longer valid")]
    ConnectionInvalid,

    /// No pending request has this id.
    #[error("unknown request {0}")]
    UnknownRequest(RequestId),

    /// The listener has shut down; nothing more will arrive.
    #[error("request queue closed")]
    Closed,

    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// Listener boundary consumed by the dispatch loop.
pub trait RequestQueue {
    /// Wait for the next request.
    fn receive(&mut self) -> impl Future<Output = Result<IncomingRequest, TransportError>> + Send;

    /// Send the response for a previously received request.
    fn send(&mut self, id: RequestId, response: OutgoingResponse) -> Result<(), TransportError>;
}

/// A request waiting in the queue with its reply channel.
#[derive(Debug)]
pub struct QueuedRequest {
    pub request: IncomingRequest,
    pub reply: oneshot::Sender<OutgoingResponse>,
}

/// Why the front end could not enqueue a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("request queue is full")]
    Full,

    #[error("request queue is closed")]
    Closed,
}

/// Front-end half of the queue.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<QueuedRequest>,
}

impl QueueSender {
    /// Enqueue `request`; the returned receiver resolves with its response.
    pub fn enqueue(
        &self,
        request: IncomingRequest,
    ) -> Result<oneshot::Receiver<OutgoingResponse>, EnqueueError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .try_send(QueuedRequest { request, reply })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
                mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
            })?;
        Ok(response)
    }
}

/// Dispatch-loop half of the queue.
#[derive(Debug)]
pub struct ChannelQueue {
    rx: mpsc::Receiver<QueuedRequest>,
    pending: HashMap<RequestId, oneshot::Sender<OutgoingResponse>>,
}

impl ChannelQueue {
    /// Requests received but not yet answered.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Create a queue holding at most `depth` waiting requests.
pub fn request_queue(depth: usize) -> (QueueSender, ChannelQueue) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (
        QueueSender { tx },
        ChannelQueue {
            rx,
            pending: HashMap::new(),
        },
    )
}

impl RequestQueue for ChannelQueue {
    async fn receive(&mut self) -> Result<IncomingRequest, TransportError> {
        let queued = self.rx.recv().await.ok_or(TransportError::Closed)?;
        if queued.reply.is_closed() {
            return Err(TransportError::ConnectionInvalid);
        }
        self.pending.insert(queued.request.id, queued.reply);
        Ok(queued.request)
    }

    fn send(&mut self, id: RequestId, response: OutgoingResponse) -> Result<(), TransportError> {
        let reply = self
            .pending
            .remove(&id)
            .ok_or(TransportError::UnknownRequest(id))?;
        reply
            .send(response)
            .map_err(|_| TransportError::ConnectionInvalid)
    }
}
