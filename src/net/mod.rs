//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, fatal on failure)
//!     → [HTTP front end snapshots the request]
//!     → queue.rs (bounded hand-off to the dispatch loop, reply correlation)
//! ```
//!
//! # Design Decisions
//! - Bounded queue prevents resource exhaustion; overflow is answered with 503
//! - A client that disconnects is a distinguishable, silent condition

pub mod listener;
pub mod queue;

pub use queue::{request_queue, ChannelQueue, QueueSender, RequestQueue, TransportError};
