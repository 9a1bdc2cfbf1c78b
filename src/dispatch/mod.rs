//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RequestQueue::receive
//!     → worker.rs (pause/stop checks, authenticate, build response)
//!     → RequestQueue::send
//! ```
//!
//! # Design Decisions
//! - Exactly one worker; requests are answered strictly in delivery order
//! - Pause is polled at iteration boundaries (bounded latency, no interrupts)
//! - Stop cancels a pending receive but never a request already dequeued
//! - Per-request failures never leave the iteration they happened in

pub mod worker;

pub use worker::{DispatchLoop, LoopExit};
