//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (service.rs):
//!     Bind listener → Acquire credentials → Spawn dispatch loop → Spawn front end
//!
//! Control (control.rs):
//!     pause / resume → flag polled by the dispatch loop
//!     stop           → cancels a pending receive, drains the front end
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop
//!     SIGUSR1        → pause
//!     SIGUSR2        → resume
//!
//! Registration (install.rs):
//!     install / uninstall → systemd unit file
//! ```
//!
//! # Design Decisions
//! - No process-wide state: the host hands out a cloneable control handle
//! - Any startup error is fatal and leaves nothing running

pub mod control;
pub mod install;
pub mod service;
pub mod signals;

pub use control::ServiceControl;
pub use service::{ServiceHost, StartupError};
