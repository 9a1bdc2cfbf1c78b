//! Negotiate authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Negotiate <base64>
//!     → token.rs (transport decoding)
//!     → negotiate.rs (scheme check, single-round handshake)
//!     → context.rs (per-exchange state machine, handle lifetime)
//!     → package.rs (host security package boundary)
//! ```
//!
//! # Design Decisions
//! - One credential handle per process, acquired at startup, freed on drop
//! - One security context per request; no connection affinity is tracked
//! - Continuation requests are failures: nothing carries state between requests
//! - The package is only consulted once a decodable Negotiate token is present

pub mod context;
pub mod negotiate;
pub mod package;
pub mod static_package;
pub mod token;

pub use negotiate::{AuthOutcome, Authenticator, EmptyTokenPolicy, FailureReason};
pub use package::{SecurityPackage, NEGOTIATE_PACKAGE};
pub use static_package::StaticPackage;
