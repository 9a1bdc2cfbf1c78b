//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, enqueue)
//!     → request.rs (owned snapshot: method, path, header table)
//!     → [dispatch loop authenticates]
//!     → echo.rs (diagnostic body for authenticated requests)
//!     → response.rs (401 challenge / 200 echo)
//!     → Send to client
//! ```

pub mod echo;
pub mod request;
pub mod response;
pub mod server;

pub use request::{HeaderTable, IncomingRequest, KnownHeader, RequestId};
pub use response::OutgoingResponse;
pub use server::{HttpServer, X_REQUEST_ID};
