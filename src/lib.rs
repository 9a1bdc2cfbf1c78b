//! Negotiate-authenticated HTTP echo service library

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use auth::{Authenticator, SecurityPackage, StaticPackage};
pub use config::ServiceConfig;
pub use lifecycle::{ServiceControl, ServiceHost, StartupError};
