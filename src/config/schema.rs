//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::auth::negotiate::EmptyTokenPolicy;
use crate::auth::package::NEGOTIATE_PACKAGE;

/// Root configuration for the echo service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP front end and request queue.
    pub listener: ListenerConfig,

    /// Negotiate authentication settings.
    pub negotiate: NegotiateConfig,

    /// Dispatch loop settings.
    pub dispatch: DispatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Service-manager integration.
    pub service: ServiceIdentityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Requests that may wait for the dispatch loop before the front end
    /// answers 503.
    pub queue_depth: usize,

    /// Header bytes captured per request. Headers past this budget are
    /// dropped from the snapshot.
    pub header_buffer_bytes: usize,

    /// Time a client may wait for its response, in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body accepted (the body is never echoed).
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            queue_depth: 1_000,
            header_buffer_bytes: 16 * 1024,
            request_timeout_secs: 30,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Negotiate authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NegotiateConfig {
    /// Security package to acquire credentials from.
    pub package: String,

    /// Handling of `Authorization: Negotiate ` with no token text.
    pub empty_token: EmptyTokenPolicy,

    /// Pre-shared tokens accepted by the static package.
    pub principals: Vec<PrincipalConfig>,

    /// Tokens the static package answers with a continuation request.
    pub continue_tokens: Vec<String>,
}

impl Default for NegotiateConfig {
    fn default() -> Self {
        Self {
            package: NEGOTIATE_PACKAGE.to_string(),
            empty_token: EmptyTokenPolicy::Attempt,
            principals: Vec::new(),
            continue_tokens: Vec::new(),
        }
    }
}

/// A token/principal pair for the static package.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrincipalConfig {
    /// Base64 token as sent by the client.
    pub token: String,

    /// Principal name reported for the token.
    pub principal: String,
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Sleep between pause-flag checks, in milliseconds.
    pub pause_poll_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { pause_poll_ms: 100 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Identity used when registering with the service manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceIdentityConfig {
    /// Unit name (without the `.service` suffix).
    pub name: String,

    /// Human-readable description.
    pub display_name: String,

    /// Directory unit files are written to.
    pub unit_dir: String,
}

impl Default for ServiceIdentityConfig {
    fn default() -> Self {
        Self {
            name: "negotiate-echo".to_string(),
            display_name: "Negotiate Echo HTTP Service".to_string(),
            unit_dir: "/etc/systemd/system".to_string(),
        }
    }
}
