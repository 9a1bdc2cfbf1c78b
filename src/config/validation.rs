//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (depths and budgets > 0, addresses parse)
//! - Check that static-package tokens are valid base64
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::auth::token;
use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("negotiate.package must not be empty")]
    EmptyPackage,

    #[error("negotiate principal '{principal}' has an invalid token: {reason}")]
    InvalidPrincipalToken { principal: String, reason: String },

    #[error("negotiate.continue_tokens[{index}] is invalid: {reason}")]
    InvalidContinueToken { index: usize, reason: String },

    #[error("service.name must be a non-empty name without '/'")]
    InvalidServiceName,
}

/// Check a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.queue_depth == 0 {
        errors.push(ValidationError::Zero("listener.queue_depth"));
    }
    if config.listener.header_buffer_bytes == 0 {
        errors.push(ValidationError::Zero("listener.header_buffer_bytes"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listener.request_timeout_secs"));
    }
    if config.dispatch.pause_poll_ms == 0 {
        errors.push(ValidationError::Zero("dispatch.pause_poll_ms"));
    }

    if config.negotiate.package.trim().is_empty() {
        errors.push(ValidationError::EmptyPackage);
    }
    for entry in &config.negotiate.principals {
        if let Err(e) = token::decode(&entry.token) {
            errors.push(ValidationError::InvalidPrincipalToken {
                principal: entry.principal.clone(),
                reason: e.to_string(),
            });
        }
    }
    for (index, text) in config.negotiate.continue_tokens.iter().enumerate() {
        if let Err(e) = token::decode(text) {
            errors.push(ValidationError::InvalidContinueToken {
                index,
                reason: e.to_string(),
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let name = &config.service.name;
    if name.trim().is_empty() || name.contains('/') {
        errors.push(ValidationError::InvalidServiceName);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
