//! Pre-shared-token security package.
//!
//! Accepts exactly the tokens it was configured with and maps each to a fixed
//! principal name. Used for lab deployments without a KDC and by the test
//! suite; production hosts plug their Kerberos/SSPI binding in behind
//! [`SecurityPackage`] instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::auth::package::{
    AcceptStatus, ContextHandle, ContextRequirements, CredentialHandle, CredentialUse,
    PackageError, SecurityPackage, SecurityStatus, NEGOTIATE_PACKAGE,
};
use crate::auth::token;
use crate::config::NegotiateConfig;

/// In-process package keyed on raw token bytes.
#[derive(Debug)]
pub struct StaticPackage {
    principals: HashMap<Vec<u8>, String>,
    continue_tokens: Vec<Vec<u8>>,
    next_handle: AtomicU64,
    live_contexts: Mutex<HashMap<u64, Option<String>>>,
}

impl StaticPackage {
    /// Create a package with no accepted tokens.
    pub fn new() -> Self {
        Self {
            principals: HashMap::new(),
            continue_tokens: Vec::new(),
            next_handle: AtomicU64::new(1),
            live_contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Accept `token` as proof of identity for `principal`.
    pub fn with_principal(mut self, token: impl Into<Vec<u8>>, principal: impl Into<String>) -> Self {
        self.principals.insert(token.into(), principal.into());
        self
    }

    /// Answer `token` with a continuation request instead of a verdict.
    pub fn with_continue_token(mut self, token: impl Into<Vec<u8>>) -> Self {
        self.continue_tokens.push(token.into());
        self
    }

    /// Build a package from the `[negotiate]` config section.
    ///
    /// Tokens in the config are base64 text, as they appear on the wire.
    pub fn from_config(config: &NegotiateConfig) -> Result<Self, token::TokenError> {
        let mut package = Self::new();
        for entry in &config.principals {
            package = package.with_principal(token::decode(&entry.token)?, entry.principal.clone());
        }
        for text in &config.continue_tokens {
            package = package.with_continue_token(token::decode(text)?);
        }
        Ok(package)
    }

    /// Number of context handles not yet deleted.
    pub fn live_contexts(&self) -> usize {
        self.live_contexts
            .lock()
            .map(|contexts| contexts.len())
            .unwrap_or_default()
    }

    fn issue_context(&self, principal: Option<String>) -> ContextHandle {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut contexts) = self.live_contexts.lock() {
            contexts.insert(raw, principal);
        }
        ContextHandle::from_raw(raw)
    }
}

impl Default for StaticPackage {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityPackage for StaticPackage {
    fn acquire_credentials_handle(
        &self,
        package: &str,
        usage: CredentialUse,
    ) -> Result<CredentialHandle, PackageError> {
        if package != NEGOTIATE_PACKAGE {
            return Err(PackageError::NotFound(package.to_string()));
        }
        if usage != CredentialUse::Inbound {
            return Err(PackageError::UnsupportedUse(usage));
        }
        if self.principals.is_empty() {
            return Err(PackageError::NoCredentials {
                package: package.to_string(),
                status: SecurityStatus::NO_CREDENTIALS,
            });
        }
        Ok(CredentialHandle::from_raw(
            self.next_handle.fetch_add(1, Ordering::Relaxed),
        ))
    }

    fn accept_security_context(
        &self,
        _credentials: &CredentialHandle,
        prior: Option<&ContextHandle>,
        input: &[u8],
        _requirements: ContextRequirements,
    ) -> AcceptStatus {
        if input.is_empty() {
            return AcceptStatus::Failed(SecurityStatus::INVALID_TOKEN);
        }

        if let Some(principal) = self.principals.get(input) {
            let context = match prior {
                Some(handle) => {
                    if let Ok(mut contexts) = self.live_contexts.lock() {
                        contexts.insert(handle.as_raw(), Some(principal.clone()));
                    }
                    ContextHandle::from_raw(handle.as_raw())
                }
                None => self.issue_context(Some(principal.clone())),
            };
            return AcceptStatus::Complete { context };
        }

        if self.continue_tokens.iter().any(|t| t.as_slice() == input) {
            let context = match prior {
                Some(handle) => ContextHandle::from_raw(handle.as_raw()),
                None => self.issue_context(None),
            };
            return AcceptStatus::ContinueNeeded {
                context,
                output: b"continue".to_vec(),
            };
        }

        AcceptStatus::Failed(SecurityStatus::LOGON_DENIED)
    }

    fn query_context_names(&self, context: &ContextHandle) -> Option<String> {
        self.live_contexts
            .lock()
            .ok()
            .and_then(|contexts| contexts.get(&context.as_raw()).cloned().flatten())
    }

    fn delete_security_context(&self, context: ContextHandle) {
        if let Ok(mut contexts) = self.live_contexts.lock() {
            contexts.remove(&context.as_raw());
        }
    }

    fn free_credentials_handle(&self, credentials: CredentialHandle) {
        tracing::debug!(handle = credentials.as_raw(), "Credentials released");
    }
}
