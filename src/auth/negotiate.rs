//! Negotiate authenticator.
//!
//! Owns the process credential handle and runs one single-round handshake per
//! request:
//!
//! ```text
//! Authorization header
//!     → scheme check ("Negotiate ")      ✗ → Failed, package untouched
//!     → token decode (base64)            ✗ → Failed, package untouched
//!     → accept_security_context
//!         Complete       → Established (principal logged)
//!         ContinueNeeded → Failed (no state survives between requests)
//!         Failed(code)   → Failed
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::context::{SecurityContext, StepOutcome};
use crate::auth::package::{
    ContextRequirements, CredentialHandle, CredentialUse, PackageError, SecurityPackage,
    SecurityStatus,
};
use crate::auth::token;

/// Authentication scheme name.
pub const NEGOTIATE_SCHEME: &str = "Negotiate";

/// Scheme prefix expected at the start of the `Authorization` value.
pub const NEGOTIATE_PREFIX: &str = "Negotiate ";

/// What to do with `Authorization: Negotiate ` carrying no token text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTokenPolicy {
    /// Hand an empty token to the package and let it decide.
    #[default]
    Attempt,
    /// Fail without calling the package.
    Reject,
}

/// Why an exchange did not establish an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    MissingHeader,
    WrongScheme,
    EmptyToken,
    MalformedToken,
    ContinueNeeded,
    Rejected(SecurityStatus),
    /// The handshake never returned a verdict (the package call panicked).
    PackageFault,
}

impl FailureReason {
    /// Short label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureReason::MissingHeader => "missing_header",
            FailureReason::WrongScheme => "wrong_scheme",
            FailureReason::EmptyToken => "empty_token",
            FailureReason::MalformedToken => "malformed_token",
            FailureReason::ContinueNeeded => "continue_needed",
            FailureReason::Rejected(_) => "rejected",
            FailureReason::PackageFault => "package_fault",
        }
    }

    /// Whether the package was consulted before failing.
    pub fn reached_package(&self) -> bool {
        matches!(
            self,
            FailureReason::ContinueNeeded | FailureReason::Rejected(_) | FailureReason::PackageFault
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Rejected(status) => write!(f, "rejected ({status})"),
            other => f.write_str(other.as_label()),
        }
    }
}

/// Result of authenticating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The package validated the token.
    Established { principal: Option<String> },
    /// No identity; the caller answers with the 401 challenge.
    Failed(FailureReason),
}

impl AuthOutcome {
    pub fn is_established(&self) -> bool {
        matches!(self, AuthOutcome::Established { .. })
    }
}

/// Drives Negotiate handshakes against a [`SecurityPackage`].
pub struct Authenticator {
    package: Arc<dyn SecurityPackage>,
    credentials: Option<CredentialHandle>,
    empty_token: EmptyTokenPolicy,
}

impl Authenticator {
    /// Acquire the inbound credential for `package_name`.
    ///
    /// Fails when the host has no usable identity for the package; callers
    /// treat that as fatal.
    pub fn new(
        package: Arc<dyn SecurityPackage>,
        package_name: &str,
        empty_token: EmptyTokenPolicy,
    ) -> Result<Self, PackageError> {
        let credentials = package.acquire_credentials_handle(package_name, CredentialUse::Inbound)?;
        tracing::info!(
            package = package_name,
            handle = credentials.as_raw(),
            "Negotiate credentials acquired"
        );
        Ok(Self {
            package,
            credentials: Some(credentials),
            empty_token,
        })
    }

    /// Authenticate a request from its raw `Authorization` value.
    pub fn authenticate(&self, authorization: Option<&str>) -> AuthOutcome {
        let Some(value) = authorization else {
            return AuthOutcome::Failed(FailureReason::MissingHeader);
        };
        // HTTP parsers trim trailing whitespace, so `Negotiate ` with no token
        // usually arrives as the bare scheme name.
        let token_text = if value == NEGOTIATE_SCHEME {
            ""
        } else {
            match value.strip_prefix(NEGOTIATE_PREFIX) {
                Some(rest) => rest,
                None => return AuthOutcome::Failed(FailureReason::WrongScheme),
            }
        };

        if token_text.trim().is_empty() && self.empty_token == EmptyTokenPolicy::Reject {
            return AuthOutcome::Failed(FailureReason::EmptyToken);
        }

        let input = match token::decode(token_text) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Authorization token did not decode");
                return AuthOutcome::Failed(FailureReason::MalformedToken);
            }
        };

        let Some(credentials) = self.credentials.as_ref() else {
            return AuthOutcome::Failed(FailureReason::Rejected(SecurityStatus::NO_CREDENTIALS));
        };

        let mut context = SecurityContext::new(self.package.as_ref());
        let step = context.accept(credentials, &input, ContextRequirements::CONNECTION);

        match step {
            Ok(StepOutcome::Established) => {
                let principal = context.principal();
                match principal.as_deref() {
                    Some(name) => tracing::info!(principal = name, "Authentication successful"),
                    None => tracing::info!("Authentication successful"),
                }
                AuthOutcome::Established { principal }
            }
            Ok(StepOutcome::ContinueNeeded { output }) => {
                tracing::info!(
                    output_len = output.len(),
                    "Authentication requires continuation; treating as failure"
                );
                context.abandon();
                AuthOutcome::Failed(FailureReason::ContinueNeeded)
            }
            Ok(StepOutcome::Rejected(status)) => {
                tracing::info!(status = %status, "AcceptSecurityContext rejected token");
                AuthOutcome::Failed(FailureReason::Rejected(status))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Security context misuse");
                AuthOutcome::Failed(FailureReason::Rejected(SecurityStatus::INVALID_HANDLE))
            }
        }
    }
}

impl Drop for Authenticator {
    fn drop(&mut self) {
        if let Some(credentials) = self.credentials.take() {
            self.package.free_credentials_handle(credentials);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::package::{AcceptStatus, ContextHandle, NEGOTIATE_PACKAGE};
    use crate::auth::static_package::StaticPackage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps a [`StaticPackage`] and counts calls.
    struct CountingPackage {
        inner: StaticPackage,
        accepts: AtomicUsize,
        freed: AtomicUsize,
    }

    impl CountingPackage {
        fn new(inner: StaticPackage) -> Arc<Self> {
            Arc::new(Self {
                inner,
                accepts: AtomicUsize::new(0),
                freed: AtomicUsize::new(0),
            })
        }

        fn accepts(&self) -> usize {
            self.accepts.load(Ordering::SeqCst)
        }
    }

    impl SecurityPackage for CountingPackage {
        fn acquire_credentials_handle(
            &self,
            package: &str,
            usage: CredentialUse,
        ) -> Result<CredentialHandle, PackageError> {
            self.inner.acquire_credentials_handle(package, usage)
        }

        fn accept_security_context(
            &self,
            credentials: &CredentialHandle,
            prior: Option<&ContextHandle>,
            input: &[u8],
            requirements: ContextRequirements,
        ) -> AcceptStatus {
            self.accepts.fetch_add(1, Ordering::SeqCst);
            self.inner
                .accept_security_context(credentials, prior, input, requirements)
        }

        fn query_context_names(&self, context: &ContextHandle) -> Option<String> {
            self.inner.query_context_names(context)
        }

        fn delete_security_context(&self, context: ContextHandle) {
            self.inner.delete_security_context(context)
        }

        fn free_credentials_handle(&self, credentials: CredentialHandle) {
            self.freed.fetch_add(1, Ordering::SeqCst);
            self.inner.free_credentials_handle(credentials)
        }
    }

    fn fixture(policy: EmptyTokenPolicy) -> (Arc<CountingPackage>, Authenticator) {
        let package = CountingPackage::new(
            StaticPackage::new()
                .with_principal(b"ticket".to_vec(), "alice@EXAMPLE.COM")
                .with_continue_token(b"round-one".to_vec()),
        );
        let auth = Authenticator::new(package.clone(), NEGOTIATE_PACKAGE, policy).unwrap();
        (package, auth)
    }

    fn header(token: &[u8]) -> String {
        format!("Negotiate {}", token::encode(token))
    }

    #[test]
    fn test_missing_header_skips_package() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        assert_eq!(
            auth.authenticate(None),
            AuthOutcome::Failed(FailureReason::MissingHeader)
        );
        assert_eq!(package.accepts(), 0);
    }

    #[test]
    fn test_basic_scheme_skips_package() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        assert_eq!(
            auth.authenticate(Some("Basic abc==")),
            AuthOutcome::Failed(FailureReason::WrongScheme)
        );
        assert_eq!(package.accepts(), 0);
    }

    #[test]
    fn test_scheme_match_is_case_sensitive_and_needs_separator() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        let token = token::encode(b"ticket");
        for value in [
            format!("negotiate {token}"),
            format!("Negotiate{token}"),
            "negotiate".into(),
            "NegotiateX".into(),
        ] {
            assert_eq!(
                auth.authenticate(Some(&value)),
                AuthOutcome::Failed(FailureReason::WrongScheme),
                "{value:?}"
            );
        }
        assert_eq!(package.accepts(), 0);
    }

    #[test]
    fn test_malformed_token_skips_package() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        assert_eq!(
            auth.authenticate(Some("Negotiate ***")),
            AuthOutcome::Failed(FailureReason::MalformedToken)
        );
        assert_eq!(package.accepts(), 0);
    }

    #[test]
    fn test_garbage_token_reaches_package_and_fails() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        let outcome = auth.authenticate(Some(&header(b"not a kerberos ticket")));
        assert_eq!(
            outcome,
            AuthOutcome::Failed(FailureReason::Rejected(SecurityStatus::LOGON_DENIED))
        );
        assert_eq!(package.accepts(), 1);
    }

    #[test]
    fn test_valid_token_establishes_and_releases_context() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        let outcome = auth.authenticate(Some(&header(b"ticket")));
        assert_eq!(
            outcome,
            AuthOutcome::Established {
                principal: Some("alice@EXAMPLE.COM".into())
            }
        );
        assert!(outcome.is_established());
        assert_eq!(package.inner.live_contexts(), 0);
    }

    #[test]
    fn test_continue_needed_is_failure() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        let outcome = auth.authenticate(Some(&header(b"round-one")));
        assert_eq!(outcome, AuthOutcome::Failed(FailureReason::ContinueNeeded));
        assert_eq!(package.accepts(), 1);
        assert_eq!(package.inner.live_contexts(), 0);
    }

    #[test]
    fn test_each_request_starts_a_fresh_context() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        assert!(!auth.authenticate(Some(&header(b"round-one"))).is_established());
        assert!(auth.authenticate(Some(&header(b"ticket"))).is_established());
        assert_eq!(package.accepts(), 2);
    }

    #[test]
    fn test_empty_token_attempted_by_default() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        let outcome = auth.authenticate(Some("Negotiate "));
        assert_eq!(
            outcome,
            AuthOutcome::Failed(FailureReason::Rejected(SecurityStatus::INVALID_TOKEN))
        );
        assert_eq!(package.accepts(), 1);
    }

    #[test]
    fn test_bare_scheme_is_an_empty_token() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        assert_eq!(
            auth.authenticate(Some("Negotiate")),
            AuthOutcome::Failed(FailureReason::Rejected(SecurityStatus::INVALID_TOKEN))
        );
        assert_eq!(package.accepts(), 1);

        let (package, auth) = fixture(EmptyTokenPolicy::Reject);
        assert_eq!(
            auth.authenticate(Some("Negotiate")),
            AuthOutcome::Failed(FailureReason::EmptyToken)
        );
        assert_eq!(package.accepts(), 0);
    }

    #[test]
    fn test_empty_token_rejected_by_policy() {
        let (package, auth) = fixture(EmptyTokenPolicy::Reject);
        assert_eq!(
            auth.authenticate(Some("Negotiate ")),
            AuthOutcome::Failed(FailureReason::EmptyToken)
        );
        assert_eq!(package.accepts(), 0);
    }

    #[test]
    fn test_credentials_released_on_drop() {
        let (package, auth) = fixture(EmptyTokenPolicy::Attempt);
        drop(auth);
        assert_eq!(package.freed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_startup_fails_without_identity() {
        let package = CountingPackage::new(StaticPackage::new());
        let result = Authenticator::new(package, NEGOTIATE_PACKAGE, EmptyTokenPolicy::Attempt);
        assert!(matches!(result, Err(PackageError::NoCredentials { .. })));
    }

    #[test]
    fn test_failure_labels() {
        assert_eq!(FailureReason::WrongScheme.as_label(), "wrong_scheme");
        assert!(FailureReason::ContinueNeeded.reached_package());
        assert!(!FailureReason::MissingHeader.reached_package());
        assert!(FailureReason::PackageFault.reached_package());
        assert_eq!(FailureReason::PackageFault.to_string(), "package_fault");
        assert_eq!(
            FailureReason::Rejected(SecurityStatus::LOGON_DENIED).to_string(),
            "rejected (0x8009030C)"
        );
    }
}
