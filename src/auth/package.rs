//! Boundary to the host security package.
//!
//! The service never performs Kerberos or SPNEGO cryptography itself. It
//! acquires an inbound credential from a package, hands it client tokens, and
//! reads back a status. Everything behind [`SecurityPackage`] belongs to the
//! host.

use std::fmt;
use std::ops::BitOr;

use thiserror::Error;

/// Package name of the Negotiate (SPNEGO) mechanism.
pub const NEGOTIATE_PACKAGE: &str = "Negotiate";

/// Opaque credential handle issued by a package.
///
/// Not `Clone`: a handle is released exactly once by moving it back into
/// [`SecurityPackage::free_credentials_handle`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CredentialHandle(u64);

impl CredentialHandle {
    /// Wrap a raw package handle value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw package handle value.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Opaque security-context handle issued by a package.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

impl ContextHandle {
    /// Wrap a raw package handle value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw package handle value.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Direction a credential is acquired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialUse {
    /// Accepting authentication from clients.
    Inbound,
    /// Authenticating to remote servers.
    Outbound,
}

/// Context requirement flags passed to an accept call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextRequirements(u32);

impl ContextRequirements {
    /// Connection-oriented context semantics.
    pub const CONNECTION: Self = Self(0x0000_0800);
    /// Mutual authentication requested by the server.
    pub const MUTUAL_AUTH: Self = Self(0x0000_0002);

    /// Raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether every flag in `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ContextRequirements {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Status code reported by a package for a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecurityStatus(pub u32);

impl SecurityStatus {
    /// The token is not valid for this package.
    pub const INVALID_TOKEN: Self = Self(0x8009_0308);
    /// The package recognised the token but refused the logon.
    pub const LOGON_DENIED: Self = Self(0x8009_030C);
    /// No credentials are available to the package.
    pub const NO_CREDENTIALS: Self = Self(0x8009_030E);
    /// The package name is not known to the host.
    pub const PACKAGE_NOT_FOUND: Self = Self(0x8009_0305);
    /// The supplied handle is not valid.
    pub const INVALID_HANDLE: Self = Self(0x8009_0301);
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Errors from package calls other than accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageError {
    /// The host has no usable identity for the requested package.
    #[error("no usable credentials for package {package}: {status}")]
    NoCredentials {
        package: String,
        status: SecurityStatus,
    },

    /// The package is not available on this host.
    #[error("security package {0} not found")]
    NotFound(String),

    /// Only inbound credentials are supported.
    #[error("credential use {0:?} is not supported")]
    UnsupportedUse(CredentialUse),
}

/// Result of a single accept call.
#[derive(Debug)]
pub enum AcceptStatus {
    /// The token was validated; the context is established.
    Complete { context: ContextHandle },
    /// The package wants another round trip; `output` must reach the client.
    ContinueNeeded {
        context: ContextHandle,
        output: Vec<u8>,
    },
    /// The package rejected the token.
    Failed(SecurityStatus),
}

/// A host security package able to accept Negotiate contexts.
pub trait SecurityPackage: Send + Sync {
    /// Acquire a credential handle for `package`.
    fn acquire_credentials_handle(
        &self,
        package: &str,
        usage: CredentialUse,
    ) -> Result<CredentialHandle, PackageError>;

    /// Run one accept step.
    ///
    /// `prior` is the context handle returned by a previous step of the same
    /// exchange, if any.
    fn accept_security_context(
        &self,
        credentials: &CredentialHandle,
        prior: Option<&ContextHandle>,
        input: &[u8],
        requirements: ContextRequirements,
    ) -> AcceptStatus;

    /// Display name of the principal bound to an established context.
    fn query_context_names(&self, context: &ContextHandle) -> Option<String>;

    /// Release a context handle.
    fn delete_security_context(&self, context: ContextHandle);

    /// Release a credential handle.
    fn free_credentials_handle(&self, credentials: CredentialHandle);
}
