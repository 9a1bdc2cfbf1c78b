//! Per-exchange security context.
//!
//! # State Transitions
//! ```text
//! NoContext → ContinueNeeded → Established | Failed
//! NoContext → Established | Failed
//! ```
//! Established and Failed are terminal: a context in either state refuses
//! further accept calls. The package handle is deleted when the context is
//! dropped.

use thiserror::Error;

use crate::auth::package::{
    AcceptStatus, ContextHandle, ContextRequirements, CredentialHandle, SecurityPackage,
    SecurityStatus,
};

/// Lifecycle state of a security context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No handshake data exists yet.
    NoContext,
    /// The package produced output that must go back to the client.
    ContinueNeeded,
    /// The token was validated.
    Established,
    /// The package rejected the token.
    Failed,
}

impl ContextState {
    /// Whether the state accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ContextState::Established | ContextState::Failed)
    }

    /// Whether moving from `self` to `next` goes forward.
    pub fn can_advance_to(self, next: ContextState) -> bool {
        use ContextState::*;
        matches!(
            (self, next),
            (NoContext, ContinueNeeded)
                | (NoContext, Established)
                | (NoContext, Failed)
                | (ContinueNeeded, Established)
                | (ContinueNeeded, Failed)
        )
    }
}

/// Errors raised by context misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Accept was called on an established or failed context.
    #[error("security context is {0:?} and cannot be reused")]
    Terminal(ContextState),

    /// An accept step would move the context backwards.
    #[error("illegal context transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: ContextState,
        to: ContextState,
    },
}

/// Outcome of one accept step.
#[derive(Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Established,
    ContinueNeeded { output: Vec<u8> },
    Rejected(SecurityStatus),
}

/// One handshake exchange against a package.
pub struct SecurityContext<'a> {
    package: &'a dyn SecurityPackage,
    handle: Option<ContextHandle>,
    state: ContextState,
}

impl<'a> SecurityContext<'a> {
    /// Start an exchange with no prior handle.
    pub fn new(package: &'a dyn SecurityPackage) -> Self {
        Self {
            package,
            handle: None,
            state: ContextState::NoContext,
        }
    }

    /// Current state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Whether a previous accept step left a handle behind.
    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Run one accept step with `input`.
    pub fn accept(
        &mut self,
        credentials: &CredentialHandle,
        input: &[u8],
        requirements: ContextRequirements,
    ) -> Result<StepOutcome, ContextError> {
        if self.state.is_terminal() {
            return Err(ContextError::Terminal(self.state));
        }

        let status = self.package.accept_security_context(
            credentials,
            self.handle.as_ref(),
            input,
            requirements,
        );

        match status {
            AcceptStatus::Complete { context } => {
                self.advance(ContextState::Established)?;
                self.replace_handle(context);
                Ok(StepOutcome::Established)
            }
            AcceptStatus::ContinueNeeded { context, output } => {
                self.advance(ContextState::ContinueNeeded)?;
                self.replace_handle(context);
                Ok(StepOutcome::ContinueNeeded { output })
            }
            AcceptStatus::Failed(code) => {
                self.advance(ContextState::Failed)?;
                Ok(StepOutcome::Rejected(code))
            }
        }
    }

    /// Mark the exchange failed without another package call.
    pub fn abandon(&mut self) {
        if !self.state.is_terminal() {
            self.state = ContextState::Failed;
        }
    }

    /// Display name of the authenticated principal.
    pub fn principal(&self) -> Option<String> {
        match (&self.handle, self.state) {
            (Some(handle), ContextState::Established) => self.package.query_context_names(handle),
            _ => None,
        }
    }

    fn advance(&mut self, next: ContextState) -> Result<(), ContextError> {
        if !self.state.can_advance_to(next) {
            return Err(ContextError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    fn replace_handle(&mut self, handle: ContextHandle) {
        // Packages normally hand back the same handle; free a stale one if not.
        match self.handle.take() {
            Some(old) if old != handle => self.package.delete_security_context(old),
            _ => {}
        }
        self.handle = Some(handle);
    }
}

impl Drop for SecurityContext<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::trace!(context = handle.as_raw(), state = ?self.state, "Deleting security context");
            self.package.delete_security_context(handle);
        }
    }
}
