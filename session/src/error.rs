//! Error types for the session core.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Error codes the provider uses when the user abandons a sign-in flow.
const CANCELLATION_CODES: &[&str] = &[
    "auth/popup-closed-by-user",
    "auth/cancelled-popup-request",
    "auth/user-cancelled",
];

/// Error reported by the identity provider.
///
/// Carries the provider's machine-readable `code` (for example
/// `auth/network-request-failed`) and its human-readable message.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("{message} ({code})")]
pub struct GatewayError {
    /// Provider error code.
    pub code: String,

    /// Provider error message.
    pub message: String,
}

impl GatewayError {
    /// Create a provider error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The user closed or cancelled the sign-in flow.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new("auth/popup-closed-by-user", "The sign-in popup was closed by the user")
    }

    /// The provider SDK panicked inside a call.
    #[must_use]
    pub fn sdk_panic(detail: impl Into<String>) -> Self {
        Self::new("sdk/panic", detail)
    }

    /// Returns `true` if the user abandoned the flow rather than the provider failing.
    ///
    /// # Examples
    ///
    /// ```
    /// # use forever_fitness_session::GatewayError;
    /// assert!(GatewayError::cancelled().is_cancellation());
    /// assert!(!GatewayError::new("auth/internal-error", "boom").is_cancellation());
    /// ```
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        CANCELLATION_CODES.contains(&self.code.as_str())
    }
}

/// Session error taxonomy.
///
/// Startup and listener failures (`ProviderUnavailable`, `ListenerFailure`,
/// `SubscriptionSetup`) are absorbed into the snapshot and never returned
/// from `initialize()`. Sign-in failures are returned to the caller of
/// `begin_sign_in()` and never stored.
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
pub enum SessionError {
    // ═══════════════════════════════════════════════════════════
    // Stored in the snapshot
    // ═══════════════════════════════════════════════════════════
    /// Provider configuration missing or invalid at startup.
    #[error("Identity provider is not configured")]
    ProviderUnavailable,

    /// The open identity subscription reported an error.
    #[error("Identity listener failed: {source}")]
    ListenerFailure {
        /// Provider error
        source: GatewayError,
        /// When the error was observed
        occurred_at: DateTime<Utc>,
    },

    /// The identity subscription could not be opened.
    #[error("Could not open identity subscription: {source}")]
    SubscriptionSetup {
        /// Provider error
        source: GatewayError,
        /// When the error was observed
        occurred_at: DateTime<Utc>,
    },

    // ═══════════════════════════════════════════════════════════
    // Returned from sign-in
    // ═══════════════════════════════════════════════════════════
    /// The provider rejected the sign-in, or the user cancelled it.
    #[error("Sign-in rejected: {0}")]
    SignInRejected(GatewayError),

    /// Sign-in refused because the session reports a provider error.
    #[error("Sign-in blocked: {0}")]
    SignInBlocked(Box<SessionError>),

    /// The session is not listening, so no push could confirm a sign-in.
    #[error("Session is not listening for identity changes")]
    NotListening,

    /// The provider accepted the sign-in but never pushed the identity.
    #[error("Sign-in was not confirmed by the identity provider within {0:?}")]
    SignInUnconfirmed(Duration),

    /// Another sign-in on this session has not finished yet.
    #[error("A sign-in is already in progress")]
    SignInInProgress,
}

impl SessionError {
    /// Returns `true` if the error came from a user-initiated sign-in.
    #[must_use]
    pub const fn is_sign_in_error(&self) -> bool {
        matches!(
            self,
            Self::SignInRejected(_)
                | Self::SignInBlocked(_)
                | Self::NotListening
                | Self::SignInUnconfirmed(_)
                | Self::SignInInProgress
        )
    }

    /// Returns `true` if the user simply cancelled the sign-in flow.
    ///
    /// Login forms usually stay silent in that case.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::SignInRejected(error) if error.is_cancellation())
    }

    /// Provider error behind this session error, if any.
    #[must_use]
    pub const fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::ListenerFailure { source, .. }
            | Self::SubscriptionSetup { source, .. }
            | Self::SignInRejected(source) => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_displays_message_and_code() {
        let error = GatewayError::new("auth/network-request-failed", "Network down");
        assert_eq!(error.to_string(), "Network down (auth/network-request-failed)");
    }

    #[test]
    fn cancellation_is_detected_through_sign_in_rejection() {
        assert!(SessionError::SignInRejected(GatewayError::cancelled()).is_cancellation());
        assert!(!SessionError::NotListening.is_cancellation());
    }

    #[test]
    fn stored_errors_are_not_sign_in_errors() {
        assert!(!SessionError::ProviderUnavailable.is_sign_in_error());
        assert!(SessionError::NotListening.is_sign_in_error());
        assert!(SessionError::SignInInProgress.is_sign_in_error());
        assert!(
            SessionError::SignInBlocked(Box::new(SessionError::ProviderUnavailable))
                .is_sign_in_error()
        );
    }

    #[test]
    fn gateway_error_is_exposed_for_listener_failures() {
        let source = GatewayError::new("auth/internal-error", "boom");
        let error = SessionError::ListenerFailure {
            source: source.clone(),
            occurred_at: Utc::now(),
        };
        assert_eq!(error.gateway_error(), Some(&source));
        assert_eq!(SessionError::ProviderUnavailable.gateway_error(), None);
    }
}
