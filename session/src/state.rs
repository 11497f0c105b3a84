//! Session state types.
//!
//! [`SessionSnapshot`] is what consumers see. [`SessionState`] wraps it with
//! the state machine position and the bookkeeping the reducer needs.
//! All types are `Clone` to support the functional architecture pattern.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::identity::{Identity, RecordScope};
use forever_fitness_core::Versioned;
use serde::Serialize;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// Snapshot
// ═══════════════════════════════════════════════════════════════════════

/// The unit of state broadcast to consumers.
///
/// # Reading a snapshot
///
/// - `identity == None && loading` means "unknown": do not redirect yet.
/// - `error` is advisory. It can coexist with an identity, because a
///   listener error does not prove the user signed out.
/// - `demo_mode` is a UI override; the core never consults it.
///
/// # Examples
///
/// ```
/// # use forever_fitness_session::{Gate, SessionSnapshot};
/// let snapshot = SessionSnapshot::initial(true);
/// assert!(snapshot.loading);
/// assert_eq!(snapshot.gate(), Gate::Pending);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Signed-in identity, if any.
    pub identity: Option<Identity>,

    /// `true` until the first definitive answer from the gateway.
    pub loading: bool,

    /// Last provider failure observed while listening.
    pub error: Option<SessionError>,

    /// Whether the provider completed initialization at startup.
    pub provider_available: bool,

    /// Local override letting the UI bypass identity checks.
    pub demo_mode: bool,
}

impl SessionSnapshot {
    /// Snapshot before the gateway has answered.
    #[must_use]
    pub const fn initial(provider_available: bool) -> Self {
        Self {
            identity: None,
            loading: true,
            error: None,
            provider_available,
            demo_mode: false,
        }
    }

    /// Routing decision for this snapshot.
    #[must_use]
    pub fn gate(&self) -> Gate<'_> {
        match (&self.identity, self.loading) {
            (Some(identity), _) => Gate::SignedIn(identity),
            (None, true) => Gate::Pending,
            (None, false) => Gate::SignedOut,
        }
    }

    /// Returns `true` once a signed-in identity is known.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Storage scope of the signed-in user's records.
    #[must_use]
    pub fn record_scope(&self) -> Option<RecordScope> {
        self.identity.as_ref().map(Identity::record_scope)
    }

    /// Whether a sign-in attempt is allowed under `config`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ProviderUnavailable`] if the provider was never configured
    /// - [`SessionError::SignInBlocked`] if an error is present and the
    ///   configuration blocks sign-in on errors
    pub fn check_sign_in(&self, config: &SessionConfig) -> Result<(), SessionError> {
        if !self.provider_available {
            return Err(SessionError::ProviderUnavailable);
        }

        match &self.error {
            Some(error) if config.block_sign_in_on_error => {
                Err(SessionError::SignInBlocked(Box::new(error.clone())))
            },
            _ => Ok(()),
        }
    }

    /// Banner to show on a sign-in page, if any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        if !self.provider_available {
            return Some(Diagnostic::ProviderNotConfigured);
        }

        self.error.as_ref().map(|error| Diagnostic::ProviderError {
            message: error
                .gateway_error()
                .map_or_else(|| error.to_string(), |source| source.message.clone()),
        })
    }
}

/// Routing decision derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate<'a> {
    /// The gateway has not answered yet; wait before redirecting.
    Pending,

    /// A user is signed in.
    SignedIn(&'a Identity),

    /// Definitively nobody is signed in.
    SignedOut,
}

/// Problem worth surfacing on a sign-in page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Provider configuration is missing or invalid.
    ProviderNotConfigured,

    /// The provider reported an error.
    ProviderError {
        /// Provider message
        message: String,
    },
}

impl Diagnostic {
    /// Short headline.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::ProviderNotConfigured => "Identity provider not configured",
            Self::ProviderError { .. } => "Identity provider error",
        }
    }

    /// Operator hint.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::ProviderNotConfigured => {
                "Provider environment variables are missing or invalid. \
                 Set them up to enable sign-in."
            },
            Self::ProviderError { .. } => {
                "Check the provider environment variables and project configuration."
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderNotConfigured => write!(f, "{}: {}", self.title(), self.hint()),
            Self::ProviderError { message } => write!(f, "{}: {message}", self.title()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// State machine
// ═══════════════════════════════════════════════════════════════════════

/// Position of the session state machine.
///
/// ```text
/// Uninitialized ──initialize──▶ Unavailable                  (provider missing)
///       │
///       └──────────initialize──▶ Connecting ──push──▶ Ready
///                                    │                  │
///                                    └──error──▶ Failed ◀┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// `initialize()` has not run.
    Uninitialized,

    /// The provider was not available at startup. Terminal.
    Unavailable,

    /// Subscription requested, no answer yet.
    Connecting,

    /// The gateway pushed an identity (or its absence).
    Ready,

    /// The subscription reported an error or could not be opened.
    Failed,
}

impl SessionPhase {
    /// Returns `true` if a gateway subscription was attempted.
    #[must_use]
    pub const fn is_listening(self) -> bool {
        matches!(self, Self::Connecting | Self::Ready | Self::Failed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Unavailable => "unavailable",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Root session state managed by the session reducer.
///
/// # Examples
///
/// ```
/// # use forever_fitness_session::{SessionPhase, SessionState};
/// let state = SessionState::new(true);
/// assert_eq!(state.phase, SessionPhase::Uninitialized);
/// assert!(state.snapshot.loading);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// State machine position.
    pub phase: SessionPhase,

    /// What consumers see.
    pub snapshot: SessionSnapshot,

    /// Bumped on every consumer-visible change.
    pub version: u64,

    /// Set by teardown. Pushes are ignored from then on.
    pub torn_down: bool,
}

impl SessionState {
    /// Fresh state for a provider that is (or is not) available.
    #[must_use]
    pub const fn new(provider_available: bool) -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            snapshot: SessionSnapshot::initial(provider_available),
            version: 0,
            torn_down: false,
        }
    }

    /// Mark the snapshot as changed so listeners are notified.
    pub(crate) const fn publish(&mut self) {
        self.version += 1;
    }
}

impl Versioned for SessionState {
    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use chrono::Utc;

    fn listener_error() -> SessionError {
        SessionError::ListenerFailure {
            source: GatewayError::new("auth/internal-error", "Quota exceeded"),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn gate_waits_while_loading() {
        assert_eq!(SessionSnapshot::initial(true).gate(), Gate::Pending);
    }

    #[test]
    fn gate_is_signed_out_once_settled_without_identity() {
        let snapshot = SessionSnapshot {
            loading: false,
            ..SessionSnapshot::initial(false)
        };
        assert_eq!(snapshot.gate(), Gate::SignedOut);
        assert!(snapshot.record_scope().is_none());
    }

    #[test]
    fn gate_reports_identity_even_with_advisory_error() {
        let identity = Identity::new("u1");
        let snapshot = SessionSnapshot {
            identity: Some(identity.clone()),
            loading: false,
            error: Some(listener_error()),
            ..SessionSnapshot::initial(true)
        };
        assert_eq!(snapshot.gate(), Gate::SignedIn(&identity));
        assert_eq!(snapshot.record_scope(), Some(identity.record_scope()));
    }

    #[test]
    fn sign_in_check_follows_policy() {
        let blocked = SessionConfig::default();
        let lenient = SessionConfig::default().with_block_sign_in_on_error(false);

        assert_eq!(
            SessionSnapshot::initial(false).check_sign_in(&lenient),
            Err(SessionError::ProviderUnavailable)
        );

        let failed = SessionSnapshot {
            loading: false,
            error: Some(listener_error()),
            ..SessionSnapshot::initial(true)
        };
        assert!(matches!(
            failed.check_sign_in(&blocked),
            Err(SessionError::SignInBlocked(_))
        ));
        assert_eq!(failed.check_sign_in(&lenient), Ok(()));
    }

    #[test]
    fn diagnostic_prefers_missing_configuration() {
        let unavailable = SessionSnapshot {
            loading: false,
            ..SessionSnapshot::initial(false)
        };
        assert_eq!(unavailable.diagnostic(), Some(Diagnostic::ProviderNotConfigured));

        let failed = SessionSnapshot {
            error: Some(listener_error()),
            ..SessionSnapshot::initial(true)
        };
        assert_eq!(
            failed.diagnostic(),
            Some(Diagnostic::ProviderError {
                message: "Quota exceeded".to_string()
            })
        );

        assert_eq!(SessionSnapshot::initial(true).diagnostic(), None);
    }

    #[test]
    fn publish_bumps_version() {
        let mut state = SessionState::new(true);
        state.publish();
        state.publish();
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn only_attempted_subscriptions_count_as_listening() {
        assert!(!SessionPhase::Uninitialized.is_listening());
        assert!(!SessionPhase::Unavailable.is_listening());
        assert!(SessionPhase::Connecting.is_listening());
        assert!(SessionPhase::Failed.is_listening());
    }
}
