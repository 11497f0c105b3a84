//! Session actions.
//!
//! Every input to the session reducer: local lifecycle calls, the demo-mode
//! override, and notifications pushed by the identity gateway.

use crate::error::GatewayError;
use crate::identity::Identity;

/// Session action.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Check provider availability and open the identity subscription.
    ///
    /// Idempotent: only the first `Initialize` has any effect.
    Initialize,

    /// The gateway pushed the current identity (`None` when signed out).
    IdentityChanged(Option<Identity>),

    /// The open subscription reported an error.
    ListenerFailed(GatewayError),

    /// Opening the subscription failed synchronously.
    SubscriptionSetupFailed(GatewayError),

    /// Toggle the local demo-mode override.
    SetDemoMode(bool),

    /// Release the subscription and stop accepting pushes.
    Teardown,
}

impl SessionAction {
    /// Returns `true` for actions that originate from the gateway.
    #[must_use]
    pub const fn is_push(&self) -> bool {
        matches!(
            self,
            Self::IdentityChanged(_) | Self::ListenerFailed(_) | Self::SubscriptionSetupFailed(_)
        )
    }
}
