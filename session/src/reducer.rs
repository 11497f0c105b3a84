//! Session reducer.
//!
//! Folds local lifecycle calls and gateway pushes into [`SessionState`].
//! The reducer is the only place the snapshot is written; every visible
//! change bumps the state version so the store notifies listeners.

use crate::actions::SessionAction;
use crate::effects::{open_subscription, release_subscription};
use crate::environment::SessionEnvironment;
use crate::error::{GatewayError, SessionError};
use crate::gateway::IdentityGateway;
use crate::identity::Identity;
use crate::state::{SessionPhase, SessionState};
use forever_fitness_core::environment::Clock;
use forever_fitness_core::{smallvec, Effect, Reducer, SmallVec};
use std::marker::PhantomData;

/// Session reducer.
///
/// # Type Parameters
///
/// - `G`: Identity gateway
/// - `C`: Clock
pub struct SessionReducer<G, C> {
    _phantom: PhantomData<fn() -> (G, C)>,
}

impl<G, C> SessionReducer<G, C> {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<G, C> Default for SessionReducer<G, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, C> Clone for SessionReducer<G, C> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<G, C> std::fmt::Debug for SessionReducer<G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionReducer")
    }
}

impl<G, C> SessionReducer<G, C>
where
    G: IdentityGateway,
    C: Clock + 'static,
{
    fn initialize(
        state: &mut SessionState,
        env: &SessionEnvironment<G, C>,
    ) -> SmallVec<[Effect<SessionAction>; 4]> {
        if state.torn_down || state.phase != SessionPhase::Uninitialized {
            tracing::debug!(
                phase = %state.phase,
                torn_down = state.torn_down,
                "Initialize ignored"
            );
            return smallvec![Effect::None];
        }

        if !env.gateway.provider_available() {
            tracing::info!("Identity provider unavailable, session settles signed out");
            state.phase = SessionPhase::Unavailable;
            state.snapshot.identity = None;
            state.snapshot.error = None;
            state.snapshot.loading = false;
            state.snapshot.provider_available = false;
            state.snapshot.demo_mode = false;
            state.publish();
            return smallvec![Effect::None];
        }

        tracing::info!("Subscribing to identity changes");
        state.phase = SessionPhase::Connecting;
        state.snapshot.provider_available = true;

        smallvec![open_subscription(
            std::sync::Arc::clone(&env.gateway),
            env.subscription.clone(),
        )]
    }

    fn identity_changed(state: &mut SessionState, identity: Option<Identity>) {
        match state.phase {
            SessionPhase::Connecting | SessionPhase::Ready => {
                state.phase = SessionPhase::Ready;
                state.snapshot.error = None;
            },
            // A push does not clear a reported failure
            SessionPhase::Failed => {},
            SessionPhase::Uninitialized | SessionPhase::Unavailable => {
                tracing::warn!(phase = %state.phase, "Identity push without subscription ignored");
                return;
            },
        }

        tracing::debug!(
            uid = identity.as_ref().map(|i| i.uid.as_str()),
            phase = %state.phase,
            "Identity changed"
        );
        state.snapshot.identity = identity;
        state.snapshot.loading = false;
        state.publish();
    }

    fn failed(state: &mut SessionState, error: SessionError) {
        if !state.phase.is_listening() {
            tracing::warn!(phase = %state.phase, "Gateway error without subscription ignored");
            return;
        }

        state.phase = SessionPhase::Failed;
        state.snapshot.loading = false;
        state.snapshot.error = Some(error);
        state.publish();
    }

    fn listener_failed(
        state: &mut SessionState,
        error: GatewayError,
        env: &SessionEnvironment<G, C>,
    ) {
        tracing::warn!(code = %error.code, error = %error.message, "Identity listener failed");
        metrics::counter!("session.listener_failures").increment(1);

        Self::failed(
            state,
            SessionError::ListenerFailure {
                source: error,
                occurred_at: env.clock.now(),
            },
        );
    }

    fn setup_failed(state: &mut SessionState, error: GatewayError, env: &SessionEnvironment<G, C>) {
        metrics::counter!("session.subscription_setup_failures").increment(1);

        Self::failed(
            state,
            SessionError::SubscriptionSetup {
                source: error,
                occurred_at: env.clock.now(),
            },
        );
    }
}

impl<G, C> Reducer for SessionReducer<G, C>
where
    G: IdentityGateway,
    C: Clock + 'static,
{
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment<G, C>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if state.torn_down && action.is_push() {
            tracing::trace!("Push after teardown dropped");
            return smallvec![Effect::None];
        }

        match action {
            SessionAction::Initialize => Self::initialize(state, env),

            SessionAction::IdentityChanged(identity) => {
                Self::identity_changed(state, identity);
                smallvec![Effect::None]
            },

            SessionAction::ListenerFailed(error) => {
                Self::listener_failed(state, error, env);
                smallvec![Effect::None]
            },

            SessionAction::SubscriptionSetupFailed(error) => {
                Self::setup_failed(state, error, env);
                smallvec![Effect::None]
            },

            SessionAction::SetDemoMode(enabled) => {
                tracing::debug!(enabled, "Demo mode set");
                state.snapshot.demo_mode = enabled;
                state.publish();
                smallvec![Effect::None]
            },

            SessionAction::Teardown => {
                if state.torn_down {
                    return smallvec![Effect::None];
                }

                tracing::info!(phase = %state.phase, "Session torn down");
                state.torn_down = true;
                smallvec![release_subscription(env.subscription.clone())]
            },
        }
    }
}
