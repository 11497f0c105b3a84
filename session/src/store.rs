//! The long-lived session handle.

use crate::actions::SessionAction;
use crate::config::SessionConfig;
use crate::environment::SessionEnvironment;
use crate::gateway::IdentityGateway;
use crate::reducer::SessionReducer;
use crate::state::{SessionPhase, SessionSnapshot, SessionState};
use forever_fitness_core::environment::{Clock, SystemClock};
use forever_fitness_runtime::{ListenerHandle, Store};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::watch;

type Runtime<G, C> =
    Store<SessionState, SessionAction, SessionEnvironment<G, C>, SessionReducer<G, C>>;

/// One session per process (or per tab).
///
/// Owns the gateway subscription and the current [`SessionSnapshot`].
/// Consumers receive the store as an explicit handle; there is no global
/// instance.
///
/// Every method is synchronous except [`begin_sign_in`](Self::begin_sign_in).
/// Dropping the store tears it down.
///
/// # Examples
///
/// ```
/// # use forever_fitness_session::{SessionConfig, SessionStore};
/// # use forever_fitness_session::mocks::MockIdentityGateway;
/// let session = SessionStore::new(MockIdentityGateway::unavailable(), SessionConfig::default());
/// session.initialize();
///
/// let snapshot = session.snapshot();
/// assert!(!snapshot.loading);
/// assert!(!snapshot.provider_available);
/// ```
pub struct SessionStore<G, C = SystemClock>
where
    G: IdentityGateway,
    C: Clock + 'static,
{
    store: Runtime<G, C>,
    config: SessionConfig,
    /// Flipped to `true` once teardown returns; wakes pending sign-ins
    pub(crate) closed: watch::Sender<bool>,
    pub(crate) sign_in_active: AtomicBool,
}

impl<G> SessionStore<G>
where
    G: IdentityGateway,
{
    /// Create a session backed by the system clock.
    ///
    /// Nothing is subscribed until [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(gateway: G, config: SessionConfig) -> Self {
        Self::with_clock(gateway, SystemClock, config)
    }
}

impl<G, C> SessionStore<G, C>
where
    G: IdentityGateway,
    C: Clock + 'static,
{
    /// Create a session with an explicit clock.
    #[must_use]
    pub fn with_clock(gateway: G, clock: C, config: SessionConfig) -> Self {
        let gateway = Arc::new(gateway);
        let state = SessionState::new(gateway.provider_available());

        Self {
            store: Store::new(
                state,
                SessionReducer::new(),
                SessionEnvironment::new(gateway, clock),
            ),
            config,
            closed: watch::Sender::new(false),
            sign_in_active: AtomicBool::new(false),
        }
    }

    /// Check provider availability and subscribe to identity changes.
    ///
    /// Idempotent. Never fails: setup problems land in the snapshot's
    /// `error` field.
    pub fn initialize(&self) {
        self.store.send(SessionAction::Initialize);
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.state(|state| state.snapshot.clone())
    }

    /// Current state machine position.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.store.state(|state| state.phase)
    }

    /// Version of the current snapshot. Bumped on every published change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.store.state(|state| state.version)
    }

    /// Returns `true` once [`teardown`](Self::teardown) ran.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.store.state(|state| state.torn_down)
    }

    /// Observe snapshot changes.
    ///
    /// `listener` runs synchronously on every change (identity push, error,
    /// demo toggle), in delivery order. It is not called with the snapshot
    /// current at registration time; read [`snapshot`](Self::snapshot) for
    /// that. Release or drop the handle to stop listening.
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        self.store
            .subscribe(move |state: &SessionState| listener(&state.snapshot))
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.store.listener_count()
    }

    /// Toggle the demo-mode override.
    ///
    /// Listeners are notified before this returns. Identity and error are
    /// left untouched and the gateway is never contacted.
    pub fn set_demo_mode(&self, enabled: bool) {
        self.store.send(SessionAction::SetDemoMode(enabled));
    }

    /// Release the gateway subscription.
    ///
    /// Safe to call repeatedly and before [`initialize`](Self::initialize).
    /// The last snapshot is retained; later pushes are ignored. Once this
    /// returns no listener runs for a gateway push, even one delivered
    /// concurrently on another thread, and a pending
    /// [`begin_sign_in`](Self::begin_sign_in) fails with
    /// [`NotListening`](crate::SessionError::NotListening).
    pub fn teardown(&self) {
        self.store.send(SessionAction::Teardown);
        self.closed.send_replace(true);
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The identity provider.
    #[must_use]
    pub fn gateway(&self) -> &Arc<G> {
        &self.store.environment().gateway
    }
}

impl<G, C> Drop for SessionStore<G, C>
where
    G: IdentityGateway,
    C: Clock + 'static,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<G, C> std::fmt::Debug for SessionStore<G, C>
where
    G: IdentityGateway,
    C: Clock + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.store.state(|state| {
            f.debug_struct("SessionStore")
                .field("phase", &state.phase)
                .field("version", &state.version)
                .field("torn_down", &state.torn_down)
                .field("listeners", &self.store.listener_count())
                .finish()
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::identity::Identity;
    use crate::mocks::MockIdentityGateway;
    use forever_fitness_testing::SnapshotRecorder;

    #[test]
    fn drop_releases_the_subscription() {
        let gateway = MockIdentityGateway::available();
        let session = SessionStore::new(gateway.clone(), SessionConfig::default());
        session.initialize();
        assert_eq!(gateway.active_subscriptions(), 1);

        drop(session);

        assert_eq!(gateway.active_subscriptions(), 0);
    }

    #[test]
    fn listeners_receive_the_snapshot_not_the_state() {
        let gateway = MockIdentityGateway::available();
        let session = SessionStore::new(gateway.clone(), SessionConfig::default());
        let recorder =
            SnapshotRecorder::<SessionSnapshot>::attach(|listener| session.subscribe(listener));

        session.initialize();
        gateway.push_identity(Some(Identity::new("u1")));

        let last = recorder.last().unwrap();
        assert_eq!(last.identity, Some(Identity::new("u1")));
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert_eq!(session.version(), 1);
    }

    #[test]
    fn debug_output_shows_phase() {
        let session =
            SessionStore::new(MockIdentityGateway::unavailable(), SessionConfig::default());
        session.initialize();
        assert!(format!("{session:?}").contains("Unavailable"));
    }
}
