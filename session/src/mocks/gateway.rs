//! Mock identity gateway for testing.

use crate::error::GatewayError;
use crate::gateway::{ErrorCallback, IdentityCallback, IdentityGateway, Unsubscribe};
use crate::identity::Identity;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

type SharedIdentityCallback = Arc<dyn Fn(Option<Identity>) + Send + Sync>;
type SharedErrorCallback = Arc<dyn Fn(GatewayError) + Send + Sync>;

struct Subscriber {
    id: u64,
    on_identity: SharedIdentityCallback,
    on_error: SharedErrorCallback,
}

/// What `subscribe` does when called.
enum SubscribeBehavior {
    Accept,
    Fail(GatewayError),
    Panic(String),
}

struct MockState {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    subscribe: SubscribeBehavior,
    emit_on_subscribe: Option<Option<Identity>>,
    ignore_unsubscribe: bool,
    sign_in_result: Result<Identity, GatewayError>,
    push_on_sign_in: bool,
    sign_in_push_delay: Option<Duration>,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    sign_in_calls: usize,
}

struct Inner {
    available: bool,
    state: Mutex<MockState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_identity(&self, identity: Option<Identity>) {
        let callbacks: Vec<_> = self
            .state()
            .subscribers
            .iter()
            .map(|s| Arc::clone(&s.on_identity))
            .collect();

        for callback in callbacks {
            callback(identity.clone());
        }
    }

    fn push_error(&self, error: GatewayError) {
        let callbacks: Vec<_> = self
            .state()
            .subscribers
            .iter()
            .map(|s| Arc::clone(&s.on_error))
            .collect();

        for callback in callbacks {
            callback(error.clone());
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.state();
        state.unsubscribe_calls += 1;
        if !state.ignore_unsubscribe {
            state.subscribers.retain(|s| s.id != id);
        }
    }
}

/// Mock identity gateway.
///
/// Keeps subscribers in memory and lets tests push identities and errors
/// at will. By default a successful sign-in resolves with `demo-user` and
/// pushes that identity to every subscriber before resolving, like the
/// real provider does.
///
/// Clones share state, so a test can keep one clone and hand another to
/// the session.
#[derive(Clone)]
pub struct MockIdentityGateway {
    inner: Arc<Inner>,
}

impl MockIdentityGateway {
    fn with_availability(available: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                available,
                state: Mutex::new(MockState {
                    subscribers: Vec::new(),
                    next_id: 1,
                    subscribe: SubscribeBehavior::Accept,
                    emit_on_subscribe: None,
                    ignore_unsubscribe: false,
                    sign_in_result: Ok(Identity::new("demo-user")
                        .with_display_name("Demo User")
                        .with_email("demo@foreverfitness.app")),
                    push_on_sign_in: true,
                    sign_in_push_delay: None,
                    subscribe_calls: 0,
                    unsubscribe_calls: 0,
                    sign_in_calls: 0,
                }),
            }),
        }
    }

    /// A configured provider.
    #[must_use]
    pub fn available() -> Self {
        Self::with_availability(true)
    }

    /// A provider whose configuration was missing at startup.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::with_availability(false)
    }

    /// Make `subscribe` fail synchronously.
    #[must_use]
    pub fn with_subscribe_error(self, error: GatewayError) -> Self {
        self.inner.state().subscribe = SubscribeBehavior::Fail(error);
        self
    }

    /// Make `subscribe` panic, like a broken SDK.
    #[must_use]
    pub fn with_subscribe_panic(self, message: impl Into<String>) -> Self {
        self.inner.state().subscribe = SubscribeBehavior::Panic(message.into());
        self
    }

    /// Push `identity` synchronously from inside `subscribe`.
    #[must_use]
    pub fn emit_on_subscribe(self, identity: Option<Identity>) -> Self {
        self.inner.state().emit_on_subscribe = Some(identity);
        self
    }

    /// Keep delivering pushes after unsubscribe, like a misbehaving SDK.
    #[must_use]
    pub fn ignore_unsubscribe(self) -> Self {
        self.inner.state().ignore_unsubscribe = true;
        self
    }

    /// Outcome of the next sign-in flows.
    #[must_use]
    pub fn with_sign_in_result(self, result: Result<Identity, GatewayError>) -> Self {
        self.inner.state().sign_in_result = result;
        self
    }

    /// Push the signed-in identity `delay` after the flow resolves instead
    /// of before.
    #[must_use]
    pub fn with_sign_in_push_delay(self, delay: Duration) -> Self {
        self.inner.state().sign_in_push_delay = Some(delay);
        self
    }

    /// Resolve successful sign-ins without pushing the identity.
    #[must_use]
    pub fn without_sign_in_push(self) -> Self {
        self.inner.state().push_on_sign_in = false;
        self
    }

    /// Push an identity (or `None` for signed out) to every subscriber.
    pub fn push_identity(&self, identity: Option<Identity>) {
        self.inner.push_identity(identity);
    }

    /// Push a listener error to every subscriber.
    pub fn push_error(&self, error: GatewayError) {
        self.inner.push_error(error);
    }

    /// Number of `subscribe` calls.
    #[must_use]
    pub fn subscribe_calls(&self) -> usize {
        self.inner.state().subscribe_calls
    }

    /// Number of released subscriptions.
    #[must_use]
    pub fn unsubscribe_calls(&self) -> usize {
        self.inner.state().unsubscribe_calls
    }

    /// Number of sign-in flows started.
    #[must_use]
    pub fn sign_in_calls(&self) -> usize {
        self.inner.state().sign_in_calls
    }

    /// Number of subscribers currently receiving pushes.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.inner.state().subscribers.len()
    }
}

impl std::fmt::Debug for MockIdentityGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("MockIdentityGateway")
            .field("available", &self.inner.available)
            .field("subscribers", &state.subscribers.len())
            .field("sign_in_calls", &state.sign_in_calls)
            .finish()
    }
}

impl IdentityGateway for MockIdentityGateway {
    fn provider_available(&self) -> bool {
        self.inner.available
    }

    #[allow(clippy::panic)] // Simulates an SDK panic on demand
    fn subscribe(
        &self,
        on_identity: IdentityCallback,
        on_error: ErrorCallback,
    ) -> Result<Unsubscribe, GatewayError> {
        let (id, emit) = {
            let mut state = self.inner.state();
            state.subscribe_calls += 1;

            match &state.subscribe {
                SubscribeBehavior::Accept => {},
                SubscribeBehavior::Fail(error) => return Err(error.clone()),
                SubscribeBehavior::Panic(message) => {
                    let message = message.clone();
                    drop(state);
                    panic!("{message}");
                },
            }

            let id = state.next_id;
            state.next_id += 1;

            let on_identity: SharedIdentityCallback = Arc::from(on_identity);
            state.subscribers.push(Subscriber {
                id,
                on_identity: Arc::clone(&on_identity),
                on_error: Arc::from(on_error),
            });

            (id, state.emit_on_subscribe.clone().map(|identity| (on_identity, identity)))
        };

        if let Some((on_identity, identity)) = emit {
            on_identity(identity);
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Unsubscribe::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.unsubscribe(id);
            }
        }))
    }

    fn begin_sign_in(&self) -> impl Future<Output = Result<Identity, GatewayError>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            let (result, push, delay) = {
                let mut state = inner.state();
                state.sign_in_calls += 1;
                (
                    state.sign_in_result.clone(),
                    state.push_on_sign_in,
                    state.sign_in_push_delay,
                )
            };

            let identity = match result {
                Ok(identity) => identity,
                Err(error) => return Err(error),
            };
            if push {
                match delay {
                    Some(delay) => {
                        let inner = Arc::clone(&inner);
                        let pushed = identity.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            inner.push_identity(Some(pushed));
                        });
                    },
                    None => inner.push_identity(Some(identity.clone())),
                }
            }

            Ok(identity)
        }
    }
}
