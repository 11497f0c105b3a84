//! Reactions to session transitions.
//!
//! Computing a snapshot never performs side effects. Redirects and record
//! loading hang off explicit reactions that fire when the session enters a
//! signed-in state.

use crate::gateway::IdentityGateway;
use crate::identity::{Identity, UserId};
use crate::state::SessionSnapshot;
use crate::store::SessionStore;
use forever_fitness_core::environment::Clock;
use forever_fitness_runtime::ListenerHandle;
use std::sync::{Arc, Mutex, PoisonError};

/// Detects transitions into a signed-in state.
///
/// Fires once when a snapshot carries an identity after one that did not,
/// and again when the signed-in uid changes. Repeated pushes of the same
/// identity do not fire.
pub struct SignedInEdge<F> {
    signed_in_as: Mutex<Option<UserId>>,
    reaction: F,
}

impl<F> SignedInEdge<F>
where
    F: Fn(&Identity),
{
    /// Wrap a reaction.
    #[must_use]
    pub const fn new(reaction: F) -> Self {
        Self {
            signed_in_as: Mutex::new(None),
            reaction,
        }
    }

    /// Feed the next snapshot.
    ///
    /// Returns `true` if the reaction fired.
    pub fn observe(&self, snapshot: &SessionSnapshot) -> bool {
        let entered = {
            let mut signed_in_as = self
                .signed_in_as
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match &snapshot.identity {
                Some(identity) if signed_in_as.as_ref() != Some(&identity.uid) => {
                    *signed_in_as = Some(identity.uid.clone());
                    Some(identity)
                },
                Some(_) => None,
                None => {
                    *signed_in_as = None;
                    None
                },
            }
        };

        // Outside the lock: the reaction may call back into the session.
        match entered {
            Some(identity) => {
                tracing::debug!(uid = %identity.uid, "Entered signed-in state");
                (self.reaction)(identity);
                true
            },
            None => false,
        }
    }
}

/// Run `reaction` each time the session enters a signed-in state.
///
/// If the session is already signed in when the reaction is attached, it
/// fires immediately for the current identity. Release or drop the handle
/// to stop reacting.
///
/// # Examples
///
/// ```
/// # use forever_fitness_session::{reactions, Identity, SessionConfig, SessionStore};
/// # use forever_fitness_session::mocks::MockIdentityGateway;
/// # use std::sync::{Arc, Mutex};
/// let gateway = MockIdentityGateway::available();
/// let session = SessionStore::new(gateway.clone(), SessionConfig::default());
/// let redirects = Arc::new(Mutex::new(Vec::new()));
///
/// let log = Arc::clone(&redirects);
/// let _redirect = reactions::on_signed_in(&session, move |identity| {
///     log.lock().unwrap().push(format!("/dashboard?uid={}", identity.uid));
/// });
///
/// session.initialize();
/// gateway.push_identity(Some(Identity::new("u1")));
/// gateway.push_identity(Some(Identity::new("u1")));
///
/// assert_eq!(*redirects.lock().unwrap(), vec!["/dashboard?uid=u1".to_string()]);
/// ```
pub fn on_signed_in<G, C, F>(session: &SessionStore<G, C>, reaction: F) -> ListenerHandle
where
    G: IdentityGateway,
    C: Clock + 'static,
    F: Fn(&Identity) + Send + Sync + 'static,
{
    let edge = Arc::new(SignedInEdge::new(reaction));

    let handle = {
        let edge = Arc::clone(&edge);
        session.subscribe(move |snapshot| {
            edge.observe(snapshot);
        })
    };
    edge.observe(&session.snapshot());

    handle
}
