//! Session environment.
//!
//! This module defines the environment type for dependency injection
//! in the session reducer.

use crate::gateway::{IdentityGateway, Unsubscribe};
use forever_fitness_core::environment::Clock;
use std::sync::{Arc, Mutex, PoisonError};

/// Session environment.
///
/// Contains all external dependencies needed by the session reducer.
///
/// # Type Parameters
///
/// - `G`: Identity gateway
/// - `C`: Clock (timestamps for stored errors)
pub struct SessionEnvironment<G, C>
where
    G: IdentityGateway,
    C: Clock,
{
    /// Identity provider.
    pub gateway: Arc<G>,

    /// Time source.
    pub clock: C,

    /// The open gateway subscription, if any.
    pub subscription: SubscriptionSlot,
}

impl<G, C> SessionEnvironment<G, C>
where
    G: IdentityGateway,
    C: Clock,
{
    /// Create a new environment with no open subscription.
    #[must_use]
    pub fn new(gateway: Arc<G>, clock: C) -> Self {
        Self {
            gateway,
            clock,
            subscription: SubscriptionSlot::default(),
        }
    }
}

/// Exclusive owner of the gateway's unsubscribe token.
///
/// The token is moved out on release, so a subscription is released at most
/// once no matter how many times teardown runs.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSlot(Arc<Mutex<Option<Unsubscribe>>>);

impl SubscriptionSlot {
    /// Store the token of a freshly opened subscription.
    ///
    /// A token already held is released first.
    pub fn occupy(&self, token: Unsubscribe) {
        let previous = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token);

        if let Some(previous) = previous {
            tracing::warn!("Replacing an open identity subscription");
            previous.release();
        }
    }

    /// Release the held subscription.
    ///
    /// Returns `true` if a subscription was open.
    pub fn release(&self) -> bool {
        // Taken under the lock, released outside it: the provider may call
        // back into the store while unsubscribing.
        let token = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();

        match token {
            Some(token) => {
                token.release();
                true
            },
            None => false,
        }
    }

    /// Returns `true` while a subscription is held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
