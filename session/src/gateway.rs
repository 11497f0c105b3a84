//! Identity provider boundary.
//!
//! The provider SDK is an external collaborator. The session core only
//! needs three things from it: whether it was configured at startup, a
//! push-based subscription to the current identity, and a way to start a
//! sign-in flow.

use crate::error::GatewayError;
use crate::identity::Identity;
use std::future::Future;

/// Callback receiving the current identity (or `None` when signed out).
pub type IdentityCallback = Box<dyn Fn(Option<Identity>) + Send + Sync>;

/// Callback receiving subscription errors.
pub type ErrorCallback = Box<dyn Fn(GatewayError) + Send + Sync>;

/// Token that cancels a gateway subscription.
///
/// Consumed on release, so a subscription can never be released twice.
pub struct Unsubscribe(Box<dyn FnOnce() + Send>);

impl Unsubscribe {
    /// Wrap the provider's unsubscribe function.
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Cancel the subscription.
    pub fn release(self) {
        (self.0)();
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Unsubscribe(<fn>)")
    }
}

/// Identity provider.
///
/// This trait abstracts over the provider SDK's client-side entry points.
///
/// # Implementation Notes
///
/// - `provider_available` is decided once at process start and never changes
/// - `subscribe` pushes the current identity at least once after subscribing,
///   then on every change; callbacks may fire on any thread, including
///   synchronously inside `subscribe`
/// - After the returned [`Unsubscribe`] is released, no more callbacks fire
pub trait IdentityGateway: Send + Sync + 'static {
    /// Whether the provider finished initialization at startup.
    fn provider_available(&self) -> bool;

    /// Start listening for identity changes.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be registered (missing
    /// configuration, SDK failure).
    fn subscribe(
        &self,
        on_identity: IdentityCallback,
        on_error: ErrorCallback,
    ) -> Result<Unsubscribe, GatewayError>;

    /// Run the provider's interactive sign-in flow.
    ///
    /// # Returns
    ///
    /// The signed-in identity. The provider also pushes it through every
    /// open subscription.
    ///
    /// # Errors
    ///
    /// Returns error if the user cancels or the provider rejects the attempt.
    fn begin_sign_in(&self) -> impl Future<Output = Result<Identity, GatewayError>> + Send;
}
