//! Session effects.
//!
//! Effects are built by the reducer and executed by the store once the state
//! update is committed. Gateway callbacks are turned into
//! [`SessionAction`]s and fed back through the store's sink, so every push
//! goes through the same update path as local calls.

use crate::actions::SessionAction;
use crate::environment::SubscriptionSlot;
use crate::error::GatewayError;
use crate::gateway::{ErrorCallback, IdentityCallback, IdentityGateway};
use forever_fitness_core::{Effect, Sink};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Open the gateway subscription and keep its token in `slot`.
///
/// Identity and error callbacks become [`SessionAction::IdentityChanged`] and
/// [`SessionAction::ListenerFailed`]. A synchronous failure, including a
/// panic inside the provider SDK, becomes
/// [`SessionAction::SubscriptionSetupFailed`].
pub fn open_subscription<G>(gateway: Arc<G>, slot: SubscriptionSlot) -> Effect<SessionAction>
where
    G: IdentityGateway,
{
    Effect::run(move |sink: Sink<SessionAction>| {
        let on_identity: IdentityCallback = {
            let sink = Arc::clone(&sink);
            Box::new(move |identity| sink.send(SessionAction::IdentityChanged(identity)))
        };
        let on_error: ErrorCallback = {
            let sink = Arc::clone(&sink);
            Box::new(move |error| sink.send(SessionAction::ListenerFailed(error)))
        };

        let result = catch_unwind(AssertUnwindSafe(|| gateway.subscribe(on_identity, on_error)))
            .unwrap_or_else(|payload| Err(GatewayError::sdk_panic(panic_message(&*payload))));

        match result {
            Ok(token) => {
                tracing::debug!("Identity subscription opened");
                slot.occupy(token);
            },
            Err(error) => {
                tracing::warn!(
                    code = %error.code,
                    error = %error.message,
                    "Identity subscription setup failed"
                );
                sink.send(SessionAction::SubscriptionSetupFailed(error));
            },
        }
    })
}

/// Release the gateway subscription held in `slot`, if any.
pub fn release_subscription(slot: SubscriptionSlot) -> Effect<SessionAction> {
    Effect::run(move |_sink| {
        if slot.release() {
            tracing::debug!("Identity subscription released");
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "provider SDK panicked".to_string())
}
