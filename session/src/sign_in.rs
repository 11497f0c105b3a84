//! User-initiated sign-in.
//!
//! The provider resolves its sign-in flow and, separately, pushes the new
//! identity through the open subscription. A sign-in only counts once the
//! store reflects the pushed identity, so every view observing the session
//! agrees with the caller.

use crate::error::{Result, SessionError};
use crate::gateway::IdentityGateway;
use crate::identity::Identity;
use crate::state::SessionSnapshot;
use crate::store::SessionStore;
use forever_fitness_core::environment::Clock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};

/// Marks a sign-in as running; cleared on completion or cancellation.
struct InProgress<'a>(&'a AtomicBool);

impl<'a> InProgress<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self(flag))
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn torn_down(closed: &mut watch::Receiver<bool>) {
    // The sender lives as long as the session, which outlives the borrow.
    let _ = closed.wait_for(|closed| *closed).await;
}

impl<G, C> SessionStore<G, C>
where
    G: IdentityGateway,
    C: Clock + 'static,
{
    /// Run the provider's sign-in flow and wait for the session to reflect it.
    ///
    /// # Returns
    ///
    /// The signed-in identity as published by the session.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ProviderUnavailable`]: the provider was not configured;
    ///   the gateway is not contacted
    /// - [`SessionError::SignInBlocked`]: the snapshot carries a provider error
    ///   and [`block_sign_in_on_error`](crate::SessionConfig::block_sign_in_on_error) is set
    /// - [`SessionError::NotListening`]: the session was never initialized or
    ///   is torn down, including a teardown while this call is pending
    /// - [`SessionError::SignInInProgress`]: an earlier call has not finished
    /// - [`SessionError::SignInRejected`]: the provider failed or the user
    ///   cancelled; nothing is stored in the snapshot
    /// - [`SessionError::SignInUnconfirmed`]: the provider resolved but never
    ///   pushed the identity within the configured timeout
    #[tracing::instrument(skip_all, name = "begin_sign_in")]
    pub async fn begin_sign_in(&self) -> Result<Identity> {
        self.snapshot()
            .check_sign_in(self.config())
            .inspect_err(|error| tracing::warn!(error = %error, "Sign-in refused"))?;

        let mut closed = self.closed.subscribe();
        let closed_already = *closed.borrow();
        if closed_already || self.is_torn_down() || !self.phase().is_listening() {
            tracing::warn!(phase = %self.phase(), "Sign-in refused, session is not listening");
            return Err(SessionError::NotListening);
        }

        let Some(_in_progress) = InProgress::claim(&self.sign_in_active) else {
            tracing::warn!("Sign-in refused, another one is in progress");
            return Err(SessionError::SignInInProgress);
        };

        // The push may arrive before the flow resolves.
        let (tx, mut pushes) = mpsc::unbounded_channel();
        let _confirmation = self.subscribe(move |snapshot: &SessionSnapshot| {
            if let Some(identity) = &snapshot.identity {
                let _ = tx.send(identity.clone());
            }
        });

        metrics::counter!("session.sign_in.attempts").increment(1);
        let flow = tokio::select! {
            result = self.gateway().begin_sign_in() => result,
            () = torn_down(&mut closed) => return Err(Self::abandoned()),
        };
        let expected = match flow {
            Ok(identity) => identity,
            Err(error) => {
                metrics::counter!("session.sign_in.rejected").increment(1);
                if error.is_cancellation() {
                    tracing::info!(code = %error.code, "Sign-in cancelled by user");
                } else {
                    tracing::warn!(code = %error.code, error = %error.message, "Sign-in rejected");
                }
                return Err(SessionError::SignInRejected(error));
            },
        };

        if let Some(current) = self.snapshot().identity.filter(|i| i.uid == expected.uid) {
            tracing::info!(uid = %current.uid, "Signed in");
            return Ok(current);
        }

        let timeout = self.config().sign_in_confirmation_timeout;
        let confirmed = tokio::time::timeout(timeout, async {
            loop {
                tokio::select! {
                    pushed = pushes.recv() => match pushed {
                        Some(identity) if identity.uid == expected.uid => return Ok(identity),
                        Some(_) => {},
                        None => return Err(()),
                    },
                    () = torn_down(&mut closed) => return Err(()),
                }
            }
        })
        .await;

        match confirmed {
            Ok(Ok(identity)) => {
                tracing::info!(uid = %identity.uid, "Signed in");
                Ok(identity)
            },
            Ok(Err(())) => Err(Self::abandoned()),
            Err(_) => {
                metrics::counter!("session.sign_in.rejected").increment(1);
                tracing::warn!(
                    uid = %expected.uid,
                    ?timeout,
                    "Sign-in not confirmed by identity push"
                );
                Err(SessionError::SignInUnconfirmed(timeout))
            },
        }
    }

    fn abandoned() -> SessionError {
        metrics::counter!("session.sign_in.rejected").increment(1);
        tracing::info!("Sign-in abandoned, session torn down");
        SessionError::NotListening
    }
}
