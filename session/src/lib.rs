//! # ForeverFitness Session
//!
//! The session synchronization core of the ForeverFitness client shell.
//!
//! An external identity provider pushes "who is signed in" asynchronously.
//! This crate folds those pushes into one observable [`SessionSnapshot`],
//! degrades to an unauthenticated state when the provider is missing or
//! broken, and offers a local demo-mode override.
//!
//! ## Architecture
//!
//! The session is a reducer driven by the runtime [`Store`](forever_fitness_runtime::Store):
//!
//! ```text
//! Gateway push / local call → SessionAction → SessionReducer → (SessionState, Effects)
//!                                                   │                      │
//!                                        listeners notified     subscription opened/released
//! ```
//!
//! Computing the snapshot is pure ([`reducer`]); reacting to it (redirects,
//! record loading) happens in listeners and [`reactions`], never while
//! reading state.
//!
//! ## Example
//!
//! ```rust,ignore
//! use forever_fitness_session::*;
//!
//! let session = SessionStore::new(gateway, SessionConfig::default());
//! let _redirect = reactions::on_signed_in(&session, |identity| {
//!     router.push("/dashboard");
//! });
//!
//! session.initialize();
//!
//! match session.snapshot().gate() {
//!     Gate::Pending => render_spinner(),
//!     Gate::SignedIn(identity) => render_dashboard(identity),
//!     Gate::SignedOut => render_login(),
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod effects;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod reactions;
pub mod reducer;
pub mod sign_in;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::SessionAction;
pub use config::{ConfigError, ProviderConfig, SessionConfig};
pub use environment::SessionEnvironment;
pub use error::{GatewayError, Result, SessionError};
pub use gateway::{IdentityGateway, Unsubscribe};
pub use identity::{Identity, RecordScope, UserId};
pub use reducer::SessionReducer;
pub use state::{Diagnostic, Gate, SessionPhase, SessionSnapshot, SessionState};
pub use store::SessionStore;
