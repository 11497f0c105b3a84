//! # ForeverFitness Testing
//!
//! Testing utilities and helpers for the ForeverFitness reducer architecture.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A Given-When-Then harness for reducers
//! - Recorders that capture every state a store publishes
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use forever_fitness_testing::SnapshotRecorder;
//!
//! #[test]
//! fn publishes_each_toggle() {
//!     let gateway = MockIdentityGateway::unavailable();
//!     let session = SessionStore::new(gateway, SessionConfig::default());
//!     let recorder = SnapshotRecorder::attach(|listener| session.subscribe(listener));
//!
//!     session.set_demo_mode(true);
//!     session.set_demo_mode(false);
//!
//!     assert_eq!(recorder.len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use forever_fitness_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use forever_fitness_testing::mocks::FixedClock;
    /// use forever_fitness_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    use forever_fitness_runtime::ListenerHandle;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Boxed listener handed to a `subscribe` function
    pub type BoxedListener<S> = Box<dyn Fn(&S) + Send + Sync>;

    /// Records every state published to a listener
    ///
    /// The recorder stays attached until it is dropped or [`detach`](Self::detach)ed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let recorder = SnapshotRecorder::attach(|listener| session.subscribe(listener));
    /// session.set_demo_mode(true);
    /// assert!(recorder.last().unwrap().demo_mode);
    /// ```
    pub struct SnapshotRecorder<S> {
        seen: Arc<Mutex<Vec<S>>>,
        handle: Option<ListenerHandle>,
    }

    impl<S> SnapshotRecorder<S>
    where
        S: Clone + Send + 'static,
    {
        /// Attach through any `subscribe`-shaped function
        pub fn attach<F>(subscribe: F) -> Self
        where
            F: FnOnce(BoxedListener<S>) -> ListenerHandle,
        {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            let handle = subscribe(Box::new(move |state: &S| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(state.clone());
            }));

            Self {
                seen,
                handle: Some(handle),
            }
        }

        /// Every state recorded so far, oldest first
        #[must_use]
        pub fn recorded(&self) -> Vec<S> {
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// The most recent state, if any
        #[must_use]
        pub fn last(&self) -> Option<S> {
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .last()
                .cloned()
        }

        /// Number of recorded states
        #[must_use]
        pub fn len(&self) -> usize {
            self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Whether nothing was recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Stop recording; already recorded states are kept
        pub fn detach(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.release();
            }
        }
    }

    /// Install a test-friendly tracing subscriber
    ///
    /// Honors `RUST_LOG`. Installing twice is a no-op, so every test may call it.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::{init_test_tracing, SnapshotRecorder};
pub use mocks::{test_clock, FixedClock};
pub use reducer_test::{assertions, ReducerTest};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
