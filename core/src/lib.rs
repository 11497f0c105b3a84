//! # ForeverFitness Core
//!
//! Core traits and types for the reducer architecture that drives the
//! ForeverFitness client shell.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature, versioned so observers know when it changed
//! - **Action**: All possible inputs to a reducer (local commands and pushed notifications)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```ignore
//! use forever_fitness_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct ToggleState {
//!     on: bool,
//!     version: u64,
//! }
//!
//! impl Versioned for ToggleState {
//!     fn version(&self) -> u64 {
//!         self.version
//!     }
//! }
//!
//! impl Reducer for ToggleReducer {
//!     type State = ToggleState;
//!     type Action = ToggleAction;
//!     type Environment = ToggleEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ToggleState,
//!         action: ToggleAction,
//!         env: &ToggleEnvironment,
//!     ) -> SmallVec<[Effect<ToggleAction>; 4]> {
//!         state.on = !state.on;
//!         state.version += 1;
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

pub use effect::{ActionSink, Effect, Sink};
pub use reducer::Reducer;
pub use state::Versioned;

/// State module - Domain state requirements
///
/// State represents the current domain state of a feature.
/// It should be owned data, Clone-able, and avoid lifetimes where possible.
pub mod state {
    /// Versioned state
    ///
    /// Every change that observers should see bumps the version. The runtime
    /// compares versions before and after a reduction and only publishes the
    /// state when they differ, so internal bookkeeping (for example a
    /// "torn down" flag) can change without waking observers.
    ///
    /// Versions must never decrease.
    pub trait Versioned {
        /// Current version of the state
        fn version(&self) -> u64;
    }
}

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime. Most reducers return at
        /// most a handful, hence the inline capacity of 4.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values, returned from reducers and executed after the state
/// update has been committed.
pub mod effect {
    use std::sync::Arc;

    /// Feedback channel from an effect back into the store
    ///
    /// Effects that talk to push-based collaborators (subscriptions,
    /// callbacks) hold on to a sink and send actions whenever the
    /// collaborator reports something. Sending never blocks on the
    /// reducer: actions are queued on the store's single update path.
    pub trait ActionSink<Action>: Send + Sync {
        /// Queue an action for reduction
        fn send(&self, action: Action);
    }

    /// Shared handle to an [`ActionSink`]
    pub type Sink<Action> = Arc<dyn ActionSink<Action>>;

    /// Synchronous effect body
    pub type RunFn<Action> = Box<dyn FnOnce(Sink<Action>) + Send>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run a closure once the state update is committed
        ///
        /// The closure receives a [`Sink`] it may keep (for example inside
        /// a subscription callback) to feed actions back into the store.
        Run(RunFn<Action>),
    }

    // Manual Debug implementation since closures don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Run(_) => write!(f, "Effect::Run(<closure>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Build a [`Effect::Run`] from a closure
        #[must_use]
        pub fn run<F>(f: F) -> Self
        where
            F: FnOnce(Sink<Action>) + Send + 'static,
        {
            Effect::Run(Box::new(f))
        }

        /// Whether this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
