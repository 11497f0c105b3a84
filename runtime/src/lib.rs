//! # ForeverFitness Runtime
//!
//! Runtime implementation for the ForeverFitness reducer architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution,
//! listener notification and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that owns state and funnels every update through one path
//! - **Listeners**: Synchronous observers of published state, detached through RAII handles
//! - **Effect Executor**: Runs effect descriptions and feeds actions back to the reducer
//!
//! ## Example
//!
//! ```ignore
//! use forever_fitness_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! let handle = store.subscribe(|state| println!("now at version {}", state.version()));
//!
//! // Send an action; listeners have been notified when this returns
//! store.send(Action::DoSomething);
//!
//! // Read state
//! let value = store.state(|s| s.some_field);
//!
//! // Detach the listener
//! handle.release();
//! ```

use forever_fitness_core::{Effect, Reducer, Versioned};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

/// Listener registry and the handles returned by `Store::subscribe`
pub mod listeners;

/// Prometheus metrics for observability
pub mod metrics;

mod update_path;

pub use listeners::ListenerHandle;
pub use store::Store;

// Lock helpers. A panicking listener must not wedge the store, so poisoned
// locks are recovered instead of propagated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Store module - the runtime coordinator
pub mod store {
    use super::listeners::{ListenerHandle, ListenerRegistry};
    use super::update_path::UpdatePath;
    use super::{read, write, Arc, Effect, Reducer, RwLock, Versioned, Weak};
    use forever_fitness_core::{ActionSink, Sink};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind a `RwLock` so readers never see a half-applied action)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. A FIFO queue of pending actions, drained by exactly one thread at a time
    /// 5. Listeners notified synchronously whenever the state version changes
    ///
    /// # Update path
    ///
    /// `send()` enqueues the action and drains the queue. If the sending
    /// thread is already draining (a listener sent an action from inside its
    /// callback, or a collaborator pushed from inside an effect), the action
    /// is processed right after the current one and `send()` returns at once.
    /// A send from any other thread while the queue is being drained blocks
    /// until its action has been reduced, published and its effects run.
    /// Actions are therefore reduced, published and acted upon in exactly
    /// the order they were sent, and nothing is coalesced.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        inner: Arc<Inner<S, A, E, R>>,
    }

    struct Inner<S, A, E, R> {
        state: RwLock<S>,
        reducer: R,
        environment: E,
        updates: UpdatePath<A>,
        listeners: Arc<ListenerRegistry<S>>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        S: Versioned + Clone + Send + Sync + 'static,
        A: Send + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Nothing is reduced until the first `send()`.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                inner: Arc::new(Inner {
                    state: RwLock::new(initial_state),
                    reducer,
                    environment,
                    updates: UpdatePath::new(),
                    listeners: Arc::new(ListenerRegistry::new()),
                }),
            }
        }

        /// Send an action to the store
        ///
        /// 1. Enqueues the action
        /// 2. Reduces queued actions one by one (write lock held only while reducing)
        /// 3. Publishes the new state to listeners if its version changed
        /// 4. Executes the returned effects
        ///
        /// When called from inside a listener or an effect, the action is
        /// queued and processed before the outermost `send()` returns. When
        /// another thread is draining, blocks until the action is processed.
        /// Waiting on that thread from inside a listener therefore deadlocks.
        #[tracing::instrument(skip_all, name = "store_send")]
        pub fn send(&self, action: A) {
            self.inner.enqueue(action);
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let loading = store.state(|s| s.loading);
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = read(&self.inner.state);
            f(&state)
        }

        /// Clone the current state
        #[must_use]
        pub fn snapshot(&self) -> S {
            self.state(Clone::clone)
        }

        /// Register a listener for published state
        ///
        /// The listener is invoked synchronously, in registration order, each
        /// time an action changes the state version. It is not invoked for the
        /// state current at registration time.
        ///
        /// The returned handle detaches the listener when released or dropped.
        /// Once detached, the listener is never invoked again.
        pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
        where
            F: Fn(&S) + Send + Sync + 'static,
        {
            self.inner.listeners.insert(Box::new(listener))
        }

        /// Number of attached listeners
        #[must_use]
        pub fn listener_count(&self) -> usize {
            self.inner.listeners.len()
        }

        /// A sink that feeds actions into this store
        ///
        /// The sink holds a weak reference: once every `Store` clone is
        /// dropped, actions sent through it are discarded.
        #[must_use]
        pub fn sink(&self) -> Sink<A> {
            self.inner.sink()
        }

        /// Injected dependencies
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.inner.environment
        }
    }

    impl<S, A, E, R> Inner<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        S: Versioned + Clone + Send + Sync + 'static,
        A: Send + 'static,
        E: Send + Sync + 'static,
    {
        fn enqueue(self: &Arc<Self>, action: A) {
            if let Some(mut drainer) = self.updates.submit(action) {
                while let Some(action) = drainer.take_next() {
                    self.process(action);
                }
            }
        }

        fn process(self: &Arc<Self>, action: A) {
            metrics::counter!("store.actions.total").increment(1);

            let (effects, published) = {
                let mut state = write(&self.state);
                let before = state.version();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                let published = (state.version() != before).then(|| state.clone());
                (effects, published)
            };

            if let Some(state) = published {
                tracing::trace!(version = state.version(), "Publishing state");
                self.listeners.notify(&state);
            }

            for effect in effects {
                self.execute(effect);
            }
        }

        fn execute(self: &Arc<Self>, effect: Effect<A>) {
            match effect {
                Effect::None => {},
                Effect::Run(run) => {
                    metrics::counter!("store.effects.executed").increment(1);
                    run(self.sink());
                },
            }
        }

        fn sink(self: &Arc<Self>) -> Sink<A> {
            Arc::new(Dispatcher {
                inner: Arc::downgrade(self),
            })
        }
    }

    /// Weak feedback channel handed to effects
    struct Dispatcher<S, A, E, R> {
        inner: Weak<Inner<S, A, E, R>>,
    }

    impl<S, A, E, R> ActionSink<A> for Dispatcher<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        S: Versioned + Clone + Send + Sync + 'static,
        A: Send + 'static,
        E: Send + Sync + 'static,
    {
        fn send(&self, action: A) {
            match self.inner.upgrade() {
                Some(inner) => inner.enqueue(action),
                None => tracing::trace!("Store dropped, discarding action"),
            }
        }
    }
}
