//! Synchronous listeners for published store state.

use super::lock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, ThreadId};

type Callback<S> = Box<dyn Fn(&S) + Send + Sync>;

struct Slot<S> {
    id: u64,
    active: AtomicBool,
    /// Held across the active check and the callback
    gate: Mutex<()>,
    invoker: Mutex<Option<ThreadId>>,
    callback: Callback<S>,
}

impl<S> Slot<S> {
    fn invoke(&self, state: &S) -> bool {
        let _gate = lock(&self.gate);
        if !self.active.load(Ordering::Acquire) {
            return false;
        }

        *lock(&self.invoker) = Some(thread::current().id());
        let _invoking = Invoking(&self.invoker);
        (self.callback)(state);
        true
    }

    /// Stop future invocations and wait out one running on another thread.
    ///
    /// A listener releasing its own handle from inside its callback does not
    /// wait for itself.
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);

        let invoked_here = *lock(&self.invoker) == Some(thread::current().id());
        if !invoked_here {
            drop(lock(&self.gate));
        }
    }
}

/// Clears the recorded invoker, also when the callback panics
struct Invoking<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for Invoking<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

/// Ordered set of listeners attached to one store
pub(crate) struct ListenerRegistry<S> {
    next_id: AtomicU64,
    slots: Mutex<Vec<Arc<Slot<S>>>>,
}

impl<S: 'static> ListenerRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn insert(self: &Arc<Self>, callback: Callback<S>) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.slots).push(Arc::new(Slot {
            id,
            active: AtomicBool::new(true),
            gate: Mutex::new(()),
            invoker: Mutex::new(None),
            callback,
        }));
        tracing::trace!(listener_id = id, "Listener attached");

        let weak: Weak<Self> = Arc::downgrade(self);
        let registry: Weak<dyn Detach> = weak;
        ListenerHandle {
            id,
            registry: Some(registry),
        }
    }

    /// Invoke every active listener with `state`
    ///
    /// The slot list is copied before invoking so callbacks may attach or
    /// detach listeners. A slot detached mid-iteration is skipped.
    pub(crate) fn notify(&self, state: &S) {
        let slots = lock(&self.slots).clone();
        for slot in slots {
            if slot.invoke(state) {
                metrics::counter!("store.listeners.notified").increment(1);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.slots).len()
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<S: 'static> Detach for ListenerRegistry<S> {
    fn detach(&self, id: u64) {
        let removed = {
            let mut slots = lock(&self.slots);
            slots
                .iter()
                .position(|slot| slot.id == id)
                .map(|position| slots.remove(position))
        };

        if let Some(slot) = removed {
            slot.deactivate();
            tracing::trace!(listener_id = id, "Listener detached");
        }
    }
}

/// Scoped registration of a store listener
///
/// Dropping the handle detaches the listener, as does [`ListenerHandle::release`].
/// Releasing twice is impossible by construction; a handle whose store is
/// already gone releases as a no-op.
#[must_use = "dropping the handle detaches the listener immediately"]
pub struct ListenerHandle {
    id: u64,
    registry: Option<Weak<dyn Detach>>,
}

impl ListenerHandle {
    /// Identifier of the listener, unique within its store
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Detach the listener now
    ///
    /// After this returns the listener is never invoked again. If another
    /// thread is running the listener at that moment, this waits for it to
    /// finish.
    pub fn release(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.id);
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn listener_may_release_its_own_handle() {
        let registry = Arc::new(ListenerRegistry::<u32>::new());
        let own: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = {
            let own = Arc::clone(&own);
            let calls = Arc::clone(&calls);
            registry.insert(Box::new(move |_: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(handle) = own.lock().unwrap().take() {
                    handle.release();
                }
            }))
        };
        *own.lock().unwrap() = Some(handle);

        registry.notify(&1);
        registry.notify(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn release_waits_for_an_invocation_on_another_thread() {
        let registry = Arc::new(ListenerRegistry::<u32>::new());
        let (entered_tx, entered) = mpsc::channel();
        let (gate_tx, gate) = mpsc::channel::<()>();
        let gate = Mutex::new(gate);
        let finished = Arc::new(AtomicBool::new(false));

        let handle = {
            let finished = Arc::clone(&finished);
            registry.insert(Box::new(move |_: &u32| {
                entered_tx.send(()).unwrap();
                gate.lock().unwrap().recv_timeout(Duration::from_secs(5)).unwrap();
                finished.store(true, Ordering::SeqCst);
            }))
        };

        let notifier = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.notify(&1))
        };
        entered.recv_timeout(Duration::from_secs(5)).unwrap();

        let opener = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            gate_tx.send(()).unwrap();
        });
        handle.release();

        assert!(finished.load(Ordering::SeqCst));
        notifier.join().unwrap();
        opener.join().unwrap();
    }
}
