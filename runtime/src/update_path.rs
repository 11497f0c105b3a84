//! The store's single update path.
//!
//! Actions are reduced one at a time, in the order they were submitted, by
//! whichever thread currently holds the drainer role. A thread that submits
//! while another thread drains blocks until its own action has been fully
//! processed. A submission made by the draining thread itself (from a
//! listener or an effect) is queued and returns at once.

use super::lock;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

struct Queue<A> {
    pending: VecDeque<A>,
    /// Tickets handed out so far; the n-th submission gets ticket n
    issued: u64,
    /// Tickets fully processed, counted in FIFO order
    completed: u64,
    drainer: Option<ThreadId>,
}

pub(crate) struct UpdatePath<A> {
    queue: Mutex<Queue<A>>,
    progress: Condvar,
}

impl<A> UpdatePath<A> {
    pub(crate) const fn new() -> Self {
        Self {
            queue: Mutex::new(Queue {
                pending: VecDeque::new(),
                issued: 0,
                completed: 0,
                drainer: None,
            }),
            progress: Condvar::new(),
        }
    }

    /// Queue `action`
    ///
    /// Returns a [`Drainer`] when the caller has to process the queue. Returns
    /// `None` when the action was queued by the draining thread itself, or
    /// once another thread finished processing it.
    pub(crate) fn submit(&self, action: A) -> Option<Drainer<'_, A>> {
        let me = thread::current().id();
        let mut queue = lock(&self.queue);

        let ticket = queue.issued;
        queue.issued += 1;
        queue.pending.push_back(action);

        if queue.drainer == Some(me) {
            tracing::trace!(ticket, "Re-entrant send queued");
            return None;
        }

        loop {
            if queue.completed > ticket {
                return None;
            }

            if queue.drainer.is_none() {
                queue.drainer = Some(me);
                return Some(Drainer {
                    path: self,
                    thread: me,
                    in_flight: false,
                });
            }

            tracing::trace!(ticket, "Update path busy, waiting");
            queue = self.wait(queue);
        }
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Queue<A>>) -> MutexGuard<'a, Queue<A>> {
        self.progress
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to process the queue
///
/// Dropping the drainer mid-action (a reducer or listener panicked) counts
/// the action as processed and hands the role to a waiting thread.
pub(crate) struct Drainer<'a, A> {
    path: &'a UpdatePath<A>,
    thread: ThreadId,
    in_flight: bool,
}

impl<A> Drainer<'_, A> {
    /// Mark the previous action processed and take the next one
    ///
    /// Returns `None` once the queue is empty; the drainer role is released
    /// in the same critical section, so no action is left behind.
    pub(crate) fn take_next(&mut self) -> Option<A> {
        let mut queue = lock(&self.path.queue);

        if self.in_flight {
            queue.completed += 1;
            self.in_flight = false;
            self.path.progress.notify_all();
        }

        match queue.pending.pop_front() {
            Some(action) => {
                self.in_flight = true;
                Some(action)
            },
            None => {
                queue.drainer = None;
                self.path.progress.notify_all();
                None
            },
        }
    }
}

impl<A> Drop for Drainer<'_, A> {
    fn drop(&mut self) {
        let mut queue = lock(&self.path.queue);

        if self.in_flight {
            queue.completed += 1;
        }
        if queue.drainer == Some(self.thread) {
            queue.drainer = None;
        }
        self.path.progress.notify_all();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn first_submitter_drains_in_order() {
        let path = UpdatePath::new();

        let mut drainer = path.submit(1).unwrap();
        assert_eq!(drainer.take_next(), Some(1));
        assert!(path.submit(2).is_none());
        assert!(path.submit(3).is_none());
        assert_eq!(drainer.take_next(), Some(2));
        assert_eq!(drainer.take_next(), Some(3));
        assert_eq!(drainer.take_next(), None);
        drop(drainer);

        assert!(path.submit(4).is_some());
    }

    #[test]
    fn other_thread_waits_until_its_action_is_processed() {
        let path = Arc::new(UpdatePath::new());
        let mut drainer = path.submit("local").unwrap();
        assert_eq!(drainer.take_next(), Some("local"));

        let (returned_tx, returned) = mpsc::channel();
        let remote = {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                assert!(path.submit("remote").is_none());
                returned_tx.send(()).unwrap();
            })
        };

        while lock(&path.queue).pending.is_empty() {
            thread::yield_now();
        }
        assert!(returned.recv_timeout(Duration::from_millis(20)).is_err());

        assert_eq!(drainer.take_next(), Some("remote"));
        assert!(returned.recv_timeout(Duration::from_millis(50)).is_err());

        assert_eq!(drainer.take_next(), None);
        returned.recv_timeout(Duration::from_secs(5)).unwrap();
        remote.join().unwrap();
    }

    #[test]
    fn dropped_drainer_hands_over_to_a_waiting_thread() {
        let path = Arc::new(UpdatePath::new());
        let mut drainer = path.submit(1).unwrap();
        assert_eq!(drainer.take_next(), Some(1));

        let remote = {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let mut drainer = path.submit(2).unwrap();
                std::iter::from_fn(|| drainer.take_next()).collect::<Vec<_>>()
            })
        };

        thread::sleep(Duration::from_millis(20));
        drop(drainer);

        assert_eq!(remote.join().unwrap(), vec![2]);
    }
}
