//! Gateway callbacks delivered on other threads: calls made while another
//! thread is notifying listeners take effect before they return.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use forever_fitness_session::mocks::MockIdentityGateway;
use forever_fitness_session::{Identity, SessionConfig, SessionSnapshot, SessionStore};
use forever_fitness_testing::init_test_tracing;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const PATIENCE: Duration = Duration::from_secs(5);

fn ready_session(gateway: &MockIdentityGateway) -> Arc<SessionStore<MockIdentityGateway>> {
    init_test_tracing();
    let session = Arc::new(SessionStore::new(gateway.clone(), SessionConfig::default()));
    session.initialize();
    gateway.push_identity(None);
    session
}

/// A listener that parks the notifying thread on the first snapshot
/// signed in as `uid`, until the gate opens.
struct Parking {
    entered: Receiver<()>,
    gate: Sender<()>,
}

impl Parking {
    fn attach(
        session: &SessionStore<MockIdentityGateway>,
        uid: &'static str,
    ) -> (Self, forever_fitness_runtime::ListenerHandle) {
        let (entered_tx, entered) = mpsc::channel();
        let (gate, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);
        let parked = AtomicBool::new(false);

        let handle = session.subscribe(move |snapshot: &SessionSnapshot| {
            let is_target = snapshot.identity.as_ref().is_some_and(|i| i.uid.as_str() == uid);
            if is_target && !parked.swap(true, Ordering::SeqCst) {
                entered_tx.send(()).unwrap();
                gate_rx.lock().unwrap().recv_timeout(PATIENCE).unwrap();
            }
        });

        (Self { entered, gate }, handle)
    }

    fn wait_until_parked(&self) {
        self.entered.recv_timeout(PATIENCE).unwrap();
    }

    fn open_later(self, delay: Duration) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            thread::sleep(delay);
            self.gate.send(()).unwrap();
        })
    }
}

fn push_on_thread(gateway: &MockIdentityGateway, uid: &str) -> thread::JoinHandle<()> {
    let gateway = gateway.clone();
    let identity = Identity::new(uid);
    thread::spawn(move || gateway.push_identity(Some(identity)))
}

#[test]
fn local_calls_take_effect_while_another_thread_notifies() {
    let gateway = MockIdentityGateway::available();
    let session = ready_session(&gateway);

    let calls = Arc::new(AtomicUsize::new(0));
    let _counter = {
        let calls = Arc::clone(&calls);
        session.subscribe(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    let (parking, _parked) = Parking::attach(&session, "u1");

    let first = push_on_thread(&gateway, "u1");
    parking.wait_until_parked();
    let second = push_on_thread(&gateway, "u2");
    let opener = parking.open_later(Duration::from_millis(50));

    session.set_demo_mode(true);
    assert!(session.snapshot().demo_mode);

    session.teardown();
    assert!(session.is_torn_down());
    assert_eq!(gateway.active_subscriptions(), 0);

    let calls_at_teardown = calls.load(Ordering::SeqCst);
    first.join().unwrap();
    second.join().unwrap();
    opener.join().unwrap();
    gateway.push_identity(Some(Identity::new("u3")));

    assert_eq!(calls.load(Ordering::SeqCst), calls_at_teardown);
}

#[test]
fn pushes_racing_teardown_never_reach_listeners_afterwards() {
    let gateway = MockIdentityGateway::available().ignore_unsubscribe();
    let session = ready_session(&gateway);

    let calls = Arc::new(AtomicUsize::new(0));
    let _counter = {
        let calls = Arc::clone(&calls);
        session.subscribe(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };

    let stop = Arc::new(AtomicBool::new(false));
    let pusher = {
        let gateway = gateway.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut n = 0_u32;
            while !stop.load(Ordering::SeqCst) {
                gateway.push_identity(Some(Identity::new(format!("u{}", n % 7))));
                n += 1;
            }
        })
    };

    while calls.load(Ordering::SeqCst) < 10 {
        thread::yield_now();
    }
    session.teardown();
    let calls_at_teardown = calls.load(Ordering::SeqCst);

    thread::sleep(Duration::from_millis(20));
    stop.store(true, Ordering::SeqCst);
    pusher.join().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), calls_at_teardown);
}

#[test]
fn released_handle_waits_out_an_invocation_on_another_thread() {
    let gateway = MockIdentityGateway::available();
    let session = ready_session(&gateway);
    let (parking, parked) = Parking::attach(&session, "u1");

    let calls = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));
    let slow = {
        let calls = Arc::clone(&calls);
        let finished = Arc::clone(&finished);
        session.subscribe(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            finished.store(true, Ordering::SeqCst);
        })
    };

    let pusher = push_on_thread(&gateway, "u1");
    parking.wait_until_parked();

    // The slow listener runs after the parked one; release it while the
    // notifying thread is about to enter or is inside it.
    let opener = parking.open_later(Duration::from_millis(10));
    thread::sleep(Duration::from_millis(20));
    slow.release();
    let finished_at_release = finished.load(Ordering::SeqCst);
    let calls_at_release = calls.load(Ordering::SeqCst);

    assert!(calls_at_release == 0 || finished_at_release);

    pusher.join().unwrap();
    opener.join().unwrap();
    drop(parked);
    gateway.push_identity(Some(Identity::new("u2")));

    assert_eq!(calls.load(Ordering::SeqCst), calls_at_release);
}
