//! Property tests: listeners observe gateway pushes in delivery order.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use forever_fitness_session::mocks::MockIdentityGateway;
use forever_fitness_session::{
    GatewayError, Identity, SessionConfig, SessionPhase, SessionSnapshot, SessionStore,
};
use forever_fitness_testing::SnapshotRecorder;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Push {
    Identity(Option<String>),
    Error(String),
    Demo(bool),
}

fn push_strategy() -> impl Strategy<Value = Push> {
    prop_oneof![
        4 => proptest::option::of("u[0-9]{1,2}").prop_map(Push::Identity),
        1 => "[a-z-]{3,12}".prop_map(Push::Error),
        1 => any::<bool>().prop_map(Push::Demo),
    ]
}

proptest! {
    #[test]
    fn every_push_is_observed_in_order(pushes in prop::collection::vec(push_strategy(), 1..40)) {
        let gateway = MockIdentityGateway::available();
        let session = SessionStore::new(gateway.clone(), SessionConfig::default());
        let recorder =
            SnapshotRecorder::<SessionSnapshot>::attach(|listener| session.subscribe(listener));
        session.initialize();

        for push in &pushes {
            match push {
                Push::Identity(uid) => gateway.push_identity(uid.as_deref().map(Identity::new)),
                Push::Error(code) => gateway.push_error(GatewayError::new(code.clone(), "failure")),
                Push::Demo(enabled) => session.set_demo_mode(*enabled),
            }
        }

        let recorded = recorder.recorded();
        prop_assert_eq!(recorded.len(), pushes.len());

        for (push, snapshot) in pushes.iter().zip(&recorded) {
            match push {
                Push::Identity(uid) => {
                    prop_assert_eq!(
                        snapshot.identity.as_ref().map(|i| i.uid.to_string()),
                        uid.clone()
                    );
                    prop_assert!(!snapshot.loading);
                },
                Push::Error(code) => {
                    let error = snapshot.error.as_ref().and_then(|e| e.gateway_error());
                    prop_assert_eq!(error.map(|e| e.code.as_str()), Some(code.as_str()));
                    prop_assert!(!snapshot.loading);
                },
                Push::Demo(enabled) => prop_assert_eq!(snapshot.demo_mode, *enabled),
            }
        }

        // Once settled, loading never comes back
        let first_push = pushes.iter().position(|p| !matches!(p, Push::Demo(_)));
        if let Some(first) = first_push {
            prop_assert!(recorded[first..].iter().all(|s| !s.loading));
            prop_assert_ne!(session.phase(), SessionPhase::Connecting);
        }

        // Versions strictly increase, one per push
        prop_assert_eq!(session.version(), pushes.len() as u64);
    }
}
