//! Session demo.
//!
//! Wires the session core to the mock identity provider:
//!
//! 1. Provider credentials are read from `FOREVER_FITNESS_*` variables
//! 2. A missing configuration degrades to an unavailable provider and the
//!    demo falls back to demo mode
//! 3. Otherwise the provider reports "signed out", the user signs in, and a
//!    reaction redirects to the dashboard
//!
//! Run with:
//!
//! ```bash
//! FOREVER_FITNESS_API_KEY=key FOREVER_FITNESS_AUTH_DOMAIN=demo.example.com \
//! FOREVER_FITNESS_PROJECT_ID=demo FOREVER_FITNESS_APP_ID=1:1:web:1 \
//! cargo run -p session-demo
//! ```

use forever_fitness_runtime::metrics::install_recorder;
use forever_fitness_session::mocks::MockIdentityGateway;
use forever_fitness_session::{reactions, Gate, ProviderConfig, SessionConfig, SessionStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,forever_fitness=debug,session_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting session demo");

    let metrics = install_recorder()?;

    let provider_available = ProviderConfig::availability(&ProviderConfig::from_env());
    let gateway = if provider_available {
        MockIdentityGateway::available()
    } else {
        MockIdentityGateway::unavailable()
    };

    let session = SessionStore::new(gateway.clone(), SessionConfig::default());

    let _render = session.subscribe(|snapshot| match snapshot.gate() {
        Gate::Pending => tracing::info!("Rendering spinner"),
        Gate::SignedIn(identity) => {
            tracing::info!(uid = %identity.uid, demo = snapshot.demo_mode, "Rendering dashboard");
        },
        Gate::SignedOut if snapshot.demo_mode => tracing::info!("Rendering dashboard in demo mode"),
        Gate::SignedOut => tracing::info!("Rendering login page"),
    });
    let _redirect = reactions::on_signed_in(&session, |identity| {
        tracing::info!(uid = %identity.uid, "Redirecting to /dashboard");
    });

    session.initialize();

    if provider_available {
        // The provider answers the subscription with "nobody signed in"
        gateway.push_identity(None);

        match session.begin_sign_in().await {
            Ok(identity) => {
                let scope = identity.record_scope();
                tracing::info!(path = %scope.document_path(), "Loading fitness records");
            },
            Err(error) if error.is_cancellation() => tracing::info!("Sign-in cancelled"),
            Err(error) => tracing::warn!(%error, "Sign-in failed"),
        }
    } else {
        if let Some(diagnostic) = session.snapshot().diagnostic() {
            tracing::warn!("{diagnostic}");
        }
        session.set_demo_mode(true);
    }

    session.teardown();
    tracing::info!(phase = %session.phase(), version = session.version(), "Session torn down");

    println!("{}", metrics.render());

    Ok(())
}
