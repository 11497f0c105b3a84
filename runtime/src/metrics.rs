//! Prometheus metrics for observability and monitoring.
//!
//! This module describes the metrics emitted by the runtime and by the
//! session layer:
//! - Action dispatch and reducer timing
//! - Listener notification
//! - Effect execution
//! - Identity listener failures and sign-in outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use forever_fitness_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//!
//! // ... run the application ...
//!
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register metric descriptions and install a Prometheus recorder.
///
/// The recorder is process-global. The returned handle renders the
/// Prometheus text format on demand; the application decides where to
/// expose it.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the histogram buckets are rejected and
/// [`MetricsError::Install`] if another recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    register_metrics();

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    let handle = builder
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
///
/// Safe to call more than once; descriptions are only kept by an installed
/// recorder.
pub fn register_metrics() {
    // Store
    describe_counter!("store.actions.total", "Total number of actions reduced by stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside a reducer for one action"
    );
    describe_counter!(
        "store.listeners.notified",
        "Total number of listener invocations with published state"
    );
    describe_counter!("store.effects.executed", "Total number of effects executed");

    // Session
    describe_counter!(
        "session.listener_failures",
        "Errors reported by the identity provider subscription"
    );
    describe_counter!(
        "session.subscription_setup_failures",
        "Identity subscriptions that could not be opened"
    );
    describe_counter!("session.sign_in.attempts", "Sign-in attempts that reached the provider");
    describe_counter!("session.sign_in.rejected", "Sign-in attempts that failed");
}
