// Logging setup shared by binaries and integration tests
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,freethinker_core=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, else `default_filter`.
///
/// Fails if a global subscriber is already installed; callers that may run
/// more than once (tests) can ignore the error.
pub fn init_tracing(default_filter: &str) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;

    info!(target: "telemetry", filter = %default_filter, "Tracing initialized");
    Ok(())
}
