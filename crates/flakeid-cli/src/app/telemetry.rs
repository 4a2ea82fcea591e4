//! Logging for the `flakeid` binary.
//!
//! Events go to stderr through a `fmt` layer so that stdout only ever carries
//! IDs or decoded output. The filter is read from `RUST_LOG` and defaults to
//! `warn`, which surfaces clock regressions reported by the generators.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_line_number(true)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}
