//! Console logging via `tracing-subscriber`.

use anyhow::{Context, Result};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global subscriber.  `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str) -> Result<()> {
    let level: LevelFilter = default_level
        .parse()
        .with_context(|| format!("unknown log level {:?}", default_level))?;

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init()
        .context("a global logger is already installed")?;
    Ok(())
}
