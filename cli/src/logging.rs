//! Logging setup
//!
//! Logs go to stderr so stdout stays clean for `info` output. The level comes
//! from RUST_LOG, falling back to `info` (or `debug` with `--verbose`).

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    tracing::debug!("Logging initialized at default level {}", default_level);
    Ok(())
}
