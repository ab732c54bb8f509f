//! Opt-in log output for test runs

use crate::config::Settings;
use crate::domain::defaults;
use crate::error::{Error, Result};
use crate::infrastructure::log_messages;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber that writes through the test harness's capture
///
/// Honors `RUST_LOG`, falling back to `filter` when it is unset or invalid.
/// Safe to call from every test: only the first call installs anything.
pub fn init_logging(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .with_target(false)
        .try_init();

    if installed.is_err() {
        tracing::trace!("{}", log_messages::logging::SUBSCRIBER_ALREADY_SET);
    }
}

/// [`init_logging`] with the crate's default filter
pub fn init_test_logging() {
    init_logging(defaults::logging::DEFAULT_FILTER);
}

/// [`init_logging`] with the filter configured as `logging.level`
pub fn init_logging_from(settings: &Settings) -> Result<()> {
    let level = settings.logging.level.as_str();
    EnvFilter::try_new(level).map_err(|e| Error::invalid_setting("logging.level", e))?;
    init_logging(level);
    Ok(())
}
