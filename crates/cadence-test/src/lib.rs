//! Cadence recurring event expansion - integration test support.
//!
//! This crate re-exports the workspace crates so integration tests can use
//! `cadence_test::component::` paths, and carries the logging setup shared
//! by those tests.

use anyhow::Result;
use cadence_core::config::Settings;
use tracing_subscriber::EnvFilter;

pub mod component {
    pub use cadence_core::{config, constants, types};
    pub use cadence_rrule::*;

    pub mod core_error {
        pub use cadence_core::error::*;
    }
}

/// ## Summary
/// Builds the log filter named by `logging.level`.
///
/// ## Errors
/// Returns an error if the level is not a valid filter directive.
pub fn log_filter(settings: &Settings) -> Result<EnvFilter> {
    Ok(EnvFilter::try_new(settings.logging.level.as_str())?)
}

/// ## Summary
/// Loads settings from built-in defaults plus explicit overrides.
///
/// Keeps tests independent of the process environment and any
/// `cadence.toml` in the working directory.
///
/// ## Errors
/// Returns an error if an override cannot be applied or the resulting
/// settings fail validation.
pub fn settings_with(overrides: &[(&str, &str)]) -> Result<Settings> {
    let mut builder = Settings::builder()?;
    for (key, value) in overrides {
        builder = builder.set_override(*key, *value)?;
    }
    let settings = Settings::from_builder(builder)?;
    tracing::debug!(level = %settings.logging.level, "Test settings assembled");
    Ok(settings)
}
