use anyhow::Result;
use chrono::TimeDelta;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_EVENT_DURATION_SECONDS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_OCCURRENCES,
    ENV_PREFIX, MAX_EVENT_DURATION_SECONDS,
};
use crate::error::{CoreError, CoreResult};
use crate::types::FoldPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// Knobs that change how a schedule expands its event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Duration given to events that have neither an end nor a duration.
    pub default_duration_seconds: i64,
    /// Tie-break for civil times that occur twice.
    pub fold_policy: FoldPolicy,
    /// `all_occurrences` fails instead of materializing more than this.
    pub max_occurrences: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_duration_seconds: DEFAULT_EVENT_DURATION_SECONDS,
            fold_policy: FoldPolicy::default(),
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }
}

impl ScheduleConfig {
    /// ## Summary
    /// Returns the fallback event duration as a `TimeDelta`.
    ///
    /// Out-of-range values are clamped to
    /// `0..=MAX_EVENT_DURATION_SECONDS`; [`validate`](Self::validate) rejects
    /// them outright.
    #[must_use]
    pub fn default_duration(&self) -> TimeDelta {
        let seconds = self
            .default_duration_seconds
            .clamp(0, MAX_EVENT_DURATION_SECONDS);
        TimeDelta::try_seconds(seconds).unwrap_or_default()
    }

    /// ## Summary
    /// Returns a copy with a different fallback duration.
    ///
    /// The setting has whole-second precision: any sub-second part of
    /// `duration` is truncated toward zero.
    #[must_use]
    pub fn with_default_duration(mut self, duration: TimeDelta) -> Self {
        self.default_duration_seconds = duration.num_seconds();
        self
    }

    /// ## Summary
    /// Returns a copy with a different fold tie-break.
    #[must_use]
    pub fn with_fold_policy(mut self, fold_policy: FoldPolicy) -> Self {
        self.fold_policy = fold_policy;
        self
    }

    /// ## Summary
    /// Returns a copy with a different materialization limit.
    #[must_use]
    pub fn with_max_occurrences(mut self, max_occurrences: usize) -> Self {
        self.max_occurrences = max_occurrences;
        self
    }

    /// ## Summary
    /// Checks that the values describe a usable schedule configuration.
    ///
    /// ## Errors
    /// Returns `CoreError::ValidationError` for a default duration outside
    /// `0..=MAX_EVENT_DURATION_SECONDS` or a zero materialization limit.
    pub fn validate(&self) -> CoreResult<()> {
        if !(0..=MAX_EVENT_DURATION_SECONDS).contains(&self.default_duration_seconds) {
            return Err(CoreError::ValidationError {
                key: "schedule.default_duration_seconds",
                reason: format!(
                    "must be between 0 and {MAX_EVENT_DURATION_SECONDS}, got {}",
                    self.default_duration_seconds
                ),
            });
        }
        if self.max_occurrences == 0 {
            return Err(CoreError::ValidationError {
                key: "schedule.max_occurrences",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Returns a configuration builder seeded with the built-in defaults.
    ///
    /// ## Errors
    /// Returns an error if a default value cannot be set.
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder().set_default("logging.level", DEFAULT_LOG_LEVEL)?)
    }

    /// ## Summary
    /// Environment source for `CADENCE_`-prefixed variables, with `__`
    /// separating nested keys (`CADENCE_SCHEDULE__FOLD_POLICY`).
    #[must_use]
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
    }

    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `cadence.toml` into a `Settings`.
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or
    /// validating the schedule section fails.
    pub fn load() -> Result<Self> {
        Self::load_with(Self::environment())
    }

    /// ## Summary
    /// Same as [`load`](Self::load) with a caller-supplied environment
    /// source.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or
    /// validating the schedule section fails.
    pub fn load_with(environment: config::Environment) -> Result<Self> {
        let builder = Self::builder()?
            // TOML file
            .add_source(config::File::with_name(CONFIG_FILE_NAME).required(false))
            // Env file / process environment
            .add_source(environment);
        Self::from_builder(builder)
    }

    /// ## Summary
    /// Builds and validates a `Settings` from an already assembled builder.
    ///
    /// ## Errors
    /// Returns an error if deserialization or validation fails.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings = builder.build()?.try_deserialize::<Settings>()?;
        settings.schedule.validate()?;
        tracing::debug!(
            default_duration_seconds = settings.schedule.default_duration_seconds,
            fold_policy = %settings.schedule.fold_policy,
            max_occurrences = settings.schedule.max_occurrences,
            "Schedule configuration loaded"
        );
        Ok(settings)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
