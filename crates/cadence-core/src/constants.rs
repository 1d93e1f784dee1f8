/// Name used for the configuration file and environment prefix
pub const APP_NAME: &str = "cadence";
pub const CONFIG_FILE_NAME: &str = const_str::concat!(APP_NAME, ".toml");
pub const ENV_PREFIX: &str = "CADENCE";

/// Duration assumed for an event that supplies neither an end nor a duration
pub const DEFAULT_EVENT_DURATION_SECONDS: i64 = 60 * 60;

/// Longest event duration accepted, about a century
pub const MAX_EVENT_DURATION_SECONDS: i64 = 100 * 366 * 24 * 60 * 60;

/// Upper bound on occurrences a single `all_occurrences` call may materialize
pub const DEFAULT_MAX_OCCURRENCES: usize = 100_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";
