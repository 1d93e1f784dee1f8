use thiserror::Error;

/// Failures raised while reading shared settings and values.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A setting holds a value outside the range it accepts.
    #[error("Invalid setting `{key}`: {reason}")]
    ValidationError { key: &'static str, reason: String },

    /// Text that does not name a known value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
