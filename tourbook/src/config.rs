//! Configuration errors and environment parsing helpers.
//!
//! Every configuration struct in the crate (`DatabaseConfig`, `AuthConfig`) reads
//! from environment variables through these helpers so that a missing or malformed
//! variable is reported the same way everywhere.

use std::str::FromStr;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    /// A variable is set but cannot be used
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Read a required variable
///
/// # Errors
///
/// * `ConfigError::MissingRequired` - Variable is unset
pub fn require_env(var: &str, hint: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingRequired {
        var: var.to_string(),
        hint: hint.to_string(),
    })
}

/// Parse an optional variable, falling back to `default` when unset
///
/// A variable that is set but does not parse is an error rather than silently
/// replaced by the default.
///
/// # Errors
///
/// * `ConfigError::Invalid` - Variable is set but unparsable
pub fn parse_env_or<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
