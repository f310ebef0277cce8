//! Authentication configuration.

use chrono::Duration;

use crate::config::{ConfigError, parse_env_or, require_env};

/// Argon2id cost parameters.
///
/// The defaults follow the OWASP Argon2id baseline (19 MiB, 2 passes, 1 lane), which
/// costs about as much per guess as bcrypt at cost 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashing {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashing {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Server-side pepper appended to every password before hashing
    pub password_pepper: String,
    /// Lifetime of issued bearer tokens
    pub token_ttl: Duration,
    /// How long a password-reset token stays valid
    pub reset_token_ttl: Duration,
    /// Argon2id parameters for new hashes
    pub hashing: PasswordHashing,
    /// Base URL the plaintext reset token is appended to in reset emails
    pub reset_url_base: String,
}

impl AuthConfig {
    /// Minimum JWT secret length (128-bit security)
    pub const MIN_JWT_SECRET_LEN: usize = 32;
    /// Minimum pepper length (64-bit security)
    pub const MIN_PEPPER_LEN: usize = 16;
    /// Longest accepted bearer token lifetime
    pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;
    /// Longest accepted reset token lifetime
    pub const MAX_RESET_TOKEN_TTL_DAYS: i64 = 7;

    /// Configuration with default lifetimes and hashing cost
    pub fn new(jwt_secret: String, password_pepper: String) -> Self {
        Self {
            jwt_secret,
            password_pepper,
            token_ttl: Duration::days(90),
            reset_token_ttl: Duration::hours(5),
            hashing: PasswordHashing::default(),
            reset_url_base: "http://127.0.0.1:3000/api/v1/users/resetPassword".to_string(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `JWT_SECRET` (required, at least 32 characters)
    /// - `PASSWORD_PEPPER` (required, at least 16 characters)
    /// - `JWT_EXPIRES_IN_DAYS` (default: 90)
    /// - `RESET_TOKEN_TTL_MINUTES` (default: 300)
    /// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`
    /// - `RESET_URL_BASE`
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = require_env("JWT_SECRET", "Generate with: openssl rand -hex 32")?;
        let password_pepper =
            require_env("PASSWORD_PEPPER", "Generate with: openssl rand -hex 16")?;

        let defaults = Self::new(jwt_secret, password_pepper);
        let base = PasswordHashing::default();
        let config = Self {
            token_ttl: checked_ttl(
                "JWT_EXPIRES_IN_DAYS",
                parse_env_or("JWT_EXPIRES_IN_DAYS", 90)?,
                Duration::try_days,
            )?,
            reset_token_ttl: checked_ttl(
                "RESET_TOKEN_TTL_MINUTES",
                parse_env_or("RESET_TOKEN_TTL_MINUTES", 300)?,
                Duration::try_minutes,
            )?,
            hashing: PasswordHashing {
                memory_kib: parse_env_or("ARGON2_MEMORY_KIB", base.memory_kib)?,
                iterations: parse_env_or("ARGON2_ITERATIONS", base.iterations)?,
                parallelism: parse_env_or("ARGON2_PARALLELISM", base.parallelism)?,
            },
            reset_url_base: std::env::var("RESET_URL_BASE")
                .unwrap_or_else(|_| defaults.reset_url_base.clone()),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate security parameters
    ///
    /// # Errors
    ///
    /// * `ConfigError::Invalid` - Secret too short, or a lifetime outside its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < Self::MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!(
                    "Must be at least {} characters (128-bit security)",
                    Self::MIN_JWT_SECRET_LEN
                ),
            });
        }

        if self.password_pepper.len() < Self::MIN_PEPPER_LEN {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: format!(
                    "Must be at least {} characters (64-bit security)",
                    Self::MIN_PEPPER_LEN
                ),
            });
        }

        if self.token_ttl <= Duration::zero()
            || self.token_ttl.num_days() > Self::MAX_TOKEN_TTL_DAYS
        {
            return Err(ConfigError::Invalid {
                var: "JWT_EXPIRES_IN_DAYS".to_string(),
                reason: format!("Must be between 1 and {} days", Self::MAX_TOKEN_TTL_DAYS),
            });
        }

        if self.reset_token_ttl <= Duration::zero()
            || self.reset_token_ttl.num_days() > Self::MAX_RESET_TOKEN_TTL_DAYS
        {
            return Err(ConfigError::Invalid {
                var: "RESET_TOKEN_TTL_MINUTES".to_string(),
                reason: format!(
                    "Must be positive and at most {} days",
                    Self::MAX_RESET_TOKEN_TTL_DAYS
                ),
            });
        }

        Ok(())
    }
}

/// Build a lifetime from an environment value, rejecting values chrono cannot represent
fn checked_ttl(
    var: &str,
    amount: i64,
    build: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    build(amount).ok_or_else(|| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("{amount} is out of range"),
    })
}
