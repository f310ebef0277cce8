//! Admin CLI configuration management.
//!
//! Consolidates environment reads and command-line parsing for the operator commands.

use pico_args::Arguments;
use thiserror::Error;
use tourbook::{
    auth::AuthConfig,
    config::ConfigError,
    db::DatabaseConfig,
    tours::TourId,
};

/// Command-line errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Missing command, see --help")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Use either --tour ID or --all, not both")]
    ConflictingTargets,

    #[error("Unexpected arguments: {0}")]
    UnexpectedArguments(String),

    #[error(transparent)]
    Args(#[from] pico_args::Error),
}

/// Which tours to reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeTarget {
    One(TourId),
    All,
}

/// Operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply schema migrations
    Migrate,
    /// Recompute rating summaries from the stored reviews
    RecomputeRatings(RecomputeTarget),
    /// Issue a password reset token and print the reset link for the operator
    SendReset { email: String },
}

/// Parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub database_url: Option<String>,
}

impl Invocation {
    /// Parse the command and its flags
    ///
    /// # Errors
    ///
    /// Returns error if the command is unknown or its arguments are incomplete
    pub fn parse(mut pargs: Arguments) -> Result<Self, CliError> {
        let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
        let name: Option<String> = pargs.subcommand()?;

        let command = match name.as_deref() {
            None => return Err(CliError::MissingCommand),
            Some("migrate") => Command::Migrate,
            Some("recompute-ratings") => {
                let tour: Option<TourId> = pargs.opt_value_from_str("--tour")?;
                let all = pargs.contains("--all");
                let target = match (tour, all) {
                    (Some(_), true) => return Err(CliError::ConflictingTargets),
                    (Some(id), false) => RecomputeTarget::One(id),
                    (None, true) => RecomputeTarget::All,
                    (None, false) => return Err(CliError::MissingArgument("--tour ID | --all")),
                };
                Command::RecomputeRatings(target)
            }
            Some("send-reset") => {
                let email: Option<String> = pargs.opt_value_from_str("--email")?;
                Command::SendReset {
                    email: email.ok_or(CliError::MissingArgument("--email"))?,
                }
            }
            Some(other) => return Err(CliError::UnknownCommand(other.to_string())),
        };

        let rest = pargs.finish();
        if !rest.is_empty() {
            return Err(CliError::UnexpectedArguments(
                rest.iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" "),
            ));
        }

        Ok(Self {
            command,
            database_url,
        })
    }
}

/// Complete admin configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Database configuration
    pub database: DatabaseConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(database_url_override: Option<String>) -> Result<Self, ConfigError> {
        let database = match database_url_override {
            Some(url) => DatabaseConfig::from_env_with_url(url)?,
            None => DatabaseConfig::from_env()?,
        };
        Ok(Self { database })
    }

    /// Authentication settings, only needed by commands that touch credentials
    ///
    /// # Errors
    ///
    /// Returns error if `JWT_SECRET` or `PASSWORD_PEPPER` is missing or too short
    pub fn auth(&self) -> Result<AuthConfig, ConfigError> {
        AuthConfig::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Result<Invocation, CliError> {
        Invocation::parse(Arguments::from_vec(
            args.iter().map(OsString::from).collect(),
        ))
    }

    #[test]
    fn test_parse_migrate_with_db_url() {
        let invocation = parse(&["--db-url", "postgres://x@y/z", "migrate"]).unwrap();
        assert_eq!(invocation.command, Command::Migrate);
        assert_eq!(invocation.database_url.as_deref(), Some("postgres://x@y/z"));
    }

    #[test]
    fn test_parse_recompute_targets() {
        assert_eq!(
            parse(&["recompute-ratings", "--tour", "7"]).unwrap().command,
            Command::RecomputeRatings(RecomputeTarget::One(7))
        );
        assert_eq!(
            parse(&["recompute-ratings", "--all"]).unwrap().command,
            Command::RecomputeRatings(RecomputeTarget::All)
        );
        assert!(matches!(
            parse(&["recompute-ratings"]),
            Err(CliError::MissingArgument(_))
        ));
        assert!(matches!(
            parse(&["recompute-ratings", "--tour", "7", "--all"]),
            Err(CliError::ConflictingTargets)
        ));
    }

    #[test]
    fn test_parse_send_reset() {
        assert_eq!(
            parse(&["send-reset", "--email", "a@example.com"]).unwrap().command,
            Command::SendReset {
                email: "a@example.com".to_string()
            }
        );
        assert!(matches!(
            parse(&["send-reset"]),
            Err(CliError::MissingArgument("--email"))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_input() {
        assert!(matches!(parse(&[]), Err(CliError::MissingCommand)));
        assert!(matches!(parse(&["drop-all"]), Err(CliError::UnknownCommand(_))));
        assert!(matches!(
            parse(&["migrate", "--force"]),
            Err(CliError::UnexpectedArguments(_))
        ));
    }
}
