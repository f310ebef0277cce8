//! Authentication error types.

use thiserror::Error;

use crate::db::StoreError;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Persistence error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed input (password length, mismatched confirmation, bad email)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Email or password did not match an active account
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Reset token unknown or already used
    #[error("Reset token is invalid")]
    TokenInvalid,

    /// Reset token matched but its window has closed
    #[error("Reset token has expired")]
    TokenExpired,

    /// Bearer token predates the latest password change
    #[error("Password was changed after this session was issued, please log in again")]
    StaleSession,

    /// Role not allowed to perform the action
    #[error("You do not have permission to perform this action")]
    Forbidden,

    /// A configured lifetime pushed a timestamp past the representable range
    #[error("Token lifetime overflows the clock")]
    ClockOverflow,

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Store and JWT errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::HashingFailed | AuthError::ClockOverflow => {
                "Internal server error".to_string()
            }
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_store_details() {
        let err = AuthError::Store(StoreError::Unavailable("pg-primary down".to_string()));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_client_message_keeps_user_facing_errors() {
        assert_eq!(
            AuthError::TokenExpired.client_message(),
            "Reset token has expired"
        );
    }
}
