//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User ID type
pub type UserId = i64;

/// Account role, checked by [`AuthManager::restrict_to`](super::AuthManager::restrict_to)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Password material stored alongside a user.
///
/// Only [`CredentialStore`](super::CredentialStore) mutates these fields after the
/// account is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    /// Argon2id PHC string
    pub password_hash: String,
    /// Last password change; `None` until the first change after signup
    pub password_changed_at: Option<DateTime<Utc>>,
    /// SHA-256 hex digest of the pending reset token
    pub password_reset_token_hash: Option<String>,
    /// Expiry of the pending reset token
    pub password_reset_expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Credential for a freshly created account
    pub fn new(password_hash: String) -> Self {
        Self {
            password_hash,
            ..Self::default()
        }
    }

    pub fn has_pending_reset(&self) -> bool {
        self.password_reset_token_hash.is_some()
    }

    pub(crate) fn clear_reset(&mut self) {
        self.password_reset_token_hash = None;
        self.password_reset_expires_at = None;
    }
}

/// User model
///
/// The credential and the activity flag never leave the process in serialized form.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
    pub role: Role,
    #[serde(skip)]
    pub active: bool,
    #[serde(skip)]
    pub credential: Credential,
}

/// Account fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
    pub role: Role,
}

/// Validated account fields to overwrite; `role` is only ever set by administrators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

/// Signup request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-service profile update.
///
/// Password fields are accepted only so they can be rejected with a pointer to the
/// password endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

/// Account update performed by an administrator. Passwords are never changed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Password change for a logged-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub password: String,
    pub password_confirm: String,
}

/// Password reset confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

/// JWT claims for access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,           // User ID
    pub role: Role,
    pub exp: i64,              // Expiration timestamp
    pub iat: i64,              // Issued at timestamp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::User, Role::Guide, Role::LeadGuide, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_serialization_hides_credential() {
        let user = User {
            id: 1,
            name: "Laura".to_string(),
            email: "laura@example.com".to_string(),
            photo: None,
            role: Role::LeadGuide,
            active: true,
            credential: Credential::new("$argon2id$secret".to_string()),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("active"));
        assert!(json.contains("\"role\":\"lead-guide\""));
    }
}
