//! Password credential lifecycle: hashing, verification, reset tokens and stale-session
//! detection.
//!
//! Every mutating operation rewrites the whole [`Credential`] of a single account in one
//! repository call, so a new password and the clearing of its reset token are never
//! observed separately.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::config::{AuthConfig, PasswordHashing};
use super::errors::{AuthError, AuthResult};
use super::models::{Credential, User};
use crate::db::{UserRepository, UserScope};

/// Random bytes per reset token (256 bits)
pub const RESET_TOKEN_BYTES: usize = 32;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum accepted password length
pub const MAX_PASSWORD_LEN: usize = 128;

/// Backdate applied to `password_changed_at`, so a token signed in the same second as
/// the change still compares as newer than it
const PASSWORD_CHANGE_SKEW_SECS: i64 = 1;

/// Owns password hashing and the reset-token flow for user accounts
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    pepper: String,
    hashing: PasswordHashing,
    reset_token_ttl: Duration,
}

impl CredentialStore {
    /// Create a new credential store
    ///
    /// # Arguments
    ///
    /// * `users` - Repository holding the accounts
    /// * `config` - Pepper, hashing cost and reset token lifetime
    pub fn new(users: Arc<dyn UserRepository>, config: &AuthConfig) -> Self {
        Self {
            users,
            pepper: config.password_pepper.clone(),
            hashing: config.hashing,
            reset_token_ttl: config.reset_token_ttl,
        }
    }

    /// Validate and hash a plaintext password with Argon2id + pepper
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Password length out of bounds
    /// * `AuthError::HashingFailed` - Invalid cost parameters
    pub fn hash_password(&self, plaintext: &str) -> AuthResult<String> {
        validate_password(plaintext)?;

        let params = Params::new(
            self.hashing.memory_kib,
            self.hashing.iterations,
            self.hashing.parallelism,
            None,
        )
        .map_err(|_| AuthError::HashingFailed)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let peppered = format!("{}{}", plaintext, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Store a new password for `user`
    ///
    /// Clears any pending reset token. When an existing hash is replaced,
    /// `password_changed_at` is set to one second before now.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Password length out of bounds
    /// * `AuthError::Store` - The credential write failed; `user` is left unchanged
    pub async fn set_password(&self, user: &mut User, plaintext: &str) -> AuthResult<()> {
        let credential = self.replacement_credential(user, plaintext)?;
        self.users.update_credential(user.id, &credential).await?;
        user.credential = credential;

        log::info!("Password updated for user {}", user.id);
        Ok(())
    }

    /// New credential carrying a fresh hash of `plaintext` and no pending reset
    fn replacement_credential(&self, user: &User, plaintext: &str) -> AuthResult<Credential> {
        let mut credential = user.credential.clone();
        let replacing = !credential.password_hash.is_empty();

        credential.password_hash = self.hash_password(plaintext)?;
        credential.clear_reset();
        if replacing {
            credential.password_changed_at =
                Some(Utc::now() - Duration::seconds(PASSWORD_CHANGE_SKEW_SECS));
        }
        Ok(credential)
    }

    /// Check a candidate password against the stored hash
    ///
    /// The digest comparison inside Argon2 verification is constant-time. A malformed
    /// stored hash never verifies.
    pub fn verify_password(&self, user: &User, candidate: &str) -> bool {
        let parsed_hash = match PasswordHash::new(&user.credential.password_hash) {
            Ok(hash) => hash,
            Err(_) => {
                log::warn!("User {} has an unparsable password hash", user.id);
                return false;
            }
        };

        let peppered = format!("{}{}", candidate, self.pepper);
        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Issue a single-use reset token for `user`
    ///
    /// Only the SHA-256 digest and expiry are persisted; any earlier pending token is
    /// overwritten. The returned plaintext must be delivered out of band.
    ///
    /// # Errors
    ///
    /// * `AuthError::Store` - The credential write failed
    /// * `AuthError::ClockOverflow` - The configured lifetime overflows the clock
    pub async fn issue_reset_token(&self, user: &mut User) -> AuthResult<String> {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let mut credential = user.credential.clone();
        credential.password_reset_token_hash = Some(hash_reset_token(&token));
        credential.password_reset_expires_at = Some(
            Utc::now()
                .checked_add_signed(self.reset_token_ttl)
                .ok_or(AuthError::ClockOverflow)?,
        );

        self.users.update_credential(user.id, &credential).await?;
        user.credential = credential;

        log::info!("Issued password reset token for user {}", user.id);
        Ok(token)
    }

    /// Redeem a reset token and set a new password
    ///
    /// The new credential is written only if the stored digest still matches, so of
    /// two concurrent redemptions of one token exactly one succeeds.
    ///
    /// # Returns
    ///
    /// * `AuthResult<User>` - The account with its new credential
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenInvalid` - No active account holds this token, or it was
    ///   redeemed concurrently
    /// * `AuthError::TokenExpired` - The token matched but its window has closed
    /// * `AuthError::Validation` - New password rejected
    pub async fn consume_reset_token(&self, token: &str, new_password: &str) -> AuthResult<User> {
        let token_hash = hash_reset_token(token.trim());
        let mut user = self
            .users
            .find_by_reset_token_hash(&token_hash, UserScope::Active)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        match user.credential.password_reset_expires_at {
            Some(expires_at) if expires_at > Utc::now() => {}
            _ => {
                log::debug!("Expired reset token presented for user {}", user.id);
                return Err(AuthError::TokenExpired);
            }
        }

        let credential = self.replacement_credential(&user, new_password)?;
        if !self
            .users
            .redeem_reset_token(user.id, &token_hash, &credential)
            .await?
        {
            log::warn!("Reset token for user {} was already redeemed", user.id);
            return Err(AuthError::TokenInvalid);
        }
        user.credential = credential;

        log::info!("Password reset for user {}", user.id);
        Ok(user)
    }

    /// Whether a session issued at `issued_at` predates the latest password change
    pub fn is_session_stale(user: &User, issued_at: DateTime<Utc>) -> bool {
        user.credential
            .password_changed_at
            .is_some_and(|changed_at| changed_at > issued_at)
    }
}

/// Hex SHA-256 digest stored in place of a reset token
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Validate password length
pub fn validate_password(password: &str) -> AuthResult<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
