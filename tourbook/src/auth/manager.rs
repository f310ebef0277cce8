//! Authentication manager implementation.

use std::sync::Arc;

use super::{
    config::AuthConfig,
    credentials::{CredentialStore, validate_password},
    errors::{AuthError, AuthResult},
    models::{
        AdminUserUpdate, LoginRequest, NewUser, PasswordResetConfirm, ProfileUpdate, Role,
        SignupRequest, UpdateMeRequest, UpdatePasswordRequest, User, UserId,
    },
    tokens::TokenSigner,
};
use crate::db::{StoreError, UserRepository, UserScope};
use crate::notify::Notifier;

/// Subject line of password reset emails
pub const RESET_EMAIL_SUBJECT: &str = "Your password reset token (valid for a limited time)";

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    credentials: CredentialStore,
    signer: TokenSigner,
    notifier: Arc<dyn Notifier>,
    reset_url_base: String,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - User repository
    /// * `notifier` - Delivers password reset tokens
    /// * `config` - Secrets, lifetimes and hashing cost
    ///
    /// # Returns
    ///
    /// * `AuthManager` - New authentication manager instance
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(Arc::clone(&users), config),
            signer: TokenSigner::new(&config.jwt_secret, config.token_ttl),
            users,
            notifier,
            reset_url_base: config.reset_url_base.trim_end_matches('/').to_string(),
        }
    }

    /// Credential store used by this manager
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Token signer used by this manager
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Register a new account with role `user` and sign a session token
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Blank name, malformed email, weak or mismatched password
    /// * `AuthError::EmailTaken` - Email already exists
    pub async fn signup(&self, request: SignupRequest) -> AuthResult<(User, String)> {
        let name = validate_name(&request.name)?;
        let email = normalize_email(&request.email)?;
        validate_password(&request.password)?;
        ensure_confirmed(&request.password, &request.password_confirm)?;

        let password_hash = self.credentials.hash_password(&request.password)?;
        let new_user = NewUser {
            name,
            email,
            photo: None,
            role: Role::User,
        };

        let user = self
            .users
            .create_user(&new_user, &password_hash)
            .await
            .map_err(map_email_conflict)?;

        log::info!("User {} signed up", user.id);
        let token = self.signer.sign(&user)?;
        Ok((user, token))
    }

    /// Log in with email and password
    ///
    /// Unknown emails, deactivated accounts and wrong passwords all fail with the same
    /// error.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - No matching active account
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, String)> {
        let email = request.email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email, UserScope::Active)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.credentials.verify_password(&user, &request.password) {
            log::debug!("Failed login for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer.sign(&user)?;
        Ok((user, token))
    }

    /// Resolve a bearer token to the active user it was issued for
    ///
    /// # Errors
    ///
    /// * `AuthError::JwtError` - Bad signature, malformed or expired token
    /// * `AuthError::UserNotFound` - Account deleted or deactivated
    /// * `AuthError::StaleSession` - Password changed after the token was issued
    pub async fn authenticate(&self, bearer: &str) -> AuthResult<User> {
        let token = bearer.strip_prefix("Bearer ").unwrap_or(bearer).trim();
        let claims = self.signer.verify(token)?;

        let user = self
            .users
            .find_by_id(claims.sub, UserScope::Active)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if CredentialStore::is_session_stale(&user, TokenSigner::issued_at(&claims)) {
            return Err(AuthError::StaleSession);
        }

        Ok(user)
    }

    /// Fail with `Forbidden` unless the user's role is listed
    pub fn restrict_to(user: &User, roles: &[Role]) -> AuthResult<()> {
        if roles.contains(&user.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Issue a reset token for an active account and deliver it
    ///
    /// A delivery failure is logged; the token stays valid and can be reissued.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No active account with this email
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let email = email.trim().to_lowercase();
        let mut user = self
            .users
            .find_by_email(&email, UserScope::Active)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self.credentials.issue_reset_token(&mut user).await?;
        let body = format!(
            "Forgot your password? Submit your new password and its confirmation to: {}/{}\n\
             If you didn't forget your password, please ignore this email.",
            self.reset_url_base, token
        );

        if let Err(e) = self
            .notifier
            .send(&user.email, RESET_EMAIL_SUBJECT, &body)
            .await
        {
            log::warn!("Failed to deliver reset token to user {}: {}", user.id, e);
        }

        Ok(())
    }

    /// Set a new password with a reset token and sign a fresh session token
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Weak or mismatched password
    /// * `AuthError::TokenInvalid` / `AuthError::TokenExpired`
    pub async fn reset_password(
        &self,
        request: PasswordResetConfirm,
    ) -> AuthResult<(User, String)> {
        ensure_confirmed(&request.password, &request.password_confirm)?;
        let user = self
            .credentials
            .consume_reset_token(&request.token, &request.password)
            .await?;

        log::info!("Password reset completed for user {}", user.id);
        let session = self.signer.sign(&user)?;
        Ok((user, session))
    }

    /// Change the password of a logged-in user
    ///
    /// Sessions issued before the change become stale; the returned token is not.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Current password is wrong
    /// * `AuthError::Validation` - Weak or mismatched new password
    pub async fn update_password(
        &self,
        user: &User,
        request: UpdatePasswordRequest,
    ) -> AuthResult<(User, String)> {
        let mut user = self
            .users
            .find_by_id(user.id, UserScope::Active)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .credentials
            .verify_password(&user, &request.current_password)
        {
            return Err(AuthError::InvalidCredentials);
        }
        ensure_confirmed(&request.password, &request.password_confirm)?;

        self.credentials
            .set_password(&mut user, &request.password)
            .await?;
        let token = self.signer.sign(&user)?;
        Ok((user, token))
    }

    /// Update name and email of the current user
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - The request carries a password field or bad values
    /// * `AuthError::EmailTaken` - New email belongs to another account
    pub async fn update_me(&self, user: &User, request: UpdateMeRequest) -> AuthResult<User> {
        if request.password.is_some() || request.password_confirm.is_some() {
            return Err(AuthError::Validation(
                "This route is not for password updates, use update_password".to_string(),
            ));
        }

        let update = ProfileUpdate {
            name: request.name.as_deref().map(validate_name).transpose()?,
            email: request.email.as_deref().map(normalize_email).transpose()?,
            role: None,
        };

        if update.is_empty() {
            return self
                .users
                .find_by_id(user.id, UserScope::Active)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        self.users
            .update_profile(user.id, &update)
            .await
            .map_err(map_email_conflict)?
            .ok_or(AuthError::UserNotFound)
    }

    /// Soft-delete the current user
    pub async fn deactivate(&self, user: &User) -> AuthResult<()> {
        self.users.set_active(user.id, false).await?;
        log::info!("User {} deactivated", user.id);
        Ok(())
    }

    /// Current state of the logged-in user
    pub async fn get_me(&self, user: &User) -> AuthResult<User> {
        self.get_user(user.id, UserScope::Active).await
    }

    /// Look up one account
    ///
    /// Role checks are the caller's job; see [`AuthManager::restrict_to`].
    pub async fn get_user(&self, user_id: UserId, scope: UserScope) -> AuthResult<User> {
        self.users
            .find_by_id(user_id, scope)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// List accounts ordered by ID
    pub async fn list_users(&self, scope: UserScope) -> AuthResult<Vec<User>> {
        Ok(self.users.list_users(scope).await?)
    }

    /// Change name, email or role of any account
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Blank name or malformed email
    /// * `AuthError::EmailTaken` - New email belongs to another account
    /// * `AuthError::UserNotFound` - No such account
    pub async fn update_user(&self, user_id: UserId, request: AdminUserUpdate) -> AuthResult<User> {
        let update = ProfileUpdate {
            name: request.name.as_deref().map(validate_name).transpose()?,
            email: request.email.as_deref().map(normalize_email).transpose()?,
            role: request.role,
        };

        if update.is_empty() {
            return self.get_user(user_id, UserScope::All).await;
        }

        let user = self
            .users
            .update_profile(user_id, &update)
            .await
            .map_err(map_email_conflict)?
            .ok_or(AuthError::UserNotFound)?;

        if let Some(role) = update.role {
            log::info!("User {} role set to {}", user.id, role);
        }
        Ok(user)
    }

    /// Permanently remove an account together with its reviews
    ///
    /// Rating summaries of the tours it reviewed are not recomputed here.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No such account
    pub async fn delete_user(&self, user_id: UserId) -> AuthResult<()> {
        if !self.users.delete_user(user_id).await? {
            return Err(AuthError::UserNotFound);
        }
        log::info!("User {} deleted", user_id);
        Ok(())
    }
}

fn map_email_conflict(err: StoreError) -> AuthError {
    if err.is_unique_violation() {
        AuthError::EmailTaken
    } else {
        AuthError::Store(err)
    }
}

fn ensure_confirmed(password: &str, confirm: &str) -> AuthResult<()> {
    if password != confirm {
        return Err(AuthError::Validation("Passwords are not the same".to_string()));
    }
    Ok(())
}

fn validate_name(name: &str) -> AuthResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("Please tell us your name".to_string()));
    }
    Ok(name.to_string())
}

/// Trim and lowercase an email, rejecting anything that does not look like an address
pub fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AuthError::Validation("Please provide a valid email".to_string()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jonas@Example.COM ").unwrap(), "jonas@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@localhost").is_err());
        assert!(normalize_email("a@b@example.com").is_err());
        assert!(normalize_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Ada ").unwrap(), "Ada");
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_ensure_confirmed() {
        assert!(ensure_confirmed("pass1234", "pass1234").is_ok());
        assert!(matches!(
            ensure_confirmed("pass1234", "pass12345"),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_map_email_conflict() {
        let err = map_email_conflict(StoreError::UniqueViolation("users_email_key".to_string()));
        assert!(matches!(err, AuthError::EmailTaken));

        let err = map_email_conflict(StoreError::Unavailable("down".to_string()));
        assert!(matches!(err, AuthError::Store(_)));
    }
}
