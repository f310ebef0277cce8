//! Integration tests for the account flows.
//!
//! Tests signup, login, bearer authentication, stale sessions, password reset by email,
//! profile updates and deactivation.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tourbook::auth::{
    AdminUserUpdate, AuthConfig, AuthError, AuthManager, LoginRequest, PasswordHashing,
    PasswordResetConfirm, Role, SignupRequest, UpdateMeRequest, UpdatePasswordRequest, User,
};
use tourbook::db::{MemoryStore, UserScope};
use tourbook::notify::{Notifier, NotifyError};

const RESET_URL_BASE: &str = "https://tours.example.com/reset";

/// Captures every message instead of sending it
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unreachable".to_string()))
    }
}

fn test_config() -> AuthConfig {
    let mut config = AuthConfig::new(
        "test_secret_key_for_jwt_signing_000".to_string(),
        "test_pepper_value_16".to_string(),
    );
    config.hashing = PasswordHashing {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    config.reset_url_base = RESET_URL_BASE.to_string();
    config
}

fn setup() -> (AuthManager, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let auth = AuthManager::new(
        Arc::new(MemoryStore::new()),
        notifier.clone(),
        &test_config(),
    );
    (auth, notifier)
}

fn signup_request(email: &str) -> SignupRequest {
    SignupRequest {
        name: "Sophie Louise Hart".to_string(),
        email: email.to_string(),
        password: "pass1234".to_string(),
        password_confirm: "pass1234".to_string(),
    }
}

fn credentials(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn password_change(current: &str, password: &str, confirm: &str) -> UpdatePasswordRequest {
    UpdatePasswordRequest {
        current_password: current.to_string(),
        password: password.to_string(),
        password_confirm: confirm.to_string(),
    }
}

fn reset_confirm(token: &str, password: &str) -> PasswordResetConfirm {
    PasswordResetConfirm {
        token: token.to_string(),
        password: password.to_string(),
        password_confirm: password.to_string(),
    }
}

async fn signed_up(auth: &AuthManager, email: &str) -> (User, String) {
    auth.signup(signup_request(email)).await.unwrap()
}

/// Pull the plaintext token out of the reset email body
fn token_from_body(body: &str) -> String {
    let start = body.find(RESET_URL_BASE).unwrap() + RESET_URL_BASE.len() + 1;
    body[start..start + 64].to_string()
}

#[tokio::test]
async fn test_signup_normalizes_email_and_authenticates() {
    let (auth, _) = setup();
    let (user, token) = signed_up(&auth, "  Sophie@Example.com ").await;

    assert_eq!(user.email, "sophie@example.com");
    assert_eq!(user.role, Role::User);
    assert!(user.active);

    let current = auth.authenticate(&format!("Bearer {token}")).await.unwrap();
    assert_eq!(current.id, user.id);
}

#[tokio::test]
async fn test_signup_rejects_duplicate_email() {
    let (auth, _) = setup();
    signed_up(&auth, "sophie@example.com").await;

    let result = auth.signup(signup_request("SOPHIE@example.com")).await;
    assert!(matches!(result, Err(AuthError::EmailTaken)));
}

#[tokio::test]
async fn test_signup_requires_matching_confirmation() {
    let (auth, _) = setup();
    let mut request = signup_request("sophie@example.com");
    request.password_confirm = "pass12345".to_string();

    assert!(matches!(
        auth.signup(request).await,
        Err(AuthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;

    let wrong_password = auth.login(credentials("sophie@example.com", "wrongpass1")).await;
    let unknown_email = auth.login(credentials("nobody@example.com", "pass1234")).await;

    auth.deactivate(&user).await.unwrap();
    let inactive = auth.login(credentials("sophie@example.com", "pass1234")).await;

    for result in [wrong_password, unknown_email, inactive] {
        let err = result.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.client_message(), "Incorrect email or password");
    }
}

#[tokio::test]
async fn test_login_with_mixed_case_email() {
    let (auth, _) = setup();
    signed_up(&auth, "sophie@example.com").await;
    assert!(auth.login(credentials("Sophie@Example.com", "pass1234")).await.is_ok());
}

#[tokio::test]
async fn test_deactivated_user_cannot_authenticate() {
    let (auth, _) = setup();
    let (user, token) = signed_up(&auth, "sophie@example.com").await;
    auth.deactivate(&user).await.unwrap();

    assert!(matches!(
        auth.authenticate(&token).await,
        Err(AuthError::UserNotFound)
    ));
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let (auth, _) = setup();
    let (_, token) = signed_up(&auth, "sophie@example.com").await;
    let tampered = format!("{}x", token);

    assert!(matches!(
        auth.authenticate(&tampered).await,
        Err(AuthError::JwtError(_))
    ));
}

#[tokio::test]
async fn test_password_update_makes_old_sessions_stale() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;
    let old_token = auth
        .signer()
        .sign_at(&user, Utc::now() - Duration::minutes(5))
        .unwrap();
    assert!(auth.authenticate(&old_token).await.is_ok());

    let (_, new_token) = auth
        .update_password(&user, password_change("pass1234", "newpass123", "newpass123"))
        .await
        .unwrap();

    assert!(matches!(
        auth.authenticate(&old_token).await,
        Err(AuthError::StaleSession)
    ));
    assert!(auth.authenticate(&new_token).await.is_ok());
    assert!(auth.login(credentials("sophie@example.com", "newpass123")).await.is_ok());
}

#[tokio::test]
async fn test_update_password_requires_current_password() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;

    let result = auth
        .update_password(&user, password_change("notmypass", "newpass123", "newpass123"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    assert!(auth.login(credentials("sophie@example.com", "pass1234")).await.is_ok());
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let (auth, notifier) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;
    let old_token = auth
        .signer()
        .sign_at(&user, Utc::now() - Duration::minutes(5))
        .unwrap();

    auth.forgot_password("sophie@example.com").await.unwrap();

    let sent = notifier.sent.lock().await.clone();
    assert_eq!(sent.len(), 1);
    let (recipient, _, body) = &sent[0];
    assert_eq!(recipient, "sophie@example.com");
    let reset_token = token_from_body(body);

    let (reset_user, session) = auth
        .reset_password(reset_confirm(&reset_token, "resetpass1"))
        .await
        .unwrap();
    assert_eq!(reset_user.id, user.id);
    assert!(auth.authenticate(&session).await.is_ok());
    assert!(matches!(
        auth.authenticate(&old_token).await,
        Err(AuthError::StaleSession)
    ));

    assert!(auth.login(credentials("sophie@example.com", "resetpass1")).await.is_ok());
    assert!(matches!(
        auth.reset_password(reset_confirm(&reset_token, "again12345")).await,
        Err(AuthError::TokenInvalid)
    ));
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let (auth, notifier) = setup();
    let result = auth.forgot_password("ghost@example.com").await;

    assert!(matches!(result, Err(AuthError::UserNotFound)));
    assert!(notifier.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_delivery_failure_is_not_fatal() {
    let store = MemoryStore::new();
    let auth = AuthManager::new(Arc::new(store), Arc::new(FailingNotifier), &test_config());
    signed_up(&auth, "sophie@example.com").await;

    assert!(auth.forgot_password("sophie@example.com").await.is_ok());
}

#[tokio::test]
async fn test_update_me_rejects_password_fields() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;

    let result = auth
        .update_me(
            &user,
            UpdateMeRequest {
                name: Some("Sophie".to_string()),
                password: Some("sneaky123".to_string()),
                ..UpdateMeRequest::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AuthError::Validation(_))));
    assert!(auth.login(credentials("sophie@example.com", "pass1234")).await.is_ok());
}

#[tokio::test]
async fn test_update_me_applies_name_and_email() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;
    signed_up(&auth, "taken@example.com").await;

    let updated = auth
        .update_me(
            &user,
            UpdateMeRequest {
                name: Some("Sophie Hart".to_string()),
                email: Some("New@Example.com".to_string()),
                ..UpdateMeRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Sophie Hart");
    assert_eq!(updated.email, "new@example.com");

    let conflict = auth
        .update_me(
            &updated,
            UpdateMeRequest {
                email: Some("taken@example.com".to_string()),
                ..UpdateMeRequest::default()
            },
        )
        .await;
    assert!(matches!(conflict, Err(AuthError::EmailTaken)));
}

#[tokio::test]
async fn test_restrict_to_roles() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;

    assert!(AuthManager::restrict_to(&user, &[Role::User, Role::Admin]).is_ok());
    assert!(matches!(
        AuthManager::restrict_to(&user, &[Role::Admin, Role::LeadGuide]),
        Err(AuthError::Forbidden)
    ));
}

#[tokio::test]
async fn test_get_me_reflects_profile_changes() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;
    auth.update_me(
        &user,
        UpdateMeRequest {
            name: Some("Sophie Hart".to_string()),
            ..UpdateMeRequest::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(auth.get_me(&user).await.unwrap().name, "Sophie Hart");
    auth.deactivate(&user).await.unwrap();
    assert!(matches!(auth.get_me(&user).await, Err(AuthError::UserNotFound)));
}

#[tokio::test]
async fn test_admin_reads_respect_scope() {
    let (auth, _) = setup();
    let (active, _) = signed_up(&auth, "sophie@example.com").await;
    let (inactive, _) = signed_up(&auth, "max@example.com").await;
    auth.deactivate(&inactive).await.unwrap();

    let listed = auth.list_users(UserScope::Active).await.unwrap();
    assert_eq!(listed.iter().map(|u| u.id).collect::<Vec<_>>(), vec![active.id]);
    assert_eq!(auth.list_users(UserScope::All).await.unwrap().len(), 2);

    assert!(matches!(
        auth.get_user(inactive.id, UserScope::Active).await,
        Err(AuthError::UserNotFound)
    ));
    assert!(!auth.get_user(inactive.id, UserScope::All).await.unwrap().active);
}

#[tokio::test]
async fn test_admin_update_changes_role_but_not_password() {
    let (auth, _) = setup();
    let (user, _) = signed_up(&auth, "sophie@example.com").await;
    signed_up(&auth, "taken@example.com").await;

    let promoted = auth
        .update_user(
            user.id,
            AdminUserUpdate {
                role: Some(Role::Guide),
                email: Some(" Guide@Example.com".to_string()),
                ..AdminUserUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Guide);
    assert_eq!(promoted.email, "guide@example.com");
    assert!(auth.login(credentials("guide@example.com", "pass1234")).await.is_ok());

    let conflict = auth
        .update_user(
            user.id,
            AdminUserUpdate {
                email: Some("taken@example.com".to_string()),
                ..AdminUserUpdate::default()
            },
        )
        .await;
    assert!(matches!(conflict, Err(AuthError::EmailTaken)));
    let missing = auth
        .update_user(
            9999,
            AdminUserUpdate {
                name: Some("Nobody".to_string()),
                ..AdminUserUpdate::default()
            },
        )
        .await;
    assert!(matches!(missing, Err(AuthError::UserNotFound)));
}

#[tokio::test]
async fn test_admin_delete_removes_account() {
    let (auth, _) = setup();
    let (user, token) = signed_up(&auth, "sophie@example.com").await;

    auth.delete_user(user.id).await.unwrap();

    assert!(matches!(
        auth.get_user(user.id, UserScope::All).await,
        Err(AuthError::UserNotFound)
    ));
    assert!(matches!(
        auth.authenticate(&token).await,
        Err(AuthError::UserNotFound)
    ));
    assert!(matches!(
        auth.delete_user(user.id).await,
        Err(AuthError::UserNotFound)
    ));
}
