//! Authentication module providing signup, login, password management and session checks.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - Single-use, time-limited password reset tokens stored only as SHA-256 digests
//! - HS256 JWT bearer tokens (90-day default lifetime)
//! - Rejection of sessions issued before the latest password change
//!
//! ## Example
//!
//! ```no_run
//! use tourbook::auth::{AuthConfig, AuthManager, SignupRequest};
//! use tourbook::db::{Database, DatabaseConfig};
//! use tourbook::notify::LogNotifier;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()?).await?;
//!     let auth = AuthManager::new(
//!         Arc::new(db.users()),
//!         Arc::new(LogNotifier),
//!         &AuthConfig::from_env()?,
//!     );
//!
//!     let (user, _token) = auth
//!         .signup(SignupRequest {
//!             name: "Laura Wilson".to_string(),
//!             email: "laura@example.com".to_string(),
//!             password: "pass1234".to_string(),
//!             password_confirm: "pass1234".to_string(),
//!         })
//!         .await?;
//!     println!("Signed up user {}", user.id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod errors;
pub mod manager;
pub mod models;
pub mod tokens;

pub use config::{AuthConfig, PasswordHashing};
pub use credentials::CredentialStore;
pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{
    AccessTokenClaims, AdminUserUpdate, Credential, LoginRequest, NewUser, PasswordResetConfirm,
    ProfileUpdate, Role, SignupRequest, UpdateMeRequest, UpdatePasswordRequest, User, UserId,
};
pub use tokens::TokenSigner;
