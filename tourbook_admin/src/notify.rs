//! Delivery of operator-issued reset links.
//!
//! The admin CLI has no mail transport, so reset messages are written to the operator's
//! terminal for them to pass on.

use std::io::{self, Stdout, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use tourbook::notify::{Notifier, NotifyError};

/// Writes each message, body included, to an output stream
pub struct OperatorNotifier<W> {
    out: Mutex<W>,
}

impl OperatorNotifier<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> OperatorNotifier<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl<W: Write + Send> Notifier for OperatorNotifier<W> {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| NotifyError::Delivery("output lock poisoned".to_string()))?;

        writeln!(out, "To: {recipient}\nSubject: {subject}\n\n{body}")
            .and_then(|()| out.flush())
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tourbook::auth::{
        AuthConfig, AuthManager, LoginRequest, PasswordHashing, PasswordResetConfirm,
        SignupRequest,
    };
    use tourbook::db::MemoryStore;

    const RESET_URL_BASE: &str = "https://tours.example.com/reset";

    fn auth_config() -> AuthConfig {
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

    fn written(notifier: &OperatorNotifier<Vec<u8>>) -> String {
        String::from_utf8(notifier.out.lock().unwrap().clone()).unwrap()
    }

    #[tokio::test]
    async fn test_message_is_written_in_full() {
        let notifier = OperatorNotifier::new(Vec::new());
        notifier
            .send("a@example.com", "Reset", "line one\nline two")
            .await
            .unwrap();

        let text = written(&notifier);
        assert!(text.starts_with("To: a@example.com\nSubject: Reset\n"));
        assert!(text.contains("line one\nline two"));
    }

    #[tokio::test]
    async fn test_operator_receives_a_usable_reset_link() {
        let notifier = Arc::new(OperatorNotifier::new(Vec::new()));
        let auth = AuthManager::new(
            Arc::new(MemoryStore::new()),
            notifier.clone(),
            &auth_config(),
        );
        auth.signup(SignupRequest {
            name: "Kate Morrison".to_string(),
            email: "kate@example.com".to_string(),
            password: "pass1234".to_string(),
            password_confirm: "pass1234".to_string(),
        })
        .await
        .unwrap();

        auth.forgot_password("kate@example.com").await.unwrap();

        let text = written(&notifier);
        let start = text.find(RESET_URL_BASE).unwrap() + RESET_URL_BASE.len() + 1;
        let token = text[start..start + 64].to_string();

        auth.reset_password(PasswordResetConfirm {
            token,
            password: "operator1".to_string(),
            password_confirm: "operator1".to_string(),
        })
        .await
        .unwrap();
        assert!(
            auth.login(LoginRequest {
                email: "kate@example.com".to_string(),
                password: "operator1".to_string(),
            })
            .await
            .is_ok()
        );
    }
}
