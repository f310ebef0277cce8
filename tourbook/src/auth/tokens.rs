//! Bearer token signing and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::errors::{AuthError, AuthResult};
use super::models::{AccessTokenClaims, User};

/// Signs and verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Sign an access token for `user`, issued now
    pub fn sign(&self, user: &User) -> AuthResult<String> {
        self.sign_at(user, Utc::now())
    }

    /// Sign an access token with an explicit issue time
    pub fn sign_at(&self, user: &User, issued_at: DateTime<Utc>) -> AuthResult<String> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::ClockOverflow)?;
        let claims = AccessTokenClaims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(token_data.claims)
    }

    /// Issue time carried by the claims (second precision)
    pub fn issued_at(claims: &AccessTokenClaims) -> DateTime<Utc> {
        DateTime::from_timestamp(claims.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
