//! Bearer-credential verification.
//!
//! The API holds no session state; every request re-verifies its token
//! through a [`TokenVerifier`]. Deployment uses [`FirebaseVerifier`];
//! tests and credential-less development use [`StaticVerifier`].

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub mod firebase;

pub use firebase::FirebaseVerifier;

/// Authenticated caller context attached to requests by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token missing required claim '{0}'")]
    MissingClaim(&'static str),

    #[error("no signing key for kid '{0}'")]
    UnknownKey(String),

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, VerifyError>;
}

/// Fixed token → user map. Every unknown token is rejected.
#[derive(Default)]
pub struct StaticVerifier {
    users: HashMap<String, AuthUser>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, uid: &str, email: &str) -> Self {
        self.users.insert(
            token.to_string(),
            AuthUser {
                uid: uid.to_string(),
                email: email.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, VerifyError> {
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| VerifyError::InvalidToken("unrecognized token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_verifier_resolves_known_tokens_only() {
        let verifier = StaticVerifier::new().with_user("tok-a", "user-a", "a@example.com");

        let user = verifier.verify("tok-a").await.unwrap();
        assert_eq!(user.uid, "user-a");
        assert_eq!(user.email, "a@example.com");

        assert!(verifier.verify("tok-b").await.is_err());
    }
}
