//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by Google's `securetoken` service account.
//! The JWK set is fetched once and cached; an unknown `kid` or an expired
//! cache triggers a refetch. Issuer and audience are pinned to the project.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{AuthUser, TokenVerifier, VerifyError};

const JWK_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const KEY_CACHE_TTL_SECS: i64 = 3600;

pub struct FirebaseVerifier {
    http: reqwest::Client,
    project_id: String,
    keys: RwLock<KeyCache>,
}

#[derive(Default)]
struct KeyCache {
    /// kid → RSA (n, e) components, base64url-encoded as published
    by_kid: HashMap<String, (String, String)>,
    fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
}

impl FirebaseVerifier {
    pub fn new(http: reqwest::Client, project_id: impl Into<String>) -> Self {
        Self {
            http,
            project_id: project_id.into(),
            keys: RwLock::new(KeyCache::default()),
        }
    }

    /// Return the RSA components for `kid`, refetching the JWK set when the
    /// cache is stale or the kid is unknown (key rotation).
    async fn key_for(&self, kid: &str) -> Result<(String, String), VerifyError> {
        {
            let cache = self.keys.read().await;
            if let Some(found) = cache.lookup(kid) {
                return Ok(found);
            }
        }

        let mut cache = self.keys.write().await;
        // Another task may have refreshed while we waited on the lock
        if let Some(found) = cache.lookup(kid) {
            return Ok(found);
        }

        let set: JwkSet = self
            .http
            .get(JWK_URL)
            .send()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        cache.by_kid = set
            .keys
            .into_iter()
            .map(|k| (k.kid, (k.n, k.e)))
            .collect();
        cache.fetched_at = Some(Utc::now());

        cache
            .by_kid
            .get(kid)
            .cloned()
            .ok_or_else(|| VerifyError::UnknownKey(kid.to_string()))
    }
}

impl KeyCache {
    fn lookup(&self, kid: &str) -> Option<(String, String)> {
        let fresh = self
            .fetched_at
            .map(|t| Utc::now() - t < Duration::seconds(KEY_CACHE_TTL_SECS))
            .unwrap_or(false);
        if fresh {
            self.by_kid.get(kid).cloned()
        } else {
            None
        }
    }
}

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, VerifyError> {
        let header =
            decode_header(token).map_err(|e| VerifyError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or(VerifyError::MissingClaim("kid"))?;

        let (n, e) = self.key_for(&kid).await?;
        let key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);

        let data = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| VerifyError::InvalidToken(e.to_string()))?;

        if data.claims.sub.is_empty() {
            return Err(VerifyError::MissingClaim("sub"));
        }

        Ok(AuthUser {
            uid: data.claims.sub,
            email: data.claims.email.unwrap_or_default(),
        })
    }
}
