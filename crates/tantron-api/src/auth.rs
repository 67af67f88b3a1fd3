// Login and token cache
//
// The cloud issues an opaque access token per login. Logging in again
// invalidates the WeChat mini-program session, so tokens are cached per
// phone number and re-verified with `get_user` before a fresh login.

use std::sync::Arc;

use dashmap::DashMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::client::CloudClient;
use crate::error::Error;
use crate::models::LoginPayload;

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

// ── TokenCache ──────────────────────────────────────────────────────

/// Access tokens keyed by phone number.
///
/// Cheaply cloneable; clones share the same entries. A cached token that
/// fails verification is evicted before the fresh login is attempted.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    tokens: Arc<DashMap<String, SecretString>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, phone: &str) -> Option<SecretString> {
        self.tokens.get(phone).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, phone: impl Into<String>, token: SecretString) {
        self.tokens.insert(phone.into(), token);
    }

    pub fn invalidate(&self, phone: &str) {
        self.tokens.remove(phone);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// ── Password hashing ────────────────────────────────────────────────

/// Hex SHA-256 of `password`, unless it already looks like one.
pub fn password_digest(password: &str) -> String {
    if password.len() == DIGEST_HEX_LEN && password.bytes().all(|b| b.is_ascii_hexdigit()) {
        return password.to_owned();
    }
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    phone: &'a str,
    password: &'a str,
}

// ── Login ───────────────────────────────────────────────────────────

impl CloudClient {
    /// Authenticate and return the access token.
    ///
    /// Reuses the cached token for `phone` when the cloud still accepts it.
    /// On success the client uses the token for all subsequent calls. A
    /// cloud-level rejection of the login itself is reported as
    /// [`Error::Authentication`].
    pub async fn login(
        &self,
        phone: &str,
        password: &SecretString,
        cache: &TokenCache,
    ) -> Result<SecretString, Error> {
        if let Some(cached) = cache.get(phone) {
            self.set_token(Some(cached.clone())).await;
            match self.get_user().await {
                Ok(Value::Null) => debug!("cached token returned no user"),
                Ok(_) => {
                    debug!("reusing cached access token");
                    return Ok(cached);
                }
                Err(e) => debug!(error = %e, "cached access token rejected"),
            }
            self.set_token(None).await;
            cache.invalidate(phone);
        }

        let digest = password_digest(password.expose_secret());
        let payload: LoginPayload = self
            .post_anonymous(
                "user-service/wei_xin_mini_program/login",
                &LoginRequest {
                    phone,
                    password: &digest,
                },
            )
            .await
            .map_err(|e| match e {
                Error::Cloud {
                    code,
                    message,
                    data,
                } => Error::Authentication {
                    code,
                    message,
                    data,
                },
                other => other,
            })?;

        let token = SecretString::from(payload.access_token);
        self.set_token(Some(token.clone())).await;
        cache.insert(phone, token.clone());
        debug!("login succeeded");
        Ok(token)
    }

    /// Fetch the authenticated user's profile.
    pub async fn get_user(&self) -> Result<Value, Error> {
        self.get("user-service/user", &[]).await
    }
}
