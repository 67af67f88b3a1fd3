// Tantron cloud HTTP client
//
// Wraps `reqwest::Client` with URL construction, token injection and
// `{ code, message, data }` envelope unwrapping. Endpoint groups (auth,
// household, devices) are implemented as inherent methods in separate
// files to keep this module focused on transport mechanics.

use std::time::Duration;

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Production endpoint of the Tantron cloud.
pub const BASE_URL: &str = "https://smart.i-ttg.net/";

/// User agent the cloud expects from its mobile clients.
pub const USER_AGENT: &str = "TantronAssistant/1.1.8 (iPhone; iOS 18.2; Scale/3.00)";

/// Header carrying the access token on authenticated calls.
pub const HEADER_TOKEN: &str = "access_token";

const CODE_OK: i64 = 200;
const CODE_FORBIDDEN: i64 = 403;

/// How long a request may take before the client gives up on it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deadline {
    /// The configured per-request timeout.
    Default,
    /// No client-side limit; used by the state long-poll.
    Unbounded,
}

/// Raw HTTP client for the Tantron cloud.
///
/// All methods return the unwrapped `data` payload. The access token is
/// held behind a lock so a shared client can log in again without being
/// rebuilt.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    token: RwLock<Option<SecretString>>,
    household_id: Option<String>,
}

impl CloudClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            request_timeout: transport.request_timeout,
            token: RwLock::new(None),
            household_id: None,
        })
    }

    /// Create a client against the production cloud.
    pub fn production(transport: &TransportConfig) -> Result<Self, Error> {
        Self::new(Url::parse(BASE_URL)?, transport)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            request_timeout: TransportConfig::default().request_timeout,
            token: RwLock::new(None),
            household_id: None,
        }
    }

    /// Use an existing access token for all authenticated calls.
    pub fn with_token(self, token: SecretString) -> Self {
        Self {
            token: RwLock::new(Some(token)),
            ..self
        }
    }

    /// Scope household-level calls to `household_id`.
    pub fn with_household(self, household_id: impl Into<String>) -> Self {
        Self {
            household_id: Some(household_id.into()),
            ..self
        }
    }

    /// The cloud base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The selected household, if any.
    pub fn household_id(&self) -> Option<&str> {
        self.household_id.as_deref()
    }

    pub(crate) fn require_household(&self) -> Result<&str, Error> {
        self.household_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingHousehold)
    }

    /// The current access token, if logged in.
    pub async fn token(&self) -> Option<SecretString> {
        self.token.read().await.clone()
    }

    /// Replace (or clear) the access token.
    pub async fn set_token(&self, token: Option<SecretString>) {
        *self.token.write().await = token;
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send an authenticated GET request and unwrap the envelope.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);

        let builder = self.http.get(url).query(query);
        self.send(builder, true, Deadline::Default).await
    }

    /// Send an authenticated POST request with JSON body.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
        deadline: Deadline,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);

        let builder = self.http.post(url).json(body);
        self.send(builder, true, deadline).await
    }

    /// Send a POST request without the access token (login).
    pub(crate) async fn post_anonymous<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);

        let builder = self.http.post(url).json(body);
        self.send(builder, false, Deadline::Default).await
    }

    /// Send an authenticated PUT request with JSON body.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {}", url);

        let builder = self.http.put(url).json(body);
        self.send(builder, true, Deadline::Default).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut builder: reqwest::RequestBuilder,
        authenticated: bool,
        deadline: Deadline,
    ) -> Result<T, Error> {
        if authenticated {
            if let Some(token) = self.token.read().await.as_ref() {
                let mut value = HeaderValue::from_str(token.expose_secret())
                    .map_err(|e| Error::InvalidHeader(e.to_string()))?;
                value.set_sensitive(true);
                builder = builder.header(HEADER_TOKEN, value);
            }
        }

        if let Deadline::Default = deadline {
            builder = builder.timeout(self.request_timeout);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        parse_envelope(resp).await
    }
}

/// Parse the `{ code, message, data }` envelope, returning `data` on
/// success.
///
/// `code == 403` means the token (or login) was rejected; any other
/// non-200 code is a cloud error. A body that isn't an object with a
/// `code` is treated as a connection failure.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    unwrap_envelope(&body)
}

pub(crate) fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let invalid = || Error::InvalidEnvelope {
        body: body.to_owned(),
    };

    let Ok(Value::Object(mut envelope)) = serde_json::from_str::<Value>(body) else {
        return Err(invalid());
    };

    let code = match envelope.get("code") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;

    let data = envelope.remove("data").unwrap_or(Value::Null);

    if code != CODE_OK {
        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| "unknown error".to_owned(), str::to_owned);
        let data = (!data.is_null()).then_some(data);
        return Err(if code == CODE_FORBIDDEN {
            Error::Authentication {
                code,
                message,
                data,
            }
        } else {
            Error::Cloud {
                code,
                message,
                data,
            }
        });
    }

    serde_json::from_value(data).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_returns_data() {
        let data: Value = unwrap_envelope(r#"{"code":200,"data":{"a":1}}"#).unwrap();
        assert_eq!(data, json!({ "a": 1 }));
    }

    #[test]
    fn missing_data_decodes_as_null() {
        let data: Option<Value> = unwrap_envelope(r#"{"code":200}"#).unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn forbidden_maps_to_authentication() {
        let err = unwrap_envelope::<Value>(r#"{"code":403,"message":"token expired"}"#).unwrap_err();
        assert!(err.is_auth_expired());
        assert_eq!(err.cloud_code(), Some(403));
    }

    #[test]
    fn other_codes_map_to_cloud_error_with_default_message() {
        let err = unwrap_envelope::<Value>(r#"{"code":500,"data":{"x":1}}"#).unwrap_err();
        match err {
            Error::Cloud {
                code,
                message,
                data,
            } => {
                assert_eq!(code, 500);
                assert_eq!(message, "unknown error");
                assert_eq!(data, Some(json!({ "x": 1 })));
            }
            other => panic!("expected Cloud error, got {other:?}"),
        }
    }

    #[test]
    fn non_object_or_codeless_body_is_connection_error() {
        for body in ["[1,2]", "not json", r#"{"data":1}"#, r#"{"code":null}"#] {
            let err = unwrap_envelope::<Value>(body).unwrap_err();
            assert!(err.is_connection(), "{body} should be a connection error");
        }
    }

    #[test]
    fn string_code_is_accepted() {
        let data: i64 = unwrap_envelope(r#"{"code":"200","data":7}"#).unwrap();
        assert_eq!(data, 7);
    }

    #[test]
    fn shape_mismatch_is_deserialization_error() {
        let err = unwrap_envelope::<Vec<String>>(r#"{"code":200,"data":{"a":1}}"#).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
        assert!(err.is_connection());
    }
}
