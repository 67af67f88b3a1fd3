use serde_json::Value;
use thiserror::Error;

/// Top-level error type for the `tantron-api` crate.
///
/// The cloud reports failures in three classes: the request never produced
/// a usable envelope (connection), the token was rejected (authentication),
/// or the envelope carried a non-success code (cloud). `tantron-core` maps
/// these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The cloud rejected the access token or the login credentials.
    #[error("Authentication failed (code {code}): {message}")]
    Authentication {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {status}")]
    Http { status: u16 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value could not be encoded (e.g. token with control chars).
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    // ── Envelope ────────────────────────────────────────────────────
    /// The body was not a JSON object carrying a `code` field.
    #[error("Malformed response envelope")]
    InvalidEnvelope { body: String },

    /// The envelope was fine but `data` did not match the expected shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Cloud ───────────────────────────────────────────────────────
    /// The envelope carried a non-success business code.
    #[error("Cloud error (code {code}): {message}")]
    Cloud {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    // ── Usage ───────────────────────────────────────────────────────
    /// A household-scoped call was made before a household was selected.
    #[error("Household id is not set")]
    MissingHousehold,
}

impl Error {
    /// Returns `true` if the request failed before a well-formed envelope
    /// was received.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Http { .. }
                | Self::InvalidEnvelope { .. }
                | Self::Deserialization { .. }
        )
    }

    /// Returns `true` if the token was rejected and logging in again
    /// might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Http { status } => *status >= 500 || *status == 429,
            Self::InvalidEnvelope { .. } => true,
            _ => false,
        }
    }

    /// Extract the cloud business code, if available.
    pub fn cloud_code(&self) -> Option<i64> {
        match self {
            Self::Authentication { code, .. } | Self::Cloud { code, .. } => Some(*code),
            _ => None,
        }
    }
}
