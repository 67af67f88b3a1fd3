// ── Core error types ──
//
// User-facing errors from tantron-core. Consumers never see envelope codes
// or JSON parse failures directly. The `From<tantron_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Tantron cloud: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Cloud errors ─────────────────────────────────────────────────
    #[error("Cloud rejected the request (code {code}): {message}")]
    Cloud { code: i64, message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Hub has not been initialized")]
    NotInitialized,

    #[error("Hub has been shut down")]
    ShutDown,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout)
    }

    /// Whether the user has to log in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tantron_api::Error> for CoreError {
    fn from(err: tantron_api::Error) -> Self {
        match err {
            tantron_api::Error::Authentication { code, message, .. } => {
                CoreError::AuthenticationFailed {
                    message: format!("{message} (code {code})"),
                }
            }
            tantron_api::Error::Transport(ref e) if e.is_timeout() => CoreError::Timeout,
            tantron_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            tantron_api::Error::Http { status } => CoreError::ConnectionFailed {
                reason: format!("HTTP status {status}"),
            },
            tantron_api::Error::InvalidEnvelope { .. } => CoreError::ConnectionFailed {
                reason: "malformed response envelope".into(),
            },
            tantron_api::Error::Deserialization { message, body: _ } => {
                CoreError::ConnectionFailed {
                    reason: format!("unexpected response payload: {message}"),
                }
            }
            tantron_api::Error::Cloud { code, message, .. } => CoreError::Cloud { code, message },
            tantron_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            tantron_api::Error::InvalidHeader(reason) => CoreError::Config {
                message: format!("Invalid access token: {reason}"),
            },
            tantron_api::Error::MissingHousehold => CoreError::Config {
                message: "no household selected".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_failures_are_retryable() {
        let err = CoreError::from(tantron_api::Error::InvalidEnvelope {
            body: "<html>".into(),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn forbidden_requires_reauth() {
        let err = CoreError::from(tantron_api::Error::Authentication {
            code: 403,
            message: "expired".into(),
            data: None,
        });
        assert!(err.requires_reauth());
        assert!(!err.is_retryable());
    }

    #[test]
    fn cloud_code_is_preserved() {
        let err = CoreError::from(tantron_api::Error::Cloud {
            code: 500,
            message: "busy".into(),
            data: None,
        });
        assert!(matches!(err, CoreError::Cloud { code: 500, .. }));
    }
}
