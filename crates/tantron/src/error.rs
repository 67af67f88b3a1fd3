//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tantron_config::ConfigError;
use tantron_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Tantron cloud: {reason}")]
    #[diagnostic(
        code(tantron::connection_failed),
        help("Check your network connection, or retry with -vv for request logs.")
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(tantron::timeout),
        help("Increase the timeout with --timeout or in your profile.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(tantron::auth_failed),
        help(
            "The access token expired or the password is wrong.\n\
             Run: tantron login --show-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(tantron::no_credentials),
        help(
            "Set token or phone/password in the profile,\n\
             or export TANTRON_TOKEN, or TANTRON_PHONE and TANTRON_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(tantron::not_found),
        help("Run: tantron {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Cloud ────────────────────────────────────────────────────────

    #[error("Cloud error ({code}): {message}")]
    #[diagnostic(code(tantron::cloud_error))]
    CloudError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tantron::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tantron::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No household configured")]
    #[diagnostic(
        code(tantron::no_config),
        help(
            "Pass --household, or add a profile to {path}\n\
             Run: tantron login to list your households."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(tantron::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(tantron::json), help("Check the JSON payload and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(tantron::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout => CliError::Timeout,
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices".into(),
            },
            CoreError::Cloud { code, message } => CliError::CloudError {
                code: code.to_string(),
                message,
            },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::NotInitialized => CliError::CloudError {
                code: "lifecycle".into(),
                message: "hub has not been initialized".into(),
            },
            CoreError::ShutDown => CliError::CloudError {
                code: "lifecycle".into(),
                message: "hub has been shut down".into(),
            },
            CoreError::Internal(message) => CliError::CloudError {
                code: "internal".into(),
                message,
            },
        }
    }
}

impl From<tantron_api::Error> for CliError {
    fn from(err: tantron_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Figment(inner) => CliError::Config(inner),
        }
    }
}
