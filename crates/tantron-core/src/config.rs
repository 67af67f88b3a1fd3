// ── Runtime hub configuration ──
//
// These types describe how to reach a household through the cloud and how
// the synchronization loops are paced. They carry credential data but
// never touch disk; the CLI builds a `HubConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// How to authenticate with the cloud.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A previously issued access token.
    Token(SecretString),
    /// Phone number and password (plain, or already SHA-256 hex).
    Password { phone: String, password: SecretString },
}

/// Pacing of the state subscription loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Wait between checks while the registry has no devices.
    pub idle_wait: Duration,
    /// Pause after each successful poll.
    pub poll_pause: Duration,
    /// Pause after a failed poll.
    pub error_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            idle_wait: Duration::from_secs(1),
            poll_pause: Duration::from_millis(100),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// Configuration for one household hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Cloud endpoint. `None` uses the production cloud.
    pub base_url: Option<Url>,
    pub credentials: Credentials,
    pub household_id: String,
    /// Timeout for ordinary requests. The state long-poll has none.
    pub timeout: Duration,
    /// How often to reload gateway and devices. Zero disables it.
    pub refresh_interval: Duration,
    pub sync: SyncConfig,
}

impl HubConfig {
    pub fn new(credentials: Credentials, household_id: impl Into<String>) -> Self {
        Self {
            base_url: None,
            credentials,
            household_id: household_id.into(),
            timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(60 * 60),
            sync: SyncConfig::default(),
        }
    }
}
