//! Shared configuration for Tantron tools.
//!
//! TOML profiles, credential resolution (env + plaintext), and translation
//! to `tantron_core::HubConfig`. Configuration is read-only: nothing here
//! writes to disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tantron_core::{Credentials, HubConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named household profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick `name`, else the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { profile: name }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Full refresh interval, seconds. 0 disables periodic refresh.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    60 * 60
}

/// A named household profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account phone number.
    pub phone: Option<String>,

    /// Password (plaintext or SHA-256 hex; prefer an env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Access token from a previous login.
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    pub token_env: Option<String>,

    /// Household id.
    pub household: Option<String>,

    /// Cloud base URL override.
    pub base_url: Option<String>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override refresh interval.
    pub refresh_interval_secs: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tantron", "tantron").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tantron");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys are `TANTRON_` prefixed with `__` as the nesting
/// separator, e.g. `TANTRON_PROFILES__HOME__HOUSEHOLD`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TANTRON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolve credentials from the profile and the process environment.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(profile, profile_name, process_env)
}

/// Resolve credentials with an explicit environment lookup.
///
/// A token wins over a password. Each secret is looked up in order: the
/// profile's `*_env` variable, the `TANTRON_TOKEN` / `TANTRON_PASSWORD`
/// variable, then the plaintext profile value.
pub fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, ConfigError> {
    let from_chain = |named: Option<&String>, global: &str, plain: Option<&String>| {
        named
            .and_then(|var| env(var))
            .or_else(|| env(global))
            .or_else(|| plain.cloned())
            .filter(|s| !s.is_empty())
    };

    if let Some(token) = from_chain(
        profile.token_env.as_ref(),
        "TANTRON_TOKEN",
        profile.token.as_ref(),
    ) {
        return Ok(Credentials::Token(SecretString::from(token)));
    }

    let phone = profile
        .phone
        .clone()
        .or_else(|| env("TANTRON_PHONE"))
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let password = from_chain(
        profile.password_env.as_ref(),
        "TANTRON_PASSWORD",
        profile.password.as_ref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })?;

    Ok(Credentials::Password {
        phone,
        password: SecretString::from(password),
    })
}

/// Build a `HubConfig` from a profile, without CLI flag overrides.
pub fn profile_to_hub_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    let household = profile
        .household
        .clone()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConfigError::Validation {
            field: "household".into(),
            reason: format!("profile '{profile_name}' has no household id"),
        })?;

    let base_url = profile
        .base_url
        .as_deref()
        .map(|raw| {
            raw.parse::<url::Url>().map_err(|_| ConfigError::Validation {
                field: "base_url".into(),
                reason: format!("invalid URL: {raw}"),
            })
        })
        .transpose()?;

    let credentials = resolve_credentials(profile, profile_name)?;

    let mut config = HubConfig::new(credentials, household);
    config.base_url = base_url;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.refresh_interval = Duration::from_secs(
        profile
            .refresh_interval_secs
            .unwrap_or(defaults.refresh_interval_secs),
    );
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn loads_profiles_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_profile = "home"

[defaults]
timeout = 10

[profiles.home]
phone = "13800000000"
password_env = "HOME_PW"
household = "H1"
refresh_interval_secs = 600
"#
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.defaults.timeout, 10);
        assert_eq!(config.defaults.output, "table");

        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(profile.household.as_deref(), Some("H1"));
        assert_eq!(profile.refresh_interval_secs, Some(600));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert!(config.profiles.is_empty());
        assert!(matches!(
            config.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn token_wins_over_password() {
        let profile = Profile {
            phone: Some("138".into()),
            password: Some("pw".into()),
            token: Some("tok".into()),
            ..Profile::default()
        };
        let creds = resolve_credentials_with(&profile, "p", no_env).unwrap();
        let Credentials::Token(token) = creds else {
            panic!("expected token credentials");
        };
        assert_eq!(token.expose_secret(), "tok");
    }

    #[test]
    fn password_env_beats_plaintext() {
        let profile = Profile {
            phone: Some("138".into()),
            password: Some("plain".into()),
            password_env: Some("MY_PW".into()),
            ..Profile::default()
        };
        let env = |name: &str| (name == "MY_PW").then(|| "from-env".to_owned());
        let Credentials::Password { phone, password } =
            resolve_credentials_with(&profile, "p", env).unwrap()
        else {
            panic!("expected password credentials");
        };
        assert_eq!(phone, "138");
        assert_eq!(password.expose_secret(), "from-env");
    }

    #[test]
    fn no_secret_is_an_error() {
        let profile = Profile {
            phone: Some("138".into()),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_credentials_with(&profile, "p", no_env),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn hub_config_requires_household_and_valid_url() {
        let defaults = Defaults::default();
        let profile = Profile {
            token: Some("tok".into()),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_hub_config(&profile, "p", &defaults),
            Err(ConfigError::Validation { ref field, .. }) if field == "household"
        ));

        let profile = Profile {
            token: Some("tok".into()),
            household: Some("H1".into()),
            base_url: Some("not a url".into()),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_hub_config(&profile, "p", &defaults),
            Err(ConfigError::Validation { ref field, .. }) if field == "base_url"
        ));
    }

    #[test]
    fn hub_config_applies_defaults_and_overrides() {
        let defaults = Defaults {
            timeout: 12,
            ..Defaults::default()
        };
        let profile = Profile {
            token: Some("tok".into()),
            household: Some("H1".into()),
            base_url: Some("http://127.0.0.1:8080/".into()),
            refresh_interval_secs: Some(0),
            ..Profile::default()
        };
        let config = profile_to_hub_config(&profile, "p", &defaults).unwrap();
        assert_eq!(config.household_id, "H1");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert!(config.refresh_interval.is_zero());
        assert_eq!(config.base_url.unwrap().as_str(), "http://127.0.0.1:8080/");
    }
}
