//! Profile selection and CLI flag overrides on top of `tantron-config`.

use tantron_config::{Config, ConfigError, Profile};
use tantron_core::HubConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The selected profile with `--household`, `--phone`, `--base-url` and
/// `--timeout` applied.
///
/// An explicitly requested profile must exist. Without `--profile` a
/// missing default profile is fine as long as the flags and environment
/// say enough on their own.
pub fn effective_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let (name, mut profile) = match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => (name, profile.clone()),
        Err(ConfigError::UnknownProfile { profile }) if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        Err(ConfigError::UnknownProfile { profile }) => (profile, Profile::default()),
        Err(e) => return Err(e.into()),
    };

    if let Some(ref household) = global.household {
        profile.household = Some(household.clone());
    }
    if let Some(ref phone) = global.phone {
        profile.phone = Some(phone.clone());
    }
    if let Some(ref base_url) = global.base_url {
        profile.base_url = Some(base_url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    Ok((name, profile))
}

/// Build a `HubConfig` from the config file, profile and CLI overrides.
pub fn build_hub_config(global: &GlobalOpts) -> Result<HubConfig, CliError> {
    let cfg = tantron_config::load_config()?;
    let (name, profile) = effective_profile(global, &cfg)?;

    if profile.household.as_deref().is_none_or(str::is_empty) {
        return Err(CliError::NoConfig {
            path: tantron_config::config_path().display().to_string(),
        });
    }

    Ok(tantron_config::profile_to_hub_config(
        &profile,
        &name,
        &cfg.defaults,
    )?)
}
