//! Account login and household discovery.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tabled::Tabled;
use tantron_api::{CloudClient, HouseholdInfo, TokenCache, TransportConfig};
use tantron_config::ConfigError;
use tantron_core::Credentials;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config;
use crate::error::CliError;
use crate::output::{self, or_dash};

#[derive(Tabled)]
struct HouseholdRow {
    #[tabled(rename = "Household")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&HouseholdInfo> for HouseholdRow {
    fn from(h: &HouseholdInfo) -> Self {
        Self {
            id: h.household_id.clone(),
            name: or_dash(h.household_name.as_deref()),
        }
    }
}

/// Process environment without `TANTRON_TOKEN`: login always uses a password.
fn password_env(name: &str) -> Option<String> {
    if name == "TANTRON_TOKEN" {
        return None;
    }
    std::env::var(name).ok()
}

fn prompt_password(phone: &str) -> Result<SecretString, CliError> {
    let password = rpassword::prompt_password(format!("Password for {phone}: "))?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "empty password".into(),
        });
    }
    Ok(SecretString::from(password))
}

pub async fn handle(args: &LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = tantron_config::load_config()?;
    let (name, profile) = config::effective_profile(global, &cfg)?;

    let phone = profile
        .phone
        .clone()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| CliError::NoCredentials {
            profile: name.clone(),
        })?;

    let password = match tantron_config::resolve_credentials_with(&profile, &name, password_env) {
        Ok(Credentials::Password { password, .. }) => password,
        Ok(Credentials::Token(_)) | Err(ConfigError::NoCredentials { .. }) => prompt_password(&phone)?,
        Err(e) => return Err(e.into()),
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(cfg.defaults.timeout));
    let transport = TransportConfig::default().with_request_timeout(timeout);
    let client = match profile.base_url.as_deref() {
        Some(raw) => {
            let url = raw.parse::<url::Url>().map_err(|_| CliError::Validation {
                field: "base_url".into(),
                reason: format!("invalid URL: {raw}"),
            })?;
            CloudClient::new(url, &transport)?
        }
        None => CloudClient::production(&transport)?,
    };

    let token = client.login(&phone, &password, &TokenCache::new()).await?;
    tracing::info!(profile = %name, "logged in");

    let households = client.list_households().await?;
    let out = output::render_list(
        &global.output,
        &households,
        |h| HouseholdRow::from(h),
        |h| h.household_id.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if args.show_token {
        eprintln!("token: {}", token.expose_secret());
    }
    Ok(())
}
