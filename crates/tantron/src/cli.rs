//! Clap derive structures for the `tantron` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tantron -- drive a Tantron smart-home household from the command line
#[derive(Debug, Parser)]
#[command(
    name = "tantron",
    version,
    about = "Inspect and control Tantron smart-home households",
    long_about = "Talks to the Tantron cloud on behalf of one household:\n\
        lists gateway devices, follows live state changes and relays\n\
        bus commands.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Household profile to use
    #[arg(long, short = 'p', env = "TANTRON_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Household id (overrides profile)
    #[arg(long, short = 'H', env = "TANTRON_HOUSEHOLD", global = true)]
    pub household: Option<String>,

    /// Account phone number (overrides profile)
    #[arg(long, env = "TANTRON_PHONE", global = true)]
    pub phone: Option<String>,

    /// Cloud base URL (overrides profile)
    #[arg(long, env = "TANTRON_BASE_URL", global = true, hide = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TANTRON_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, env = "TANTRON_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and list the households bound to the account
    Login(LoginArgs),

    /// List devices of the household
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show one device or the gateway
    Device(DeviceArgs),

    /// List entity adapters with their current state
    #[command(alias = "ent")]
    Entities,

    /// Follow live state changes until interrupted
    Watch,

    /// Write function values to a device
    Write(WriteArgs),

    /// Relay a raw state write to the cloud
    Send(SendArgs),

    /// Show weather at the household location
    Weather(WeatherArgs),

    /// Dump redacted diagnostics
    Diagnostics(DiagnosticsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command args ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Print the access token so it can be stored in a profile
    #[arg(long)]
    pub show_token: bool,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only devices of this type (e.g. light, curtain, airCondition)
    #[arg(long = "type", short = 't')]
    pub device_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Device id (`masterId.configId`) or gateway id
    pub id: String,
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Device id
    pub id: String,

    /// Function values as key=value pairs
    #[arg(required = true, value_parser = parse_key_value)]
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// JSON payload with deviceConfigId, configVersion, masterId and cmd;
    /// `-` reads it from stdin
    pub payload: String,
}

#[derive(Debug, Args)]
pub struct WeatherArgs {
    #[arg(value_enum, default_value = "now")]
    pub period: WeatherPeriodArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WeatherPeriodArg {
    /// Current conditions
    Now,
    /// Hourly forecast
    Hourly,
    /// Daily forecast
    Daily,
}

#[derive(Debug, Args)]
pub struct DiagnosticsArgs {
    /// Only this device
    #[arg(long)]
    pub device: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: Shell,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn key_value_pairs_split_on_first_equals() {
        assert_eq!(
            parse_key_value("mode=a=b").unwrap(),
            ("mode".to_owned(), "a=b".to_owned())
        );
        assert!(parse_key_value("=1").is_err());
        assert!(parse_key_value("switch").is_err());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["tantron", "devices", "-H", "H1", "-o", "json", "-t", "light"])
            .unwrap();
        assert_eq!(cli.global.household.as_deref(), Some("H1"));
        assert!(matches!(cli.global.output, OutputFormat::Json));
        let Command::Devices(args) = cli.command else {
            panic!("expected devices");
        };
        assert_eq!(args.device_type.as_deref(), Some("light"));
    }
}
