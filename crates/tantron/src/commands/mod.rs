//! Command dispatch: bridges CLI args to the hub and output formatting.

pub mod devices;
pub mod diagnostics;
pub mod entities;
pub mod login;
pub mod send;
pub mod watch;
pub mod weather;

use tantron_core::Hub;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a household-bound command to its handler.
pub async fn dispatch(cmd: Command, hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::list(hub, &args, global).await,
        Command::Device(args) => devices::show(hub, &args, global).await,
        Command::Write(args) => devices::write(hub, args, global).await,
        Command::Entities => entities::handle(hub, global).await,
        Command::Watch => watch::handle(hub, global).await,
        Command::Send(args) => send::handle(hub, &args, global).await,
        Command::Weather(args) => weather::handle(hub, &args, global).await,
        Command::Diagnostics(args) => diagnostics::handle(hub, &args, global).await,
        // Handled before a hub exists
        Command::Login(_) | Command::Completions(_) => Ok(()),
    }
}

/// Render a state mapping as `key=value` pairs, or `unavailable`.
pub(crate) fn format_values(values: Option<&tantron_api::FunctionValues>) -> String {
    match values {
        Some(values) if values.is_empty() => "-".into(),
        Some(values) => values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" "),
        None => "unavailable".into(),
    }
}
