//! Redacted diagnostics dump.

use tantron_core::Hub;

use crate::cli::{DiagnosticsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(hub: &Hub, args: &DiagnosticsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // A failed refresh is part of the picture, not a reason to bail.
    if let Err(e) = hub.refresh().await {
        tracing::warn!(error = %e, "refresh failed, dumping what is known");
    }

    let dump = match args.device {
        Some(ref id) => hub.device_diagnostics(id).ok_or_else(|| CliError::NotFound {
            resource_type: "device".into(),
            identifier: id.clone(),
            list_command: "devices".into(),
        })?,
        None => hub.diagnostics(),
    };
    output::print_output(&output::render_document(&global.output, &dump)?, global.quiet);
    Ok(())
}
