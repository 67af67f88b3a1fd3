//! Raw command injection.

use std::io::Read;

use serde_json::Value;
use tantron_core::Hub;

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

fn read_payload(raw: &str) -> Result<Value, CliError> {
    if raw == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(serde_json::from_str(&buf)?);
    }
    Ok(serde_json::from_str(raw)?)
}

pub async fn handle(hub: &Hub, args: &SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let payload = read_payload(&args.payload)?;
    hub.inject_command(payload).await?;
    output::print_output("sent", global.quiet);
    Ok(())
}
