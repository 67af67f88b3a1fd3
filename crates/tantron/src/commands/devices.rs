//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;
use tantron_core::{Device, Gateway, Hub, Record, RegistrySnapshot};

use crate::cli::{DeviceArgs, DevicesArgs, GlobalOpts, WriteArgs};
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::format_values;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Area")]
    area: String,
    #[tabled(rename = "State")]
    state: String,
}

impl DeviceRow {
    fn new(d: &Arc<Device>, snap: &RegistrySnapshot) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone().unwrap_or_default(),
            dtype: d.device_type.clone().unwrap_or_default(),
            area: d
                .area_id
                .as_deref()
                .and_then(|a| snap.area_name(a))
                .unwrap_or_default()
                .to_owned(),
            state: format_values(d.values.as_ref()),
        }
    }
}

fn device_detail(d: &Arc<Device>, snap: &RegistrySnapshot) -> String {
    let mut lines = vec![
        format!("ID:        {}", d.id),
        format!("Name:      {}", d.name.as_deref().unwrap_or("-")),
        format!("Type:      {}", d.device_type.as_deref().unwrap_or("-")),
        format!(
            "Area:      {}",
            or_dash(d.area_id.as_deref().and_then(|a| snap.area_name(a)))
        ),
        format!("Master:    {}", d.master_id()),
        format!("Version:   {}", d.connection.version),
        format!("Available: {}", d.is_available()),
    ];
    if !d.functions.is_empty() {
        lines.push("Functions:".into());
        for f in &d.functions {
            let writable = if f.send_list.is_empty() { "" } else { " (writable)" };
            lines.push(format!(
                "  {:<12} {:<10} {}{writable}",
                f.key,
                d.value(&f.key).unwrap_or("-"),
                f.name.as_deref().unwrap_or(""),
            ));
        }
    }
    lines.join("\n")
}

fn gateway_detail(g: &Arc<Gateway>) -> String {
    [
        format!("ID:       {}", g.id),
        format!("Name:     {}", g.name.as_deref().unwrap_or("-")),
        format!("Model:    {}", g.model.as_deref().unwrap_or("-")),
        format!("Serial:   {}", g.serial_number.as_deref().unwrap_or("-")),
        format!("Firmware: {}", g.firmware_version.as_deref().unwrap_or("-")),
        format!("Status:   {}", g.online_state),
    ]
    .join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(hub: &Hub, args: &DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    hub.refresh().await?;
    let snap = hub.registry().snapshot();
    let devices: Vec<Arc<Device>> = snap
        .devices
        .values()
        .filter(|d| args.device_type.as_deref().is_none_or(|t| d.is_type(t)))
        .cloned()
        .collect();

    let out = output::render_list(
        &global.output,
        &devices,
        |d| DeviceRow::new(d, &snap),
        |d| d.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn show(hub: &Hub, args: &DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    hub.refresh().await?;
    let snap = hub.registry().snapshot();

    let out = match hub.get_device(&args.id) {
        Some(Record::Device(d)) => output::render_single(
            &global.output,
            &d,
            |d| device_detail(d, &snap),
            |d| d.id.to_string(),
        )?,
        Some(Record::Gateway(g)) => {
            output::render_single(&global.output, &g, gateway_detail, |g| g.id.clone())?
        }
        None => {
            return Err(CliError::NotFound {
                resource_type: "device".into(),
                identifier: args.id.clone(),
                list_command: "devices".into(),
            });
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn write(hub: &Hub, args: WriteArgs, global: &GlobalOpts) -> Result<(), CliError> {
    hub.refresh().await?;
    let sent = hub.write(&args.id, args.values).await?;
    if sent == 0 {
        tracing::warn!(device = %args.id, "no writable function matched, nothing sent");
    }
    output::print_output(&format!("sent {sent} command(s)"), global.quiet);
    Ok(())
}
