// ── Diagnostics ──
//
// Redacted JSON dumps of hub state for bug reports.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::Device;
use crate::store::RegistrySnapshot;

/// Keys whose values never leave the process.
pub const TO_REDACT: &[&str] = &["phone", "password", "token", "household"];

pub const REDACTED: &str = "**REDACTED**";

/// Replace the value of every key in `keys`, at any depth.
pub fn redact(value: &Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if keys.contains(&k.as_str()) {
                        Value::String(REDACTED.to_owned())
                    } else {
                        redact(v, keys)
                    };
                    (k.clone(), v)
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact(v, keys)).collect()),
        other => other.clone(),
    }
}

fn to_redacted<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).map_or(Value::Null, |v| redact(&v, TO_REDACT))
}

/// Diagnostics for one device.
pub fn device_diagnostics(device: &Device) -> Value {
    to_redacted(device)
}

/// Diagnostics for the whole registry plus caller-supplied context.
pub fn registry_diagnostics(snapshot: &RegistrySnapshot, context: Value) -> Value {
    let devices: Map<String, Value> = snapshot
        .devices
        .iter()
        .map(|(id, device)| (id.to_string(), device_diagnostics(device)))
        .collect();
    let mut out = Map::new();
    out.insert("entry_data".into(), redact(&context, TO_REDACT));
    out.insert("generation".into(), Value::from(snapshot.generation));
    out.insert("gateway".into(), to_redacted(&snapshot.gateway));
    out.insert("areas".into(), to_redacted(&*snapshot.areas));
    out.insert("devices".into(), Value::Object(devices));
    Value::Object(out)
}
