// ── Device domain types ──

use std::borrow::Borrow;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use tantron_api::{Connection, FunctionDescriptor, FunctionValues};

// ── DeviceId ────────────────────────────────────────────────────────

/// Household-unique device key: `{masterId}.{deviceConfigId}`.
///
/// Config ids are only unique per master controller, so the master id is
/// part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(master_id: &str, config_id: &str) -> Self {
        Self(format!("{master_id}.{config_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// A device known to the registry.
///
/// `values` is `None` while the device is unavailable. `updated_at` is a
/// nanosecond timestamp that strictly increases on every accepted change;
/// consumers compare it to detect staleness and nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_type: Option<String>,
    pub name: Option<String>,
    pub area_id: Option<String>,
    pub icon: Option<String>,
    pub connection: Connection,
    pub functions: Vec<FunctionDescriptor>,
    pub values: Option<FunctionValues>,
    pub updated_at: i64,
}

impl Device {
    pub fn is_available(&self) -> bool {
        self.values.is_some()
    }

    pub fn config_id(&self) -> &str {
        &self.connection.device_config_id
    }

    pub fn master_id(&self) -> &str {
        &self.connection.master_id
    }

    pub fn is_type(&self, device_type: &str) -> bool {
        self.device_type.as_deref() == Some(device_type)
    }

    /// Current value of one function, if the device is available.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.as_ref()?.get(key).map(String::as_str)
    }

    pub fn function(&self, key: &str) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.key == key)
    }

    /// Stamp the device as changed now.
    pub(crate) fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}

/// Wall-clock nanoseconds, forced past `previous` so that two changes in
/// the same clock tick still compare unequal.
pub(crate) fn next_timestamp(previous: i64) -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    now.max(previous.saturating_add(1))
}
