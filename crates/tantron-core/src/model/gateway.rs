// ── Gateway domain types ──

use serde::Serialize;
use strum::{Display, EnumString};

/// Gateway connectivity as reported by the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OnlineState {
    Online,
    Offline,
    #[default]
    Unknown,
}

impl OnlineState {
    /// Map the cloud's `onlineState`: 0 offline, 1 online, anything else unknown.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(0) => Self::Offline,
            Some(1) => Self::Online,
            _ => Self::Unknown,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Online => Some(true),
            Self::Offline => Some(false),
            Self::Unknown => None,
        }
    }
}

/// The household gateway. Refreshed with the devices, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Gateway {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub online_state: OnlineState,
}
