// ── Domain model ──
//
// Canonical types exposed to consumers. Wire types from tantron-api are
// translated in `convert.rs`.

pub mod device;
pub mod gateway;

use indexmap::IndexMap;

pub use device::{Device, DeviceId};
pub use gateway::{Gateway, OnlineState};

/// Area id → display name, in cloud order.
pub type AreaMap = IndexMap<String, String>;
