// ── API-to-domain type conversions ──
//
// Bridges raw `tantron_api` response types into `tantron_core::model`
// domain types.

use tantron_api::{Connection, Floor, RawDevice};

use crate::model::device::next_timestamp;
use crate::model::{AreaMap, Device, DeviceId, Gateway, OnlineState};

// ── Device ─────────────────────────────────────────────────────────

impl From<RawDevice> for Device {
    fn from(raw: RawDevice) -> Self {
        let connection = Connection {
            device_config_id: raw.id,
            config_version: raw.config_version,
            master_id: raw.master_id,
            version: 0,
        };

        Self {
            id: DeviceId::new(&connection.master_id, &connection.device_config_id),
            device_type: raw.device_type,
            name: raw.name,
            area_id: raw.area,
            icon: raw.icon,
            connection,
            functions: raw.function_list,
            values: raw.function_values,
            updated_at: next_timestamp(0),
        }
    }
}

// ── Gateway ────────────────────────────────────────────────────────

impl From<tantron_api::Gateway> for Gateway {
    fn from(raw: tantron_api::Gateway) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            model: raw.model,
            serial_number: raw.serial_no,
            firmware_version: raw.version_name,
            online_state: OnlineState::from_code(raw.online_state),
        }
    }
}

// ── Areas ──────────────────────────────────────────────────────────

/// Flatten floors into an area map.
///
/// With more than one floor, names are prefixed `"{floor}-{area}"` so that
/// identically named rooms on different floors stay distinguishable.
pub fn area_names(floors: &[Floor]) -> AreaMap {
    let prefixed = floors.len() > 1;
    floors
        .iter()
        .flat_map(|floor| {
            floor.area_list.iter().map(move |area| {
                let name = if prefixed {
                    format!("{}-{}", floor.name, area.name)
                } else {
                    area.name.clone()
                };
                (area.id.clone(), name)
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn floors(value: serde_json::Value) -> Vec<Floor> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn single_floor_keeps_plain_names() {
        let areas = area_names(&floors(json!([
            { "name": "1F", "areaList": [{ "id": "A1", "name": "Living" }] }
        ])));
        assert_eq!(areas.get("A1").map(String::as_str), Some("Living"));
    }

    #[test]
    fn multiple_floors_prefix_names() {
        let areas = area_names(&floors(json!([
            { "name": "1F", "areaList": [{ "id": "A1", "name": "Hall" }] },
            { "name": "2F", "areaList": [{ "id": "A2", "name": "Hall" }] }
        ])));
        assert_eq!(areas.get("A1").map(String::as_str), Some("1F-Hall"));
        assert_eq!(areas.get("A2").map(String::as_str), Some("2F-Hall"));
    }

    #[test]
    fn raw_device_becomes_keyed_device_with_unknown_version() {
        let raw: RawDevice = serde_json::from_value(json!({
            "id": "D1",
            "masterId": "M1",
            "configVersion": 3,
            "type": "curtain",
            "functionValues": { "switch": "0" }
        }))
        .unwrap();

        let device = Device::from(raw);
        assert_eq!(device.id.as_str(), "M1.D1");
        assert_eq!(device.connection.version, 0);
        assert_eq!(device.connection.config_version, 3);
        assert_eq!(device.value("switch"), Some("0"));
        assert!(device.updated_at > 0);
    }
}
