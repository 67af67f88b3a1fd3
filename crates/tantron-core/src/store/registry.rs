// ── Device registry ──
//
// Authoritative in-memory view of one household. The whole view lives in an
// immutable `Arc<RegistrySnapshot>` held by a `watch` channel: every write
// runs inside the channel's critical section and publishes a new snapshot
// (copy-on-write), so readers always see either the state before a batch or
// the state after it.

use std::slice;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::trace;

use tantron_api::{Connection, StateDelta};

use crate::model::{AreaMap, Device, DeviceId, Gateway};
use crate::stream::DeviceStream;

// ── Snapshot ────────────────────────────────────────────────────────

/// Point-in-time view of the registry.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Devices in cloud listing order.
    pub devices: IndexMap<DeviceId, Arc<Device>>,
    pub areas: Arc<AreaMap>,
    pub gateway: Option<Arc<Gateway>>,
    /// Distinct master ids in first-seen order.
    pub master_ids: Vec<String>,
    /// Bumped by every full refresh.
    pub generation: u64,
}

impl RegistrySnapshot {
    pub fn get(&self, id: &str) -> Option<&Arc<Device>> {
        self.devices.get(id)
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.devices
            .values()
            .map(|d| d.connection.clone())
            .collect()
    }

    pub fn area_name(&self, area_id: &str) -> Option<&str> {
        self.areas.get(area_id).map(String::as_str)
    }

    /// Resolve a delta's config id to a device key by trying each master.
    fn resolve(&self, config_id: &str) -> Option<DeviceId> {
        self.master_ids
            .iter()
            .map(|master| DeviceId::new(master, config_id))
            .find(|key| self.devices.contains_key(key))
    }
}

/// Result of [`DeviceRegistry::lookup`].
#[derive(Debug, Clone)]
pub enum Record {
    Device(Arc<Device>),
    Gateway(Arc<Gateway>),
}

// ── Registry ────────────────────────────────────────────────────────

/// Reactive store for one household's gateway, areas and devices.
pub struct DeviceRegistry {
    state: watch::Sender<Arc<RegistrySnapshot>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(RegistrySnapshot::default()));
        Self { state }
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.state.borrow())
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    pub fn get(&self, id: &str) -> Option<Arc<Device>> {
        self.state.borrow().devices.get(id).cloned()
    }

    /// Look up a device, or the gateway when `id` is the gateway id.
    pub fn lookup(&self, id: &str) -> Option<Record> {
        let snap = self.state.borrow();
        if let Some(ref gateway) = snap.gateway {
            if gateway.id == id {
                return Some(Record::Gateway(Arc::clone(gateway)));
            }
        }
        snap.devices.get(id).cloned().map(Record::Device)
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.state.borrow().connections()
    }

    pub fn master_ids(&self) -> Vec<String> {
        self.state.borrow().master_ids.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().devices.is_empty()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> DeviceStream {
        DeviceStream::new(self.state.subscribe())
    }

    // ── Writers ─────────────────────────────────────────────────────

    /// Swap in the result of a full refresh and return the new generation.
    ///
    /// Devices absent from `devices` are dropped. `areas: None` keeps the
    /// current area map.
    pub fn replace_all(&self, devices: Vec<Device>, areas: Option<AreaMap>, gateway: Gateway) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|snap| {
            let mut master_ids: Vec<String> = Vec::new();
            let mut map = IndexMap::with_capacity(devices.len());
            for device in devices {
                if !master_ids.iter().any(|m| m == device.master_id()) {
                    master_ids.push(device.master_id().to_owned());
                }
                map.insert(device.id.clone(), Arc::new(device));
            }

            generation = snap.generation + 1;
            *snap = Arc::new(RegistrySnapshot {
                devices: map,
                areas: areas.map_or_else(|| Arc::clone(&snap.areas), Arc::new),
                gateway: Some(Arc::new(gateway)),
                master_ids,
                generation,
            });
        });
        generation
    }

    /// Apply one delta against the current generation.
    pub fn apply_delta(&self, delta: &StateDelta) -> bool {
        self.apply_deltas(self.generation(), slice::from_ref(delta)) == 1
    }

    /// Apply a batch of deltas atomically and return how many were accepted.
    ///
    /// A batch polled under a superseded `generation` is dropped whole.
    /// Subscribers are notified once per batch, and only if at least one
    /// delta was accepted.
    pub fn apply_deltas(&self, generation: u64, deltas: &[StateDelta]) -> usize {
        let mut accepted = 0;
        self.state.send_if_modified(|snap| {
            if snap.generation != generation {
                trace!(generation, current = snap.generation, "dropping stale batch");
                return false;
            }
            let targets: Vec<(DeviceId, &StateDelta)> = deltas
                .iter()
                .filter_map(|delta| {
                    let config_id = delta.device_config_id.as_deref().filter(|s| !s.is_empty())?;
                    snap.resolve(config_id).map(|key| (key, delta))
                })
                .collect();
            if targets.is_empty() {
                return false;
            }

            let snap = Arc::make_mut(snap);
            for (key, delta) in targets {
                if let Some(entry) = snap.devices.get_mut(&key) {
                    merge(Arc::make_mut(entry), delta);
                    accepted += 1;
                }
            }
            accepted > 0
        });
        accepted
    }

    /// Drop everything. Used on shutdown.
    pub fn clear(&self) {
        self.state.send_modify(|snap| {
            let generation = snap.generation + 1;
            *snap = Arc::new(RegistrySnapshot {
                generation,
                ..RegistrySnapshot::default()
            });
        });
    }
}

/// Fold a delta into a device: `null` clears the values, a first mapping
/// is taken verbatim, later mappings merge key-wise with the delta winning.
fn merge(device: &mut Device, delta: &StateDelta) {
    device.connection.version = delta.version.unwrap_or(0);
    match delta.function {
        None => device.values = None,
        Some(ref update) => match device.values {
            Some(ref mut values) => {
                values.extend(update.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            None => device.values = Some(update.clone()),
        },
    }
    device.touch();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use tantron_api::{FunctionValues, RawDevice};

    fn device(master: &str, id: &str, device_type: &str, values: serde_json::Value) -> Device {
        let raw: RawDevice = serde_json::from_value(json!({
            "id": id,
            "masterId": master,
            "configVersion": 1,
            "type": device_type,
            "functionValues": values
        }))
        .unwrap();
        Device::from(raw)
    }

    fn gateway() -> Gateway {
        Gateway {
            id: "G1".into(),
            ..Gateway::default()
        }
    }

    fn delta(id: &str, version: i64, function: serde_json::Value) -> StateDelta {
        serde_json::from_value(json!({
            "deviceConfigId": id,
            "version": version,
            "function": function
        }))
        .unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> FunctionValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn replace_all_replaces_the_device_set() {
        let registry = DeviceRegistry::new();
        registry.replace_all(
            vec![
                device("M1", "D1", "light", json!(null)),
                device("M1", "D2", "light", json!(null)),
            ],
            None,
            gateway(),
        );
        let generation = registry.replace_all(
            vec![
                device("M1", "D2", "light", json!(null)),
                device("M2", "D3", "light", json!(null)),
            ],
            None,
            gateway(),
        );

        let snap = registry.snapshot();
        let ids: Vec<&str> = snap.devices.keys().map(DeviceId::as_str).collect();
        assert_eq!(ids, vec!["M1.D2", "M2.D3"]);
        assert_eq!(snap.master_ids, vec!["M1".to_owned(), "M2".to_owned()]);
        assert_eq!(generation, 2);
    }

    #[test]
    fn replace_all_keeps_areas_when_not_reloaded() {
        let registry = DeviceRegistry::new();
        let mut areas = AreaMap::new();
        areas.insert("A1".into(), "Living".into());
        registry.replace_all(Vec::new(), Some(areas), gateway());
        registry.replace_all(Vec::new(), None, gateway());

        assert_eq!(registry.snapshot().area_name("A1"), Some("Living"));
    }

    #[test]
    fn unknown_delta_is_ignored_without_notification() {
        let registry = DeviceRegistry::new();
        registry.replace_all(vec![device("M1", "D1", "light", json!({ "switch": "0" }))], None, gateway());
        let mut rx = registry.state.subscribe();
        rx.mark_unchanged();

        assert!(!registry.apply_delta(&delta("D404", 1, json!({ "switch": "1" }))));
        assert!(!registry.apply_delta(&StateDelta::default()));

        assert!(!rx.has_changed().unwrap());
        assert_eq!(registry.get("M1.D1").unwrap().value("switch"), Some("0"));
    }

    #[test]
    fn partial_deltas_merge_into_unavailable_device() {
        let registry = DeviceRegistry::new();
        registry.replace_all(vec![device("M1", "D1", "AC", json!(null))], None, gateway());

        assert!(registry.apply_delta(&delta("D1", 1, json!({ "a": "1" }))));
        assert!(registry.apply_delta(&delta("D1", 2, json!({ "b": "2" }))));

        let d = registry.get("M1.D1").unwrap();
        assert_eq!(d.values, Some(values(&[("a", "1"), ("b", "2")])));
        assert_eq!(d.connection.version, 2);
    }

    #[test]
    fn null_delta_makes_unavailable_then_next_mapping_is_verbatim() {
        let registry = DeviceRegistry::new();
        registry.replace_all(
            vec![device("M1", "D1", "AC", json!({ "switch": "1", "mode": "2" }))],
            None,
            gateway(),
        );

        registry.apply_delta(&delta("D1", 5, json!(null)));
        assert!(!registry.get("M1.D1").unwrap().is_available());

        registry.apply_delta(&delta("D1", 6, json!({ "switch": "0" })));
        let d = registry.get("M1.D1").unwrap();
        assert_eq!(d.values, Some(values(&[("switch", "0")])));
    }

    #[test]
    fn delta_without_version_resets_to_zero() {
        let registry = DeviceRegistry::new();
        registry.replace_all(vec![device("M1", "D1", "light", json!({}))], None, gateway());
        registry.apply_delta(&delta("D1", 9, json!({})));

        let no_version: StateDelta =
            serde_json::from_value(json!({ "deviceConfigId": "D1", "function": {} })).unwrap();
        registry.apply_delta(&no_version);
        assert_eq!(registry.get("M1.D1").unwrap().connection.version, 0);
    }

    #[test]
    fn accepted_delta_advances_timestamp() {
        let registry = DeviceRegistry::new();
        registry.replace_all(vec![device("M1", "D1", "light", json!({}))], None, gateway());
        let before = registry.get("M1.D1").unwrap().updated_at;

        registry.apply_delta(&delta("D1", 1, json!({ "switch": "1" })));
        assert!(registry.get("M1.D1").unwrap().updated_at > before);
    }

    #[test]
    fn delta_resolves_across_master_ids() {
        let registry = DeviceRegistry::new();
        registry.replace_all(
            vec![
                device("M1", "D1", "light", json!({})),
                device("M2", "D7", "light", json!({})),
            ],
            None,
            gateway(),
        );

        assert!(registry.apply_delta(&delta("D7", 1, json!({ "switch": "1" }))));
        assert_eq!(registry.get("M2.D7").unwrap().value("switch"), Some("1"));
    }

    #[test]
    fn batch_notifies_once() {
        let registry = DeviceRegistry::new();
        let generation = registry.replace_all(
            vec![
                device("M1", "D1", "light", json!({})),
                device("M1", "D2", "light", json!({})),
            ],
            None,
            gateway(),
        );
        let mut rx = registry.state.subscribe();
        rx.mark_unchanged();

        let accepted = registry.apply_deltas(
            generation,
            &[
                delta("D1", 1, json!({ "switch": "1" })),
                delta("D2", 1, json!({ "switch": "1" })),
                delta("D9", 1, json!({ "switch": "1" })),
            ],
        );
        assert_eq!(accepted, 2);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn stale_generation_batch_is_dropped() {
        let registry = DeviceRegistry::new();
        let old = registry.replace_all(vec![device("M1", "D1", "light", json!({}))], None, gateway());
        registry.replace_all(vec![device("M1", "D1", "light", json!({}))], None, gateway());

        let accepted = registry.apply_deltas(old, &[delta("D1", 1, json!({ "switch": "1" }))]);
        assert_eq!(accepted, 0);
        assert_eq!(registry.get("M1.D1").unwrap().value("switch"), None);
    }

    #[test]
    fn lookup_returns_gateway_by_id() {
        let registry = DeviceRegistry::new();
        registry.replace_all(vec![device("M1", "D1", "light", json!({}))], None, gateway());

        assert!(matches!(registry.lookup("G1"), Some(Record::Gateway(_))));
        assert!(matches!(registry.lookup("M1.D1"), Some(Record::Device(_))));
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn readers_never_see_half_applied_batches() {
        let registry = DeviceRegistry::new();
        let generation = registry.replace_all(vec![device("M1", "D1", "AC", json!(null))], None, gateway());
        let before = registry.snapshot();

        registry.apply_deltas(
            generation,
            &[delta("D1", 1, json!({ "a": "1" })), delta("D1", 2, json!({ "b": "2" }))],
        );

        assert!(before.get("M1.D1").unwrap().values.is_none());
        let after = registry.snapshot();
        assert_eq!(after.get("M1.D1").unwrap().values, Some(values(&[("a", "1"), ("b", "2")])));
    }
}
