// ── Entity adapters ──
//
// Typed views over registry devices. Each adapter wraps a `DeviceEntity`,
// which caches the device it was built from and only re-reads state when
// the device timestamp moves.

mod binary_sensor;
mod climate;
mod cover;
mod fan;
mod light;
mod sensor;
pub mod weather;

use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tracing::debug;

use tantron_api::{Command, FunctionDescriptor};

use crate::cloud::CloudApi;
use crate::codec::{self, FunctionKey, FunctionState};
use crate::error::CoreError;
use crate::model::Device;
use crate::store::RegistrySnapshot;

pub use binary_sensor::{GatewayOnline, MotionSensor};
pub use climate::{AirConditioner, FanMode, Heater, HvacMode};
pub use cover::Curtain;
pub use fan::AirPurifier;
pub use light::Light;
pub use sensor::{EnvSensor, SensorClass};
pub use weather::{Condition, DailyEntry, HourlyEntry, WeatherEntity, WeatherSnapshot};

// ── DeviceEntity ────────────────────────────────────────────────────

/// Shared core of every device-backed adapter.
///
/// `function` narrows the entity to a single function of the device; the
/// entity then only sees and writes that function.
#[derive(Debug, Clone)]
pub struct DeviceEntity {
    device: Arc<Device>,
    function: Option<&'static str>,
    state: FunctionState,
    updated_at: i64,
}

impl DeviceEntity {
    pub fn new(device: Arc<Device>, function: Option<&'static str>) -> Self {
        let mut entity = Self {
            state: FunctionState::Absent,
            updated_at: device.updated_at,
            device,
            function,
        };
        entity.reload();
        entity
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn function(&self) -> Option<&'static str> {
        self.function
    }

    /// `{deviceId}.{function}` for single-function entities, else the device id.
    pub fn unique_id(&self) -> String {
        match self.function {
            Some(function) => format!("{}.{function}", self.device.id),
            None => self.device.id.to_string(),
        }
    }

    /// The function's display name, or the device name for whole-device entities.
    pub fn name(&self) -> Option<&str> {
        match self.function {
            Some(function) => self.device.function(function)?.name.as_deref(),
            None => self.device.name.as_deref(),
        }
    }

    pub fn available(&self) -> bool {
        self.device.is_available()
    }

    /// Cached state: a single value for function entities, the full map otherwise.
    pub fn state(&self) -> &FunctionState {
        &self.state
    }

    /// One value out of the cached state.
    pub fn value(&self, key: &str) -> FunctionState {
        match self.state {
            FunctionState::All(ref values) => codec::read(Some(values), FunctionKey::One(key)),
            FunctionState::Value(ref v) if self.function == Some(key) => {
                FunctionState::Value(v.clone())
            }
            _ => FunctionState::Absent,
        }
    }

    /// Descriptors visible to this entity.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.device
            .functions
            .iter()
            .filter(|f| self.function.is_none_or(|name| f.key == name))
    }

    /// Pick up a newer copy of the device from `snapshot`.
    ///
    /// Returns `true` when the cached state was re-read.
    pub fn refresh(&mut self, snapshot: &RegistrySnapshot) -> bool {
        match snapshot.get(self.device.id.as_str()) {
            Some(device) if device.updated_at != self.updated_at => {
                self.device = Arc::clone(device);
                self.reload();
                true
            }
            _ => false,
        }
    }

    fn reload(&mut self) {
        let key = self.function.map_or(FunctionKey::All, FunctionKey::One);
        self.state = codec::read(self.device.values.as_ref(), key);
        self.updated_at = self.device.updated_at;
        debug!(device = %self.device.id, values = ?self.device.values, "function state reloaded");
    }

    /// Encode `values` against this entity's functions.
    pub fn commands<K, V>(&self, values: impl IntoIterator<Item = (K, V)>) -> Vec<Command>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let functions: Vec<FunctionDescriptor> = self.functions().cloned().collect();
        codec::encode(&functions, values)
    }

    /// Write `values` to the device. Returns the number of commands sent;
    /// nothing goes over the wire when none of the keys are writable.
    pub async fn send<C, K, V>(
        &self,
        cloud: &C,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<usize, CoreError>
    where
        C: CloudApi,
        K: AsRef<str>,
        V: Into<String>,
    {
        let commands = self.commands(values);
        if commands.is_empty() {
            debug!(device = %self.device.id, "no writable functions, skipping write");
            return Ok(0);
        }
        cloud.send_state(&self.device.connection, &commands).await?;
        Ok(commands.len())
    }

    /// Write a bare value to this entity's function.
    pub async fn send_value<C: CloudApi>(
        &self,
        cloud: &C,
        value: impl Into<String>,
    ) -> Result<usize, CoreError> {
        let Some(function) = self.function else {
            return Err(CoreError::ValidationFailed {
                message: format!("{} has no single function to write", self.device.id),
            });
        };
        self.send(cloud, [(function, value.into())]).await
    }
}

// ── Entity set ──────────────────────────────────────────────────────

/// Every adapter kind, one per supported device type.
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    GatewayOnline(GatewayOnline),
    Motion(MotionSensor),
    AirConditioner(AirConditioner),
    Heater(Heater),
    Curtain(Curtain),
    AirPurifier(AirPurifier),
    Light(Light),
    EnvSensor(EnvSensor),
}

/// Flattened entity state, for display and serialization.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub unique_id: String,
    pub kind: String,
    pub name: Option<String>,
    pub available: bool,
    pub state: Option<String>,
}

impl Entity {
    /// The device core, for every kind except the gateway sensor.
    pub fn device_entity(&self) -> Option<&DeviceEntity> {
        match self {
            Self::GatewayOnline(_) => None,
            Self::Motion(e) => Some(e.entity()),
            Self::AirConditioner(e) => Some(e.entity()),
            Self::Heater(e) => Some(e.entity()),
            Self::Curtain(e) => Some(e.entity()),
            Self::AirPurifier(e) => Some(e.entity()),
            Self::Light(e) => Some(e.entity()),
            Self::EnvSensor(e) => Some(e.entity()),
        }
    }

    fn device_entity_mut(&mut self) -> Option<&mut DeviceEntity> {
        match self {
            Self::GatewayOnline(_) => None,
            Self::Motion(e) => Some(e.entity_mut()),
            Self::AirConditioner(e) => Some(e.entity_mut()),
            Self::Heater(e) => Some(e.entity_mut()),
            Self::Curtain(e) => Some(e.entity_mut()),
            Self::AirPurifier(e) => Some(e.entity_mut()),
            Self::Light(e) => Some(e.entity_mut()),
            Self::EnvSensor(e) => Some(e.entity_mut()),
        }
    }

    pub fn unique_id(&self) -> String {
        match self {
            Self::GatewayOnline(_) => GatewayOnline::UNIQUE_ID.to_owned(),
            _ => self
                .device_entity()
                .map(DeviceEntity::unique_id)
                .unwrap_or_default(),
        }
    }

    pub fn available(&self) -> bool {
        match self {
            Self::GatewayOnline(g) => g.gateway().is_some(),
            _ => self.device_entity().is_some_and(DeviceEntity::available),
        }
    }

    /// Re-read state from `snapshot`. Returns `true` if anything changed.
    pub fn refresh(&mut self, snapshot: &RegistrySnapshot) -> bool {
        match self {
            Self::GatewayOnline(g) => g.refresh(snapshot),
            _ => self
                .device_entity_mut()
                .is_some_and(|e| e.refresh(snapshot)),
        }
    }

    /// Human-readable primary state, `None` when unknown.
    pub fn state_text(&self) -> Option<String> {
        fn on_off(v: bool) -> String {
            String::from(if v { "on" } else { "off" })
        }
        match self {
            Self::GatewayOnline(g) => g.is_on().map(on_off),
            Self::Motion(m) => m.is_on().map(on_off),
            Self::AirConditioner(ac) => ac.hvac_mode().map(|m| m.to_string()),
            Self::Heater(h) => h.hvac_mode().map(|m| m.to_string()),
            Self::Curtain(c) => c
                .is_closed()
                .map(|closed| String::from(if closed { "closed" } else { "open" })),
            Self::AirPurifier(f) => match (f.is_on(), f.percentage()) {
                (Some(true), Some(pct)) => Some(format!("on {pct}%")),
                (Some(on), _) => Some(on_off(on)),
                (None, _) => None,
            },
            Self::Light(l) => l.is_on().map(on_off),
            Self::EnvSensor(s) => s.native_value().map(|v| match s.unit() {
                Some(unit) => format!("{v} {unit}"),
                None => v.to_string(),
            }),
        }
    }

    pub fn summary(&self) -> EntitySummary {
        let name = match self {
            Self::GatewayOnline(g) => g.gateway().and_then(|g| g.name.clone()),
            _ => self
                .device_entity()
                .and_then(|e| e.name().map(str::to_owned)),
        };
        EntitySummary {
            unique_id: self.unique_id(),
            kind: self.to_string(),
            name,
            available: self.available(),
            state: self.state_text(),
        }
    }
}

/// Build the adapters for every supported device in `snapshot`.
///
/// The gateway connectivity sensor comes first; devices follow in registry
/// order. Devices of unsupported types get no entity.
pub fn build_entities(snapshot: &RegistrySnapshot) -> Vec<Entity> {
    let mut entities = vec![Entity::GatewayOnline(GatewayOnline::new(
        snapshot.gateway.clone(),
    ))];
    for device in snapshot.devices.values() {
        let device = Arc::clone(device);
        let entity = match device.device_type.as_deref() {
            Some("secuSensor") if MotionSensor::matches(&device) => {
                Entity::Motion(MotionSensor::new(device))
            }
            Some("AC") => Entity::AirConditioner(AirConditioner::new(device)),
            Some("heating") => Entity::Heater(Heater::new(device)),
            Some("curtain") => Entity::Curtain(Curtain::new(device)),
            Some("freshAir") => Entity::AirPurifier(AirPurifier::new(device)),
            Some("light") => Entity::Light(Light::new(device)),
            Some("envSensor") => Entity::EnvSensor(EnvSensor::new(device)),
            _ => continue,
        };
        entities.push(entity);
    }
    entities
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::Gateway;
    use crate::store::DeviceRegistry;
    use crate::sync::tests::FakeCloud;
    use tantron_api::RawDevice;

    /// A device with a writable function per key in `writable`.
    pub(crate) fn device_with(
        device_type: &str,
        writable: &[&str],
        values: serde_json::Value,
    ) -> Arc<Device> {
        let functions: Vec<serde_json::Value> = writable
            .iter()
            .map(|key| {
                json!({
                    "type": key,
                    "name": format!("{key} name"),
                    "sendList": [{ "dataType": "1", "dataLength": "1", "addr": format!("0/0/{key}"), "protocolType": "KNX", "sleep": 0 }]
                })
            })
            .collect();
        let raw: RawDevice = serde_json::from_value(json!({
            "id": "D1",
            "masterId": "M1",
            "configVersion": 7,
            "type": device_type,
            "name": "Device one",
            "icon": "",
            "functionList": functions,
            "functionValues": values
        }))
        .unwrap();
        Arc::new(Device::from(raw))
    }

    /// Keys and values of every command the fake cloud received.
    pub(crate) fn sent_pairs(cloud: &FakeCloud) -> Vec<Vec<(String, String)>> {
        cloud
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cmds)| cmds.iter().map(|c| (c.key.clone(), c.value.clone())).collect())
            .collect()
    }

    #[test]
    fn unique_id_and_name_depend_on_function() {
        let device = device_with("light", &["switch"], json!({ "switch": "1" }));
        let whole = DeviceEntity::new(Arc::clone(&device), None);
        let single = DeviceEntity::new(device, Some("switch"));

        assert_eq!(whole.unique_id(), "M1.D1");
        assert_eq!(whole.name(), Some("Device one"));
        assert_eq!(single.unique_id(), "M1.D1.switch");
        assert_eq!(single.name(), Some("switch name"));
        assert_eq!(single.state().as_str(), Some("1"));
    }

    #[test]
    fn function_entity_only_writes_its_function() {
        let device = device_with("AC", &["switch", "mode"], json!({}));
        let entity = DeviceEntity::new(device, Some("switch"));

        let cmds = entity.commands([("switch", "1"), ("mode", "2")]);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].key, "switch");
    }

    #[test]
    fn refresh_only_when_timestamp_moves() {
        let registry = DeviceRegistry::new();
        let generation = registry.replace_all(
            vec![Arc::unwrap_or_clone(device_with("light", &["switch"], json!({ "switch": "0" })))],
            None,
            Gateway::default(),
        );
        let mut entity = DeviceEntity::new(registry.get("M1.D1").unwrap(), Some("switch"));

        assert!(!entity.refresh(&registry.snapshot()));

        let delta = serde_json::from_value(json!({
            "deviceConfigId": "D1", "version": 1, "function": { "switch": "1" }
        }))
        .unwrap();
        registry.apply_deltas(generation, &[delta]);
        assert!(entity.refresh(&registry.snapshot()));
        assert_eq!(entity.state().as_str(), Some("1"));
    }

    #[tokio::test]
    async fn write_without_send_metadata_makes_no_call() {
        let cloud = FakeCloud::default();
        let device = device_with("light", &[], json!({ "switch": "0" }));
        let entity = DeviceEntity::new(device, Some("switch"));

        let sent = entity.send_value(&cloud, "1").await.unwrap();
        assert_eq!(sent, 0);
        assert!(cloud.sent.lock().unwrap().is_empty());
        assert_eq!(cloud.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bare_value_needs_a_function() {
        let cloud = FakeCloud::default();
        let entity = DeviceEntity::new(device_with("AC", &["switch"], json!({})), None);
        let err = entity.send_value(&cloud, "1").await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }

    #[test]
    fn build_entities_maps_supported_types() {
        let registry = DeviceRegistry::new();
        let mut devices = Vec::new();
        for (id, ty, icon) in [
            ("D1", "light", ""),
            ("D2", "curtain", ""),
            ("D3", "secuSensor", "icon_secusensor_02"),
            ("D4", "secuSensor", "icon_secusensor_01"),
            ("D5", "doorbell", ""),
        ] {
            let raw: RawDevice = serde_json::from_value(json!({
                "id": id, "masterId": "M1", "configVersion": 1, "type": ty, "icon": icon
            }))
            .unwrap();
            devices.push(Device::from(raw));
        }
        registry.replace_all(
            devices,
            None,
            Gateway {
                id: "G1".into(),
                ..Gateway::default()
            },
        );

        let kinds: Vec<String> = build_entities(&registry.snapshot())
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(kinds, vec!["gateway_online", "light", "curtain", "motion"]);
    }
}
