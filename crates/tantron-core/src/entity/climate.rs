// ── Climate adapters ──
//
// Air conditioners and floor heating. Both expose whole-device state and
// write whole-degree target temperatures.

use std::sync::Arc;

use strum::{Display, EnumString};

use crate::cloud::CloudApi;
use crate::error::CoreError;
use crate::model::Device;

use super::DeviceEntity;

/// Operating mode of a climate device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Dry,
    FanOnly,
}

impl HvacMode {
    /// Map an AC `mode` value.
    fn from_ac_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(Self::Heat),
            "2" => Some(Self::Cool),
            "3" => Some(Self::Dry),
            "4" => Some(Self::FanOnly),
            _ => None,
        }
    }

    fn ac_code(self) -> Option<&'static str> {
        match self {
            Self::Heat => Some("1"),
            Self::Cool => Some("2"),
            Self::Dry => Some("3"),
            Self::FanOnly => Some("4"),
            Self::Off => None,
        }
    }
}

/// AC fan speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FanMode {
    Auto,
    Low,
    Medium,
    High,
}

impl FanMode {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "2" => Some(Self::Auto),
            "5" => Some(Self::Low),
            "4" => Some(Self::Medium),
            "3" => Some(Self::High),
            _ => None,
        }
    }

    fn code(self) -> &'static str {
        match self {
            Self::Auto => "2",
            Self::Low => "5",
            Self::Medium => "4",
            Self::High => "3",
        }
    }
}

fn check_range(target: i64, min: i64, max: i64) -> Result<String, CoreError> {
    if (min..=max).contains(&target) {
        Ok(target.to_string())
    } else {
        Err(CoreError::ValidationFailed {
            message: format!("target temperature {target} outside {min}..={max}"),
        })
    }
}

// ── AirConditioner ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AirConditioner {
    entity: DeviceEntity,
}

impl AirConditioner {
    pub const MIN_TEMP: i64 = 18;
    pub const MAX_TEMP: i64 = 29;

    pub fn new(device: Arc<Device>) -> Self {
        Self {
            entity: DeviceEntity::new(device, None),
        }
    }

    pub fn entity(&self) -> &DeviceEntity {
        &self.entity
    }

    pub(crate) fn entity_mut(&mut self) -> &mut DeviceEntity {
        &mut self.entity
    }

    /// `None` when unavailable or the mode code is unknown.
    pub fn hvac_mode(&self) -> Option<HvacMode> {
        if self.entity.state().is_absent() {
            return None;
        }
        if self.entity.value("switch").as_str() == Some("0") {
            return Some(HvacMode::Off);
        }
        HvacMode::from_ac_code(self.entity.value("mode").as_str()?)
    }

    pub fn fan_mode(&self) -> Option<FanMode> {
        FanMode::from_code(self.entity.value("speed").as_str()?)
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.entity.value("targetTemp").as_f64()
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.entity.value("tempSensor").as_f64()
    }

    pub async fn turn_on<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "1")]).await
    }

    pub async fn turn_off<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "0")]).await
    }

    /// Set the mode and power on in one write; `Off` powers down.
    pub async fn set_hvac_mode<C: CloudApi>(
        &self,
        cloud: &C,
        mode: HvacMode,
    ) -> Result<usize, CoreError> {
        match mode.ac_code() {
            Some(code) => self.entity.send(cloud, [("mode", code), ("switch", "1")]).await,
            None => self.turn_off(cloud).await,
        }
    }

    pub async fn set_fan_mode<C: CloudApi>(
        &self,
        cloud: &C,
        mode: FanMode,
    ) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("speed", mode.code())]).await
    }

    pub async fn set_temperature<C: CloudApi>(
        &self,
        cloud: &C,
        target: i64,
    ) -> Result<usize, CoreError> {
        let value = check_range(target, Self::MIN_TEMP, Self::MAX_TEMP)?;
        self.entity.send(cloud, [("targetTemp", value)]).await
    }
}

// ── Heater ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Heater {
    entity: DeviceEntity,
}

impl Heater {
    pub const MIN_TEMP: i64 = 20;
    pub const MAX_TEMP: i64 = 40;

    pub fn new(device: Arc<Device>) -> Self {
        Self {
            entity: DeviceEntity::new(device, None),
        }
    }

    pub fn entity(&self) -> &DeviceEntity {
        &self.entity
    }

    pub(crate) fn entity_mut(&mut self) -> &mut DeviceEntity {
        &mut self.entity
    }

    /// Off when switched off, heating otherwise.
    pub fn hvac_mode(&self) -> Option<HvacMode> {
        if self.entity.state().is_absent() {
            return None;
        }
        if self.entity.value("switch").as_str() == Some("0") {
            Some(HvacMode::Off)
        } else {
            Some(HvacMode::Heat)
        }
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.entity.value("targetTemp").as_f64()
    }

    pub async fn turn_on<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "1")]).await
    }

    pub async fn turn_off<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "0")]).await
    }

    pub async fn set_hvac_mode<C: CloudApi>(
        &self,
        cloud: &C,
        mode: HvacMode,
    ) -> Result<usize, CoreError> {
        match mode {
            HvacMode::Off => self.turn_off(cloud).await,
            HvacMode::Heat => self.turn_on(cloud).await,
            other => Err(CoreError::ValidationFailed {
                message: format!("heater does not support mode {other}"),
            }),
        }
    }

    pub async fn set_temperature<C: CloudApi>(
        &self,
        cloud: &C,
        target: i64,
    ) -> Result<usize, CoreError> {
        let value = check_range(target, Self::MIN_TEMP, Self::MAX_TEMP)?;
        self.entity.send(cloud, [("targetTemp", value)]).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::entity::tests::{device_with, sent_pairs};
    use crate::sync::tests::FakeCloud;

    const AC_FUNCTIONS: &[&str] = &["switch", "mode", "speed", "targetTemp"];

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn ac_reads_modes_and_temperatures() {
        let ac = AirConditioner::new(device_with(
            "AC",
            AC_FUNCTIONS,
            json!({ "switch": "1", "mode": "2", "speed": "5", "targetTemp": "24", "tempSensor": "26.5" }),
        ));
        assert_eq!(ac.hvac_mode(), Some(HvacMode::Cool));
        assert_eq!(ac.fan_mode(), Some(FanMode::Low));
        assert_eq!(ac.target_temperature(), Some(24.0));
        assert_eq!(ac.current_temperature(), Some(26.5));
    }

    #[test]
    fn ac_switch_off_wins_over_mode() {
        let ac = AirConditioner::new(device_with("AC", AC_FUNCTIONS, json!({ "switch": "0", "mode": "1" })));
        assert_eq!(ac.hvac_mode(), Some(HvacMode::Off));
    }

    #[test]
    fn ac_unknown_codes_read_as_none() {
        let ac = AirConditioner::new(device_with(
            "AC",
            AC_FUNCTIONS,
            json!({ "switch": "1", "mode": "9", "speed": "1", "targetTemp": "warm" }),
        ));
        assert_eq!(ac.hvac_mode(), None);
        assert_eq!(ac.fan_mode(), None);
        assert_eq!(ac.target_temperature(), None);

        let unavailable = AirConditioner::new(device_with("AC", AC_FUNCTIONS, json!(null)));
        assert_eq!(unavailable.hvac_mode(), None);
    }

    #[tokio::test]
    async fn ac_set_mode_writes_mode_then_power() {
        let cloud = FakeCloud::default();
        let ac = AirConditioner::new(device_with("AC", AC_FUNCTIONS, json!({})));

        ac.set_hvac_mode(&cloud, HvacMode::Dry).await.unwrap();
        ac.set_hvac_mode(&cloud, HvacMode::Off).await.unwrap();
        ac.set_fan_mode(&cloud, FanMode::High).await.unwrap();
        ac.set_temperature(&cloud, 22).await.unwrap();

        assert_eq!(
            sent_pairs(&cloud),
            vec![
                pairs(&[("mode", "3"), ("switch", "1")]),
                pairs(&[("switch", "0")]),
                pairs(&[("speed", "3")]),
                pairs(&[("targetTemp", "22")]),
            ]
        );
    }

    #[tokio::test]
    async fn ac_rejects_out_of_range_temperature() {
        let cloud = FakeCloud::default();
        let ac = AirConditioner::new(device_with("AC", AC_FUNCTIONS, json!({})));

        let err = ac.set_temperature(&cloud, 30).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
        assert!(cloud.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn heater_modes_go_through_switch() {
        let cloud = FakeCloud::default();
        let heater = Heater::new(device_with("heating", &["switch", "targetTemp"], json!({ "switch": "1" })));
        assert_eq!(heater.hvac_mode(), Some(HvacMode::Heat));

        heater.set_hvac_mode(&cloud, HvacMode::Off).await.unwrap();
        heater.set_hvac_mode(&cloud, HvacMode::Heat).await.unwrap();
        heater.set_temperature(&cloud, 35).await.unwrap();
        assert!(heater.set_hvac_mode(&cloud, HvacMode::Cool).await.is_err());
        assert!(heater.set_temperature(&cloud, 19).await.is_err());

        assert_eq!(
            sent_pairs(&cloud),
            vec![
                pairs(&[("switch", "0")]),
                pairs(&[("switch", "1")]),
                pairs(&[("targetTemp", "35")]),
            ]
        );
    }
}
