// ── Environment sensor ──

use std::sync::Arc;

use strum::Display;

use crate::model::Device;

use super::DeviceEntity;

/// What an environment sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SensorClass {
    Temperature,
    Humidity,
    Pm25,
    Pm10,
    Co2,
}

impl SensorClass {
    /// Classify by device name first, then by icon.
    fn classify(device: &Device) -> Option<Self> {
        let by_name = match device.name.as_deref() {
            Some("温度") => Some(Self::Temperature),
            Some("湿度") => Some(Self::Humidity),
            Some("PM2.5") => Some(Self::Pm25),
            Some("PM10") => Some(Self::Pm10),
            Some("CO2") => Some(Self::Co2),
            _ => None,
        };
        by_name.or_else(|| match device.icon.as_deref() {
            Some("icon_envsensor_01") => Some(Self::Temperature),
            Some("icon_envsensor_02") => Some(Self::Humidity),
            Some("icon_envsensor_03") => Some(Self::Pm25),
            Some("icon_envsensor_04") => Some(Self::Pm10),
            Some("icon_envsensor_05") => Some(Self::Co2),
            _ => None,
        })
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity => "%",
            Self::Pm25 | Self::Pm10 => "µg/m³",
            Self::Co2 => "ppm",
        }
    }
}

/// Single-value sensor reading the `value` function.
#[derive(Debug, Clone)]
pub struct EnvSensor {
    entity: DeviceEntity,
}

impl EnvSensor {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            entity: DeviceEntity::new(device, Some("value")),
        }
    }

    pub fn entity(&self) -> &DeviceEntity {
        &self.entity
    }

    pub(crate) fn entity_mut(&mut self) -> &mut DeviceEntity {
        &mut self.entity
    }

    pub fn class(&self) -> Option<SensorClass> {
        SensorClass::classify(self.entity.device())
    }

    pub fn unit(&self) -> Option<&'static str> {
        self.class().map(SensorClass::unit)
    }

    pub fn native_value(&self) -> Option<f64> {
        self.entity.state().as_f64()
    }
}
