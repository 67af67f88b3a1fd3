// ── Air purifier ──

use std::sync::Arc;

use crate::cloud::CloudApi;
use crate::error::CoreError;
use crate::model::Device;

use super::DeviceEntity;

/// Fresh-air unit with three speeds, exposed as a percentage.
#[derive(Debug, Clone)]
pub struct AirPurifier {
    entity: DeviceEntity,
}

impl AirPurifier {
    pub const SPEED_COUNT: u8 = 3;

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

    pub fn is_on(&self) -> Option<bool> {
        self.entity.value("switch").as_str().map(|s| s == "1")
    }

    /// Speed 1..=3 as 33/66/100.
    pub fn percentage(&self) -> Option<u8> {
        let speed = self.entity.value("speed").as_i64()?;
        u8::try_from(speed.checked_mul(100)? / i64::from(Self::SPEED_COUNT)).ok()
    }

    pub async fn turn_on<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "1")]).await
    }

    pub async fn turn_off<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "0")]).await
    }

    /// Power on at the lowest speed covering `percentage`; 0 powers off.
    pub async fn set_percentage<C: CloudApi>(
        &self,
        cloud: &C,
        percentage: u8,
    ) -> Result<usize, CoreError> {
        match speed_for(percentage) {
            0 => self.turn_off(cloud).await,
            speed => {
                self.entity
                    .send(cloud, [("switch", "1".to_owned()), ("speed", speed.to_string())])
                    .await
            }
        }
    }
}

/// `ceil(count * pct / 100)`, with `pct` clamped to 100.
fn speed_for(percentage: u8) -> u8 {
    let pct = u16::from(percentage.min(100));
    let count = u16::from(AirPurifier::SPEED_COUNT);
    u8::try_from((count * pct).div_ceil(100)).unwrap_or(AirPurifier::SPEED_COUNT)
}
