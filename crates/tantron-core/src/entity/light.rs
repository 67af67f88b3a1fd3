// ── Light ──

use std::sync::Arc;

use crate::cloud::CloudApi;
use crate::error::CoreError;
use crate::model::Device;

use super::DeviceEntity;

/// On/off light bound to the `switch` function.
#[derive(Debug, Clone)]
pub struct Light {
    entity: DeviceEntity,
}

impl Light {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            entity: DeviceEntity::new(device, Some("switch")),
        }
    }

    pub fn entity(&self) -> &DeviceEntity {
        &self.entity
    }

    pub(crate) fn entity_mut(&mut self) -> &mut DeviceEntity {
        &mut self.entity
    }

    pub fn is_on(&self) -> Option<bool> {
        self.entity.state().as_str().map(|s| s == "1")
    }

    pub async fn turn_on<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send_value(cloud, "1").await
    }

    pub async fn turn_off<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send_value(cloud, "0").await
    }
}
