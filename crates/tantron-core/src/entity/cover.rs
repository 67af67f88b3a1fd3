// ── Curtain ──

use std::sync::Arc;

use crate::cloud::CloudApi;
use crate::error::CoreError;
use crate::model::Device;

use super::DeviceEntity;

/// Motorized curtain. `switch` is `1` while closed.
#[derive(Debug, Clone)]
pub struct Curtain {
    entity: DeviceEntity,
}

impl Curtain {
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

    pub fn is_closed(&self) -> Option<bool> {
        self.entity.value("switch").as_str().map(|s| s == "1")
    }

    pub async fn close<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "1")]).await
    }

    pub async fn open<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("switch", "0")]).await
    }

    pub async fn stop<C: CloudApi>(&self, cloud: &C) -> Result<usize, CoreError> {
        self.entity.send(cloud, [("stop", "1")]).await
    }
}
