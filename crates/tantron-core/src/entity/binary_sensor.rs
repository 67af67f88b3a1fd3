// ── Binary sensors ──

use std::sync::Arc;

use crate::model::{Device, Gateway};
use crate::store::RegistrySnapshot;

use super::DeviceEntity;

/// Gateway connectivity, derived from the gateway's online state.
#[derive(Debug, Clone)]
pub struct GatewayOnline {
    gateway: Option<Arc<Gateway>>,
}

impl GatewayOnline {
    pub const UNIQUE_ID: &'static str = "gateway.online";

    pub fn new(gateway: Option<Arc<Gateway>>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> Option<&Gateway> {
        self.gateway.as_deref()
    }

    pub fn is_on(&self) -> Option<bool> {
        self.gateway.as_ref()?.online_state.as_bool()
    }

    pub(crate) fn refresh(&mut self, snapshot: &RegistrySnapshot) -> bool {
        if self.gateway == snapshot.gateway {
            return false;
        }
        self.gateway.clone_from(&snapshot.gateway);
        true
    }
}

/// Motion detector: a security sensor with the motion icon.
#[derive(Debug, Clone)]
pub struct MotionSensor {
    entity: DeviceEntity,
}

impl MotionSensor {
    const ICON: &'static str = "icon_secusensor_02";

    pub fn new(device: Arc<Device>) -> Self {
        Self {
            entity: DeviceEntity::new(device, Some("status")),
        }
    }

    pub(crate) fn matches(device: &Device) -> bool {
        device.is_type("secuSensor") && device.icon.as_deref() == Some(Self::ICON)
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
}
