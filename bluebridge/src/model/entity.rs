//! Read-only resolution of identity paths against the driver's live state.

use std::sync::Arc;

use crate::driver::{BleDriver, SnapshotStream, TreeStream};
use crate::error::{BridgeError, Result};

use super::ids::{CharacteristicId, DeviceId, ServiceId};
use super::path::EntityPath;
use super::snapshot::{CharacteristicInfo, DeviceInfo, ManagerSnapshot, ServiceInfo};

/// Address of one characteristic as device, service and characteristic id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacteristicRef {
    pub device: DeviceId,
    pub service: ServiceId,
    pub characteristic: CharacteristicId,
}

impl CharacteristicRef {
    pub fn path(&self) -> EntityPath {
        EntityPath::Characteristic(
            self.device.clone(),
            self.service.clone(),
            self.characteristic.clone(),
        )
    }
}

/// Projection of the driver's entity tree, addressed by identity path.
#[derive(Clone)]
pub struct EntityModel {
    driver: Arc<dyn BleDriver>,
}

impl EntityModel {
    pub fn new(driver: Arc<dyn BleDriver>) -> Self {
        Self { driver }
    }

    pub fn manager(&self) -> ManagerSnapshot {
        self.driver.manager_snapshot()
    }

    /// Register for future snapshot changes of the entity at `path`.
    pub fn observe(&self, path: &EntityPath) -> SnapshotStream {
        self.driver.observe(path)
    }

    /// Register for child-membership changes below `path`.
    pub fn children(&self, path: &EntityPath) -> TreeStream {
        self.driver.children(path)
    }

    /// # Errors
    /// * `BridgeError::DeviceNotFound` - the driver does not track `id`
    pub fn device(&self, id: &DeviceId) -> Result<DeviceInfo> {
        self.driver
            .device(id)
            .ok_or_else(|| BridgeError::DeviceNotFound(id.clone()))
    }

    /// # Errors
    /// * `BridgeError::DeviceNotFound` / `BridgeError::ServiceNotFound`
    pub fn service(&self, device: &DeviceId, service: &ServiceId) -> Result<ServiceInfo> {
        self.device(device)?;
        self.driver
            .services(device)
            .into_iter()
            .find(|s| &s.id == service)
            .ok_or_else(|| BridgeError::ServiceNotFound {
                device: device.clone(),
                service: service.clone(),
            })
    }

    /// Resolve a characteristic, failing on the first missing level.
    pub fn characteristic(
        &self,
        device: &DeviceId,
        service: &ServiceId,
        characteristic: &CharacteristicId,
    ) -> Result<(CharacteristicRef, CharacteristicInfo)> {
        let found = self.service(device, service)?;
        let info = found.characteristic(characteristic).cloned().ok_or_else(|| {
            BridgeError::CharacteristicNotFound {
                device: device.clone(),
                service: service.clone(),
                characteristic: characteristic.clone(),
            }
        })?;

        let target = CharacteristicRef {
            device: device.clone(),
            service: service.clone(),
            characteristic: characteristic.clone(),
        };
        Ok((target, info))
    }

    /// Whether `path` currently resolves to a known entity.
    pub fn contains(&self, path: &EntityPath) -> bool {
        match path {
            EntityPath::Manager => true,
            EntityPath::Device(device) => self.device(device).is_ok(),
            EntityPath::Service(device, service) => self.service(device, service).is_ok(),
            EntityPath::Characteristic(device, service, characteristic) => {
                self.characteristic(device, service, characteristic).is_ok()
            }
        }
    }
}
