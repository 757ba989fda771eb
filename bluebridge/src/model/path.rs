//! Typed identity paths for the manager/device/service/characteristic tree.

use bridge_registry::IdentityPath;

use super::ids::{CharacteristicId, DeviceId, ServiceId};

/// The level of the entity tree a path points at.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EntityKind {
    Manager,
    Device,
    Service,
    Characteristic,
}

impl EntityKind {
    /// Whether entities of this kind produce their own snapshots; services
    /// only report child membership.
    pub fn has_snapshots(&self) -> bool {
        !matches!(self, EntityKind::Service)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Manager => "manager",
            EntityKind::Device => "device",
            EntityKind::Service => "service",
            EntityKind::Characteristic => "characteristic",
        };
        write!(f, "{}", name)
    }
}

/// Address of one entity in the tree.
///
/// Paths stay stable for as long as the entity exists; they are the only way
/// the bridge and the remote consumer refer to entities.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum EntityPath {
    Manager,
    Device(DeviceId),
    Service(DeviceId, ServiceId),
    Characteristic(DeviceId, ServiceId, CharacteristicId),
}

impl EntityPath {
    pub fn device(device: impl Into<DeviceId>) -> Self {
        EntityPath::Device(device.into())
    }

    pub fn service(device: impl Into<DeviceId>, service: impl Into<ServiceId>) -> Self {
        EntityPath::Service(device.into(), service.into())
    }

    pub fn characteristic(
        device: impl Into<DeviceId>,
        service: impl Into<ServiceId>,
        characteristic: impl Into<CharacteristicId>,
    ) -> Self {
        EntityPath::Characteristic(device.into(), service.into(), characteristic.into())
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPath::Manager => EntityKind::Manager,
            EntityPath::Device(..) => EntityKind::Device,
            EntityPath::Service(..) => EntityKind::Service,
            EntityPath::Characteristic(..) => EntityKind::Characteristic,
        }
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            EntityPath::Manager => None,
            EntityPath::Device(device)
            | EntityPath::Service(device, _)
            | EntityPath::Characteristic(device, _, _) => Some(device),
        }
    }

    pub fn service_id(&self) -> Option<&ServiceId> {
        match self {
            EntityPath::Service(_, service) | EntityPath::Characteristic(_, service, _) => {
                Some(service)
            }
            _ => None,
        }
    }

    pub fn characteristic_id(&self) -> Option<&CharacteristicId> {
        match self {
            EntityPath::Characteristic(_, _, characteristic) => Some(characteristic),
            _ => None,
        }
    }

    /// Whether entities at this level own a child collection.
    pub fn has_children(&self) -> bool {
        !matches!(self, EntityPath::Characteristic(..))
    }

    /// Path of the child keyed by `key`, `None` below characteristics.
    pub fn child(&self, key: &str) -> Option<EntityPath> {
        match self {
            EntityPath::Manager => Some(EntityPath::Device(DeviceId::new(key))),
            EntityPath::Device(device) => {
                Some(EntityPath::Service(device.clone(), ServiceId::new(key)))
            }
            EntityPath::Service(device, service) => Some(EntityPath::Characteristic(
                device.clone(),
                service.clone(),
                CharacteristicId::new(key),
            )),
            EntityPath::Characteristic(..) => None,
        }
    }

    /// The untyped registry key for this entity.
    pub fn identity(&self) -> IdentityPath {
        match self {
            EntityPath::Manager => IdentityPath::root(),
            EntityPath::Device(device) => IdentityPath::from_segments([device.as_str()]),
            EntityPath::Service(device, service) => {
                IdentityPath::from_segments([device.as_str(), service.as_str()])
            }
            EntityPath::Characteristic(device, service, characteristic) => {
                IdentityPath::from_segments([
                    device.as_str(),
                    service.as_str(),
                    characteristic.as_str(),
                ])
            }
        }
    }

    /// Inverse of [`identity`](Self::identity); `None` for paths deeper than
    /// a characteristic.
    pub fn from_identity(path: &IdentityPath) -> Option<Self> {
        match path.segments() {
            [] => Some(EntityPath::Manager),
            [device] => Some(EntityPath::device(device.as_str())),
            [device, service] => Some(EntityPath::service(device.as_str(), service.as_str())),
            [device, service, characteristic] => Some(EntityPath::characteristic(
                device.as_str(),
                service.as_str(),
                characteristic.as_str(),
            )),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identity())
    }
}
