//! Entity model: identifiers, identity paths, driver snapshots and
//! path resolution.

mod entity;
mod ids;
mod path;
mod snapshot;

pub use entity::{CharacteristicRef, EntityModel};
pub use ids::{CharacteristicId, DeviceId, ServiceId};
pub use path::{EntityKind, EntityPath};
pub use snapshot::{
    AuthorizationStatus, CharacteristicInfo, CharacteristicProperty, ConnectionStatus, DeviceInfo,
    EntitySnapshot, ManagerSnapshot, ManagerState, ServiceInfo, TreeSnapshot,
};
