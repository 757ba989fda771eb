//! Capability interface the bridge consumes from the Bluetooth driver.
//!
//! The driver owns the radio and the entity tree. The bridge only reads
//! current snapshots, subscribes to snapshot and child-membership streams,
//! and invokes the mutating operations below.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::DriverError;
use crate::model::{
    CharacteristicRef, DeviceId, DeviceInfo, EntityPath, EntitySnapshot, ManagerSnapshot,
    ServiceInfo, TreeSnapshot,
};

/// Stream of state changes for one entity, in production order.
pub type SnapshotStream = BoxStream<'static, EntitySnapshot>;

/// Stream of child-membership changes for one tree node.
pub type TreeStream = BoxStream<'static, TreeSnapshot>;

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Bluetooth driver capabilities.
///
/// Streams end when the entity they describe goes away; the bridge treats
/// an ended stream as removal of that entity.
#[async_trait]
pub trait BleDriver: Send + Sync + 'static {
    /// Current manager-level values.
    fn manager_snapshot(&self) -> ManagerSnapshot;

    /// Current description of a tracked device.
    fn device(&self, id: &DeviceId) -> Option<DeviceInfo> {
        self.manager_snapshot()
            .devices
            .into_iter()
            .find(|device| &device.id == id)
    }

    /// Services discovered so far on `device` (empty before discovery).
    fn services(&self, device: &DeviceId) -> Vec<ServiceInfo>;

    /// Future snapshot changes of the entity at `path`.
    ///
    /// Not called for service paths; services only report child membership.
    fn observe(&self, path: &EntityPath) -> SnapshotStream;

    /// Child-membership changes below `path`, starting with the current set.
    fn children(&self, path: &EntityPath) -> TreeStream;

    async fn authorization_request(&self) -> DriverResult<()>;

    async fn scanning_start(&self) -> DriverResult<()>;

    async fn scanning_stop(&self) -> DriverResult<()>;

    async fn connect(&self, device: &DeviceId) -> DriverResult<()>;

    async fn disconnect(&self, device: &DeviceId) -> DriverResult<()>;

    async fn discover_services(&self, device: &DeviceId) -> DriverResult<()>;

    /// Request an MTU; returns the value actually negotiated.
    async fn request_mtu(&self, device: &DeviceId, mtu: u16) -> DriverResult<u16>;

    async fn read(&self, target: &CharacteristicRef) -> DriverResult<Vec<u8>>;

    async fn write(
        &self,
        target: &CharacteristicRef,
        value: &[u8],
        with_response: bool,
    ) -> DriverResult<()>;

    /// Enable notifications/indications at the radio level.
    async fn subscribe(&self, target: &CharacteristicRef) -> DriverResult<()>;

    async fn unsubscribe(&self, target: &CharacteristicRef) -> DriverResult<()>;
}
