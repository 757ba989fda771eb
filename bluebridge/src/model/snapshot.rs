//! Immutable snapshots of entity state as produced by the driver.
//!
//! The bridge never builds or mutates these itself; it only reads them and
//! forwards them to the remote consumer. Field names serialize in the shape
//! the remote consumer expects.

use std::collections::BTreeSet;

use serde::Serialize;

use super::ids::{CharacteristicId, DeviceId, ServiceId};
use super::path::EntityKind;

/// Adapter power/availability state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ManagerState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

/// Platform Bluetooth permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    Unknown,
    Authorized,
    Denied,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CharacteristicProperty {
    Broadcast,
    Read,
    WriteWithoutResponse,
    Write,
    Notify,
    Indicate,
    AuthenticatedSignedWrites,
    ExtendedProperties,
}

/// Advertisement-level description of a peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: Option<String>,
    pub rssi: i16,
    pub is_connectable: bool,
    pub advertised_services: Vec<ServiceId>,
    pub manufacturer_id: Option<u16>,
    #[serde(rename = "manufacturerString")]
    pub manufacturer_name: Option<String>,
    pub manufacturer_data: Vec<u8>,
}

impl DeviceInfo {
    /// A connectable device with no advertisement payload.
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            rssi: 0,
            is_connectable: true,
            advertised_services: Vec::new(),
            manufacturer_id: None,
            manufacturer_name: None,
            manufacturer_data: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = rssi;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacteristicInfo {
    pub id: CharacteristicId,
    /// Assigned-number name for well known UUIDs
    pub name: Option<String>,
    pub properties: Vec<CharacteristicProperty>,
}

impl CharacteristicInfo {
    pub fn new(id: impl Into<CharacteristicId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<CharacteristicProperty>) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub id: ServiceId,
    /// Assigned-number name for well known UUIDs
    pub name: Option<String>,
    pub characteristics: Vec<CharacteristicInfo>,
}

impl ServiceInfo {
    pub fn new(id: impl Into<ServiceId>, characteristics: Vec<CharacteristicInfo>) -> Self {
        Self {
            id: id.into(),
            name: None,
            characteristics,
        }
    }

    pub fn characteristic(&self, id: &CharacteristicId) -> Option<&CharacteristicInfo> {
        self.characteristics.iter().find(|c| &c.id == id)
    }
}

/// One observed value change of one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntitySnapshot {
    // Manager level
    State(ManagerState),
    Authorization(AuthorizationStatus),
    ScanningEnabled(bool),
    /// A single advertisement sighting during a scan
    ScanResult(DeviceInfo),
    Devices(Vec<DeviceInfo>),

    // Device level
    ConnectionStatus(ConnectionStatus),
    Services(Vec<ServiceInfo>),
    Mtu(u16),

    // Characteristic level
    Notifying(bool),
    Data(Vec<u8>),
}

impl EntitySnapshot {
    /// The tree level this snapshot belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntitySnapshot::State(_)
            | EntitySnapshot::Authorization(_)
            | EntitySnapshot::ScanningEnabled(_)
            | EntitySnapshot::ScanResult(_)
            | EntitySnapshot::Devices(_) => EntityKind::Manager,
            EntitySnapshot::ConnectionStatus(_)
            | EntitySnapshot::Services(_)
            | EntitySnapshot::Mtu(_) => EntityKind::Device,
            EntitySnapshot::Notifying(_) | EntitySnapshot::Data(_) => EntityKind::Characteristic,
        }
    }
}

/// Current manager-level values, read synchronously from the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSnapshot {
    pub state: ManagerState,
    pub authorization: AuthorizationStatus,
    pub scanning_enabled: bool,
    pub devices: Vec<DeviceInfo>,
}

/// Current child membership of one tree node, unordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    children: BTreeSet<String>,
}

impl TreeSnapshot {
    pub fn new<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            children: children.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.children.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for TreeSnapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
