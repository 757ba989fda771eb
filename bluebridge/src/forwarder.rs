//! Event forwarding to the remote consumer.
//!
//! Every snapshot observed through a live observation is translated into a
//! named push event addressed by the entity's identity fields. Delivery is
//! fire-and-forget: a closed consumer channel drops the event and nothing
//! upstream is affected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::model::{
    CharacteristicId, DeviceId, EntityPath, EntitySnapshot, ManagerSnapshot, ServiceId,
};

/// Names of the push events understood by the remote consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    State,
    AuthorizationStatus,
    ScanningEnabled,
    ScanningDevices,
    Devices,
    DeviceConnectionStatus,
    DeviceServices,
    DeviceMtu,
    DeviceCharacteristicIsNotifying,
    DeviceCharacteristicData,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::State => "stateUpdate",
            EventName::AuthorizationStatus => "authorizationStatusUpdate",
            EventName::ScanningEnabled => "scanningEnabledUpdate",
            EventName::ScanningDevices => "scanningDevicesUpdate",
            EventName::Devices => "devicesUpdate",
            EventName::DeviceConnectionStatus => "deviceConnectionStatusUpdate",
            EventName::DeviceServices => "deviceServicesUpdate",
            EventName::DeviceMtu => "deviceMTUUpdate",
            EventName::DeviceCharacteristicIsNotifying => "deviceCharacteristicIsNotifyingUpdate",
            EventName::DeviceCharacteristicData => "deviceCharacteristicDataUpdate",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound update for the remote consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub name: EventName,
    pub device_id: Option<DeviceId>,
    pub service_id: Option<ServiceId>,
    pub characteristic_id: Option<CharacteristicId>,
    pub value: Value,
}

impl PushEvent {
    fn at(name: EventName, path: &EntityPath, value: Value) -> Self {
        Self {
            name,
            device_id: path.device_id().cloned(),
            service_id: path.service_id().cloned(),
            characteristic_id: path.characteristic_id().cloned(),
            value,
        }
    }

    /// Flat argument map as sent over the push channel.
    pub fn arguments(&self) -> Map<String, Value> {
        let mut arguments = Map::new();
        if let Some(device) = &self.device_id {
            arguments.insert("deviceId".into(), Value::from(device.as_str()));
        }
        if let Some(service) = &self.service_id {
            arguments.insert("serviceId".into(), Value::from(service.as_str()));
        }
        if let Some(characteristic) = &self.characteristic_id {
            arguments.insert("characteristicId".into(), Value::from(characteristic.as_str()));
        }
        arguments.insert("value".into(), self.value.clone());
        arguments
    }
}

/// The consumer side of the push channel has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Push channel closed")]
pub struct SinkClosed;

/// Ordered, fire-and-forget push channel to the remote consumer.
pub trait EventSink: Send + Sync + 'static {
    fn push(&self, event: PushEvent) -> Result<(), SinkClosed>;
}

impl EventSink for mpsc::UnboundedSender<PushEvent> {
    fn push(&self, event: PushEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

/// Translate a snapshot observed at `path` into its push event.
///
/// Returns `None` when the snapshot kind does not belong to the path's level.
pub fn translate(path: &EntityPath, snapshot: &EntitySnapshot) -> Option<PushEvent> {
    let (name, value) = match (path, snapshot) {
        (EntityPath::Manager, EntitySnapshot::State(state)) => (EventName::State, to_value(state)?),
        (EntityPath::Manager, EntitySnapshot::Authorization(status)) => {
            (EventName::AuthorizationStatus, to_value(status)?)
        }
        (EntityPath::Manager, EntitySnapshot::ScanningEnabled(enabled)) => {
            (EventName::ScanningEnabled, Value::Bool(*enabled))
        }
        (EntityPath::Manager, EntitySnapshot::ScanResult(device)) => {
            (EventName::ScanningDevices, to_value(device)?)
        }
        (EntityPath::Manager, EntitySnapshot::Devices(devices)) => {
            (EventName::Devices, to_value(devices)?)
        }
        (EntityPath::Device(_), EntitySnapshot::ConnectionStatus(status)) => {
            (EventName::DeviceConnectionStatus, to_value(status)?)
        }
        (EntityPath::Device(_), EntitySnapshot::Services(services)) => {
            (EventName::DeviceServices, to_value(services)?)
        }
        (EntityPath::Device(_), EntitySnapshot::Mtu(mtu)) => (EventName::DeviceMtu, Value::from(*mtu)),
        (EntityPath::Characteristic(..), EntitySnapshot::Notifying(notifying)) => {
            (EventName::DeviceCharacteristicIsNotifying, Value::Bool(*notifying))
        }
        (EntityPath::Characteristic(..), EntitySnapshot::Data(data)) => {
            (EventName::DeviceCharacteristicData, to_value(data)?)
        }
        _ => return None,
    };

    Some(PushEvent::at(name, path, value))
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to encode push event value: {}", e);
            None
        }
    }
}

/// Relays observed snapshots to the remote consumer.
///
/// Cloned into every observation task of a session. Once closed, every
/// event is dropped, so a detached consumer never hears from the bridge
/// again even if the driver keeps emitting.
#[derive(Clone)]
pub struct EventForwarder {
    sink: Arc<dyn EventSink>,
    open: Arc<AtomicBool>,
}

impl EventForwarder {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Forward one snapshot; returns whether it reached the sink.
    pub fn forward(&self, path: &EntityPath, snapshot: &EntitySnapshot) -> bool {
        match translate(path, snapshot) {
            Some(event) => self.push(event),
            None => {
                tracing::warn!(
                    "Dropping {:?} snapshot observed at {} {}",
                    snapshot.kind(),
                    path.kind(),
                    path
                );
                false
            }
        }
    }

    /// Push the current manager-level values, as `initialize` requires.
    pub fn report_manager(&self, snapshot: &ManagerSnapshot) {
        let manager = EntityPath::Manager;
        self.forward(&manager, &EntitySnapshot::State(snapshot.state));
        self.forward(&manager, &EntitySnapshot::Authorization(snapshot.authorization));
        self.forward(&manager, &EntitySnapshot::ScanningEnabled(snapshot.scanning_enabled));
        self.forward(&manager, &EntitySnapshot::Devices(snapshot.devices.clone()));
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn push(&self, event: PushEvent) -> bool {
        if !self.is_open() {
            tracing::trace!("Forwarder closed, dropping {}", event.name);
            return false;
        }

        let name = event.name;
        match self.sink.push(event) {
            Ok(()) => true,
            Err(SinkClosed) => {
                tracing::debug!("Consumer channel closed, dropping {}", name);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectionStatus, DeviceInfo, ManagerState};
    use serde_json::json;

    fn forwarder() -> (EventForwarder, mpsc::UnboundedReceiver<PushEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventForwarder::new(Arc::new(tx)), rx)
    }

    #[test]
    fn test_characteristic_event_carries_full_path() {
        let path = EntityPath::characteristic("D1", "180d", "2a37");
        let event = translate(&path, &EntitySnapshot::Data(vec![1, 2, 3])).unwrap();

        assert_eq!(event.name.as_str(), "deviceCharacteristicDataUpdate");
        assert_eq!(
            Value::Object(event.arguments()),
            json!({
                "deviceId": "D1",
                "serviceId": "180d",
                "characteristicId": "2a37",
                "value": [1, 2, 3],
            })
        );
    }

    #[test]
    fn test_device_events() {
        let path = EntityPath::device("D1");
        let event = translate(&path, &EntitySnapshot::ConnectionStatus(ConnectionStatus::Connected))
            .unwrap();
        assert_eq!(event.name, EventName::DeviceConnectionStatus);
        assert_eq!(event.value, json!("connected"));
        assert_eq!(event.service_id, None);

        let event = translate(&path, &EntitySnapshot::Mtu(185)).unwrap();
        assert_eq!(event.name.as_str(), "deviceMTUUpdate");
        assert_eq!(event.value, json!(185));
    }

    #[test]
    fn test_mismatched_snapshot_is_not_translated() {
        let path = EntityPath::device("D1");
        assert!(translate(&path, &EntitySnapshot::Data(vec![0])).is_none());
        assert!(translate(&EntityPath::Manager, &EntitySnapshot::Mtu(23)).is_none());
    }

    #[test]
    fn test_forward_preserves_order() {
        let (forwarder, mut rx) = forwarder();
        let path = EntityPath::characteristic("D1", "180d", "2a37");
        for byte in 0..5u8 {
            assert!(forwarder.forward(&path, &EntitySnapshot::Data(vec![byte])));
        }

        for byte in 0..5u8 {
            assert_eq!(rx.try_recv().unwrap().value, json!([byte]));
        }
    }

    #[test]
    fn test_closed_forwarder_drops_events() {
        let (forwarder, mut rx) = forwarder();
        forwarder.close();

        assert!(!forwarder.forward(&EntityPath::Manager, &EntitySnapshot::ScanningEnabled(true)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_consumer_is_silent() {
        let (forwarder, rx) = forwarder();
        drop(rx);

        assert!(!forwarder.forward(&EntityPath::Manager, &EntitySnapshot::ScanningEnabled(true)));
        assert!(forwarder.is_open());
    }

    #[test]
    fn test_report_manager() {
        let (forwarder, mut rx) = forwarder();
        forwarder.report_manager(&ManagerSnapshot {
            state: ManagerState::PoweredOn,
            authorization: crate::model::AuthorizationStatus::Authorized,
            scanning_enabled: false,
            devices: vec![DeviceInfo::new("D1")],
        });

        let names: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| event.name)
            .collect();
        assert_eq!(
            names,
            vec![
                EventName::State,
                EventName::AuthorizationStatus,
                EventName::ScanningEnabled,
                EventName::Devices,
            ]
        );
    }
}
