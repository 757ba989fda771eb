//! Scripted in-memory driver for bridge integration tests.
//!
//! The driver keeps a small entity tree (devices, services, characteristics)
//! and a set of open stream senders per path. Tests mutate the tree and the
//! driver publishes the resulting child lists to every open children stream,
//! the way a real driver would after a scan or a discovery.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bluebridge::prelude::*;
use bluebridge::{AuthorizationStatus, CharacteristicInfo, ConnectionStatus, ManagerState};
use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Default)]
struct TreeState {
    devices: Vec<DeviceInfo>,
    services: HashMap<DeviceId, Vec<ServiceInfo>>,
    values: HashMap<EntityPath, Vec<u8>>,
    scanning: bool,
}

/// Always locked before `tree` when both are needed.
#[derive(Default)]
struct Streams {
    snapshots: HashMap<EntityPath, Vec<mpsc::UnboundedSender<EntitySnapshot>>>,
    children: HashMap<EntityPath, Vec<mpsc::UnboundedSender<TreeSnapshot>>>,
}

/// In-memory [`BleDriver`] with scripted streams and failure injection.
#[derive(Default)]
pub struct MockDriver {
    tree: Mutex<TreeState>,
    streams: Mutex<Streams>,
    failures: Mutex<HashMap<&'static str, String>>,
    calls: Mutex<Vec<String>>,
    connect_gate: Mutex<Option<Arc<Notify>>>,
    observe_count: AtomicU32,
    children_count: AtomicU32,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Driver with one device `D1` exposing service `180d` with
    /// characteristics `2a37` (notify) and `2a39` (write).
    pub fn with_heart_rate_device() -> Arc<Self> {
        let driver = Self::new();
        driver.add_device(DeviceInfo::new("D1").with_name("HRM").with_rssi(-60));
        driver.set_services("D1", vec![heart_rate_service()]);
        driver
    }

    // ------------------------------------------------------------------
    // Tree scripting
    // ------------------------------------------------------------------

    /// Track a device and publish the new device list.
    pub fn add_device(&self, device: DeviceInfo) {
        {
            let mut tree = self.tree.lock();
            tree.devices.retain(|d| d.id != device.id);
            tree.devices.push(device);
        }
        self.publish_children(&EntityPath::Manager);
    }

    /// Stop tracking a device and publish the new device list.
    pub fn remove_device(&self, id: &str) {
        let id = DeviceId::new(id);
        {
            let mut tree = self.tree.lock();
            tree.devices.retain(|d| d.id != id);
            tree.services.remove(&id);
        }
        self.publish_children(&EntityPath::Manager);
    }

    /// Replace the discovered services of a device, as a (re)discovery
    /// would, and publish the affected child lists.
    pub fn set_services(&self, device: &str, services: Vec<ServiceInfo>) {
        let device = DeviceId::new(device);
        let service_paths: Vec<EntityPath> = services
            .iter()
            .map(|s| EntityPath::Service(device.clone(), s.id.clone()))
            .collect();
        self.tree.lock().services.insert(device.clone(), services);

        self.publish_children(&EntityPath::Device(device));
        for path in &service_paths {
            self.publish_children(path);
        }
    }

    /// Scan sighting pushed on the manager snapshot stream.
    pub fn sight(&self, device: DeviceInfo) {
        self.emit(&EntityPath::Manager, EntitySnapshot::ScanResult(device));
    }

    /// Push a snapshot to every open snapshot stream of `path`.
    pub fn emit(&self, path: &EntityPath, snapshot: EntitySnapshot) {
        let mut streams = self.streams.lock();
        if let Some(senders) = streams.snapshots.get_mut(path) {
            senders.retain(|tx| tx.unbounded_send(snapshot.clone()).is_ok());
        }
    }

    /// Push the current child list of `path` to its open children streams.
    pub fn publish_children(&self, path: &EntityPath) {
        let mut streams = self.streams.lock();
        let current = self.current_children(path);
        if let Some(senders) = streams.children.get_mut(path) {
            senders.retain(|tx| tx.unbounded_send(current.clone()).is_ok());
        }
    }

    /// Push an arbitrary child list to the open children streams of `path`.
    pub fn publish_raw_children(&self, path: &EntityPath, snapshot: TreeSnapshot) {
        let mut streams = self.streams.lock();
        if let Some(senders) = streams.children.get_mut(path) {
            senders.retain(|tx| tx.unbounded_send(snapshot.clone()).is_ok());
        }
    }

    /// End every stream of `path`, as a driver does when the entity is gone.
    pub fn end_streams(&self, path: &EntityPath) {
        let mut streams = self.streams.lock();
        streams.snapshots.remove(path);
        streams.children.remove(path);
    }

    // ------------------------------------------------------------------
    // Failure injection and call tracking
    // ------------------------------------------------------------------

    /// Make `operation` fail with `message` until cleared.
    pub fn fail(&self, operation: &'static str, message: &str) {
        self.failures.lock().insert(operation, message.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Block `connect` until the returned gate is notified.
    pub fn gate_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.connect_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == operation).count()
    }

    pub fn observe_count(&self) -> u32 {
        self.observe_count.load(Ordering::SeqCst)
    }

    pub fn children_count(&self) -> u32 {
        self.children_count.load(Ordering::SeqCst)
    }

    /// Streams of `path` whose consumer is still alive.
    pub fn live_streams(&self, path: &EntityPath) -> usize {
        let streams = self.streams.lock();
        let snapshots = streams
            .snapshots
            .get(path)
            .map_or(0, |s| s.iter().filter(|tx| !tx.is_closed()).count());
        let children = streams
            .children
            .get(path)
            .map_or(0, |s| s.iter().filter(|tx| !tx.is_closed()).count());
        snapshots + children
    }

    /// Streams across the whole tree whose consumer is still alive.
    pub fn total_live_streams(&self) -> usize {
        let streams = self.streams.lock();
        let snapshots: usize = streams
            .snapshots
            .values()
            .map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            .sum();
        let children: usize = streams
            .children
            .values()
            .map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            .sum();
        snapshots + children
    }

    fn current_children(&self, path: &EntityPath) -> TreeSnapshot {
        let tree = self.tree.lock();
        match path {
            EntityPath::Manager => tree.devices.iter().map(|d| d.id.as_str()).collect(),
            EntityPath::Device(device) => tree
                .services
                .get(device)
                .map(|services| services.iter().map(|s| s.id.as_str()).collect())
                .unwrap_or_default(),
            EntityPath::Service(device, service) => tree
                .services
                .get(device)
                .and_then(|services| services.iter().find(|s| &s.id == service))
                .map(|s| s.characteristics.iter().map(|c| c.id.as_str()).collect())
                .unwrap_or_default(),
            EntityPath::Characteristic(..) => TreeSnapshot::empty(),
        }
    }

    fn record(&self, operation: &str) -> DriverResult<()> {
        self.calls.lock().push(operation.to_string());
        match self.failures.lock().get(operation) {
            Some(message) => Err(DriverError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BleDriver for MockDriver {
    fn manager_snapshot(&self) -> ManagerSnapshot {
        let tree = self.tree.lock();
        ManagerSnapshot {
            state: ManagerState::PoweredOn,
            authorization: AuthorizationStatus::Authorized,
            scanning_enabled: tree.scanning,
            devices: tree.devices.clone(),
        }
    }

    fn services(&self, device: &DeviceId) -> Vec<ServiceInfo> {
        self.tree
            .lock()
            .services
            .get(device)
            .cloned()
            .unwrap_or_default()
    }

    fn observe(&self, path: &EntityPath) -> SnapshotStream {
        self.observe_count.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded();
        self.streams
            .lock()
            .snapshots
            .entry(path.clone())
            .or_default()
            .push(tx);
        rx.boxed()
    }

    fn children(&self, path: &EntityPath) -> TreeStream {
        self.children_count.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded();
        let mut streams = self.streams.lock();
        let _ = tx.unbounded_send(self.current_children(path));
        streams.children.entry(path.clone()).or_default().push(tx);
        rx.boxed()
    }

    async fn authorization_request(&self) -> DriverResult<()> {
        self.record("authorizationRequest")
    }

    async fn scanning_start(&self) -> DriverResult<()> {
        self.record("scanningStart")?;
        self.tree.lock().scanning = true;
        self.emit(&EntityPath::Manager, EntitySnapshot::ScanningEnabled(true));
        Ok(())
    }

    async fn scanning_stop(&self) -> DriverResult<()> {
        self.record("scanningStop")?;
        self.tree.lock().scanning = false;
        self.emit(&EntityPath::Manager, EntitySnapshot::ScanningEnabled(false));
        Ok(())
    }

    async fn connect(&self, device: &DeviceId) -> DriverResult<()> {
        self.record("connect")?;
        let gate = self.connect_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.emit(
            &EntityPath::Device(device.clone()),
            EntitySnapshot::ConnectionStatus(ConnectionStatus::Connected),
        );
        Ok(())
    }

    async fn disconnect(&self, device: &DeviceId) -> DriverResult<()> {
        self.record("disconnect")?;
        self.emit(
            &EntityPath::Device(device.clone()),
            EntitySnapshot::ConnectionStatus(ConnectionStatus::Disconnected),
        );
        Ok(())
    }

    async fn discover_services(&self, device: &DeviceId) -> DriverResult<()> {
        self.record("discoverServices")?;
        self.publish_children(&EntityPath::Device(device.clone()));
        Ok(())
    }

    async fn request_mtu(&self, device: &DeviceId, mtu: u16) -> DriverResult<u16> {
        self.record("requestMtu")?;
        let negotiated = mtu.min(185);
        self.emit(
            &EntityPath::Device(device.clone()),
            EntitySnapshot::Mtu(negotiated),
        );
        Ok(negotiated)
    }

    async fn read(&self, target: &CharacteristicRef) -> DriverResult<Vec<u8>> {
        self.record("read")?;
        Ok(self
            .tree
            .lock()
            .values
            .get(&target.path())
            .cloned()
            .unwrap_or_default())
    }

    async fn write(
        &self,
        target: &CharacteristicRef,
        value: &[u8],
        _with_response: bool,
    ) -> DriverResult<()> {
        self.record("write")?;
        self.tree.lock().values.insert(target.path(), value.to_vec());
        Ok(())
    }

    async fn subscribe(&self, target: &CharacteristicRef) -> DriverResult<()> {
        self.record("subscribe")?;
        self.emit(&target.path(), EntitySnapshot::Notifying(true));
        Ok(())
    }

    async fn unsubscribe(&self, target: &CharacteristicRef) -> DriverResult<()> {
        self.record("unsubscribe")?;
        self.emit(&target.path(), EntitySnapshot::Notifying(false));
        Ok(())
    }
}

/// Service `180d` with characteristics `2a37` and `2a39`.
pub fn heart_rate_service() -> ServiceInfo {
    ServiceInfo::new(
        "180d",
        vec![
            CharacteristicInfo::new("2a37"),
            CharacteristicInfo::new("2a39"),
        ],
    )
}

/// Collecting sink handed to `Bridge::on_attach`.
pub fn event_channel() -> (
    Arc<tokio::sync::mpsc::UnboundedSender<PushEvent>>,
    tokio::sync::mpsc::UnboundedReceiver<PushEvent>,
) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

/// Drain everything currently buffered in the event channel.
pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<PushEvent>) -> Vec<PushEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Give spawned observation tasks a chance to drain their streams.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Await `future` with a two second timeout.
pub async fn within<F: Future>(future: F) -> F::Output {
    match tokio::time::timeout(Duration::from_secs(2), future).await {
        Ok(output) => output,
        Err(_) => panic!("Timed out"),
    }
}
