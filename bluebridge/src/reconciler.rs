//! Tree reconciliation: keeps the subscription registry shaped like the
//! driver's entity tree.
//!
//! Every observed node with children has one task consuming its children
//! stream, so Tree Snapshots for one parent are reconciled strictly in order.
//! All registry mutations happen under one lock that is never held across an
//! await point; each reconcile is one atomic diff-and-apply step.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_registry::{IdentityPath, RegistryError, SubscriptionRegistry};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::driver::{SnapshotStream, TreeStream};
use crate::forwarder::EventForwarder;
use crate::model::{EntityModel, EntityPath, EntitySnapshot, TreeSnapshot};
use crate::observation::{Observation, ObservationId};

/// The registry shared by the reconciler tasks and the lifecycle controller.
pub type SharedRegistry = Arc<Mutex<SubscriptionRegistry<Observation>>>;

/// What a single reconcile step changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Children that got a fresh observation
    pub added: Vec<EntityPath>,
    /// Children whose subtree was torn down
    pub removed: Vec<EntityPath>,
    /// Total handles released, nested ones included
    pub released: usize,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Diffs child membership against the registry and installs or tears down
/// observations accordingly.
#[derive(Clone)]
pub struct Reconciler {
    model: EntityModel,
    registry: SharedRegistry,
    forwarder: EventForwarder,
    runtime: Handle,
    next_id: Arc<AtomicU64>,
}

impl Reconciler {
    pub fn new(
        model: EntityModel,
        registry: SharedRegistry,
        forwarder: EventForwarder,
        runtime: Handle,
    ) -> Self {
        Self {
            model,
            registry,
            forwarder,
            runtime,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start observing the manager-level streams.
    ///
    /// Returns `None` when the root is already observed.
    pub fn observe_root(&self) -> Option<ObservationId> {
        let mut registry = self.registry.lock();
        self.install_locked(&mut registry, &EntityPath::Manager)
    }

    /// Apply a new child-membership snapshot for `parent`.
    ///
    /// `owner` is the observation whose children stream produced the
    /// snapshot; if `parent` is no longer observed by it (removed or
    /// re-installed meanwhile) the snapshot is stale and ignored.
    pub fn reconcile(
        &self,
        parent: &EntityPath,
        owner: ObservationId,
        snapshot: &TreeSnapshot,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let mut registry = self.registry.lock();

        let parent_key = parent.identity();
        if !is_current(&registry, &parent_key, owner) {
            tracing::debug!("Ignoring stale child list for {} ({})", parent, owner);
            return outcome;
        }

        let desired: BTreeMap<IdentityPath, EntityPath> = snapshot
            .iter()
            .filter_map(|key| parent.child(key))
            .map(|path| (path.identity(), path))
            .collect();

        for existing in registry.children_of(&parent_key) {
            if desired.contains_key(&existing) {
                continue;
            }
            outcome.released += registry.remove_subtree(&existing);
            if let Some(path) = EntityPath::from_identity(&existing) {
                tracing::debug!("{} {} is gone", path.kind(), path);
                outcome.removed.push(path);
            }
        }

        for (key, path) in desired {
            if registry.is_observed(&key) {
                continue;
            }
            if self.install_locked(&mut registry, &path).is_some() {
                outcome.added.push(path);
            }
        }

        outcome
    }

    /// Observe a single child of `parent` if it is not observed yet.
    ///
    /// Used for scan sightings, which announce one device at a time without
    /// a full membership list.
    pub fn sight(&self, parent: &EntityPath, owner: ObservationId, key: &str) -> bool {
        let Some(path) = parent.child(key) else {
            return false;
        };

        let mut registry = self.registry.lock();
        if !is_current(&registry, &parent.identity(), owner) {
            return false;
        }
        if registry.is_observed(&path.identity()) {
            return false;
        }
        self.install_locked(&mut registry, &path).is_some()
    }

    /// Tear down `path` and everything beneath it, provided `owner` still
    /// observes it. Returns the number of handles released.
    pub fn entity_lost(&self, path: &EntityPath, owner: ObservationId) -> usize {
        let mut registry = self.registry.lock();
        let key = path.identity();
        if !is_current(&registry, &key, owner) {
            return 0;
        }
        registry.remove_subtree(&key)
    }

    fn owns(&self, path: &EntityPath, id: ObservationId) -> bool {
        is_current(&self.registry.lock(), &path.identity(), id)
    }

    fn install_locked(
        &self,
        registry: &mut SubscriptionRegistry<Observation>,
        path: &EntityPath,
    ) -> Option<ObservationId> {
        let id = ObservationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        match registry.install_with(path.identity(), || self.spawn_observation(path, id)) {
            Ok(()) => {
                tracing::debug!("Observing {} {} ({})", path.kind(), path, id);
                Some(id)
            }
            Err(RegistryError::AlreadyObserved(_)) => {
                tracing::warn!("{} {} is already observed, skipping", path.kind(), path);
                None
            }
            Err(e) => {
                tracing::warn!("Cannot observe {} {}: {}", path.kind(), path, e);
                None
            }
        }
    }

    fn spawn_observation(&self, path: &EntityPath, id: ObservationId) -> Observation {
        let mut tasks = Vec::with_capacity(2);

        if path.kind().has_snapshots() {
            let snapshots = self.model.observe(path);
            let task = self
                .runtime
                .spawn(self.clone().run_snapshots(path.clone(), id, snapshots));
            tasks.push(task.abort_handle());
        }

        if path.has_children() {
            let children = self.model.children(path);
            let task = self
                .runtime
                .spawn(self.clone().run_children(path.clone(), id, children));
            tasks.push(task.abort_handle());
        }

        Observation::new(id, tasks)
    }

    async fn run_snapshots(self, path: EntityPath, id: ObservationId, mut stream: SnapshotStream) {
        while let Some(snapshot) = stream.next().await {
            // Abort is asynchronous; a removed entity must not forward
            if !self.owns(&path, id) {
                break;
            }
            if let EntitySnapshot::ScanResult(device) = &snapshot {
                self.sight(&path, id, device.id.as_str());
            }
            self.forwarder.forward(&path, &snapshot);
        }
        self.stream_ended(&path, id, "snapshot");
    }

    async fn run_children(self, path: EntityPath, id: ObservationId, mut stream: TreeStream) {
        while let Some(snapshot) = stream.next().await {
            let outcome = self.reconcile(&path, id, &snapshot);
            if !outcome.is_noop() {
                tracing::debug!(
                    "Reconciled {}: +{} -{} ({} released)",
                    path,
                    outcome.added.len(),
                    outcome.removed.len(),
                    outcome.released
                );
            }
        }
        self.stream_ended(&path, id, "children");
    }

    fn stream_ended(&self, path: &EntityPath, id: ObservationId, which: &str) {
        if *path == EntityPath::Manager {
            tracing::warn!("Manager {} stream ended", which);
            return;
        }

        let released = self.entity_lost(path, id);
        if released > 0 {
            tracing::debug!(
                "{} stream of {} ended, released {} observation(s)",
                which,
                path,
                released
            );
        }
    }
}

fn is_current(
    registry: &SubscriptionRegistry<Observation>,
    path: &IdentityPath,
    owner: ObservationId,
) -> bool {
    registry
        .get(path)
        .map_or(false, |observation| observation.id() == owner)
}
