//! Bridge lifecycle: attach, request handling and detach.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_registry::{RegistryStats, SubscriptionRegistry};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::command::{RemoteRequest, RemoteResponse};
use crate::config::BridgeConfig;
use crate::dispatcher::CommandDispatcher;
use crate::driver::BleDriver;
use crate::error::{BridgeError, RemoteError, Result};
use crate::forwarder::{EventForwarder, EventSink};
use crate::model::{EntityModel, EntityPath};
use crate::observation::ObservationId;
use crate::reconciler::{Reconciler, SharedRegistry};

/// Everything that lives between one attach and the matching detach.
struct Session {
    registry: SharedRegistry,
    forwarder: EventForwarder,
    dispatcher: CommandDispatcher,
    attached: AtomicBool,
}

impl Session {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Stop forwarding and release every observation. Only the first call
    /// does any work.
    fn shutdown(&self) -> usize {
        if !self.attached.swap(false, Ordering::SeqCst) {
            return 0;
        }
        self.forwarder.close();
        self.registry.lock().clear()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Connects a Bluetooth driver to one remote consumer.
///
/// While attached, the bridge observes the whole entity tree and forwards
/// every change to the consumer's [`EventSink`]; it also answers remote
/// requests through [`handle`](Self::handle).
///
/// # Example
///
/// ```rust,ignore
/// let bridge = Bridge::new(driver, BridgeConfig::default())?;
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// bridge.on_attach(Arc::new(tx))?;
///
/// let reply = bridge
///     .handle(RemoteRequest::new("scanningStart", serde_json::Value::Null))
///     .await;
///
/// bridge.on_detach();
/// ```
pub struct Bridge {
    driver: Arc<dyn BleDriver>,
    config: BridgeConfig,
    session: Mutex<Option<Arc<Session>>>,
}

impl Bridge {
    /// Create a detached bridge.
    ///
    /// # Errors
    /// * `BridgeError::Configuration` - the configuration is invalid
    pub fn new(driver: Arc<dyn BleDriver>, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            driver,
            config,
            session: Mutex::new(None),
        })
    }

    /// Start bridging to `sink`.
    ///
    /// Observes the manager and, through it, every entity currently in the
    /// tree. Attaching an already attached bridge is a no-op.
    ///
    /// # Errors
    /// * `BridgeError::NoRuntime` - not called from within a tokio runtime
    pub fn on_attach(&self, sink: Arc<dyn EventSink>) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;

        let mut slot = self.session.lock();
        if slot.is_some() {
            tracing::debug!("Bridge already attached to '{}'", self.config.channel_name);
            return Ok(());
        }

        let registry: SharedRegistry = Arc::new(Mutex::new(SubscriptionRegistry::with_limit(
            self.config.max_observations,
        )));
        let forwarder = EventForwarder::new(sink);
        let reconciler = Reconciler::new(
            EntityModel::new(Arc::clone(&self.driver)),
            Arc::clone(&registry),
            forwarder.clone(),
            runtime,
        );
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&self.driver),
            forwarder.clone(),
            self.config.serialize_mutations,
        );

        // The registry is fresh, so the root is always vacant here
        if reconciler.observe_root().is_none() {
            tracing::warn!("Manager was not observed on attach");
        }

        *slot = Some(Arc::new(Session {
            registry,
            forwarder,
            dispatcher,
            attached: AtomicBool::new(true),
        }));

        tracing::info!("Bridge attached to '{}'", self.config.channel_name);
        Ok(())
    }

    /// Stop bridging and release every observation.
    ///
    /// Returns the number of observations released; `0` when the bridge was
    /// not attached.
    pub fn on_detach(&self) -> usize {
        let session = self.session.lock().take();
        match session {
            Some(session) => {
                let released = session.shutdown();
                tracing::info!(
                    "Bridge detached from '{}', released {} observation(s)",
                    self.config.channel_name,
                    released
                );
                released
            }
            None => 0,
        }
    }

    /// Answer one remote request.
    ///
    /// Returns `None` when there is no consumer to answer: the bridge is
    /// detached, or was detached while the request was being executed.
    pub async fn handle(&self, request: RemoteRequest) -> Option<RemoteResponse> {
        let Some(session) = self.session.lock().clone() else {
            tracing::debug!("Not attached, ignoring '{}'", request.method);
            return None;
        };

        let result = session.dispatcher.dispatch(&request).await;

        if !session.is_attached() {
            tracing::debug!("Detached while running '{}', discarding result", request.method);
            return None;
        }
        Some(result.map_err(RemoteError::from))
    }

    pub fn is_attached(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Every entity currently observed, in tree order.
    pub fn observed_paths(&self) -> Vec<EntityPath> {
        let Some(session) = self.session.lock().clone() else {
            return Vec::new();
        };
        let paths = session.registry.lock().paths();
        paths.iter().filter_map(EntityPath::from_identity).collect()
    }

    /// Id of the live observation of `path`, if any.
    pub fn observation_id(&self, path: &EntityPath) -> Option<ObservationId> {
        let session = self.session.lock().clone()?;
        let registry = session.registry.lock();
        registry.get(&path.identity()).map(|observation| observation.id())
    }

    pub fn registry_stats(&self) -> Option<RegistryStats> {
        let session = self.session.lock().clone()?;
        let stats = session.registry.lock().stats();
        Some(stats)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.on_detach();
    }
}
