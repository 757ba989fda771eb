//! Bluetooth LE Bridge
//!
//! Keeps a remote consumer (a UI layer, another process) in sync with a live
//! Bluetooth LE entity tree, and answers the consumer's commands.
//!
//! # Architecture
//!
//! ```text
//! BleDriver streams → Reconciler → SubscriptionRegistry
//!                          │
//!                          └→ EventForwarder → EventSink (remote consumer)
//!
//! RemoteRequest → CommandDispatcher → BleDriver → RemoteResponse
//! ```
//!
//! While attached, the bridge holds exactly one observation per entity in
//! the tree (manager, devices, services, characteristics). Entities that
//! appear are observed automatically; entities that disappear have their
//! whole subtree released.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bluebridge::prelude::*;
//!
//! let bridge = Bridge::new(driver, BridgeConfig::default())?;
//!
//! let (tx, mut events) = tokio::sync::mpsc::unbounded_channel();
//! bridge.on_attach(Arc::new(tx))?;
//!
//! let reply = bridge
//!     .handle(RemoteRequest::new(
//!         "deviceConnect",
//!         serde_json::json!({ "deviceId": "D1" }),
//!     ))
//!     .await;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{} {:?}", event.name, event.arguments());
//! }
//! ```

// Lifecycle controller (main interface)
pub mod bridge;

// Remote commands
pub mod command;
pub mod dispatcher;

// Entity tree and driver interface
pub mod driver;
pub mod model;

// Observation management
pub mod observation;
pub mod reconciler;

// Outbound events
pub mod forwarder;

// Configuration
pub mod config;

// Error types
pub mod error;

// Logging infrastructure
pub mod logging;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::Bridge;
pub use command::{Command, RemoteRequest, RemoteResponse};
pub use config::BridgeConfig;
pub use dispatcher::CommandDispatcher;
pub use driver::{BleDriver, DriverResult, SnapshotStream, TreeStream};
pub use forwarder::{translate, EventForwarder, EventName, EventSink, PushEvent, SinkClosed};
pub use model::{
    AuthorizationStatus, CharacteristicId, CharacteristicInfo, CharacteristicProperty,
    CharacteristicRef, ConnectionStatus, DeviceId, DeviceInfo, EntityKind, EntityModel,
    EntityPath, EntitySnapshot, ManagerSnapshot, ManagerState, ServiceId, ServiceInfo,
    TreeSnapshot,
};
pub use observation::{Observation, ObservationId};
pub use reconciler::{ReconcileOutcome, Reconciler, SharedRegistry};

pub use bridge_registry::{IdentityPath, RegistryError, RegistryStats, SubscriptionRegistry};

// ============================================================================
// Re-exports - Error types
// ============================================================================

pub use error::{BridgeError, DriverError, ErrorCode, RemoteError, Result};

// ============================================================================
// Re-exports - Logging
// ============================================================================

pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::bridge::Bridge;
    pub use crate::command::{RemoteRequest, RemoteResponse};
    pub use crate::config::BridgeConfig;
    pub use crate::driver::{BleDriver, DriverResult, SnapshotStream, TreeStream};
    pub use crate::error::{BridgeError, DriverError, ErrorCode, RemoteError};
    pub use crate::forwarder::{EventName, EventSink, PushEvent};
    pub use crate::model::{
        CharacteristicId, CharacteristicRef, DeviceId, DeviceInfo, EntityPath, EntitySnapshot,
        ManagerSnapshot, ServiceId, ServiceInfo, TreeSnapshot,
    };
}
