//! # bridge-registry
//!
//! A small, driver-agnostic registry of observation handles keyed by
//! identity path.
//!
//! Each node of a live entity tree (manager, device, service, characteristic)
//! is addressed by an [`IdentityPath`]. The registry guarantees that at most
//! one [`SubscriptionHandle`] exists per path, and that tearing down a node
//! releases every handle nested beneath it exactly once.
//!
//! ```rust
//! use bridge_registry::{IdentityPath, SubscriptionHandle, SubscriptionRegistry};
//!
//! struct Noop;
//! impl SubscriptionHandle for Noop {
//!     fn release(self) {}
//! }
//!
//! let mut registry = SubscriptionRegistry::new();
//! let device = IdentityPath::root().child("D1");
//! registry.install(device.clone(), Noop).unwrap();
//! registry.install(device.child("180d"), Noop).unwrap();
//!
//! assert_eq!(registry.remove_subtree(&device), 2);
//! assert!(registry.is_empty());
//! ```

mod error;
mod path;
mod registry;

pub use error::{RegistryError, RegistryResult};
pub use path::IdentityPath;
pub use registry::{Rejected, RegistryStats, SubscriptionHandle, SubscriptionRegistry};
