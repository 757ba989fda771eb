//! Path-keyed subscription registry with subtree teardown
//!
//! The registry owns at most one live handle per [`IdentityPath`] and mirrors
//! the shape of the observed entity tree. Removing a node releases the node's
//! handle together with every handle nested beneath it.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{RegistryError, RegistryResult};
use crate::path::IdentityPath;

/// A live observation resource owned by the registry.
///
/// `release` consumes the handle, so a handle can only ever be released once.
pub trait SubscriptionHandle: Send {
    /// Stop observing and free the underlying resources.
    fn release(self);
}

/// A handle rejected by [`SubscriptionRegistry::install`].
///
/// The registry never keeps a rejected handle; ownership goes back to the
/// caller together with the reason.
pub struct Rejected<H> {
    pub error: RegistryError,
    pub handle: H,
}

impl<H: SubscriptionHandle> Rejected<H> {
    /// Release the rejected handle and keep only the error.
    pub fn release(self) -> RegistryError {
        self.handle.release();
        self.error
    }
}

impl<H> fmt::Debug for Rejected<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected").field("error", &self.error).finish_non_exhaustive()
    }
}

/// Registry of active observation handles keyed by identity path.
pub struct SubscriptionRegistry<H: SubscriptionHandle> {
    /// Live handles; descendants of a path sort directly after it
    entries: BTreeMap<IdentityPath, H>,

    /// Maximum number of live handles, `None` for unbounded
    max_entries: Option<usize>,
}

impl<H: SubscriptionHandle> SubscriptionRegistry<H> {
    /// Create an unbounded registry
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            max_entries: None,
        }
    }

    /// Create a registry that refuses installs beyond `max_entries` handles
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_entries: Some(max_entries),
        }
    }

    pub fn is_observed(&self, path: &IdentityPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &IdentityPath) -> Option<&H> {
        self.entries.get(path)
    }

    /// Store `handle` as the observer of `path`
    ///
    /// # Errors
    /// * `RegistryError::AlreadyObserved` - `path` already has a live handle
    /// * `RegistryError::RegistryFull` - the capacity limit is reached
    ///
    /// On error the handle is returned untouched inside [`Rejected`].
    pub fn install(&mut self, path: IdentityPath, handle: H) -> Result<(), Rejected<H>> {
        if let Err(error) = self.check_vacant(&path) {
            return Err(Rejected { error, handle });
        }
        self.entries.insert(path, handle);
        Ok(())
    }

    /// Like [`install`](Self::install), but only builds the handle once the
    /// path is known to be free.
    pub fn install_with<F>(&mut self, path: IdentityPath, make: F) -> RegistryResult<()>
    where
        F: FnOnce() -> H,
    {
        self.check_vacant(&path)?;
        let handle = make();
        self.entries.insert(path, handle);
        Ok(())
    }

    /// Detach the handle for `path` and hand it to the caller for release.
    ///
    /// Returns `None` when nothing observes `path`; calling it again is a no-op.
    pub fn remove(&mut self, path: &IdentityPath) -> Option<H> {
        self.entries.remove(path)
    }

    /// Remove `path` and every entry nested beneath it, releasing each handle.
    ///
    /// Returns the number of handles released.
    pub fn remove_subtree(&mut self, path: &IdentityPath) -> usize {
        let doomed = self.subtree_paths(path);
        let mut released = 0;

        for key in doomed {
            if let Some(handle) = self.entries.remove(&key) {
                handle.release();
                released += 1;
            }
        }

        if released > 0 {
            tracing::debug!("Released {} handle(s) under {}", released, path);
        }
        released
    }

    /// Direct children of `path` that currently have a live handle
    pub fn children_of(&self, path: &IdentityPath) -> Vec<IdentityPath> {
        let depth = path.depth() + 1;
        self.entries
            .range(path.clone()..)
            .take_while(|(key, _)| key.starts_with(path))
            .filter(|(key, _)| key.depth() == depth)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// All observed paths in tree order
    pub fn paths(&self) -> Vec<IdentityPath> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything, equivalent to `remove_subtree(&IdentityPath::root())`
    pub fn clear(&mut self) -> usize {
        self.remove_subtree(&IdentityPath::root())
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let mut by_depth = BTreeMap::new();
        for path in self.entries.keys() {
            *by_depth.entry(path.depth()).or_insert(0) += 1;
        }

        RegistryStats {
            total_entries: self.entries.len(),
            max_entries: self.max_entries,
            by_depth,
        }
    }

    fn check_vacant(&self, path: &IdentityPath) -> RegistryResult<()> {
        if self.entries.contains_key(path) {
            return Err(RegistryError::AlreadyObserved(path.clone()));
        }
        if let Some(max_entries) = self.max_entries {
            if self.entries.len() >= max_entries {
                return Err(RegistryError::RegistryFull { max_entries });
            }
        }
        Ok(())
    }

    fn subtree_paths(&self, path: &IdentityPath) -> Vec<IdentityPath> {
        self.entries
            .range(path.clone()..)
            .take_while(|(key, _)| key.starts_with(path))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl<H: SubscriptionHandle> Default for SubscriptionRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: SubscriptionHandle> Drop for SubscriptionRegistry<H> {
    fn drop(&mut self) {
        let released = self.clear();
        if released > 0 {
            tracing::debug!("Registry dropped, released {} live handle(s)", released);
        }
    }
}

/// Statistics about the registry state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_entries: usize,
    pub max_entries: Option<usize>,
    /// Live handles per path depth (0 = manager, 1 = device, ...)
    pub by_depth: BTreeMap<usize, usize>,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registry Stats:")?;
        match self.max_entries {
            Some(max) => writeln!(f, "  Total: {}/{}", self.total_entries, max)?,
            None => writeln!(f, "  Total: {}", self.total_entries)?,
        }
        writeln!(f, "  Depth breakdown:")?;
        for (depth, count) in &self.by_depth {
            writeln!(f, "    {}: {}", depth, count)?;
        }
        Ok(())
    }
}
