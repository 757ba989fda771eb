//! Observation handles: the live resources stored in the subscription registry.

use bridge_registry::SubscriptionHandle;
use tokio::task::AbortHandle;

/// Unique identifier for one observation of one entity.
///
/// A path that is removed and later observed again gets a new id, which lets
/// late callbacks from the old observation recognise that they are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationId(u64);

impl ObservationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obs-{}", self.0)
    }
}

/// The tasks consuming one entity's snapshot and children streams.
///
/// Releasing or dropping the observation aborts every task, which drops the
/// driver streams they were polling.
pub struct Observation {
    id: ObservationId,
    tasks: Vec<AbortHandle>,
}

impl Observation {
    pub(crate) fn new(id: ObservationId, tasks: Vec<AbortHandle>) -> Self {
        Self { id, tasks }
    }

    pub fn id(&self) -> ObservationId {
        self.id
    }
}

impl SubscriptionHandle for Observation {
    fn release(self) {
        tracing::trace!("Releasing observation {}", self.id);
        drop(self);
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_release_aborts_tasks() {
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let observation = Observation::new(ObservationId::new(7), vec![task.abort_handle()]);
        assert_eq!(observation.id().to_string(), "obs-7");

        observation.release();
        let result = task.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
