//! Snapshot cache
//!
//! Last known configuration snapshot of every node group. Actions produced by the
//! translators are performed against it and every resulting change is broadcast
//! to subscribers (the delivery layer).

use crate::errors::{DeltaplaneError, Result};
use crate::xds::action::SnapshotUpdateAction;
use crate::xds::snapshot::Snapshot;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// New snapshot published for one node group
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotUpdate {
    pub node_group: String,
    pub snapshot: Snapshot,
}

#[derive(Debug)]
pub struct SnapshotCache {
    update_tx: broadcast::Sender<Arc<SnapshotUpdate>>,
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl SnapshotCache {
    pub fn new(channel_capacity: usize) -> Self {
        let (update_tx, _) = broadcast::channel(channel_capacity.max(1));
        Self { update_tx, snapshots: RwLock::new(HashMap::new()) }
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<Arc<SnapshotUpdate>> {
        self.update_tx.subscribe()
    }

    /// Last known snapshot of `node_group`
    pub fn snapshot(&self, node_group: &str) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().map_err(|_| lock_poisoned())?;
        Ok(snapshots.get(node_group).cloned())
    }

    /// Every cached snapshot, ordered by node group
    pub fn snapshots(&self) -> Result<BTreeMap<String, Snapshot>> {
        let snapshots = self.snapshots.read().map_err(|_| lock_poisoned())?;
        Ok(snapshots.iter().map(|(name, snapshot)| (name.clone(), snapshot.clone())).collect())
    }

    /// Perform `action` against the node group's snapshot (empty when unknown).
    ///
    /// Returns the published update, or `None` when the snapshot did not change.
    /// A failing action leaves the cached snapshot untouched.
    pub fn apply(
        &self,
        node_group: &str,
        action: &SnapshotUpdateAction,
    ) -> Result<Option<Arc<SnapshotUpdate>>> {
        let mut snapshots = self.snapshots.write().map_err(|_| lock_poisoned())?;
        let current = snapshots.get(node_group).cloned().unwrap_or_default();
        let next = action.perform(&current)?;

        if next == current && snapshots.contains_key(node_group) {
            debug!(node_group, "Snapshot unchanged, nothing to publish");
            return Ok(None);
        }

        snapshots.insert(node_group.to_string(), next.clone());
        drop(snapshots);

        let update = Arc::new(SnapshotUpdate { node_group: node_group.to_string(), snapshot: next });
        // no receivers is fine
        let _ = self.update_tx.send(update.clone());
        Ok(Some(update))
    }

    /// Apply one action per node group, stopping at the first failure
    pub fn apply_all(
        &self,
        actions: &BTreeMap<String, SnapshotUpdateAction>,
    ) -> Result<Vec<Arc<SnapshotUpdate>>> {
        let mut published = Vec::new();
        for (node_group, action) in actions {
            if let Some(update) = self.apply(node_group, action)? {
                published.push(update);
            }
        }
        info!(node_groups = actions.len(), published = published.len(), "Applied snapshot actions");
        Ok(published)
    }
}

fn lock_poisoned() -> DeltaplaneError {
    DeltaplaneError::internal("Snapshot cache lock poisoned")
}
