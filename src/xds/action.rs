//! Snapshot update actions
//!
//! Every translation result is expressed as a [`SnapshotUpdateAction`]: a pure
//! function from a node group's current [`Snapshot`] to the next one. Actions never
//! mutate their argument; a composite applies its parts to a private working copy
//! and returns it only when every part succeeded.

use super::snapshot::{EntityKey, ResourceEntity, Snapshot};
use crate::domain::ResourceKind;
use crate::errors::{DeltaplaneError, Result};
use std::collections::HashMap;

/// Update or delete of one composite resource, tagged with its target version
#[derive(Debug, Clone, PartialEq)]
pub struct GranularEntityUpdate {
    is_delete: bool,
    target_version: String,
    entity: ResourceEntity,
}

impl GranularEntityUpdate {
    pub fn update(target_version: impl Into<String>, entity: ResourceEntity) -> Self {
        Self { is_delete: false, target_version: target_version.into(), entity }
    }

    pub fn delete(target_version: impl Into<String>, entity: ResourceEntity) -> Self {
        Self { is_delete: true, target_version: target_version.into(), entity }
    }

    pub fn is_delete(&self) -> bool {
        self.is_delete
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    pub fn entity(&self) -> &ResourceEntity {
        &self.entity
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.entity.resource_kind()
    }

    pub fn key(&self) -> EntityKey {
        self.entity.key()
    }

    fn apply(&self, snapshot: &mut Snapshot) -> Result<()> {
        ensure_version(&self.target_version, self.resource_kind())?;
        if self.is_delete {
            snapshot.remove(&self.target_version, self.resource_kind(), self.entity.name());
        } else {
            snapshot.upsert(&self.target_version, self.entity.clone());
        }
        Ok(())
    }
}

/// Replace every resource of one kind with an empty set.
///
/// Only emitted by full reloads, always ahead of the update deltas that repopulate
/// the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAllByKind {
    target_version: String,
    resource_kind: ResourceKind,
}

impl DeleteAllByKind {
    pub fn new(target_version: impl Into<String>, resource_kind: ResourceKind) -> Self {
        Self { target_version: target_version.into(), resource_kind }
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.resource_kind
    }

    fn apply(&self, snapshot: &mut Snapshot) -> Result<()> {
        ensure_version(&self.target_version, self.resource_kind)?;
        snapshot.clear(&self.target_version, self.resource_kind);
        Ok(())
    }
}

/// Ordered sequence of actions, each applied to the output of the previous one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeUpdateAction {
    actions: Vec<SnapshotUpdateAction>,
}

impl CompositeUpdateAction {
    pub fn new(actions: Vec<SnapshotUpdateAction>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[SnapshotUpdateAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn apply(&self, snapshot: &mut Snapshot) -> Result<()> {
        for action in &self.actions {
            action.apply(snapshot)?;
        }
        Ok(())
    }
}

/// Operation turning one configuration snapshot into the next
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotUpdateAction {
    Granular(GranularEntityUpdate),
    DeleteAllByKind(DeleteAllByKind),
    Composite(CompositeUpdateAction),
}

impl SnapshotUpdateAction {
    /// Sequence `actions`, collapsing a single action to itself
    pub fn sequence(mut actions: Vec<SnapshotUpdateAction>) -> Self {
        if actions.len() == 1 {
            if let Some(action) = actions.pop() {
                return action;
            }
        }
        SnapshotUpdateAction::Composite(CompositeUpdateAction::new(actions))
    }

    /// Produce the next snapshot. `current` is left untouched, also on error.
    pub fn perform(&self, current: &Snapshot) -> Result<Snapshot> {
        let mut next = current.clone();
        self.apply(&mut next)?;
        Ok(next)
    }

    fn apply(&self, snapshot: &mut Snapshot) -> Result<()> {
        match self {
            SnapshotUpdateAction::Granular(update) => update.apply(snapshot),
            SnapshotUpdateAction::DeleteAllByKind(delete_all) => delete_all.apply(snapshot),
            SnapshotUpdateAction::Composite(composite) => composite.apply(snapshot),
        }
    }

    /// Number of granular deltas contained, recursively
    pub fn delta_count(&self) -> usize {
        match self {
            SnapshotUpdateAction::Granular(_) => 1,
            SnapshotUpdateAction::DeleteAllByKind(_) => 0,
            SnapshotUpdateAction::Composite(composite) => {
                composite.actions.iter().map(SnapshotUpdateAction::delta_count).sum()
            }
        }
    }
}

impl From<GranularEntityUpdate> for SnapshotUpdateAction {
    fn from(update: GranularEntityUpdate) -> Self {
        SnapshotUpdateAction::Granular(update)
    }
}

impl From<DeleteAllByKind> for SnapshotUpdateAction {
    fn from(delete_all: DeleteAllByKind) -> Self {
        SnapshotUpdateAction::DeleteAllByKind(delete_all)
    }
}

fn ensure_version(version: &str, kind: ResourceKind) -> Result<()> {
    if version.is_empty() {
        return Err(DeltaplaneError::invariant(format!(
            "Snapshot action for {} has an empty target version",
            kind
        )));
    }
    Ok(())
}

/// Deduplicating container of granular deltas.
///
/// Holds at most one delta per (resource kind, entity). A later delta for the same
/// key replaces the earlier one in place, so iteration follows first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct ActionsMap {
    entries: Vec<GranularEntityUpdate>,
    index: HashMap<(ResourceKind, EntityKey), usize>,
}

impl ActionsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delta, replacing any delta already held for the same resource
    pub fn put(&mut self, delta: GranularEntityUpdate) {
        let key = (delta.resource_kind(), delta.key());
        match self.index.get(&key) {
            Some(&position) => self.entries[position] = delta,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(delta);
            }
        }
    }

    pub fn get(&self, kind: ResourceKind, key: &EntityKey) -> Option<&GranularEntityUpdate> {
        self.index.get(&(kind, key.clone())).map(|&position| &self.entries[position])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GranularEntityUpdate> {
        self.entries.iter()
    }

    /// Deltas of one resource kind, in insertion order
    pub fn by_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &GranularEntityUpdate> {
        self.entries.iter().filter(move |delta| delta.resource_kind() == kind)
    }

    /// Drop every delta of `kind`, keeping the order of the rest
    pub fn remove_kind(&mut self, kind: ResourceKind) {
        self.entries.retain(|delta| delta.resource_kind() != kind);
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, delta)| ((delta.resource_kind(), delta.key()), position))
            .collect();
    }

    /// Every delta wrapped as an action, in insertion order
    pub fn into_actions(self) -> Vec<SnapshotUpdateAction> {
        self.entries.into_iter().map(SnapshotUpdateAction::from).collect()
    }

    /// Single action applying every held delta
    pub fn composite_action(&self) -> SnapshotUpdateAction {
        SnapshotUpdateAction::sequence(
            self.entries.iter().cloned().map(SnapshotUpdateAction::from).collect(),
        )
    }
}
