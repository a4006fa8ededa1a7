//! Multi-node-group translator
//!
//! [`CompositeUpdateBuilder`] accumulates deltas for any number of node groups,
//! either from a global change event (versions taken from the version ledger
//! records carried by the event) or from an explicit reload request. Each node
//! group keeps its own deduplicating [`ActionsMap`] plus an ordered list of
//! before-actions that always run first.

use crate::domain::{EnvoyConfigVersion, ResourceKind, Table};
use crate::errors::{DeltaplaneError, Result};
use crate::storage::{ChangeSet, Repository};
use crate::xds::action::{ActionsMap, DeleteAllByKind, SnapshotUpdateAction};
use crate::xds::factory::UpdateActionFactory;
use crate::xds::resolver::{BatchIndex, DeltaSink, ResolveContext, ResolverRegistry, Target};
use crate::xds::version::VersionRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Changes of one committed transaction, across every node group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub changes: ChangeSet,
}

impl ChangeEvent {
    pub fn new(changes: ChangeSet) -> Self {
        Self { changes }
    }

    /// Version ledger entries carried by the event, in record order
    pub fn ledger(&self) -> Result<Vec<EnvoyConfigVersion>> {
        let mut entries = Vec::new();
        for record in self.changes.get(&Table::EnvoyConfigVersion).into_iter().flatten() {
            if let Some(entry) = record.after_as::<EnvoyConfigVersion>()? {
                entries.push(entry.clone());
            }
        }
        Ok(entries)
    }
}

/// One (node group, resource kind) pair to rebuild from live data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadEntry {
    pub node_group: String,
    pub resource_kind: ResourceKind,
    pub version: String,
}

impl ReloadEntry {
    pub fn new(node_group: impl Into<String>, resource_kind: ResourceKind, version: impl Into<String>) -> Self {
        Self { node_group: node_group.into(), resource_kind, version: version.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloadRequest {
    pub entries: Vec<ReloadEntry>,
}

#[derive(Debug, Clone, Default)]
struct NodeGroupActions {
    before: Vec<SnapshotUpdateAction>,
    actions: ActionsMap,
    /// Resource kinds rebuilt by a reload, with the reload version
    reloaded: BTreeMap<ResourceKind, String>,
}

impl NodeGroupActions {
    /// Fold `other` into the queued actions.
    ///
    /// A reload of a kind supersedes every delta of that kind queued before it.
    /// Later incremental deltas of a reloaded kind are only kept when their version
    /// is newer than the reload's, so the kind's version never goes backwards.
    fn merge(&mut self, other: NodeGroupActions) {
        for (kind, version) in &other.reloaded {
            self.actions.remove_kind(*kind);
            self.before.retain(|action| {
                !matches!(action, SnapshotUpdateAction::DeleteAllByKind(d) if d.resource_kind() == *kind)
            });
            self.reloaded.insert(*kind, version.clone());
        }
        self.before.extend(other.before);

        for delta in other.actions.iter() {
            let kind = delta.resource_kind();
            if !other.reloaded.contains_key(&kind) {
                if let Some(reload_version) = self.reloaded.get(&kind) {
                    if !is_newer(delta.target_version(), reload_version) {
                        debug!(
                            resource_kind = %kind,
                            version = delta.target_version(),
                            reload_version = %reload_version,
                            "Delta superseded by reload, skipping"
                        );
                        continue;
                    }
                }
            }
            self.actions.put(delta.clone());
        }
    }

    fn into_action(self) -> Option<SnapshotUpdateAction> {
        let mut actions = self.before;
        actions.extend(self.actions.into_actions());
        if actions.is_empty() {
            return None;
        }
        Some(SnapshotUpdateAction::sequence(actions))
    }
}

/// Whether `candidate` orders after `than`. Versions that are not both numeric
/// cannot be ordered and never count as newer.
fn is_newer(candidate: &str, than: &str) -> bool {
    match (candidate.parse::<i64>(), than.parse::<i64>()) {
        (Ok(candidate), Ok(than)) => candidate > than,
        _ => false,
    }
}

/// Accumulates per-node-group actions for bulk translation and full reloads
#[derive(Debug)]
pub struct CompositeUpdateBuilder<'a> {
    registry: &'a ResolverRegistry,
    factory: &'a UpdateActionFactory,
    reject_unknown_tables: bool,
    node_groups: BTreeMap<String, NodeGroupActions>,
}

impl<'a> CompositeUpdateBuilder<'a> {
    pub fn new(registry: &'a ResolverRegistry, factory: &'a UpdateActionFactory) -> Self {
        Self { registry, factory, reject_unknown_tables: false, node_groups: BTreeMap::new() }
    }

    /// Fail on tables without a resolver instead of skipping them
    pub fn reject_unknown_tables(mut self, reject: bool) -> Self {
        self.reject_unknown_tables = reject;
        self
    }

    /// Resolve a global change event.
    ///
    /// Versions come from the event's own version ledger records; an event without
    /// any is rejected. On error the builder is left as it was before the call.
    #[instrument(skip(self, repo, event), fields(tables = event.changes.len()), name = "composite_change_event")]
    pub fn add_change_event(&mut self, repo: &dyn Repository, event: &ChangeEvent) -> Result<()> {
        let ledger = event.ledger()?;
        if ledger.is_empty() {
            return Err(DeltaplaneError::config(
                "Change event carries no version ledger entries",
            ));
        }
        let versions = VersionRegistry::from_ledger(&ledger);

        let batch = BatchIndex::from_changes(&event.changes)?;
        let ctx = ResolveContext::new(repo, &batch);
        let mut sink = MultiNodeGroupSink {
            versions: &versions,
            factory: self.factory,
            node_groups: BTreeMap::new(),
        };
        self.registry.resolve(&ctx, &event.changes, &mut sink, self.reject_unknown_tables)?;

        debug!(node_groups = sink.node_groups.len(), "Resolved global change event");
        self.merge(sink.node_groups);
        Ok(())
    }

    /// Queue a full rebuild of every requested (node group, resource kind) pair.
    ///
    /// Each pair gets a clear-all-of-kind before-action followed by an update for
    /// every entity of that kind currently visible to the node group.
    #[instrument(skip(self, repo, request), fields(entries = request.entries.len()), name = "composite_reload")]
    pub fn add_reload(&mut self, repo: &dyn Repository, request: &ReloadRequest) -> Result<()> {
        if request.entries.is_empty() {
            return Err(DeltaplaneError::config("Reload request carries no version ledger entries"));
        }

        let mut pending: BTreeMap<String, NodeGroupActions> = BTreeMap::new();
        for entry in &request.entries {
            if entry.version.is_empty() {
                return Err(DeltaplaneError::config(format!(
                    "Reload of {} for node group '{}' has an empty version",
                    entry.resource_kind, entry.node_group
                )));
            }
            let group = pending.entry(entry.node_group.clone()).or_default();
            group.before.push(DeleteAllByKind::new(&entry.version, entry.resource_kind).into());
            group.reloaded.insert(entry.resource_kind, entry.version.clone());
            self.reload_kind(repo, entry, &mut group.actions)?;
        }

        info!(node_groups = pending.len(), "Prepared reload");
        self.merge(pending);
        Ok(())
    }

    fn reload_kind(
        &self,
        repo: &dyn Repository,
        entry: &ReloadEntry,
        actions: &mut ActionsMap,
    ) -> Result<()> {
        let node_group = entry.node_group.as_str();
        let version = entry.version.as_str();
        let deltas: Vec<_> = match entry.resource_kind {
            ResourceKind::Cluster => repo
                .find_clusters_by_node_group(node_group)?
                .iter()
                .filter_map(|cluster| self.factory.cluster_update(node_group, version, cluster))
                .collect(),
            ResourceKind::RouteConfiguration => repo
                .find_route_configurations_by_node_group(node_group)?
                .iter()
                .filter_map(|rc| self.factory.route_configuration_update(node_group, version, rc))
                .collect(),
            ResourceKind::Listener => repo
                .find_listeners_by_node_group(node_group)?
                .iter()
                .filter_map(|listener| self.factory.listener_update(node_group, version, listener))
                .collect(),
            ResourceKind::Runtime => {
                self.factory.runtime_update(node_group, version).into_iter().collect()
            }
        };
        debug!(
            node_group,
            resource_kind = %entry.resource_kind,
            deltas = deltas.len(),
            "Reloading resource kind"
        );
        for delta in deltas {
            actions.put(delta);
        }
        Ok(())
    }

    fn merge(&mut self, pending: BTreeMap<String, NodeGroupActions>) {
        for (node_group, actions) in pending {
            self.node_groups.entry(node_group).or_default().merge(actions);
        }
    }

    /// Node groups with at least one queued action
    pub fn node_groups(&self) -> impl Iterator<Item = &str> {
        self.node_groups.keys().map(String::as_str)
    }

    /// One action per node group: before-actions first, then every granular delta
    pub fn build(self) -> BTreeMap<String, SnapshotUpdateAction> {
        self.node_groups
            .into_iter()
            .filter_map(|(node_group, actions)| {
                actions.into_action().map(|action| (node_group, action))
            })
            .collect()
    }
}

struct MultiNodeGroupSink<'a> {
    versions: &'a VersionRegistry,
    factory: &'a UpdateActionFactory,
    node_groups: BTreeMap<String, NodeGroupActions>,
}

impl DeltaSink for MultiNodeGroupSink<'_> {
    fn emit(&mut self, target: Target) {
        let version = self.versions.get(target.node_group(), target.resource_kind());
        if let Some(delta) = target.to_delta(self.factory, version) {
            self.node_groups
                .entry(target.node_group().to_string())
                .or_default()
                .actions
                .put(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::*;
    use crate::storage::ChangeRecord;
    use crate::xds::snapshot::Snapshot;

    fn ledger(node_group: &str, kind: ResourceKind, version: i64) -> ChangeRecord {
        ChangeRecord::created(EnvoyConfigVersion::new(node_group, kind, version))
    }

    #[test]
    fn test_change_event_fans_out_per_node_group() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();
        let mut after = cluster(1);
        after.enable_h2 = true;
        let event = ChangeEvent::new(changes_of(vec![
            ChangeRecord::updated(cluster(1), after),
            ledger("ng1", ResourceKind::Cluster, 4),
            ledger("ng2", ResourceKind::Cluster, 8),
        ]));

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        builder.add_change_event(&state, &event).unwrap();
        let result = builder.build();

        assert_eq!(result.len(), 2);
        let ng1 = result["ng1"].perform(&Snapshot::new()).unwrap();
        let ng2 = result["ng2"].perform(&Snapshot::new()).unwrap();
        assert_eq!(ng1.version(ResourceKind::Cluster), Some("4"));
        assert_eq!(ng2.version(ResourceKind::Cluster), Some("8"));
    }

    #[test]
    fn test_change_event_without_ledger_is_rejected() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();
        let event = ChangeEvent::new(changes_of(vec![ChangeRecord::created(cluster(3))]));

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        let err = builder.add_change_event(&state, &event).unwrap_err();
        assert!(matches!(err, DeltaplaneError::Config { .. }));
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_failed_event_leaves_builder_untouched() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();
        let mut changes = changes_of(vec![
            ChangeRecord::created(cluster(2)),
            ledger("ng1", ResourceKind::Cluster, 1),
        ]);
        changes.insert(
            Table::Route,
            vec![ChangeRecord { table: Table::Route, before: None, after: Some(cluster(1).into()) }],
        );

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        assert!(builder.add_change_event(&state, &ChangeEvent::new(changes)).is_err());
        assert_eq!(builder.node_groups().count(), 0);
    }

    #[test]
    fn test_reload_orders_clear_before_updates() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();
        let request = ReloadRequest {
            entries: vec![ReloadEntry::new("ng1", ResourceKind::Cluster, "v5")],
        };

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        builder.add_reload(&state, &request).unwrap();
        let result = builder.build();

        let SnapshotUpdateAction::Composite(composite) = &result["ng1"] else {
            panic!("expected a composite action");
        };
        assert_eq!(composite.len(), 3);
        assert_eq!(
            composite.actions()[0],
            SnapshotUpdateAction::from(DeleteAllByKind::new("v5", ResourceKind::Cluster))
        );
        assert!(composite.actions()[1..]
            .iter()
            .all(|action| matches!(action, SnapshotUpdateAction::Granular(d) if !d.is_delete())));
    }

    fn cluster_removal(id: i64, version: i64) -> ChangeEvent {
        ChangeEvent::new(changes_of(vec![
            ChangeRecord::deleted(cluster(id)),
            ChangeRecord::deleted(cluster_join(id, "ng1")),
            ledger("ng1", ResourceKind::Cluster, version),
        ]))
    }

    fn cluster_reload(version: &str) -> ReloadRequest {
        ReloadRequest { entries: vec![ReloadEntry::new("ng1", ResourceKind::Cluster, version)] }
    }

    #[test]
    fn test_older_change_event_after_reload_keeps_reload_version() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        builder.add_reload(&state, &cluster_reload("5")).unwrap();
        builder.add_change_event(&state, &cluster_removal(9, 4)).unwrap();
        let snapshot = builder.build()["ng1"].perform(&Snapshot::new()).unwrap();

        assert_eq!(snapshot.version(ResourceKind::Cluster), Some("5"));
        assert_eq!(snapshot.len(ResourceKind::Cluster), 2);
    }

    #[test]
    fn test_newer_change_event_after_reload_is_applied() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        builder.add_reload(&state, &cluster_reload("5")).unwrap();
        builder.add_change_event(&state, &cluster_removal(9, 6)).unwrap();
        let snapshot = builder.build()["ng1"].perform(&Snapshot::new()).unwrap();

        assert_eq!(snapshot.version(ResourceKind::Cluster), Some("6"));
        assert_eq!(snapshot.len(ResourceKind::Cluster), 2);
    }

    #[test]
    fn test_reload_supersedes_queued_change_event_deltas() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        builder.add_change_event(&state, &cluster_removal(9, 7)).unwrap();
        builder.add_reload(&state, &cluster_reload("8")).unwrap();
        let result = builder.build();

        let SnapshotUpdateAction::Composite(composite) = &result["ng1"] else {
            panic!("expected a composite action");
        };
        assert_eq!(
            composite.actions()[0],
            SnapshotUpdateAction::from(DeleteAllByKind::new("8", ResourceKind::Cluster))
        );
        assert_eq!(composite.len(), 3);
        let snapshot = result["ng1"].perform(&Snapshot::new()).unwrap();
        assert_eq!(snapshot.version(ResourceKind::Cluster), Some("8"));
    }

    #[test]
    fn test_reload_runtime_and_empty_requests() {
        let registry = ResolverRegistry::with_defaults();
        let factory = UpdateActionFactory::default();
        let state = topology().snapshot().unwrap();

        let mut builder = CompositeUpdateBuilder::new(&registry, &factory);
        let err = builder.add_reload(&state, &ReloadRequest::default()).unwrap_err();
        assert!(matches!(err, DeltaplaneError::Config { .. }));

        let request = ReloadRequest {
            entries: vec![ReloadEntry::new("ng2", ResourceKind::Runtime, "2")],
        };
        builder.add_reload(&state, &request).unwrap();
        let snapshot = builder.build()["ng2"].perform(&Snapshot::new()).unwrap();
        assert_eq!(snapshot.len(ResourceKind::Runtime), 1);
        assert_eq!(snapshot.version(ResourceKind::Runtime), Some("2"));
    }
}
