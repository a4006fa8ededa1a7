//! Translation service
//!
//! Runs the translators against read transactions of a [`ConfigStore`] and applies
//! the resulting actions to the [`SnapshotCache`]. A failed translation publishes
//! nothing for its batch.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::TranslationConfig,
    domain::Table,
    errors::{DeltaplaneError, Result},
    observability::TranslationMetrics,
    storage::{group_by_table, ConfigStore, WriteTransaction},
    translation_span,
    xds::{
        ChangeEvent, ChangeEventParser, CompositeUpdateBuilder, EntityVersions,
        NodeGroupChangeEvent, ReloadRequest, ResolverRegistry, SnapshotCache, SnapshotUpdate,
        SnapshotUpdateAction, UpdateActionFactory,
    },
};

/// Service turning committed changes into published snapshots
pub struct TranslationService<S> {
    store: Arc<S>,
    cache: Arc<SnapshotCache>,
    registry: ResolverRegistry,
    factory: UpdateActionFactory,
    reject_unknown_tables: bool,
    metrics: TranslationMetrics,
}

impl<S: ConfigStore> TranslationService<S> {
    /// Create a translation service with the built-in resolvers
    pub fn new(store: Arc<S>, cache: Arc<SnapshotCache>, config: &TranslationConfig) -> Self {
        Self {
            store,
            cache,
            registry: ResolverRegistry::with_defaults(),
            factory: UpdateActionFactory::new(&config.runtime_layer_name),
            reject_unknown_tables: config.reject_unknown_tables,
            metrics: TranslationMetrics::new(),
        }
    }

    /// Replace the resolver registry
    pub fn with_registry(mut self, registry: ResolverRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Translate and publish the changes of one node group
    pub fn handle_node_group_event(
        &self,
        event: &NodeGroupChangeEvent,
        versions: &EntityVersions,
    ) -> Result<Option<Arc<SnapshotUpdate>>> {
        let span = translation_span!("node_group_event", event.node_group);
        let _enter = span.enter();

        let action = self.observe("node_group", || {
            let parser = ChangeEventParser::new(&self.registry, &self.factory)
                .reject_unknown_tables(self.reject_unknown_tables);
            let actions =
                self.store.with_read_tx(|repo| parser.parse(repo, event, versions))?;
            Ok(actions.composite_action())
        })?;

        self.record_deltas(&action);
        self.cache.apply(&event.node_group, &action)
    }

    /// Per-node-group actions for a global change event, without publishing them
    pub fn translate_change_event(
        &self,
        event: &ChangeEvent,
    ) -> Result<BTreeMap<String, SnapshotUpdateAction>> {
        self.observe("change_event", || {
            let mut builder = CompositeUpdateBuilder::new(&self.registry, &self.factory)
                .reject_unknown_tables(self.reject_unknown_tables);
            self.store.with_read_tx(|repo| builder.add_change_event(repo, event))?;
            Ok(builder.build())
        })
    }

    /// Translate and publish a global change event
    pub fn handle_change_event(&self, event: &ChangeEvent) -> Result<Vec<Arc<SnapshotUpdate>>> {
        let span = translation_span!("change_event", "*", tables = event.changes.len());
        let _enter = span.enter();

        let actions = self.translate_change_event(event)?;
        self.publish(&actions)
    }

    /// Per-node-group actions rebuilding the requested resource kinds, without
    /// publishing them
    pub fn translate_reload(
        &self,
        request: &ReloadRequest,
    ) -> Result<BTreeMap<String, SnapshotUpdateAction>> {
        self.observe("reload", || {
            let mut builder = CompositeUpdateBuilder::new(&self.registry, &self.factory);
            self.store.with_read_tx(|repo| builder.add_reload(repo, request))?;
            Ok(builder.build())
        })
    }

    /// Rebuild and publish the requested (node group, resource kind) pairs
    pub fn handle_reload(&self, request: &ReloadRequest) -> Result<Vec<Arc<SnapshotUpdate>>> {
        let span = translation_span!("reload", "*", entries = request.entries.len());
        let _enter = span.enter();

        let actions = self.translate_reload(request)?;
        self.publish(&actions)
    }

    /// Run `mutate` in a write transaction and publish what it changed.
    ///
    /// Every tracked (node group, resource kind) version is bumped in the same
    /// transaction so the resulting change event carries its version ledger. A
    /// store without any tracked node group commits but publishes nothing.
    #[instrument(skip(self, mutate), name = "commit_and_publish")]
    pub fn commit_and_publish(
        &self,
        mutate: impl FnOnce(&mut S::WriteTx) -> Result<()>,
    ) -> Result<Vec<Arc<SnapshotUpdate>>> {
        let records = self.store.with_write_tx(|tx| {
            mutate(tx)?;
            let tracked = tx.repository().find_all_envoy_config_versions()?;
            for entry in tracked {
                tx.bump_version(&entry.node_group, entry.entity_type)?;
            }
            Ok(())
        })?;

        let event = ChangeEvent::new(group_by_table(records));
        if !event.changes.contains_key(&Table::EnvoyConfigVersion) {
            warn!("No node group tracks any resource kind, nothing to publish");
            return Ok(Vec::new());
        }
        self.handle_change_event(&event)
    }

    /// Delete several deployment versions in one transaction and publish the result.
    ///
    /// The first failing deletion aborts the transaction and is returned.
    pub fn retire_deployment_versions(
        &self,
        versions: &[String],
    ) -> Result<Vec<Arc<SnapshotUpdate>>> {
        self.commit_and_publish(|tx| {
            for version in versions {
                if tx.delete(&Table::DeploymentVersion, version)?.is_none() {
                    return Err(DeltaplaneError::not_found("DeploymentVersion", version));
                }
                debug!(deployment_version = %version, "Deployment version retired");
            }
            Ok(())
        })
    }

    fn publish(
        &self,
        actions: &BTreeMap<String, SnapshotUpdateAction>,
    ) -> Result<Vec<Arc<SnapshotUpdate>>> {
        for action in actions.values() {
            self.record_deltas(action);
        }
        let published = self.cache.apply_all(actions)?;
        info!(
            node_groups = actions.len(),
            published = published.len(),
            "Translation published"
        );
        Ok(published)
    }

    fn observe<T>(&self, mode: &str, translate: impl FnOnce() -> Result<T>) -> Result<T> {
        let started = Instant::now();
        let result = translate();
        self.metrics.record_translation(mode, result.is_ok(), started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            error!(
                mode,
                error = %e,
                kind = e.kind(),
                fatal = e.is_fatal(),
                "Translation failed, nothing published for this batch"
            );
        }
        result
    }

    fn record_deltas(&self, action: &SnapshotUpdateAction) {
        match action {
            SnapshotUpdateAction::Granular(delta) => {
                self.metrics.record_deltas(delta.resource_kind().as_str(), 1)
            }
            SnapshotUpdateAction::DeleteAllByKind(_) => {}
            SnapshotUpdateAction::Composite(composite) => {
                for inner in composite.actions() {
                    self.record_deltas(inner);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeploymentStage, DeploymentVersion, Entity, EnvoyConfigVersion, ResourceKind};
    use crate::storage::test_helpers::*;
    use crate::storage::{ChangeRecord, InMemoryStore};
    use crate::xds::ReloadEntry;

    fn service(store: InMemoryStore) -> TranslationService<InMemoryStore> {
        TranslationService::new(
            Arc::new(store),
            Arc::new(SnapshotCache::default()),
            &TranslationConfig::default(),
        )
    }

    fn tracked_topology() -> InMemoryStore {
        let mut entities = topology_entities();
        for node_group in ["ng1", "ng2"] {
            for kind in [ResourceKind::Cluster, ResourceKind::RouteConfiguration] {
                entities.push(EnvoyConfigVersion::new(node_group, kind, 1).into());
            }
        }
        InMemoryStore::with_entities(entities)
    }

    #[test]
    fn test_handle_node_group_event_publishes_snapshot() {
        let service = service(topology());
        let event = NodeGroupChangeEvent::new(
            "ng1",
            changes_of(vec![ChangeRecord::deleted(cluster_join(1, "ng1"))]),
        );
        let versions: EntityVersions = [(ResourceKind::Cluster, "7".to_string())].into();

        let update = service.handle_node_group_event(&event, &versions).unwrap().unwrap();
        assert_eq!(update.snapshot.version(ResourceKind::Cluster), Some("7"));
        assert_eq!(update.snapshot.len(ResourceKind::Cluster), 1);
    }

    #[test]
    fn test_commit_and_publish_bumps_versions() {
        let service = service(tracked_topology());
        let mut updated = cluster(2);
        updated.enable_h2 = true;

        let published =
            service.commit_and_publish(|tx| tx.save(Entity::from(updated.clone()))).unwrap();

        assert_eq!(published.len(), 1);
        assert_eq!(published[0].node_group, "ng1");
        assert_eq!(published[0].snapshot.version(ResourceKind::Cluster), Some("2"));
    }

    #[test]
    fn test_commit_without_tracked_node_groups_publishes_nothing() {
        let service = service(topology());
        let published = service
            .commit_and_publish(|tx| tx.save(Entity::from(cluster(3))))
            .unwrap();
        assert!(published.is_empty());
    }

    #[test]
    fn test_retire_deployment_versions_propagates_missing_version() {
        let mut entities = topology_entities();
        entities.push(EnvoyConfigVersion::new("ng1", ResourceKind::Cluster, 1).into());
        entities.push(
            DeploymentVersion { version: "v1".to_string(), stage: DeploymentStage::Legacy }.into(),
        );
        let service = service(InMemoryStore::with_entities(entities));

        let err = service
            .retire_deployment_versions(&["v1".to_string(), "v9".to_string()])
            .unwrap_err();
        assert!(matches!(err, DeltaplaneError::NotFound { .. }));

        // the whole transaction was rolled back
        let state = service.store().snapshot().unwrap();
        assert!(state.get(&Table::DeploymentVersion, "v1").is_some());

        let published = service.retire_deployment_versions(&["v1".to_string()]).unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].node_group, "ng1");
    }

    #[test]
    fn test_handle_reload_replaces_kind() {
        let service = service(topology());
        let request = ReloadRequest {
            entries: vec![ReloadEntry::new("ng1", ResourceKind::Cluster, "v5")],
        };

        let published = service.handle_reload(&request).unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].snapshot.len(ResourceKind::Cluster), 2);
        assert_eq!(published[0].snapshot.version(ResourceKind::Cluster), Some("v5"));
    }
}
