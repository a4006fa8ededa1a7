//! Single-node-group translator
//!
//! Turns the change set of one node group into one deduplicated [`ActionsMap`].
//! Targets the resolvers report for other node groups are dropped here; the
//! multi-node-group builder in [`crate::xds::composite`] handles fan-out.

use crate::errors::Result;
use crate::storage::{ChangeSet, Repository};
use crate::xds::action::ActionsMap;
use crate::xds::factory::UpdateActionFactory;
use crate::xds::resolver::{BatchIndex, DeltaSink, ResolveContext, ResolverRegistry, Target};
use crate::xds::version::EntityVersions;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

/// Changes committed for a single node group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeGroupChangeEvent {
    pub node_group: String,
    pub changes: ChangeSet,
}

impl NodeGroupChangeEvent {
    pub fn new(node_group: impl Into<String>, changes: ChangeSet) -> Self {
        Self { node_group: node_group.into(), changes }
    }
}

/// Reactive translator for one node group
#[derive(Debug, Clone)]
pub struct ChangeEventParser<'a> {
    registry: &'a ResolverRegistry,
    factory: &'a UpdateActionFactory,
    reject_unknown_tables: bool,
}

impl<'a> ChangeEventParser<'a> {
    pub fn new(registry: &'a ResolverRegistry, factory: &'a UpdateActionFactory) -> Self {
        Self { registry, factory, reject_unknown_tables: false }
    }

    /// Fail on tables without a resolver instead of skipping them
    pub fn reject_unknown_tables(mut self, reject: bool) -> Self {
        self.reject_unknown_tables = reject;
        self
    }

    /// Resolve every change of `event` against `repo` and collect the deltas
    /// addressed to the event's node group.
    ///
    /// Any store failure aborts the whole call; no partial map is returned.
    #[instrument(
        skip(self, repo, event, versions),
        fields(node_group = %event.node_group, tables = event.changes.len()),
        name = "parse_node_group_changes"
    )]
    pub fn parse(
        &self,
        repo: &dyn Repository,
        event: &NodeGroupChangeEvent,
        versions: &EntityVersions,
    ) -> Result<ActionsMap> {
        let batch = BatchIndex::from_changes(&event.changes)?;
        let ctx = ResolveContext::new(repo, &batch);
        let mut sink = NodeGroupSink {
            node_group: &event.node_group,
            versions,
            factory: self.factory,
            actions: ActionsMap::new(),
        };

        self.registry.resolve(&ctx, &event.changes, &mut sink, self.reject_unknown_tables)?;

        debug!(deltas = sink.actions.len(), "Parsed node group change event");
        Ok(sink.actions)
    }
}

struct NodeGroupSink<'a> {
    node_group: &'a str,
    versions: &'a EntityVersions,
    factory: &'a UpdateActionFactory,
    actions: ActionsMap,
}

impl DeltaSink for NodeGroupSink<'_> {
    fn emit(&mut self, target: Target) {
        if target.node_group() != self.node_group {
            trace!(target_node_group = %target.node_group(), "Target outside node group");
            return;
        }
        let version = self.versions.get(&target.resource_kind()).map_or("", String::as_str);
        if let Some(delta) = target.to_delta(self.factory, version) {
            self.actions.put(delta);
        }
    }
}
