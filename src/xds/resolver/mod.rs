//! Dependency resolver
//!
//! For every entity kind a resolver walks the ownership graph from the changed
//! entity up to the composite resources it is rendered into, and reports each of
//! them as a [`Target`] to the caller's [`DeltaSink`]. Both translators share the
//! same resolvers; they only differ in how targets become deltas.
//!
//! Resolvers read the before-state of deleted entities and the after-state of
//! everything else. An owner that no longer exists (typically deleted in the same
//! transaction) is not an error: the branch simply yields nothing, and the owner's
//! own removal event takes care of it. Store failures propagate and abort the call.

mod cluster;
mod listener;
mod node_group;
mod route;

use crate::domain::{
    Cluster, ClusterId, Listener, ResourceKind, Route, RouteConfiguration,
    RouteConfigurationId, RouteId, Table, VirtualHostId,
};
use crate::errors::{DeltaplaneError, Result};
use crate::observability::TranslationMetrics;
use crate::storage::{ChangeRecord, ChangeSet, Repository};
use crate::xds::action::GranularEntityUpdate;
use crate::xds::factory::UpdateActionFactory;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace, warn};

/// Composite resource a change must be re-published to
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Cluster { node_group: String, cluster: Cluster, delete: bool },
    RouteConfiguration { route_configuration: RouteConfiguration, delete: bool },
    Listener { listener: Listener, delete: bool },
    Runtime { node_group: String },
}

impl Target {
    pub fn node_group(&self) -> &str {
        match self {
            Target::Cluster { node_group, .. } => node_group,
            Target::RouteConfiguration { route_configuration, .. } => {
                &route_configuration.node_group
            }
            Target::Listener { listener, .. } => &listener.node_group,
            Target::Runtime { node_group } => node_group,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Target::Cluster { .. } => ResourceKind::Cluster,
            Target::RouteConfiguration { .. } => ResourceKind::RouteConfiguration,
            Target::Listener { .. } => ResourceKind::Listener,
            Target::Runtime { .. } => ResourceKind::Runtime,
        }
    }

    /// Shape the delta for this target at `version`; `None` when the kind is untracked
    pub fn to_delta(
        &self,
        factory: &UpdateActionFactory,
        version: &str,
    ) -> Option<GranularEntityUpdate> {
        let node_group = self.node_group();
        match self {
            Target::Cluster { cluster, delete: false, .. } => {
                factory.cluster_update(node_group, version, cluster)
            }
            Target::Cluster { cluster, delete: true, .. } => {
                factory.cluster_delete(node_group, version, cluster)
            }
            Target::RouteConfiguration { route_configuration, delete: false } => {
                factory.route_configuration_update(node_group, version, route_configuration)
            }
            Target::RouteConfiguration { route_configuration, delete: true } => {
                factory.route_configuration_delete(node_group, version, route_configuration)
            }
            Target::Listener { listener, delete: false } => {
                factory.listener_update(node_group, version, listener)
            }
            Target::Listener { listener, delete: true } => {
                factory.listener_delete(node_group, version, listener)
            }
            Target::Runtime { .. } => factory.runtime_update(node_group, version),
        }
    }
}

/// Accumulator receiving the targets discovered by resolvers
pub trait DeltaSink {
    fn emit(&mut self, target: Target);
}

impl DeltaSink for Vec<Target> {
    fn emit(&mut self, target: Target) {
        self.push(target);
    }
}

/// Before-states of entities deleted in the batch being translated.
///
/// Lets resolvers tell "owner deleted in this very transaction" apart from "owner
/// never existed" where the difference changes the delta shape.
#[derive(Debug, Clone, Default)]
pub struct BatchIndex {
    deleted_clusters: HashMap<ClusterId, Cluster>,
    removed_cluster_node_groups: HashMap<ClusterId, Vec<String>>,
}

impl BatchIndex {
    pub fn from_changes(changes: &ChangeSet) -> Result<Self> {
        let mut index = Self::default();
        for record in changes.get(&Table::Cluster).into_iter().flatten() {
            if record.is_delete() {
                let cluster = record.current_as::<Cluster>()?;
                index.deleted_clusters.insert(cluster.id, cluster.clone());
            }
        }
        for record in changes.get(&Table::ClusterNodeGroup).into_iter().flatten() {
            if record.is_delete() {
                let join = record.current_as::<crate::domain::ClusterNodeGroup>()?;
                index
                    .removed_cluster_node_groups
                    .entry(join.cluster_id)
                    .or_default()
                    .push(join.node_group.clone());
            }
        }
        Ok(index)
    }

    pub fn deleted_cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.deleted_clusters.get(&id)
    }

    pub fn removed_node_groups(&self, id: ClusterId) -> &[String] {
        self.removed_cluster_node_groups.get(&id).map_or(&[], Vec::as_slice)
    }
}

/// Read handle and batch view shared by every resolver call of one translation
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub repo: &'a dyn Repository,
    pub batch: &'a BatchIndex,
}

impl<'a> ResolveContext<'a> {
    pub fn new(repo: &'a dyn Repository, batch: &'a BatchIndex) -> Self {
        Self { repo, batch }
    }
}

/// Resolution function registered for one table
pub type Resolver = fn(&ResolveContext<'_>, &ChangeRecord, &mut dyn DeltaSink) -> Result<()>;

#[derive(Clone, Copy)]
enum Handler {
    Resolve(Resolver),
    Ignore,
}

/// Registry mapping each table to its resolver
#[derive(Clone)]
pub struct ResolverRegistry {
    handlers: HashMap<Table, Handler>,
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tables: Vec<&str> = self.handlers.keys().map(Table::as_str).collect();
        tables.sort_unstable();
        f.debug_struct("ResolverRegistry").field("tables", &tables).finish()
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ResolverRegistry {
    /// Registry without any handler
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Registry with every built-in resolver; the version ledger is side-effect free
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register(Table::NodeGroup, node_group::node_group)
            .register(Table::DeploymentVersion, node_group::deployment_version)
            .register(Table::MicroserviceVersion, node_group::microservice_version)
            .register(Table::ClusterNodeGroup, node_group::cluster_node_group)
            .register(Table::Cluster, cluster::cluster)
            .register(Table::Endpoint, cluster::endpoint)
            .register(Table::HealthCheck, cluster::health_check)
            .register(Table::CircuitBreaker, cluster::circuit_breaker)
            .register(Table::Threshold, cluster::threshold)
            .register(Table::TcpKeepalive, cluster::tcp_keepalive)
            .register(Table::TlsConfig, cluster::tls_config)
            .register(Table::TlsConfigNodeGroup, cluster::tls_config_node_group)
            .register(Table::RouteConfiguration, route::route_configuration)
            .register(Table::VirtualHost, route::virtual_host)
            .register(Table::VirtualHostDomain, route::virtual_host_domain)
            .register(Table::Route, route::route)
            .register(Table::HeaderMatcher, route::header_matcher)
            .register(Table::RetryPolicy, route::retry_policy)
            .register(Table::HashPolicy, route::hash_policy)
            .register(Table::RateLimit, route::rate_limit)
            .register(Table::StatefulSession, route::stateful_session)
            .register(Table::Listener, listener::listener)
            .register(Table::WasmFilter, listener::wasm_filter)
            .register(Table::ListenerWasmFilter, listener::listener_wasm_filter)
            .register(Table::ExtAuthzFilter, listener::ext_authz_filter)
            .ignore(Table::EnvoyConfigVersion);
        registry
    }

    /// Add or override the resolver of `table`
    pub fn register(&mut self, table: Table, resolver: Resolver) -> &mut Self {
        self.handlers.insert(table, Handler::Resolve(resolver));
        self
    }

    /// Mark `table` as having no side effect on published configuration
    pub fn ignore(&mut self, table: Table) -> &mut Self {
        self.handlers.insert(table, Handler::Ignore);
        self
    }

    pub fn is_supported(&self, table: &Table) -> bool {
        self.handlers.contains_key(table)
    }

    /// Run the matching resolver for every record of `changes`.
    ///
    /// Tables without a handler are logged and skipped, or rejected when `strict`.
    pub fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        changes: &ChangeSet,
        sink: &mut dyn DeltaSink,
        strict: bool,
    ) -> Result<()> {
        for (table, records) in changes {
            match self.handlers.get(table) {
                Some(Handler::Resolve(resolver)) => {
                    for record in records {
                        resolver(ctx, record, sink)?;
                    }
                }
                Some(Handler::Ignore) => {
                    trace!(table = %table, records = records.len(), "Table has no side effect");
                }
                None if strict => {
                    return Err(DeltaplaneError::validation_field(
                        format!("No resolver registered for table '{}'", table),
                        "table",
                    ));
                }
                None => {
                    warn!(
                        table = %table,
                        records = records.len(),
                        "Unsupported table in change batch, skipping"
                    );
                    TranslationMetrics::new().record_unsupported_table(table.as_str());
                }
            }
        }
        Ok(())
    }
}

// Owner lookups shared by the per-table resolvers.

/// Emit a cluster for every node group it is visible from. Deletions also reach
/// node groups whose join rows were removed in the same batch.
fn emit_cluster(
    ctx: &ResolveContext<'_>,
    cluster: &Cluster,
    delete: bool,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let mut node_groups = ctx.repo.find_node_groups_by_cluster(cluster.id)?;
    if delete {
        node_groups.extend(ctx.batch.removed_node_groups(cluster.id).iter().cloned());
    }
    let mut seen = HashSet::new();
    for node_group in node_groups {
        if seen.insert(node_group.clone()) {
            sink.emit(Target::Cluster { node_group, cluster: cluster.clone(), delete });
        }
    }
    Ok(())
}

fn emit_cluster_by_id(
    ctx: &ResolveContext<'_>,
    id: ClusterId,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    match ctx.repo.find_cluster_by_id(id)? {
        Some(cluster) => emit_cluster(ctx, &cluster, false, sink),
        None => {
            debug!(cluster_id = %id, "Owning cluster no longer exists");
            Ok(())
        }
    }
}

fn emit_clusters_matching(
    ctx: &ResolveContext<'_>,
    predicate: impl Fn(&Cluster) -> bool,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    for cluster in ctx.repo.find_all_clusters()?.iter().filter(|c| predicate(c)) {
        emit_cluster(ctx, cluster, false, sink)?;
    }
    Ok(())
}

fn emit_route_configuration_by_id(
    ctx: &ResolveContext<'_>,
    id: RouteConfigurationId,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    match ctx.repo.find_route_configuration_by_id(id)? {
        Some(route_configuration) => {
            sink.emit(Target::RouteConfiguration { route_configuration, delete: false });
        }
        None => debug!(route_configuration_id = %id, "Owning route configuration no longer exists"),
    }
    Ok(())
}

fn route_configuration_of_virtual_host(
    ctx: &ResolveContext<'_>,
    id: VirtualHostId,
) -> Result<Option<RouteConfiguration>> {
    match ctx.repo.find_virtual_host_by_id(id)? {
        Some(virtual_host) => {
            ctx.repo.find_route_configuration_by_id(virtual_host.route_configuration_id)
        }
        None => {
            debug!(virtual_host_id = %id, "Owning virtual host no longer exists");
            Ok(None)
        }
    }
}

fn emit_virtual_host_by_id(
    ctx: &ResolveContext<'_>,
    id: VirtualHostId,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    if let Some(route_configuration) = route_configuration_of_virtual_host(ctx, id)? {
        sink.emit(Target::RouteConfiguration { route_configuration, delete: false });
    }
    Ok(())
}

/// Route configurations owning `routes`, each listed once
fn route_configurations_of_routes<'r>(
    ctx: &ResolveContext<'_>,
    routes: impl IntoIterator<Item = &'r Route>,
) -> Result<Vec<RouteConfiguration>> {
    let mut visited = HashSet::new();
    let mut owners = Vec::new();
    for route in routes {
        if !visited.insert(route.virtual_host_id) {
            continue;
        }
        if let Some(route_configuration) =
            route_configuration_of_virtual_host(ctx, route.virtual_host_id)?
        {
            if owners.iter().all(|rc: &RouteConfiguration| rc.id != route_configuration.id) {
                owners.push(route_configuration);
            }
        }
    }
    Ok(owners)
}

fn emit_routes<'r>(
    ctx: &ResolveContext<'_>,
    routes: impl IntoIterator<Item = &'r Route>,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    for route_configuration in route_configurations_of_routes(ctx, routes)? {
        sink.emit(Target::RouteConfiguration { route_configuration, delete: false });
    }
    Ok(())
}

fn emit_route_by_id(ctx: &ResolveContext<'_>, id: RouteId, sink: &mut dyn DeltaSink) -> Result<()> {
    match ctx.repo.find_route_by_id(id)? {
        Some(route) => emit_routes(ctx, [&route], sink),
        None => {
            debug!(route_id = %id, "Owning route no longer exists");
            Ok(())
        }
    }
}

/// Route configurations whose routes target `cluster_name`
fn emit_routes_targeting_cluster(
    ctx: &ResolveContext<'_>,
    cluster_name: &str,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let routes = ctx.repo.find_routes_by_cluster_name(cluster_name)?;
    emit_routes(ctx, &routes, sink)
}

/// Every route configuration and listener of a node group
fn emit_node_group_routing(
    ctx: &ResolveContext<'_>,
    node_group: &str,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    for route_configuration in ctx.repo.find_route_configurations_by_node_group(node_group)? {
        sink.emit(Target::RouteConfiguration { route_configuration, delete: false });
    }
    for listener in ctx.repo.find_listeners_by_node_group(node_group)? {
        sink.emit(Target::Listener { listener, delete: false });
    }
    Ok(())
}
