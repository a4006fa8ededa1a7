//! In-memory configuration store
//!
//! Reference implementation of [`ConfigStore`]: committed state lives behind a
//! `RwLock`, a write transaction works on a private copy and swaps it in on
//! commit. Foreign-key finders are plain scans over the owning table.

use super::change::ChangeRecord;
use super::repository::{ConfigStore, Repository, WriteTransaction};
use crate::domain::{
    CircuitBreaker, Cluster, ClusterId, ClusterNodeGroup, Endpoint, EndpointId, Entity,
    EnvoyConfigVersion, Listener, ListenerId, ListenerWasmFilter, NodeGroup, Route,
    RouteConfiguration, RouteConfigurationId, RouteId, StatefulSessionId, Table, TableEntity,
    TlsConfigId, TlsConfigNodeGroup, VirtualHost, VirtualHostId, WasmFilterId,
};
use crate::errors::{DeltaplaneError, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;
use tracing::{debug, instrument};

/// Point-in-time content of every table
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    tables: BTreeMap<Table, BTreeMap<String, Entity>>,
}

impl StoreState {
    /// Insert or replace an entity, returning the previous row
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.tables.entry(entity.table()).or_default().insert(entity.primary_key(), entity)
    }

    pub fn remove(&mut self, table: &Table, key: &str) -> Option<Entity> {
        self.tables.get_mut(table).and_then(|rows| rows.remove(key))
    }

    pub fn get(&self, table: &Table, key: &str) -> Option<&Entity> {
        self.tables.get(table).and_then(|rows| rows.get(key))
    }

    pub fn len(&self, table: &Table) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    fn rows<'a, T: TableEntity + 'a>(&'a self) -> impl Iterator<Item = &'a T> + 'a {
        self.tables
            .get(&T::table())
            .into_iter()
            .flat_map(|rows| rows.values())
            .filter_map(T::from_entity)
    }

    fn find<T: TableEntity + Clone>(&self, key: &str) -> Option<T> {
        self.get(&T::table(), key).and_then(T::from_entity).cloned()
    }

    fn select<T: TableEntity + Clone>(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows::<T>().filter(|row| predicate(row)).cloned().collect()
    }
}

impl Repository for StoreState {
    fn find_node_group(&self, name: &str) -> Result<Option<NodeGroup>> {
        Ok(self.find(name))
    }

    fn find_cluster_by_id(&self, id: ClusterId) -> Result<Option<Cluster>> {
        Ok(self.find(&id.to_string()))
    }

    fn find_all_clusters(&self) -> Result<Vec<Cluster>> {
        Ok(self.select(|_: &Cluster| true))
    }

    fn find_clusters_by_node_group(&self, node_group: &str) -> Result<Vec<Cluster>> {
        let ids: HashSet<ClusterId> = self
            .rows::<ClusterNodeGroup>()
            .filter(|join| join.node_group == node_group)
            .map(|join| join.cluster_id)
            .collect();
        Ok(self.select(|cluster: &Cluster| ids.contains(&cluster.id)))
    }

    fn find_node_groups_by_cluster(&self, cluster_id: ClusterId) -> Result<Vec<String>> {
        Ok(self
            .rows::<ClusterNodeGroup>()
            .filter(|join| join.cluster_id == cluster_id)
            .map(|join| join.node_group.clone())
            .collect())
    }

    fn find_endpoint_by_id(&self, id: EndpointId) -> Result<Option<Endpoint>> {
        Ok(self.find(&id.to_string()))
    }

    fn find_endpoints_by_deployment_version(&self, version: &str) -> Result<Vec<Endpoint>> {
        Ok(self.select(|endpoint: &Endpoint| endpoint.deployment_version == version))
    }

    fn find_endpoints_by_stateful_session(&self, id: StatefulSessionId) -> Result<Vec<Endpoint>> {
        Ok(self.select(|endpoint: &Endpoint| endpoint.stateful_session_id == Some(id)))
    }

    fn find_all_circuit_breakers(&self) -> Result<Vec<CircuitBreaker>> {
        Ok(self.select(|_: &CircuitBreaker| true))
    }

    fn find_node_groups_by_tls_config(&self, tls_config_id: TlsConfigId) -> Result<Vec<String>> {
        Ok(self
            .rows::<TlsConfigNodeGroup>()
            .filter(|binding| binding.tls_config_id == tls_config_id)
            .map(|binding| binding.node_group.clone())
            .collect())
    }

    fn find_route_configuration_by_id(
        &self,
        id: RouteConfigurationId,
    ) -> Result<Option<RouteConfiguration>> {
        Ok(self.find(&id.to_string()))
    }

    fn find_route_configurations_by_node_group(
        &self,
        node_group: &str,
    ) -> Result<Vec<RouteConfiguration>> {
        Ok(self.select(|rc: &RouteConfiguration| rc.node_group == node_group))
    }

    fn find_virtual_host_by_id(&self, id: VirtualHostId) -> Result<Option<VirtualHost>> {
        Ok(self.find(&id.to_string()))
    }

    fn find_virtual_hosts_by_rate_limit(&self, rate_limit: &str) -> Result<Vec<VirtualHost>> {
        Ok(self.select(|vh: &VirtualHost| vh.rate_limit_id.as_deref() == Some(rate_limit)))
    }

    fn find_route_by_id(&self, id: RouteId) -> Result<Option<Route>> {
        Ok(self.find(&id.to_string()))
    }

    fn find_all_routes(&self) -> Result<Vec<Route>> {
        Ok(self.select(|_: &Route| true))
    }

    fn find_routes_by_cluster_name(&self, cluster_name: &str) -> Result<Vec<Route>> {
        Ok(self.select(|route: &Route| route.cluster_name == cluster_name))
    }

    fn find_routes_by_deployment_version(&self, version: &str) -> Result<Vec<Route>> {
        Ok(self.select(|route: &Route| route.deployment_version == version))
    }

    fn find_routes_by_rate_limit(&self, rate_limit: &str) -> Result<Vec<Route>> {
        Ok(self.select(|route: &Route| route.rate_limit_id.as_deref() == Some(rate_limit)))
    }

    fn find_routes_by_stateful_session(&self, id: StatefulSessionId) -> Result<Vec<Route>> {
        Ok(self.select(|route: &Route| route.stateful_session_id == Some(id)))
    }

    fn find_listener_by_id(&self, id: ListenerId) -> Result<Option<Listener>> {
        Ok(self.find(&id.to_string()))
    }

    fn find_listeners_by_node_group(&self, node_group: &str) -> Result<Vec<Listener>> {
        Ok(self.select(|listener: &Listener| listener.node_group == node_group))
    }

    fn find_listener_wasm_filters_by_wasm_filter(
        &self,
        wasm_filter_id: WasmFilterId,
    ) -> Result<Vec<ListenerWasmFilter>> {
        Ok(self.select(|join: &ListenerWasmFilter| join.wasm_filter_id == wasm_filter_id))
    }

    fn find_all_envoy_config_versions(&self) -> Result<Vec<EnvoyConfigVersion>> {
        Ok(self.select(|_: &EnvoyConfigVersion| true))
    }
}

/// Write transaction over a private copy of the committed state
#[derive(Debug)]
pub struct MemoryWriteTx {
    state: StoreState,
    changes: Vec<ChangeRecord>,
}

impl WriteTransaction for MemoryWriteTx {
    fn repository(&self) -> &dyn Repository {
        &self.state
    }

    fn save(&mut self, entity: Entity) -> Result<()> {
        if let Table::Unknown(name) = entity.table() {
            return Err(DeltaplaneError::invariant(format!("Cannot save into table '{}'", name)));
        }
        let before = self.state.insert(entity.clone());
        self.changes.push(ChangeRecord { table: entity.table(), before, after: Some(entity) });
        Ok(())
    }

    fn delete(&mut self, table: &Table, key: &str) -> Result<Option<Entity>> {
        let removed = self.state.remove(table, key);
        if let Some(before) = &removed {
            self.changes.push(ChangeRecord {
                table: table.clone(),
                before: Some(before.clone()),
                after: None,
            });
        }
        Ok(removed)
    }
}

/// Copy-on-write in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entities`, without producing change records
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut state = StoreState::default();
        for entity in entities {
            state.insert(entity);
        }
        Self { state: RwLock::new(state) }
    }

    /// Clone of the committed state
    pub fn snapshot(&self) -> Result<StoreState> {
        self.state
            .read()
            .map(|state| state.clone())
            .map_err(|_| DeltaplaneError::storage("Configuration store lock poisoned"))
    }
}

impl ConfigStore for InMemoryStore {
    type WriteTx = MemoryWriteTx;

    fn with_read_tx<T>(&self, f: impl FnOnce(&dyn Repository) -> Result<T>) -> Result<T> {
        let state = self
            .state
            .read()
            .map_err(|_| DeltaplaneError::storage("Configuration store lock poisoned"))?;
        f(&*state)
    }

    #[instrument(skip(self, f), name = "store_write_tx")]
    fn with_write_tx(
        &self,
        f: impl FnOnce(&mut Self::WriteTx) -> Result<()>,
    ) -> Result<Vec<ChangeRecord>> {
        let mut committed = self
            .state
            .write()
            .map_err(|_| DeltaplaneError::storage("Configuration store lock poisoned"))?;

        let mut tx = MemoryWriteTx { state: committed.clone(), changes: Vec::new() };
        f(&mut tx)?;

        *committed = tx.state;
        debug!(changes = tx.changes.len(), "Committed write transaction");
        Ok(tx.changes)
    }
}
