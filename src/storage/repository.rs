//! Repository and transaction seams of the configuration store
//!
//! The translation core only ever reads: every dependency lookup runs against a
//! committed point-in-time view handed out by [`ConfigStore::with_read_tx`]. Lookups
//! return `Ok(None)` / an empty list when the owner does not exist; `Err` is reserved
//! for failures of the store itself.

use super::change::ChangeRecord;
use crate::domain::{
    CircuitBreaker, Cluster, ClusterId, Endpoint, EndpointId, Entity, EnvoyConfigVersion,
    Listener, ListenerId, ListenerWasmFilter, NodeGroup, ResourceKind, Route,
    RouteConfiguration, RouteConfigurationId, RouteId, StatefulSessionId, Table, TlsConfigId,
    VirtualHost, VirtualHostId, WasmFilterId,
};
use crate::errors::Result;

/// Read-side finders used by the dependency resolver and the reload builder.
pub trait Repository {
    fn find_node_group(&self, name: &str) -> Result<Option<NodeGroup>>;

    fn find_cluster_by_id(&self, id: ClusterId) -> Result<Option<Cluster>>;

    /// Full scan; circuit breaker, threshold and keepalive references only point
    /// from the cluster outwards.
    fn find_all_clusters(&self) -> Result<Vec<Cluster>>;

    fn find_clusters_by_node_group(&self, node_group: &str) -> Result<Vec<Cluster>>;

    /// Node groups a cluster is visible from, via the cluster/node-group join
    fn find_node_groups_by_cluster(&self, cluster_id: ClusterId) -> Result<Vec<String>>;

    fn find_endpoint_by_id(&self, id: EndpointId) -> Result<Option<Endpoint>>;

    fn find_endpoints_by_deployment_version(&self, version: &str) -> Result<Vec<Endpoint>>;

    fn find_endpoints_by_stateful_session(&self, id: StatefulSessionId) -> Result<Vec<Endpoint>>;

    fn find_all_circuit_breakers(&self) -> Result<Vec<CircuitBreaker>>;

    /// Node groups a TLS configuration is bound to as node-group wide policy
    fn find_node_groups_by_tls_config(&self, tls_config_id: TlsConfigId) -> Result<Vec<String>>;

    fn find_route_configuration_by_id(
        &self,
        id: RouteConfigurationId,
    ) -> Result<Option<RouteConfiguration>>;

    fn find_route_configurations_by_node_group(
        &self,
        node_group: &str,
    ) -> Result<Vec<RouteConfiguration>>;

    fn find_virtual_host_by_id(&self, id: VirtualHostId) -> Result<Option<VirtualHost>>;

    fn find_virtual_hosts_by_rate_limit(&self, rate_limit: &str) -> Result<Vec<VirtualHost>>;

    fn find_route_by_id(&self, id: RouteId) -> Result<Option<Route>>;

    fn find_all_routes(&self) -> Result<Vec<Route>>;

    fn find_routes_by_cluster_name(&self, cluster_name: &str) -> Result<Vec<Route>>;

    fn find_routes_by_deployment_version(&self, version: &str) -> Result<Vec<Route>>;

    fn find_routes_by_rate_limit(&self, rate_limit: &str) -> Result<Vec<Route>>;

    fn find_routes_by_stateful_session(&self, id: StatefulSessionId) -> Result<Vec<Route>>;

    fn find_listener_by_id(&self, id: ListenerId) -> Result<Option<Listener>>;

    fn find_listeners_by_node_group(&self, node_group: &str) -> Result<Vec<Listener>>;

    fn find_listener_wasm_filters_by_wasm_filter(
        &self,
        wasm_filter_id: WasmFilterId,
    ) -> Result<Vec<ListenerWasmFilter>>;

    fn find_all_envoy_config_versions(&self) -> Result<Vec<EnvoyConfigVersion>>;
}

/// Mutations available inside a write transaction.
pub trait WriteTransaction {
    /// Read view including the transaction's own uncommitted writes
    fn repository(&self) -> &dyn Repository;

    /// Insert or replace an entity, recording a creation or update
    fn save(&mut self, entity: Entity) -> Result<()>;

    /// Delete by primary key, recording a deletion. Deleting a missing row records nothing.
    fn delete(&mut self, table: &Table, key: &str) -> Result<Option<Entity>>;

    /// Increment the version ledger entry of `kind` in `node_group`, creating it at 1.
    fn bump_version(&mut self, node_group: &str, kind: ResourceKind) -> Result<i64> {
        let current = self
            .repository()
            .find_all_envoy_config_versions()?
            .into_iter()
            .find(|entry| entry.node_group == node_group && entry.entity_type == kind)
            .map(|entry| entry.version)
            .unwrap_or(0);
        let next = current + 1;
        self.save(Entity::from(EnvoyConfigVersion::new(node_group, kind, next)))?;
        Ok(next)
    }
}

/// Transactional configuration store.
///
/// One writer at a time, any number of readers against committed snapshots.
pub trait ConfigStore: Send + Sync {
    type WriteTx: WriteTransaction;

    fn with_read_tx<T>(&self, f: impl FnOnce(&dyn Repository) -> Result<T>) -> Result<T>;

    /// Run `f` in a write transaction. On success the transaction commits and the
    /// ordered change records it produced are returned; on error nothing is applied.
    fn with_write_tx(
        &self,
        f: impl FnOnce(&mut Self::WriteTx) -> Result<()>,
    ) -> Result<Vec<ChangeRecord>>;
}
