//! Common test utilities for all integration tests.
//!
//! Provides entity builders, a canned two-node-group topology and a service
//! constructor over the in-memory store.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use deltaplane::config::TranslationConfig;
use deltaplane::domain::*;
use deltaplane::services::TranslationService;
use deltaplane::storage::{ChangeRecord, InMemoryStore};
use deltaplane::xds::SnapshotCache;
use std::sync::Arc;

pub fn node_group(name: &str) -> NodeGroup {
    NodeGroup { name: name.to_string(), gateway_type: GatewayType::Ingress, forbid_virtual_hosts: false }
}

pub fn cluster(id: i64) -> Cluster {
    Cluster {
        id: ClusterId::new(id),
        name: format!("svc{id}||svc{id}||8080"),
        lb_policy: LbPolicy::RoundRobin,
        enable_h2: false,
        version: 1,
        tls_id: None,
        circuit_breaker_id: None,
        tcp_keepalive_id: None,
    }
}

pub fn cluster_join(cluster_id: i64, node_group: &str) -> ClusterNodeGroup {
    ClusterNodeGroup { cluster_id: ClusterId::new(cluster_id), node_group: node_group.to_string() }
}

pub fn endpoint(id: i64, cluster_id: i64) -> Endpoint {
    Endpoint {
        id: EndpointId::new(id),
        cluster_id: ClusterId::new(cluster_id),
        address: "10.0.0.1".to_string(),
        port: 8080,
        deployment_version: "v1".to_string(),
        hostname: None,
        stateful_session_id: None,
    }
}

pub fn route_configuration(id: i64, node_group: &str) -> RouteConfiguration {
    RouteConfiguration {
        id: RouteConfigurationId::new(id),
        name: format!("rc{id}"),
        node_group: node_group.to_string(),
        version: 1,
    }
}

pub fn virtual_host(id: i64, route_configuration_id: i64) -> VirtualHost {
    VirtualHost {
        id: VirtualHostId::new(id),
        name: format!("vh{id}"),
        route_configuration_id: RouteConfigurationId::new(route_configuration_id),
        rate_limit_id: None,
        version: 1,
    }
}

pub fn route(id: i64, virtual_host_id: i64, cluster_name: &str) -> Route {
    Route {
        id: RouteId::new(id),
        virtual_host_id: VirtualHostId::new(virtual_host_id),
        route_key: format!("/r{id}"),
        prefix: Some(format!("/r{id}")),
        path: None,
        cluster_name: cluster_name.to_string(),
        deployment_version: "v1".to_string(),
        initial_deployment_version: "v1".to_string(),
        rate_limit_id: None,
        stateful_session_id: None,
        direct_response_code: None,
        timeout_ms: None,
        version: 1,
    }
}

pub fn listener(id: i64, node_group: &str) -> Listener {
    Listener {
        id: ListenerId::new(id),
        name: format!("listener{id}"),
        node_group: node_group.to_string(),
        bind_host: "0.0.0.0".to_string(),
        bind_port: 10000,
        route_configuration_name: format!("rc-{node_group}"),
        with_tls: false,
        version: 1,
    }
}

pub fn hash_policy(id: i64, route_id: Option<i64>, endpoint_id: Option<i64>) -> HashPolicy {
    HashPolicy {
        id: HashPolicyId::new(id),
        route_id: route_id.map(RouteId::new),
        endpoint_id: endpoint_id.map(EndpointId::new),
        header_name: Some("x-user".to_string()),
        cookie_name: None,
        terminal: false,
    }
}

pub fn header_matcher(id: i64, route_id: i64) -> HeaderMatcher {
    HeaderMatcher {
        id: HeaderMatcherId::new(id),
        route_id: RouteId::new(route_id),
        name: "x-canary".to_string(),
        exact_match: Some("true".to_string()),
        invert_match: false,
    }
}

/// Two node groups sharing cluster 1:
///
/// - `ng1`: clusters 1 and 2, rc100 → vh110 → route 120 → cluster 1, listener 300
/// - `ng2`: cluster 1, rc200 → vh210 → route 220 → cluster 2, listener 400
/// - endpoint 10 belongs to cluster 1
pub fn topology_entities() -> Vec<Entity> {
    vec![
        node_group("ng1").into(),
        node_group("ng2").into(),
        cluster(1).into(),
        cluster(2).into(),
        cluster_join(1, "ng1").into(),
        cluster_join(1, "ng2").into(),
        cluster_join(2, "ng1").into(),
        endpoint(10, 1).into(),
        route_configuration(100, "ng1").into(),
        route_configuration(200, "ng2").into(),
        virtual_host(110, 100).into(),
        virtual_host(210, 200).into(),
        route(120, 110, &cluster(1).name).into(),
        route(220, 210, &cluster(2).name).into(),
        listener(300, "ng1").into(),
        listener(400, "ng2").into(),
    ]
}

/// Version ledger entries tracking every given kind in both node groups
pub fn ledger(kinds: &[ResourceKind], version: i64) -> Vec<EnvoyConfigVersion> {
    ["ng1", "ng2"]
        .iter()
        .flat_map(|node_group| {
            kinds.iter().map(move |kind| EnvoyConfigVersion::new(*node_group, *kind, version))
        })
        .collect()
}

/// Change records announcing `entries` as the versions of this batch
pub fn ledger_records(entries: &[EnvoyConfigVersion]) -> Vec<ChangeRecord> {
    entries.iter().cloned().map(ChangeRecord::created).collect()
}

pub fn topology() -> InMemoryStore {
    InMemoryStore::with_entities(topology_entities())
}

/// Topology with clusters, route configurations and listeners tracked at version 1
pub fn tracked_topology() -> InMemoryStore {
    let mut entities = topology_entities();
    let kinds = [ResourceKind::Cluster, ResourceKind::RouteConfiguration, ResourceKind::Listener];
    entities.extend(ledger(&kinds, 1).into_iter().map(Entity::from));
    InMemoryStore::with_entities(entities)
}

pub fn service(store: InMemoryStore) -> TranslationService<InMemoryStore> {
    TranslationService::new(
        Arc::new(store),
        Arc::new(SnapshotCache::default()),
        &TranslationConfig::default(),
    )
}
