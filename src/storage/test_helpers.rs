//! Fixture builders for in-library tests.
//!
//! The canned [`topology`] is small enough to reason about by hand:
//!
//! - node groups `ng1` and `ng2`
//! - cluster 1 visible from both, cluster 2 from `ng1` only
//! - endpoint 10 of cluster 1 in deployment version `v1`
//! - route configuration 100 (`ng1`) → virtual host 110 → route 120 → cluster 1
//! - route configuration 200 (`ng2`) → virtual host 210 → route 220 → cluster 2
//! - listeners 300 (`ng1`) and 400 (`ng2`)
//!
//! This module is only available in test builds (`#[cfg(test)]`).

use super::{group_by_table, ChangeRecord, ChangeSet, InMemoryStore};
use crate::domain::*;
use crate::errors::Result;
use crate::xds::resolver::{BatchIndex, ResolveContext, ResolverRegistry, Target};

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

pub fn tls_config(id: i64) -> TlsConfig {
    TlsConfig {
        id: TlsConfigId::new(id),
        name: format!("tls{id}"),
        enabled: true,
        insecure: false,
        trusted_ca: None,
        sni: None,
    }
}

pub fn stateful_session(id: i64) -> StatefulSession {
    StatefulSession {
        id: StatefulSessionId::new(id),
        cookie_name: "session".to_string(),
        cookie_path: None,
        enabled: true,
        cluster_name: String::new(),
        namespace: String::new(),
        gateways: Vec::new(),
        deployment_version: "v1".to_string(),
    }
}

/// Entities of the canned topology
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

pub fn topology() -> InMemoryStore {
    InMemoryStore::with_entities(topology_entities())
}

pub fn changes_of(records: Vec<ChangeRecord>) -> ChangeSet {
    group_by_table(records)
}

/// Targets the default registry resolves for `changes` against the store's state
pub fn resolve_all(store: &InMemoryStore, changes: &ChangeSet) -> Result<Vec<Target>> {
    let state = store.snapshot()?;
    let batch = BatchIndex::from_changes(changes)?;
    let mut targets: Vec<Target> = Vec::new();
    ResolverRegistry::with_defaults().resolve(
        &ResolveContext::new(&state, &batch),
        changes,
        &mut targets,
        false,
    )?;
    Ok(targets)
}

/// Compact `kind:node_group:name[:delete]` labels for assertions
pub fn labels(targets: &[Target]) -> Vec<String> {
    targets
        .iter()
        .map(|target| {
            let (name, delete) = match target {
                Target::Cluster { cluster, delete, .. } => (cluster.name.clone(), *delete),
                Target::RouteConfiguration { route_configuration, delete } => {
                    (route_configuration.name.clone(), *delete)
                }
                Target::Listener { listener, delete } => (listener.name.clone(), *delete),
                Target::Runtime { .. } => ("runtime".to_string(), false),
            };
            let suffix = if delete { ":delete" } else { "" };
            format!("{}:{}:{}{}", target.resource_kind(), target.node_group(), name, suffix)
        })
        .collect()
}
