//! Cluster domain types
//!
//! Clusters are composite resources: the unit versioned and delivered to proxies.
//! Endpoints, health checks, circuit breakers (with their thresholds), TCP keepalive
//! settings and TLS configurations are leaf entities rendered into the cluster
//! that owns them.

use super::id::{
    CircuitBreakerId, ClusterId, EndpointId, HealthCheckId, StatefulSessionId, TcpKeepaliveId,
    ThresholdId, TlsConfigId,
};
use serde::{Deserialize, Serialize};

/// Separator used in cluster names: `family||family||port`.
pub const CLUSTER_NAME_SEPARATOR: &str = "||";

/// Load balancing policy applied to a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LbPolicy {
    #[default]
    RoundRobin,
    LeastRequest,
    RingHash,
    Maglev,
}

/// Upstream cluster.
///
/// A cluster may be visible from several node groups; visibility is recorded by
/// [`ClusterNodeGroup`] join rows rather than on the cluster itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,

    /// Cluster name, conventionally `family||family||port`
    pub name: String,

    #[serde(default)]
    pub lb_policy: LbPolicy,

    #[serde(default)]
    pub enable_h2: bool,

    #[serde(default)]
    pub version: i64,

    /// Explicit TLS configuration; when absent the node-group TLS policy applies
    #[serde(default)]
    pub tls_id: Option<TlsConfigId>,

    #[serde(default)]
    pub circuit_breaker_id: Option<CircuitBreakerId>,

    #[serde(default)]
    pub tcp_keepalive_id: Option<TcpKeepaliveId>,
}

impl Cluster {
    /// Family part of the cluster name (text before the first `||`).
    pub fn family_name(&self) -> &str {
        family_of(&self.name)
    }
}

/// Family part of a cluster name as stored on routes and clusters.
pub fn family_of(cluster_name: &str) -> &str {
    cluster_name.split(CLUSTER_NAME_SEPARATOR).next().unwrap_or(cluster_name)
}

/// Family key used to match clusters of a microservice across deployment versions.
///
/// Microservices in the default namespace are keyed by their bare name, everything
/// else is suffixed with the namespace.
pub fn family_key(name: &str, namespace: &str) -> String {
    if namespace.is_empty() || namespace == "default" {
        name.to_string()
    } else {
        format!("{}.{}", name, namespace)
    }
}

/// Many-to-many join between clusters and node groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNodeGroup {
    pub cluster_id: ClusterId,
    pub node_group: String,
}

/// Upstream endpoint of a cluster, tagged with the deployment version it serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub cluster_id: ClusterId,
    pub address: String,
    pub port: u16,
    pub deployment_version: String,

    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub stateful_session_id: Option<StatefulSessionId>,
}

/// Active health check attached to a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub id: HealthCheckId,
    pub cluster_id: ClusterId,

    #[serde(default)]
    pub timeout_ms: u64,

    #[serde(default)]
    pub interval_ms: u64,

    #[serde(default)]
    pub path: Option<String>,
}

/// Circuit breaker referenced by clusters through `Cluster::circuit_breaker_id`.
///
/// The reference only points forward (cluster to breaker), so finding the clusters
/// that use a breaker requires a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub id: CircuitBreakerId,
    pub threshold_id: ThresholdId,
}

/// Thresholds of a circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub id: ThresholdId,

    #[serde(default)]
    pub max_connections: u32,

    #[serde(default)]
    pub max_pending_requests: u32,

    #[serde(default)]
    pub max_requests: u32,
}

/// Upstream TCP keepalive settings referenced by clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpKeepalive {
    pub id: TcpKeepaliveId,

    #[serde(default)]
    pub probes: u32,

    #[serde(default)]
    pub time_secs: u32,

    #[serde(default)]
    pub interval_secs: u32,
}

/// Upstream TLS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub id: TlsConfigId,
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub trusted_ca: Option<String>,

    #[serde(default)]
    pub sni: Option<String>,
}

/// Binds a TLS configuration to a node group as the node-group wide policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfigNodeGroup {
    pub tls_config_id: TlsConfigId,
    pub node_group: String,
}
