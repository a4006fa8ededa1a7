//! Route domain types
//!
//! A route configuration (route table) is the composite resource. Virtual hosts
//! belong to a route configuration, routes belong to a virtual host, and header
//! matchers, retry policies and route-bound hash policies belong to a route.

use super::cluster::family_of;
use super::id::{
    EndpointId, HashPolicyId, HeaderMatcherId, RetryPolicyId, RouteConfigurationId, RouteId,
    StatefulSessionId, VirtualHostId,
};
use serde::{Deserialize, Serialize};

/// Named route table owned by exactly one node group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfiguration {
    pub id: RouteConfigurationId,
    pub name: String,
    pub node_group: String,

    #[serde(default)]
    pub version: i64,
}

/// Virtual host of a route configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualHost {
    pub id: VirtualHostId,
    pub name: String,
    pub route_configuration_id: RouteConfigurationId,

    /// Name of the rate limit applied to the whole virtual host
    #[serde(default)]
    pub rate_limit_id: Option<String>,

    #[serde(default)]
    pub version: i64,
}

/// Domain served by a virtual host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHostDomain {
    pub virtual_host_id: VirtualHostId,
    pub domain: String,

    #[serde(default)]
    pub version: i64,
}

/// Route inside a virtual host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub virtual_host_id: VirtualHostId,
    pub route_key: String,

    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    /// Target cluster name, empty for direct responses
    #[serde(default)]
    pub cluster_name: String,

    pub deployment_version: String,

    #[serde(default)]
    pub initial_deployment_version: String,

    #[serde(default)]
    pub rate_limit_id: Option<String>,

    #[serde(default)]
    pub stateful_session_id: Option<StatefulSessionId>,

    #[serde(default)]
    pub direct_response_code: Option<u32>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub version: i64,
}

impl Route {
    /// Family part of the target cluster name.
    pub fn cluster_family(&self) -> &str {
        family_of(&self.cluster_name)
    }
}

/// Header match condition of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderMatcher {
    pub id: HeaderMatcherId,
    pub route_id: RouteId,
    pub name: String,

    #[serde(default)]
    pub exact_match: Option<String>,

    #[serde(default)]
    pub invert_match: bool,
}

/// Retry policy of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub id: RetryPolicyId,
    pub route_id: RouteId,

    #[serde(default)]
    pub retry_on: String,

    #[serde(default)]
    pub num_retries: u32,

    #[serde(default)]
    pub per_try_timeout_ms: Option<u64>,
}

/// Consistent-hashing policy.
///
/// A hash policy may be bound to a route, to an endpoint, or to both at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashPolicy {
    pub id: HashPolicyId,

    #[serde(default)]
    pub route_id: Option<RouteId>,

    #[serde(default)]
    pub endpoint_id: Option<EndpointId>,

    #[serde(default)]
    pub header_name: Option<String>,

    #[serde(default)]
    pub cookie_name: Option<String>,

    #[serde(default)]
    pub terminal: bool,
}

/// Rate limit referenced by name from virtual hosts and routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
    pub name: String,
    pub limit_requests_per_unit: u32,
    pub unit: String,

    #[serde(default)]
    pub priority: RateLimitPriority,
}

/// Source priority of a rate limit definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateLimitPriority {
    #[default]
    Project,
    Product,
}

/// Sticky-session cookie configuration.
///
/// Binding is resolved in priority order: routes referencing the session, then
/// endpoints referencing it, then every route whose target cluster belongs to the
/// session's cluster family (across all deployment versions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatefulSession {
    pub id: StatefulSessionId,
    pub cookie_name: String,

    #[serde(default)]
    pub cookie_path: Option<String>,

    #[serde(default)]
    pub enabled: bool,

    /// Cluster family the session applies to when neither a route nor an endpoint
    /// references it
    #[serde(default)]
    pub cluster_name: String,

    #[serde(default)]
    pub namespace: String,

    /// Node groups the session is restricted to; empty means every node group
    #[serde(default)]
    pub gateways: Vec<String>,

    #[serde(default)]
    pub deployment_version: String,
}

impl StatefulSession {
    /// Whether deltas for `node_group` are allowed by the gateway restriction.
    pub fn applies_to(&self, node_group: &str) -> bool {
        self.gateways.is_empty() || self.gateways.iter().any(|g| g == node_group)
    }
}
