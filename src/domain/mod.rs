//! Domain layer
//!
//! Pure configuration entities with zero infrastructure dependencies.
//!
//! ## Module Organization
//!
//! - `id`: Type-safe numeric identifiers with NewType pattern
//! - `cluster`: Clusters and the leaf entities rendered into them
//! - `route`: Route configurations, virtual hosts, routes and route policies
//! - `listener`: Listeners, wasm filters and ext-authz filters
//! - `node_group`: Node groups, deployment versions and the version ledger
//! - `entity`: Entity-kind tags and the tagged union of all payloads

pub mod cluster;
pub mod entity;
pub mod id;
pub mod listener;
pub mod node_group;
pub mod route;

pub use cluster::{
    family_key, family_of, CircuitBreaker, Cluster, ClusterNodeGroup, Endpoint, HealthCheck,
    LbPolicy, TcpKeepalive, Threshold, TlsConfig, TlsConfigNodeGroup,
};
pub use entity::{Entity, ResourceKind, Table, TableEntity};
pub use id::{
    CircuitBreakerId, ClusterId, EndpointId, HashPolicyId, HeaderMatcherId, HealthCheckId,
    ListenerId, RetryPolicyId, RouteConfigurationId, RouteId, StatefulSessionId,
    TcpKeepaliveId, ThresholdId, TlsConfigId, VirtualHostId, WasmFilterId,
};
pub use listener::{ExtAuthzFilter, Listener, ListenerWasmFilter, WasmFilter};
pub use node_group::{
    DeploymentStage, DeploymentVersion, EnvoyConfigVersion, GatewayType, MicroserviceVersion,
    NodeGroup,
};
pub use route::{
    HashPolicy, HeaderMatcher, RateLimit, RateLimitPriority, RetryPolicy, Route,
    RouteConfiguration, StatefulSession, VirtualHost, VirtualHostDomain,
};
