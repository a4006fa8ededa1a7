//! Domain ID Types with NewType Pattern
//!
//! Every stored entity is addressed by a numeric surrogate key. Wrapping each key
//! in its own type prevents passing a route id where a cluster id is expected,
//! which matters a great deal for the dependency resolver: nearly every
//! resolution step follows a foreign key from one table into another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to generate NewType ID wrappers with all required traits
macro_rules! domain_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create an ID from its raw value
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw value
            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

domain_id!(
    /// Unique identifier for a cluster
    ClusterId
);

domain_id!(
    /// Unique identifier for a cluster endpoint
    EndpointId
);

domain_id!(
    /// Unique identifier for a cluster health check
    HealthCheckId
);

domain_id!(
    /// Unique identifier for a circuit breaker
    CircuitBreakerId
);

domain_id!(
    /// Unique identifier for a circuit breaker threshold
    ThresholdId
);

domain_id!(
    /// Unique identifier for a TCP keepalive setting
    TcpKeepaliveId
);

domain_id!(
    /// Unique identifier for a route configuration (route table)
    RouteConfigurationId
);

domain_id!(
    /// Unique identifier for a virtual host
    VirtualHostId
);

domain_id!(
    /// Unique identifier for a route
    RouteId
);

domain_id!(
    /// Unique identifier for a header matcher
    HeaderMatcherId
);

domain_id!(
    /// Unique identifier for a retry policy
    RetryPolicyId
);

domain_id!(
    /// Unique identifier for a hash policy
    HashPolicyId
);

domain_id!(
    /// Unique identifier for a listener
    ListenerId
);

domain_id!(
    /// Unique identifier for a wasm filter
    WasmFilterId
);

domain_id!(
    /// Unique identifier for a TLS configuration
    TlsConfigId
);

domain_id!(
    /// Unique identifier for a stateful session configuration
    StatefulSessionId
);
