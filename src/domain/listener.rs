//! Listener domain types

use super::id::{ListenerId, WasmFilterId};
use serde::{Deserialize, Serialize};

/// Listener owned by exactly one node group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub id: ListenerId,
    pub name: String,
    pub node_group: String,
    pub bind_host: String,
    pub bind_port: u16,
    pub route_configuration_name: String,

    #[serde(default)]
    pub with_tls: bool,

    #[serde(default)]
    pub version: i64,
}

/// Wasm HTTP filter that can be attached to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasmFilter {
    pub id: WasmFilterId,
    pub name: String,
    pub url: String,
    pub sha256: String,

    #[serde(default)]
    pub timeout_ms: u64,
}

/// Many-to-many join between listeners and wasm filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerWasmFilter {
    pub listener_id: ListenerId,
    pub wasm_filter_id: WasmFilterId,
}

/// External authorization filter, configured once per node group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtAuthzFilter {
    pub name: String,
    pub node_group: String,
    pub cluster_name: String,

    #[serde(default)]
    pub timeout_ms: u64,
}
