//! Node groups, deployment versions and the version ledger

use super::cluster::family_key;
use super::entity::ResourceKind;
use serde::{Deserialize, Serialize};

/// Role of the proxies in a node group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayType {
    #[default]
    Ingress,
    Mesh,
    Egress,
}

/// Named set of proxy instances sharing one configuration view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub name: String,

    #[serde(default)]
    pub gateway_type: GatewayType,

    #[serde(default)]
    pub forbid_virtual_hosts: bool,
}

/// Blue-green stage of a deployment version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStage {
    Legacy,
    #[default]
    Active,
    Candidate,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentVersion {
    pub version: String,

    #[serde(default)]
    pub stage: DeploymentStage,
}

/// Maps a microservice to the deployment version it is currently served from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroserviceVersion {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    pub deployment_version: String,

    #[serde(default)]
    pub initial_deployment_version: String,
}

impl MicroserviceVersion {
    pub fn family_key(&self) -> String {
        family_key(&self.name, &self.namespace)
    }
}

/// Version ledger entry: the current version of one resource kind in one node group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvoyConfigVersion {
    pub node_group: String,
    pub entity_type: ResourceKind,
    pub version: i64,
}

impl EnvoyConfigVersion {
    pub fn new(node_group: impl Into<String>, entity_type: ResourceKind, version: i64) -> Self {
        Self { node_group: node_group.into(), entity_type, version }
    }
}
