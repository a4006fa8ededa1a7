//! Per node group configuration snapshots
//!
//! A snapshot holds, for each composite resource kind, the version the node group
//! currently runs and the resources of that kind keyed by resource name. The
//! resource body is the composite entity itself; rendering to a proxy wire format
//! happens further down the line.

use crate::domain::{Cluster, Listener, ResourceKind, RouteConfiguration};
use crate::domain::{ClusterId, ListenerId, RouteConfigurationId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Runtime layer of a node group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeLayer {
    pub name: String,
    pub node_group: String,
}

/// Body of one composite resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "resource")]
pub enum ResourceEntity {
    Cluster(Cluster),
    RouteConfiguration(RouteConfiguration),
    Listener(Listener),
    Runtime(RuntimeLayer),
}

/// Identity of a composite resource within its kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Cluster(ClusterId),
    RouteConfiguration(RouteConfigurationId),
    Listener(ListenerId),
    Runtime(String),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Cluster(id) => write!(f, "cluster#{}", id),
            EntityKey::RouteConfiguration(id) => write!(f, "route_configuration#{}", id),
            EntityKey::Listener(id) => write!(f, "listener#{}", id),
            EntityKey::Runtime(node_group) => write!(f, "runtime#{}", node_group),
        }
    }
}

impl ResourceEntity {
    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            ResourceEntity::Cluster(_) => ResourceKind::Cluster,
            ResourceEntity::RouteConfiguration(_) => ResourceKind::RouteConfiguration,
            ResourceEntity::Listener(_) => ResourceKind::Listener,
            ResourceEntity::Runtime(_) => ResourceKind::Runtime,
        }
    }

    /// Name the resource is published under
    pub fn name(&self) -> &str {
        match self {
            ResourceEntity::Cluster(cluster) => &cluster.name,
            ResourceEntity::RouteConfiguration(rc) => &rc.name,
            ResourceEntity::Listener(listener) => &listener.name,
            ResourceEntity::Runtime(layer) => &layer.name,
        }
    }

    pub fn key(&self) -> EntityKey {
        match self {
            ResourceEntity::Cluster(cluster) => EntityKey::Cluster(cluster.id),
            ResourceEntity::RouteConfiguration(rc) => EntityKey::RouteConfiguration(rc.id),
            ResourceEntity::Listener(listener) => EntityKey::Listener(listener.id),
            ResourceEntity::Runtime(layer) => EntityKey::Runtime(layer.node_group.clone()),
        }
    }
}

/// Resources of one kind together with the version they were published at
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceSet {
    pub version: String,
    pub items: BTreeMap<String, ResourceEntity>,
}

/// Complete configuration held by one node group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    resources: BTreeMap<ResourceKind, ResourceSet>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version of `kind`, if the kind was ever published
    pub fn version(&self, kind: ResourceKind) -> Option<&str> {
        self.resources.get(&kind).map(|set| set.version.as_str())
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&ResourceEntity> {
        self.resources.get(&kind).and_then(|set| set.items.get(name))
    }

    pub fn resources(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceEntity> {
        self.resources.get(&kind).into_iter().flat_map(|set| set.items.values())
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        self.resources.get(&kind).map_or(0, |set| set.items.len())
    }

    /// Insert or replace a resource. A renamed resource replaces its old entry.
    pub(crate) fn upsert(&mut self, version: &str, entity: ResourceEntity) {
        let set = self.resources.entry(entity.resource_kind()).or_default();
        set.version = version.to_string();
        let key = entity.key();
        set.items.retain(|name, existing| name == entity.name() || existing.key() != key);
        set.items.insert(entity.name().to_string(), entity);
    }

    pub(crate) fn remove(&mut self, version: &str, kind: ResourceKind, name: &str) {
        let set = self.resources.entry(kind).or_default();
        set.version = version.to_string();
        set.items.remove(name);
    }

    pub(crate) fn clear(&mut self, version: &str, kind: ResourceKind) {
        let set = self.resources.entry(kind).or_default();
        set.version = version.to_string();
        set.items.clear();
    }
}
