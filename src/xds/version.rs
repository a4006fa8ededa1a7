//! Version registry
//!
//! Node group -> resource kind -> version string, built once per translation call
//! from version ledger entities. A missing pair resolves to the empty string, which
//! the update action factory treats as "do not emit".

use crate::domain::{EnvoyConfigVersion, ResourceKind};
use std::collections::{BTreeMap, HashMap};

/// Versions of a single node group, keyed by resource kind
pub type EntityVersions = HashMap<ResourceKind, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionRegistry {
    versions: BTreeMap<String, EntityVersions>,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ledger entries; a later entry for the same pair wins
    pub fn from_ledger<'a>(entries: impl IntoIterator<Item = &'a EnvoyConfigVersion>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.insert(&entry.node_group, entry.entity_type, entry.version.to_string());
        }
        registry
    }

    pub fn insert(&mut self, node_group: &str, kind: ResourceKind, version: impl Into<String>) {
        self.versions.entry(node_group.to_string()).or_default().insert(kind, version.into());
    }

    /// Version of `kind` in `node_group`, or `""` when the pair is not tracked
    pub fn get(&self, node_group: &str, kind: ResourceKind) -> &str {
        self.versions
            .get(node_group)
            .and_then(|versions| versions.get(&kind))
            .map_or("", String::as_str)
    }

    /// Versions scoped to one node group
    pub fn for_node_group(&self, node_group: &str) -> EntityVersions {
        self.versions.get(node_group).cloned().unwrap_or_default()
    }

    pub fn node_groups(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.values().all(HashMap::is_empty)
    }
}
