//! Fixture files driving the `translate` and `reload` commands
//!
//! A fixture holds the committed store content (`seed`), plus either the change
//! records of the transaction that produced it (`event`) or reload entries.
//! Entities are externally tagged by kind:
//!
//! ```yaml
//! seed:
//!   - NodeGroup: { name: ng1, gateway_type: INGRESS }
//!   - EnvoyConfigVersion: { node_group: ng1, entity_type: Cluster, version: 3 }
//! event:
//!   - table: clusters_node_groups
//!     before: { ClusterNodeGroup: { cluster_id: 5, node_group: ng1 } }
//! reload:
//!   - { node_group: ng1, resource_kind: Cluster, version: v5 }
//! ```

use crate::domain::Entity;
use crate::errors::{DeltaplaneError, Result};
use crate::storage::{group_by_table, ChangeRecord, InMemoryStore};
use crate::xds::{ChangeEvent, ReloadEntry, ReloadRequest};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub seed: Vec<Entity>,
    pub event: Vec<ChangeRecord>,
    pub reload: Vec<ReloadEntry>,
}

impl Fixture {
    /// Read a YAML (or JSON) fixture
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeltaplaneError::Io {
            source: e,
            context: format!("Failed to read fixture '{}'", path.display()),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn store(&self) -> InMemoryStore {
        InMemoryStore::with_entities(self.seed.iter().cloned())
    }

    pub fn change_event(&self) -> Result<ChangeEvent> {
        if self.event.is_empty() {
            return Err(DeltaplaneError::validation_field("Fixture has no event records", "event"));
        }
        Ok(ChangeEvent::new(group_by_table(self.event.iter().cloned())))
    }

    pub fn reload_request(&self) -> Result<ReloadRequest> {
        if self.reload.is_empty() {
            return Err(DeltaplaneError::validation_field("Fixture has no reload entries", "reload"));
        }
        Ok(ReloadRequest { entries: self.reload.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GatewayType, ResourceKind, Table};
    use std::io::Write;

    const FIXTURE: &str = r#"
seed:
  - NodeGroup: { name: ng1, gateway_type: INGRESS }
  - EnvoyConfigVersion: { node_group: ng1, entity_type: Cluster, version: 3 }
event:
  - table: clusters_node_groups
    before: { ClusterNodeGroup: { cluster_id: 5, node_group: ng1 } }
reload:
  - { node_group: ng1, resource_kind: Cluster, version: v5 }
"#;

    #[test]
    fn test_parse_fixture() {
        let fixture = Fixture::parse(FIXTURE).unwrap();
        assert_eq!(fixture.seed.len(), 2);
        assert!(matches!(
            &fixture.seed[0],
            Entity::NodeGroup(group) if group.gateway_type == GatewayType::Ingress
        ));

        let event = fixture.change_event().unwrap();
        let records = &event.changes[&Table::ClusterNodeGroup];
        assert!(records[0].is_delete());

        let request = fixture.reload_request().unwrap();
        assert_eq!(request.entries[0].resource_kind, ResourceKind::Cluster);
    }

    #[test]
    fn test_gateway_type_is_upper_case() {
        let err = Fixture::parse("seed:\n  - NodeGroup: { name: ng1, gateway_type: ingress }\n")
            .unwrap_err();
        assert!(matches!(err, DeltaplaneError::Yaml { .. }));
    }

    #[test]
    fn test_load_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", FIXTURE).unwrap();

        let fixture = Fixture::load(file.path()).unwrap();
        assert_eq!(fixture.store().snapshot().unwrap().len(&Table::NodeGroup), 1);
    }

    #[test]
    fn test_missing_sections() {
        let fixture = Fixture::parse("seed: []").unwrap();
        assert!(fixture.change_event().is_err());
        assert!(fixture.reload_request().is_err());
    }
}
