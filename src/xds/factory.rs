//! Update action factory
//!
//! Shapes the granular delta for each composite resource kind. An empty target
//! version means the node group does not track the kind: no delta is produced.

use super::action::GranularEntityUpdate;
use super::snapshot::{ResourceEntity, RuntimeLayer};
use crate::domain::{Cluster, Listener, RouteConfiguration};
use tracing::trace;

/// Default name of the single runtime layer each node group carries
pub const DEFAULT_RUNTIME_LAYER_NAME: &str = "rtds_layer0";

#[derive(Debug, Clone)]
pub struct UpdateActionFactory {
    runtime_layer_name: String,
}

impl Default for UpdateActionFactory {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME_LAYER_NAME)
    }
}

impl UpdateActionFactory {
    pub fn new(runtime_layer_name: impl Into<String>) -> Self {
        Self { runtime_layer_name: runtime_layer_name.into() }
    }

    pub fn cluster_update(
        &self,
        node_group: &str,
        version: &str,
        cluster: &Cluster,
    ) -> Option<GranularEntityUpdate> {
        self.build(node_group, version, ResourceEntity::Cluster(cluster.clone()), false)
    }

    pub fn cluster_delete(
        &self,
        node_group: &str,
        version: &str,
        cluster: &Cluster,
    ) -> Option<GranularEntityUpdate> {
        self.build(node_group, version, ResourceEntity::Cluster(cluster.clone()), true)
    }

    pub fn route_configuration_update(
        &self,
        node_group: &str,
        version: &str,
        route_configuration: &RouteConfiguration,
    ) -> Option<GranularEntityUpdate> {
        let entity = ResourceEntity::RouteConfiguration(route_configuration.clone());
        self.build(node_group, version, entity, false)
    }

    pub fn route_configuration_delete(
        &self,
        node_group: &str,
        version: &str,
        route_configuration: &RouteConfiguration,
    ) -> Option<GranularEntityUpdate> {
        let entity = ResourceEntity::RouteConfiguration(route_configuration.clone());
        self.build(node_group, version, entity, true)
    }

    pub fn listener_update(
        &self,
        node_group: &str,
        version: &str,
        listener: &Listener,
    ) -> Option<GranularEntityUpdate> {
        self.build(node_group, version, ResourceEntity::Listener(listener.clone()), false)
    }

    pub fn listener_delete(
        &self,
        node_group: &str,
        version: &str,
        listener: &Listener,
    ) -> Option<GranularEntityUpdate> {
        self.build(node_group, version, ResourceEntity::Listener(listener.clone()), true)
    }

    /// Runtime layer update, keyed only by node group
    pub fn runtime_update(&self, node_group: &str, version: &str) -> Option<GranularEntityUpdate> {
        let layer = RuntimeLayer {
            name: self.runtime_layer_name.clone(),
            node_group: node_group.to_string(),
        };
        self.build(node_group, version, ResourceEntity::Runtime(layer), false)
    }

    fn build(
        &self,
        node_group: &str,
        version: &str,
        entity: ResourceEntity,
        is_delete: bool,
    ) -> Option<GranularEntityUpdate> {
        if version.is_empty() {
            trace!(
                node_group,
                resource_kind = %entity.resource_kind(),
                resource = entity.name(),
                "Resource kind not tracked by node group, skipping delta"
            );
            return None;
        }
        Some(if is_delete {
            GranularEntityUpdate::delete(version, entity)
        } else {
            GranularEntityUpdate::update(version, entity)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClusterId, LbPolicy, ListenerId, ResourceKind};

    fn cluster() -> Cluster {
        Cluster {
            id: ClusterId::new(5),
            name: "svc||svc||8080".to_string(),
            lb_policy: LbPolicy::RoundRobin,
            enable_h2: false,
            version: 1,
            tls_id: None,
            circuit_breaker_id: None,
            tcp_keepalive_id: None,
        }
    }

    #[test]
    fn test_empty_version_emits_nothing() {
        let factory = UpdateActionFactory::default();
        assert!(factory.cluster_update("ng1", "", &cluster()).is_none());
        assert!(factory.cluster_delete("ng1", "", &cluster()).is_none());
        assert!(factory.runtime_update("ng1", "").is_none());
    }

    #[test]
    fn test_update_and_delete_shapes() {
        let factory = UpdateActionFactory::default();
        let update = factory.cluster_update("ng1", "7", &cluster()).unwrap();
        assert!(!update.is_delete());
        assert_eq!(update.target_version(), "7");
        assert_eq!(update.resource_kind(), ResourceKind::Cluster);

        let listener = Listener {
            id: ListenerId::new(1),
            name: "ng1-listener".to_string(),
            node_group: "ng1".to_string(),
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8080,
            route_configuration_name: "ng1-routes".to_string(),
            with_tls: false,
            version: 1,
        };
        let delete = factory.listener_delete("ng1", "3", &listener).unwrap();
        assert!(delete.is_delete());
        assert_eq!(delete.resource_kind(), ResourceKind::Listener);
    }

    #[test]
    fn test_runtime_layer_naming() {
        let factory = UpdateActionFactory::new("custom_layer");
        let update = factory.runtime_update("ng1", "1").unwrap();
        assert_eq!(update.entity().name(), "custom_layer");
        assert_eq!(update.resource_kind(), ResourceKind::Runtime);
    }
}
