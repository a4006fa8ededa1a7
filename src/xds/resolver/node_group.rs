//! Node groups, deployment versions and cluster visibility

use super::{
    emit_cluster_by_id, emit_node_group_routing, emit_routes, DeltaSink, ResolveContext, Target,
};
use crate::domain::{ClusterNodeGroup, DeploymentVersion, MicroserviceVersion, NodeGroup};
use crate::errors::Result;
use crate::storage::ChangeRecord;
use std::collections::HashSet;
use tracing::debug;

/// A new node group gets its runtime layer and all its routing resources. Later
/// edits matter only when they change the gateway type.
pub(super) fn node_group(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let current = record.current_as::<NodeGroup>()?;

    if record.is_delete() {
        debug!(node_group = %current.name, "Node group removed, nothing to publish");
        return Ok(());
    }

    if record.is_create() {
        sink.emit(Target::Runtime { node_group: current.name.clone() });
        return emit_node_group_routing(ctx, &current.name, sink);
    }

    let gateway_changed = record
        .before_as::<NodeGroup>()?
        .is_some_and(|before| before.gateway_type != current.gateway_type);
    if gateway_changed {
        emit_node_group_routing(ctx, &current.name, sink)?;
    }
    Ok(())
}

pub(super) fn deployment_version(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let version = &record.current_as::<DeploymentVersion>()?.version;

    let mut clusters = HashSet::new();
    for endpoint in ctx.repo.find_endpoints_by_deployment_version(version)? {
        if clusters.insert(endpoint.cluster_id) {
            emit_cluster_by_id(ctx, endpoint.cluster_id, sink)?;
        }
    }

    let routes = ctx.repo.find_routes_by_deployment_version(version)?;
    emit_routes(ctx, &routes, sink)
}

/// Route configurations carrying routes of this microservice in its deployment version
pub(super) fn microservice_version(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let microservice = record.current_as::<MicroserviceVersion>()?;
    let family = microservice.family_key();

    let routes = ctx.repo.find_routes_by_deployment_version(&microservice.deployment_version)?;
    emit_routes(ctx, routes.iter().filter(|route| route.cluster_family() == family), sink)
}

/// Cluster visibility changed in one node group.
///
/// The cluster is re-rendered for that node group while it exists; once it is gone
/// as part of the same batch it is deleted there instead. Routing resources of the
/// node group follow either way since they may reference the cluster.
pub(super) fn cluster_node_group(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let join = record.current_as::<ClusterNodeGroup>()?;

    match ctx.repo.find_cluster_by_id(join.cluster_id)? {
        Some(cluster) => sink.emit(Target::Cluster {
            node_group: join.node_group.clone(),
            cluster,
            delete: false,
        }),
        None => match ctx.batch.deleted_cluster(join.cluster_id) {
            Some(cluster) => sink.emit(Target::Cluster {
                node_group: join.node_group.clone(),
                cluster: cluster.clone(),
                delete: true,
            }),
            None => debug!(cluster_id = %join.cluster_id, "Joined cluster no longer exists"),
        },
    }

    emit_node_group_routing(ctx, &join.node_group, sink)
}
