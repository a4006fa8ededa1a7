//! Clusters and the leaf entities rendered into them

use super::{
    emit_cluster, emit_cluster_by_id, emit_clusters_matching, DeltaSink, ResolveContext, Target,
};
use crate::domain::{
    CircuitBreaker, Cluster, Endpoint, HealthCheck, TcpKeepalive, Threshold, TlsConfig,
    TlsConfigNodeGroup,
};
use crate::errors::Result;
use crate::storage::ChangeRecord;
use std::collections::HashSet;

pub(super) fn cluster(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let cluster = record.current_as::<Cluster>()?;
    emit_cluster(ctx, cluster, record.is_delete(), sink)
}

pub(super) fn endpoint(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    emit_cluster_by_id(ctx, record.current_as::<Endpoint>()?.cluster_id, sink)
}

pub(super) fn health_check(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    emit_cluster_by_id(ctx, record.current_as::<HealthCheck>()?.cluster_id, sink)
}

pub(super) fn circuit_breaker(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let id = record.current_as::<CircuitBreaker>()?.id;
    emit_clusters_matching(ctx, |cluster| cluster.circuit_breaker_id == Some(id), sink)
}

/// Thresholds reach clusters through every circuit breaker using them
pub(super) fn threshold(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let id = record.current_as::<Threshold>()?.id;
    let breakers: HashSet<_> = ctx
        .repo
        .find_all_circuit_breakers()?
        .into_iter()
        .filter(|breaker| breaker.threshold_id == id)
        .map(|breaker| breaker.id)
        .collect();
    if breakers.is_empty() {
        return Ok(());
    }
    emit_clusters_matching(
        ctx,
        |cluster| cluster.circuit_breaker_id.is_some_and(|cb| breakers.contains(&cb)),
        sink,
    )
}

pub(super) fn tcp_keepalive(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let id = record.current_as::<TcpKeepalive>()?.id;
    emit_clusters_matching(ctx, |cluster| cluster.tcp_keepalive_id == Some(id), sink)
}

/// Clusters referencing the configuration explicitly, everywhere they are visible,
/// plus clusters without explicit TLS in every node group bound to it.
pub(super) fn tls_config(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let id = record.current_as::<TlsConfig>()?.id;
    emit_clusters_matching(ctx, |cluster| cluster.tls_id == Some(id), sink)?;

    for node_group in ctx.repo.find_node_groups_by_tls_config(id)? {
        emit_policy_clusters(ctx, &node_group, sink)?;
    }
    Ok(())
}

pub(super) fn tls_config_node_group(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let binding = record.current_as::<TlsConfigNodeGroup>()?;
    emit_policy_clusters(ctx, &binding.node_group, sink)
}

/// Clusters of `node_group` that inherit the node-group TLS policy
fn emit_policy_clusters(
    ctx: &ResolveContext<'_>,
    node_group: &str,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    for cluster in ctx.repo.find_clusters_by_node_group(node_group)? {
        if cluster.tls_id.is_none() {
            sink.emit(Target::Cluster { node_group: node_group.to_string(), cluster, delete: false });
        }
    }
    Ok(())
}
