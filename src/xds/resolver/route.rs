//! Route configurations and everything rendered into them

use super::{
    emit_cluster, emit_route_by_id, emit_route_configuration_by_id, emit_routes,
    emit_routes_targeting_cluster, emit_virtual_host_by_id, route_configurations_of_routes,
    DeltaSink, ResolveContext, Target,
};
use crate::domain::{
    family_key, family_of, HashPolicy, HeaderMatcher, RateLimit, RetryPolicy, Route,
    RouteConfiguration, StatefulSession, VirtualHost, VirtualHostDomain,
};
use crate::errors::Result;
use crate::storage::ChangeRecord;
use std::collections::HashSet;
use tracing::debug;

pub(super) fn route_configuration(
    _ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let route_configuration = record.current_as::<RouteConfiguration>()?.clone();
    sink.emit(Target::RouteConfiguration { route_configuration, delete: record.is_delete() });
    Ok(())
}

pub(super) fn virtual_host(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let virtual_host = record.current_as::<VirtualHost>()?;
    emit_route_configuration_by_id(ctx, virtual_host.route_configuration_id, sink)
}

pub(super) fn virtual_host_domain(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    emit_virtual_host_by_id(ctx, record.current_as::<VirtualHostDomain>()?.virtual_host_id, sink)
}

pub(super) fn route(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    emit_routes(ctx, [record.current_as::<Route>()?], sink)
}

pub(super) fn header_matcher(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    emit_route_by_id(ctx, record.current_as::<HeaderMatcher>()?.route_id, sink)
}

pub(super) fn retry_policy(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    emit_route_by_id(ctx, record.current_as::<RetryPolicy>()?.route_id, sink)
}

/// Hash policies bind to a route, an endpoint, or both; each binding resolves on
/// its own. Endpoint-bound policies are rendered into the endpoint's cluster and
/// into every route configuration routing to that cluster.
pub(super) fn hash_policy(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let policy = record.current_as::<HashPolicy>()?;

    if let Some(route_id) = policy.route_id {
        emit_route_by_id(ctx, route_id, sink)?;
    }

    if let Some(endpoint_id) = policy.endpoint_id {
        let Some(endpoint) = ctx.repo.find_endpoint_by_id(endpoint_id)? else {
            debug!(endpoint_id = %endpoint_id, "Owning endpoint no longer exists");
            return Ok(());
        };
        let Some(cluster) = ctx.repo.find_cluster_by_id(endpoint.cluster_id)? else {
            debug!(cluster_id = %endpoint.cluster_id, "Owning cluster no longer exists");
            return Ok(());
        };
        emit_cluster(ctx, &cluster, false, sink)?;
        emit_routes_targeting_cluster(ctx, &cluster.name, sink)?;
    }
    Ok(())
}

pub(super) fn rate_limit(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let name = &record.current_as::<RateLimit>()?.name;

    for virtual_host in ctx.repo.find_virtual_hosts_by_rate_limit(name)? {
        emit_route_configuration_by_id(ctx, virtual_host.route_configuration_id, sink)?;
    }
    let routes = ctx.repo.find_routes_by_rate_limit(name)?;
    emit_routes(ctx, &routes, sink)
}

/// Route configurations affected by a stateful session, limited to the session's
/// gateways when it names any.
pub(super) fn stateful_session(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let session = record.current_as::<StatefulSession>()?;
    let routes = session_routes(ctx, session)?;

    for route_configuration in route_configurations_of_routes(ctx, &routes)? {
        if session.applies_to(&route_configuration.node_group) {
            sink.emit(Target::RouteConfiguration { route_configuration, delete: false });
        } else {
            debug!(
                session_id = %session.id,
                node_group = %route_configuration.node_group,
                "Node group outside session gateways"
            );
        }
    }
    Ok(())
}

/// Routes bound to a session. Bindings are tried in order (routes, endpoints, then
/// the microservice family) and the first one that matches anything wins.
fn session_routes(ctx: &ResolveContext<'_>, session: &StatefulSession) -> Result<Vec<Route>> {
    let routes = ctx.repo.find_routes_by_stateful_session(session.id)?;
    if !routes.is_empty() {
        return Ok(routes);
    }

    let endpoints = ctx.repo.find_endpoints_by_stateful_session(session.id)?;
    if !endpoints.is_empty() {
        let mut clusters = HashSet::new();
        let mut routes = Vec::new();
        for endpoint in endpoints {
            if !clusters.insert(endpoint.cluster_id) {
                continue;
            }
            if let Some(cluster) = ctx.repo.find_cluster_by_id(endpoint.cluster_id)? {
                routes.extend(ctx.repo.find_routes_by_cluster_name(&cluster.name)?);
            }
        }
        return Ok(routes);
    }

    if session.cluster_name.is_empty() {
        return Ok(Vec::new());
    }
    let family = family_key(family_of(&session.cluster_name), &session.namespace);
    Ok(ctx
        .repo
        .find_all_routes()?
        .into_iter()
        .filter(|route| route.cluster_family() == family)
        .collect())
}
