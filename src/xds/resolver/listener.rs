//! Listeners and their filters

use super::{DeltaSink, ResolveContext, Target};
use crate::domain::{ExtAuthzFilter, Listener, ListenerId, ListenerWasmFilter, WasmFilter};
use crate::errors::Result;
use crate::storage::ChangeRecord;
use tracing::debug;

pub(super) fn listener(
    _ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let listener = record.current_as::<Listener>()?.clone();
    sink.emit(Target::Listener { listener, delete: record.is_delete() });
    Ok(())
}

pub(super) fn wasm_filter(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let filter = record.current_as::<WasmFilter>()?;
    for join in ctx.repo.find_listener_wasm_filters_by_wasm_filter(filter.id)? {
        emit_listener_by_id(ctx, join.listener_id, sink)?;
    }
    Ok(())
}

pub(super) fn listener_wasm_filter(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    emit_listener_by_id(ctx, record.current_as::<ListenerWasmFilter>()?.listener_id, sink)
}

/// Ext-authz filters are attached to every listener of their node group
pub(super) fn ext_authz_filter(
    ctx: &ResolveContext<'_>,
    record: &ChangeRecord,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    let filter = record.current_as::<ExtAuthzFilter>()?;
    for listener in ctx.repo.find_listeners_by_node_group(&filter.node_group)? {
        sink.emit(Target::Listener { listener, delete: false });
    }
    Ok(())
}

fn emit_listener_by_id(
    ctx: &ResolveContext<'_>,
    id: ListenerId,
    sink: &mut dyn DeltaSink,
) -> Result<()> {
    match ctx.repo.find_listener_by_id(id)? {
        Some(listener) => sink.emit(Target::Listener { listener, delete: false }),
        None => debug!(listener_id = %id, "Owning listener no longer exists"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::domain::*;
    use crate::storage::test_helpers::*;
    use crate::storage::{ChangeRecord, InMemoryStore};

    fn wasm_filter(id: i64) -> WasmFilter {
        WasmFilter {
            id: WasmFilterId::new(id),
            name: format!("filter{id}"),
            url: "https://filters.example.com/auth.wasm".to_string(),
            sha256: "ab".repeat(32),
            timeout_ms: 5000,
        }
    }

    #[test]
    fn test_listener_delete_shape() {
        let store = topology();
        let changes = changes_of(vec![ChangeRecord::deleted(listener(300, "ng1"))]);

        assert_eq!(
            labels(&resolve_all(&store, &changes).unwrap()),
            vec!["Listener:ng1:listener300:delete"]
        );
    }

    #[test]
    fn test_wasm_filter_reaches_joined_listeners() {
        let mut entities = topology_entities();
        entities.push(wasm_filter(1).into());
        entities.push(
            ListenerWasmFilter { listener_id: ListenerId::new(400), wasm_filter_id: WasmFilterId::new(1) }
                .into(),
        );
        let store = InMemoryStore::with_entities(entities);

        let mut after = wasm_filter(1);
        after.timeout_ms = 1000;
        let changes = changes_of(vec![ChangeRecord::updated(wasm_filter(1), after)]);

        assert_eq!(
            labels(&resolve_all(&store, &changes).unwrap()),
            vec!["Listener:ng2:listener400"]
        );
    }

    #[test]
    fn test_listener_wasm_filter_join_reaches_its_listener() {
        let store = topology();
        let join =
            ListenerWasmFilter { listener_id: ListenerId::new(300), wasm_filter_id: WasmFilterId::new(1) };
        let orphan =
            ListenerWasmFilter { listener_id: ListenerId::new(999), wasm_filter_id: WasmFilterId::new(1) };
        let changes = changes_of(vec![ChangeRecord::created(join), ChangeRecord::deleted(orphan)]);

        assert_eq!(
            labels(&resolve_all(&store, &changes).unwrap()),
            vec!["Listener:ng1:listener300"]
        );
    }

    #[test]
    fn test_unjoined_wasm_filter_is_silent() {
        let store = topology();
        let changes = changes_of(vec![ChangeRecord::created(wasm_filter(1))]);

        assert!(resolve_all(&store, &changes).unwrap().is_empty());
    }

    #[test]
    fn test_ext_authz_filter_reaches_node_group_listeners() {
        let store = topology();
        let filter = ExtAuthzFilter {
            name: "authz".to_string(),
            node_group: "ng1".to_string(),
            cluster_name: "authz||authz||9000".to_string(),
            timeout_ms: 200,
        };
        let changes = changes_of(vec![ChangeRecord::created(filter)]);

        assert_eq!(
            labels(&resolve_all(&store, &changes).unwrap()),
            vec!["Listener:ng1:listener300"]
        );
    }
}
