//! Change records emitted by committed write transactions

use crate::domain::{Entity, Table, TableEntity};
use crate::errors::{DeltaplaneError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Change records grouped by table.
///
/// Tables are visited in their declaration order; records of one table keep the
/// order in which the store committed them.
pub type ChangeSet = BTreeMap<Table, Vec<ChangeRecord>>;

/// A single entity mutation.
///
/// A missing `before` marks a creation, a missing `after` marks a deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub table: Table,

    #[serde(default)]
    pub before: Option<Entity>,

    #[serde(default)]
    pub after: Option<Entity>,
}

impl ChangeRecord {
    pub fn created(entity: impl Into<Entity>) -> Self {
        let entity = entity.into();
        Self { table: entity.table(), before: None, after: Some(entity) }
    }

    pub fn updated(before: impl Into<Entity>, after: impl Into<Entity>) -> Self {
        let after = after.into();
        Self { table: after.table(), before: Some(before.into()), after: Some(after) }
    }

    pub fn deleted(entity: impl Into<Entity>) -> Self {
        let entity = entity.into();
        Self { table: entity.table(), before: Some(entity), after: None }
    }

    pub fn is_create(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    pub fn is_delete(&self) -> bool {
        self.after.is_none()
    }

    /// The state resolvers work from: the after-state, or the before-state on deletion.
    pub fn current(&self) -> Result<&Entity> {
        self.after.as_ref().or(self.before.as_ref()).ok_or_else(|| {
            DeltaplaneError::invariant(format!(
                "Change record for table '{}' has neither before nor after state",
                self.table
            ))
        })
    }

    /// Typed view of [`ChangeRecord::current`].
    pub fn current_as<T: TableEntity>(&self) -> Result<&T> {
        self.cast(self.current()?)
    }

    pub fn before_as<T: TableEntity>(&self) -> Result<Option<&T>> {
        self.before.as_ref().map(|entity| self.cast(entity)).transpose()
    }

    pub fn after_as<T: TableEntity>(&self) -> Result<Option<&T>> {
        self.after.as_ref().map(|entity| self.cast(entity)).transpose()
    }

    fn cast<'a, T: TableEntity>(&self, entity: &'a Entity) -> Result<&'a T> {
        if self.table != T::table() {
            return Err(DeltaplaneError::invariant(format!(
                "Change record for table '{}' read as '{}'",
                self.table,
                T::table()
            )));
        }
        T::from_entity(entity).ok_or_else(|| {
            DeltaplaneError::invariant(format!(
                "Change record for table '{}' carries a '{}' payload",
                self.table,
                entity.table()
            ))
        })
    }
}

/// Group an ordered list of change records by table.
pub fn group_by_table(records: impl IntoIterator<Item = ChangeRecord>) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for record in records {
        changes.entry(record.table.clone()).or_default().push(record);
    }
    changes
}
