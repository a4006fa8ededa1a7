//! # Storage
//!
//! Seams to the transactional configuration store, plus an in-memory reference
//! implementation used by the CLI and the test suites.

pub mod change;
pub mod memory;
pub mod repository;

pub use change::{group_by_table, ChangeRecord, ChangeSet};
pub use memory::{InMemoryStore, MemoryWriteTx, StoreState};
pub use repository::{ConfigStore, Repository, WriteTransaction};

#[cfg(test)]
pub mod test_helpers;
