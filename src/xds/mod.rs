//! # Configuration delta translation
//!
//! Turns committed store changes into per-node-group snapshot actions.
//!
//! - [`resolver`] walks entity relationships up to the composite resources a change
//!   must be re-published to
//! - [`parser`] translates the changes of a single node group
//! - [`composite`] translates global change events and full reloads for many
//!   node groups at once
//! - [`action`], [`factory`], [`snapshot`] and [`version`] make up the delta model
//! - [`cache`] keeps the last published snapshot per node group

pub mod action;
pub mod cache;
pub mod composite;
pub mod factory;
pub mod parser;
pub mod resolver;
pub mod snapshot;
pub mod version;

pub use action::{
    ActionsMap, CompositeUpdateAction, DeleteAllByKind, GranularEntityUpdate,
    SnapshotUpdateAction,
};
pub use cache::{SnapshotCache, SnapshotUpdate};
pub use composite::{ChangeEvent, CompositeUpdateBuilder, ReloadEntry, ReloadRequest};
pub use factory::{UpdateActionFactory, DEFAULT_RUNTIME_LAYER_NAME};
pub use parser::{ChangeEventParser, NodeGroupChangeEvent};
pub use resolver::{BatchIndex, DeltaSink, ResolveContext, Resolver, ResolverRegistry, Target};
pub use snapshot::{EntityKey, ResourceEntity, ResourceSet, RuntimeLayer, Snapshot};
pub use version::{EntityVersions, VersionRegistry};
