//! # Deltaplane
//!
//! Incremental change-to-configuration-delta translation for a proxy control plane.
//!
//! Managed proxies are grouped into node groups, each holding one versioned
//! snapshot of clusters, route configurations, listeners and a runtime layer. Every
//! committed store transaction yields ordered change records; deltaplane walks the
//! entity relationships behind each record up to the composite resources that embed
//! it and produces, per node group, one snapshot action carrying the minimal set of
//! deltas at the externally supplied versions.
//!
//! ## Architecture
//!
//! ```text
//! ConfigStore ──change records──▶ Dependency Resolver ──targets──▶ Translator
//!                                                                     │
//!                                  SnapshotCache ◀──SnapshotUpdateAction
//! ```
//!
//! ## Core Components
//!
//! - **Storage**: repository and transaction seams plus an in-memory store
//! - **Resolver**: one resolution function per entity kind
//! - **Translators**: single-node-group parser and multi-node-group composite builder
//! - **Snapshot cache**: last published snapshot per node group with update broadcast
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use deltaplane::{
//!     config::TranslationConfig, services::TranslationService, storage::InMemoryStore,
//!     xds::SnapshotCache, Result,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let service = TranslationService::new(
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(SnapshotCache::default()),
//!         &TranslationConfig::default(),
//!     );
//!     let published = service.commit_and_publish(|_tx| Ok(()))?;
//!     println!("{} node groups updated", published.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;
pub mod xds;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{DeltaplaneError, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
