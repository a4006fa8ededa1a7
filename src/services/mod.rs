//! Services layer
//!
//! Glue between the configuration store, the translators and the snapshot cache.

pub mod translation;

pub use translation::TranslationService;
