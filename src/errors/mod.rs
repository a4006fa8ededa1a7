//! # Error Handling
//!
//! Two classes of failure matter to callers of the translators:
//!
//! - fatal errors ([`DeltaplaneError::is_fatal`]) abort the whole translation call and
//!   nothing may be published for the batch;
//! - expected absence (an owner deleted in the same transaction) is never an error
//!   and simply produces no delta.

pub mod types;

pub use types::{DeltaplaneError, Result};
