//! Shared utilities.

pub mod validate;

pub use validate::{ValidatedJson, ValidatedQuery};
