//! Core types and utilities shared across the Bakeshop package directory.
//!
//! This crate carries the pieces every other Bakeshop crate needs:
//!
//! - **Errors**: the workspace-wide [`Error`] enum and [`Result`] alias.
//!   Leaf crates define richer error types and convert into these at the
//!   boundary.
//!
//! - **JSON**: thin sonic-rs wrappers in [`json`] for fast, consistent
//!   (de)serialization.
//!
//! - **Inflection**: the [`inflect`] module translates between the naming
//!   conventions the directory juggles - plural source names, singular
//!   model keys, underscored table names.
//!
//! ## Example
//!
//! ```
//! use bakeshop_core::inflect;
//!
//! assert_eq!(inflect::singularize("repositories"), "repository");
//! assert_eq!(inflect::tableize("Repository"), "repositories");
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod inflect;
pub mod json;

// Re-export main types
pub use error::{Error, Result};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
