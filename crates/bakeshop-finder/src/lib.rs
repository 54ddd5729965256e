//! Faceted search for the Bakeshop package index.
//!
//! Turns an [`IndexOptions`] facet bag (thresholds, capability and
//! keyword tags, framework version, category, free text, recency, sort)
//! into an enriched [`PackageQuery`], then renders it as a parameterized
//! PostgreSQL SELECT. Building and rendering are pure; nothing here
//! touches a database.
//!
//! ```
//! use bakeshop_finder::{IndexOptions, PackageQuery, find_index};
//!
//! let spec = find_index(PackageQuery::new(), &IndexOptions::default()).finish();
//! let (sql, values) = spec.to_sql();
//!
//! assert!(sql.ends_with("ORDER BY Maintainers.username DESC"));
//! assert!(values.is_empty());
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod finder;
pub mod options;
pub mod query;

pub use finder::{VALID_TYPES, find_index};
pub use options::{IndexOptions, SortDirection, VALID_ORDERS};
pub use query::{
    AssociationMatch, CompareOp, JoinClause, JoinCondition, OrderClause, PackageQuery, Predicate,
    QuerySpec, ResultShape, SqlValue,
};

/// Crate version, surfaced in diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
