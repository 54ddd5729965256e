//! GitHub REST datasource for the Bakeshop package directory.
//!
//! Answers ORM-style reads (`repository`, `user`, plus registered extras)
//! by resolving path templates against the GitHub v3 API, caching every
//! response for a configurable TTL, throttling fresh fetches, and
//! normalizing payloads into keyed records. Failures GitHub reports are
//! data, not errors: a missing repository reads as a failed outcome that
//! is cached and replayed like any payload.
//!
//! ```
//! use bakeshop_github::{GithubConfig, GithubSource};
//!
//! let source = GithubSource::new(GithubConfig::default()).unwrap();
//! assert_eq!(source.list_sources(), vec!["githubs", "issues", "repositories", "users"]);
//! assert!(source.describe("Repository").is_empty());
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod error;
pub mod record;
pub mod source;
pub mod template;
pub mod transport;

pub use cache::{CacheStats, CachedPayload, ResponseCache};
pub use config::{DEFAULT_CACHE_TTL, GithubConfig};
pub use error::{Result, SourceError};
pub use record::{
    DomainRecord, GithubIssue, GithubRepository, GithubUser, NormalizedRecord, model_name,
    normalize,
};
pub use source::{
    FailureKind, FetchFailure, FinderCall, GithubSource, ORM_ONLY_FIELDS, ReadOutcome, SOURCES,
    Schema, SourceStats, dispatch,
};
pub use template::{ACTION_FIELD, PathTemplate, QueryTypeMap, RequestFields};
pub use transport::{ApiTransport, HttpTransport, RawResponse};

/// Crate version, surfaced in user agents and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
