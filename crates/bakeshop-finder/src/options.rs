//! The facet surface of the package index.
//!
//! [`IndexOptions`] carries everything a listing request may ask for.
//! Every facet is optional; an empty bag produces the plain listing.
//! Sort field and direction resolve defensively since both arrive
//! straight from query strings.

use serde::Deserialize;

/// Sortable fields of the package index.
///
/// `username` lives on the maintainers association; the rest are columns
/// of the packages table itself.
pub const VALID_ORDERS: [&str; 10] = [
    "username",
    "name",
    "created",
    "modified",
    "collaborators",
    "contributors",
    "forks",
    "open_issues",
    "watchers",
    "last_pushed_at",
];

/// Resolved sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending, the listing default.
    #[default]
    Desc,
}

impl SortDirection {
    /// Resolve a raw direction string.
    ///
    /// Case-insensitive; the common typos `dsc` and `des` normalize to
    /// `desc`, and anything else that is not `asc` falls back to `desc`,
    /// as does an absent or empty value.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|value| !value.is_empty()) else {
            return Self::Desc;
        };
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Self::Asc,
            "desc" | "dsc" | "des" => Self::Desc,
            _ => Self::Desc,
        }
    }

    /// Lowercase form, the shape the option surface uses.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// SQL keyword form.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Facets accepted by the package index listing.
///
/// Deserializable so a query-string layer can populate it directly;
/// absent keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Minimum collaborator count.
    pub collaborators: Option<i64>,
    /// Minimum contributor count.
    pub contributors: Option<i64>,
    /// Minimum fork count.
    pub forks: Option<i64>,
    /// Capability tags a package must carry, e.g. `behavior`, `helper`.
    pub has: Vec<String>,
    /// Free-form keyword tags a package must carry.
    pub keyword: Vec<String>,
    /// Maximum open issue count.
    pub open_issues: Option<i64>,
    /// Free-text search over name, description, and maintainer.
    pub query: Option<String>,
    /// Only packages pushed strictly after this date or datetime.
    pub since: Option<String>,
    /// Framework version tag, e.g. `2.x` or `1.3`.
    pub version: Option<String>,
    /// Minimum watcher count.
    pub watchers: Option<i64>,
    /// Category slug to restrict to.
    pub category: Option<String>,
    /// Sort field, checked against [`VALID_ORDERS`].
    pub sort: Option<String>,
    /// Sort direction, resolved by [`SortDirection::parse`].
    pub direction: Option<String>,
}

impl IndexOptions {
    /// Resolved sort direction.
    #[must_use]
    pub fn sort_direction(&self) -> SortDirection {
        SortDirection::parse(self.direction.as_deref())
    }

    /// Resolved sort field, falling back to `username`.
    ///
    /// Matching is case-insensitive; unrecognized fields never reach the
    /// ORDER BY clause.
    #[must_use]
    pub fn sort_field(&self) -> &'static str {
        let Some(raw) = self.sort.as_deref().filter(|value| !value.is_empty()) else {
            return "username";
        };
        let lowered = raw.to_ascii_lowercase();
        VALID_ORDERS
            .iter()
            .find(|field| **field == lowered)
            .copied()
            .unwrap_or("username")
    }

    /// Requested framework version, when non-empty.
    #[must_use]
    pub fn version_facet(&self) -> Option<&str> {
        self.version.as_deref().filter(|value| !value.is_empty())
    }

    /// Whether any facet stored in the tag table is requested.
    #[must_use]
    pub fn wants_tags(&self) -> bool {
        self.version_facet().is_some() || !self.has.is_empty() || !self.keyword.is_empty()
    }
}
