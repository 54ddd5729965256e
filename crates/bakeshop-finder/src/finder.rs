//! The `index` finder: facets in, enriched query out.
//!
//! [`find_index`] is a pure transformation. It never executes anything;
//! it marks the package result shape, settles ordering, and folds each
//! requested facet into joins and predicates on the supplied query.
//! Facets that cannot be honored (unknown capability, unparseable date)
//! are skipped with a debug log rather than failing the listing.

use crate::options::IndexOptions;
use crate::query::{
    AssociationMatch, CompareOp, JoinCondition, PackageQuery, Predicate, ResultShape, SqlValue,
};
use bakeshop_core::inflect;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

/// Capability tags a package can be filtered on.
pub const VALID_TYPES: [&str; 15] = [
    "model",
    "controller",
    "view",
    "behavior",
    "component",
    "helper",
    "shell",
    "theme",
    "datasource",
    "lib",
    "test",
    "vendor",
    "app",
    "config",
    "resource",
];

/// Build the package index listing query.
///
/// Always orders: unrecognized sort fields fall back to the maintainer
/// username, unrecognized directions to descending. Numeric facets add
/// threshold predicates; version, capability, and keyword facets join
/// through the tag table (one `Tagged` join shared by all of them, one
/// tags join per facet value); category restricts through an association
/// match; free text adds an OR group of substring matches. An empty
/// options bag yields the plain ordered listing.
#[must_use]
pub fn find_index(query: PackageQuery, options: &IndexOptions) -> PackageQuery {
    let mut query = query.find(ResultShape::Package);

    let direction = options.sort_direction();
    let sort = options.sort_field();
    let order_column = if sort == "username" {
        "Maintainers.username".to_string()
    } else {
        format!("Packages.{sort}")
    };
    query = query.order_by(order_column, direction);

    if let Some(minimum) = options.collaborators {
        query = query.and_where(threshold("Packages.collaborators", CompareOp::GtEq, minimum));
    }
    if let Some(minimum) = options.contributors {
        query = query.and_where(threshold("Packages.contributors", CompareOp::GtEq, minimum));
    }
    if let Some(minimum) = options.forks {
        query = query.and_where(threshold("Packages.forks", CompareOp::GtEq, minimum));
    }
    if let Some(maximum) = options.open_issues {
        query = query.and_where(threshold("Packages.open_issues", CompareOp::LtEq, maximum));
    }

    if options.wants_tags() {
        query = query.inner_join(
            "Tagged",
            "tagged",
            vec![JoinCondition::Column {
                column: "foreign_key".to_string(),
                other: "Packages.id".to_string(),
            }],
        );
    }

    if let Some(version) = options.version_facet() {
        let keyname = version.replace(".x", "").replace('.', "");
        query = query.inner_join("Tags", "tags", tag_conditions("version", &keyname));
    }

    for capability in &options.has {
        let keyname = inflect::singularize(&capability.to_lowercase());
        if VALID_TYPES.contains(&keyname.as_str()) {
            query = query.inner_join("Tags", "tags", tag_conditions("has", &keyname));
        } else {
            debug!(capability = %capability, "skipping unrecognized capability facet");
        }
    }

    for keyword in &options.keyword {
        query = query.inner_join("Tags", "tags", tag_conditions("keyword", keyword));
    }

    if let Some(category) = options.category.as_deref().filter(|slug| !slug.is_empty()) {
        query = query.matching(AssociationMatch {
            association: "Categories".to_string(),
            table: "categories".to_string(),
            on: vec![JoinCondition::Column {
                column: "id".to_string(),
                other: "Packages.category_id".to_string(),
            }],
            conditions: vec![Predicate::Compare {
                column: "Categories.slug".to_string(),
                op: CompareOp::Eq,
                value: SqlValue::Text(category.to_string()),
            }],
        });
    }

    if let Some(term) = &options.query {
        let pattern = format!("%{term}%");
        query = query.and_where(Predicate::Any(vec![
            like("Packages.name", &pattern),
            like("Packages.description", &pattern),
            like("Maintainers.username", &pattern),
        ]));
    }

    if let Some(since) = &options.since {
        match parse_since(since) {
            Some(time) => {
                query = query.and_where(Predicate::Compare {
                    column: "Packages.last_pushed_at".to_string(),
                    op: CompareOp::Gt,
                    value: SqlValue::Timestamp(time),
                });
            }
            None => debug!(since = %since, "skipping unparseable recency filter"),
        }
    }

    if let Some(minimum) = options.watchers {
        query = query.and_where(threshold("Packages.watchers", CompareOp::GtEq, minimum));
    }

    query
}

fn threshold(column: &str, op: CompareOp, value: i64) -> Predicate {
    Predicate::Compare {
        column: column.to_string(),
        op,
        value: SqlValue::Int(value),
    }
}

fn like(column: &str, pattern: &str) -> Predicate {
    Predicate::Like {
        column: column.to_string(),
        pattern: pattern.to_string(),
    }
}

fn tag_conditions(identifier: &str, keyname: &str) -> Vec<JoinCondition> {
    vec![
        JoinCondition::Column {
            column: "id".to_string(),
            other: "Tagged.tag_id".to_string(),
        },
        JoinCondition::Value {
            column: "keyname".to_string(),
            value: SqlValue::Text(keyname.to_string()),
        },
        JoinCondition::Value {
            column: "identifier".to_string(),
            value: SqlValue::Text(identifier.to_string()),
        },
    ]
}

/// Parse the recency filter: RFC 3339, `Y-m-d H:M:S`, or bare `Y-m-d`.
fn parse_since(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(time.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
