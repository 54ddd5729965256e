//! Query builder for the package index.
//!
//! [`PackageQuery`] accumulates joins, predicates, association matches,
//! and ordering, then [`PackageQuery::finish`] seals them into a
//! [`QuerySpec`]. The builder owns two invariants: a join identical to
//! one already present is never added twice, and a second join wanting a
//! taken alias gets the next numbered one (`Tags`, `Tags2`, ...). Join
//! conditions name the joined table's columns without the alias prefix,
//! so renumbering an alias never rewrites a condition.
//!
//! [`QuerySpec::to_sql`] renders a parameterized PostgreSQL SELECT.
//! Every user-supplied value is bound as a `$n` placeholder and carried
//! out-of-band; nothing user-controlled lands in the SQL text.

use crate::options::SortDirection;

/// A value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer threshold.
    Int(i64),
    /// Text such as a tag keyname or LIKE pattern.
    Text(String),
    /// UTC timestamp.
    Timestamp(chrono::DateTime<chrono::Utc>),
}

/// Comparison operator of a [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `>=`
    GtEq,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
}

impl CompareOp {
    /// SQL operator text.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
            Self::Gt => ">",
        }
    }
}

/// A WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> $n`.
    Compare {
        /// Qualified column, e.g. `Packages.forks`.
        column: String,
        /// Comparison operator.
        op: CompareOp,
        /// Bound value.
        value: SqlValue,
    },
    /// `column LIKE $n`.
    Like {
        /// Qualified column.
        column: String,
        /// Pattern including any `%` wrapping.
        pattern: String,
    },
    /// Disjunction: `(p1 OR p2 OR ...)`.
    Any(Vec<Predicate>),
}

/// One condition of a join's ON clause.
///
/// Columns of the joined table are named bare; the renderer prefixes the
/// join's alias. Columns of other tables stay fully qualified in `other`.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// `<alias>.column = other`.
    Column {
        /// Column on the joined table.
        column: String,
        /// Qualified column it must equal.
        other: String,
    },
    /// `<alias>.column = $n`.
    Value {
        /// Column on the joined table.
        column: String,
        /// Bound value.
        value: SqlValue,
    },
}

/// An INNER JOIN accumulated by the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// Alias the join is known by, unique within the query.
    pub alias: String,
    /// Joined table name.
    pub table: String,
    /// ON conditions, conjunctive.
    pub on: Vec<JoinCondition>,
}

/// An association restricted by a sub-filter, e.g. categories by slug.
///
/// Carries its own join shape, so the renderer needs no schema knowledge
/// of the association.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationMatch {
    /// Association alias, e.g. `Categories`.
    pub association: String,
    /// Association table name.
    pub table: String,
    /// ON conditions tying the association to the base table.
    pub on: Vec<JoinCondition>,
    /// Restrictions on the matched rows, folded into WHERE.
    pub conditions: Vec<Predicate>,
}

/// The single ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    /// Qualified column to order on.
    pub column: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Named result shape the host applies to rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultShape {
    /// Bare rows of the base table.
    #[default]
    All,
    /// Package rows with their maintainer joined in.
    Package,
}

/// Incrementally built package index query.
#[derive(Debug, Clone, Default)]
pub struct PackageQuery {
    shape: ResultShape,
    joins: Vec<JoinClause>,
    matches: Vec<AssociationMatch>,
    predicates: Vec<Predicate>,
    order: Option<OrderClause>,
}

impl PackageQuery {
    /// Start an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the result shape.
    #[must_use]
    pub fn find(mut self, shape: ResultShape) -> Self {
        self.shape = shape;
        self
    }

    /// Add an INNER JOIN.
    ///
    /// A join with the same table and conditions as an existing one is
    /// dropped. A fresh join whose alias is taken gets the next numbered
    /// alias instead; its conditions carry over untouched since they
    /// never name the alias.
    #[must_use]
    pub fn inner_join(
        mut self,
        alias: impl Into<String>,
        table: impl Into<String>,
        on: Vec<JoinCondition>,
    ) -> Self {
        let table = table.into();
        if self
            .joins
            .iter()
            .any(|join| join.table == table && join.on == on)
        {
            return self;
        }

        let base = alias.into();
        let mut candidate = base.clone();
        let mut suffix = 1u32;
        while self.joins.iter().any(|join| join.alias == candidate) {
            suffix += 1;
            candidate = format!("{base}{suffix}");
        }

        self.joins.push(JoinClause {
            alias: candidate,
            table,
            on,
        });
        self
    }

    /// Add a conjunctive WHERE predicate.
    #[must_use]
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Restrict through an association match.
    #[must_use]
    pub fn matching(mut self, association: AssociationMatch) -> Self {
        self.matches.push(association);
        self
    }

    /// Set the ORDER BY clause, replacing any earlier one.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.order = Some(OrderClause {
            column: column.into(),
            direction,
        });
        self
    }

    /// Seal the accumulated clauses.
    #[must_use]
    pub fn finish(self) -> QuerySpec {
        QuerySpec {
            shape: self.shape,
            joins: self.joins,
            matches: self.matches,
            predicates: self.predicates,
            order: self.order,
        }
    }

    /// Joins accumulated so far.
    #[must_use]
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    /// Predicates accumulated so far.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

/// A sealed query, ready to render.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Result shape.
    pub shape: ResultShape,
    /// INNER JOINs in accumulation order.
    pub joins: Vec<JoinClause>,
    /// Association matches in accumulation order.
    pub matches: Vec<AssociationMatch>,
    /// Conjunctive WHERE predicates in accumulation order.
    pub predicates: Vec<Predicate>,
    /// ORDER BY clause, when one was set.
    pub order: Option<OrderClause>,
}

impl QuerySpec {
    /// Render a parameterized SELECT.
    ///
    /// Renders joins, then association-match joins, then WHERE with the
    /// plain predicates followed by the match restrictions, then ORDER
    /// BY. Placeholders are numbered in render order and the returned
    /// values align with them one to one.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut values = Vec::new();
        let mut sql = String::from("SELECT Packages.* FROM packages Packages");

        if self.shape == ResultShape::Package {
            sql.push_str(
                " INNER JOIN maintainers Maintainers ON Maintainers.id = Packages.maintainer_id",
            );
        }

        for join in &self.joins {
            push_join(&mut sql, &join.table, &join.alias, &join.on, &mut values);
        }
        for matched in &self.matches {
            push_join(
                &mut sql,
                &matched.table,
                &matched.association,
                &matched.on,
                &mut values,
            );
        }

        let mut conditions: Vec<String> = self
            .predicates
            .iter()
            .map(|predicate| render_predicate(predicate, &mut values))
            .collect();
        for matched in &self.matches {
            conditions.extend(
                matched
                    .conditions
                    .iter()
                    .map(|predicate| render_predicate(predicate, &mut values)),
            );
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(order) = &self.order {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                order.column,
                order.direction.as_sql()
            ));
        }

        (sql, values)
    }
}

fn push_join(
    sql: &mut String,
    table: &str,
    alias: &str,
    on: &[JoinCondition],
    values: &mut Vec<SqlValue>,
) {
    let conditions: Vec<String> = on
        .iter()
        .map(|condition| render_condition(alias, condition, values))
        .collect();
    sql.push_str(&format!(
        " INNER JOIN {table} {alias} ON {}",
        conditions.join(" AND ")
    ));
}

fn render_condition(alias: &str, condition: &JoinCondition, values: &mut Vec<SqlValue>) -> String {
    match condition {
        JoinCondition::Column { column, other } => format!("{alias}.{column} = {other}"),
        JoinCondition::Value { column, value } => {
            values.push(value.clone());
            format!("{alias}.{column} = ${}", values.len())
        }
    }
}

fn render_predicate(predicate: &Predicate, values: &mut Vec<SqlValue>) -> String {
    match predicate {
        Predicate::Compare { column, op, value } => {
            values.push(value.clone());
            format!("{column} {} ${}", op.as_sql(), values.len())
        }
        Predicate::Like { column, pattern } => {
            values.push(SqlValue::Text(pattern.clone()));
            format!("{column} LIKE ${}", values.len())
        }
        Predicate::Any(parts) => {
            let rendered: Vec<String> = parts
                .iter()
                .map(|part| render_predicate(part, values))
                .collect();
            format!("({})", rendered.join(" OR "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_on() -> Vec<JoinCondition> {
        vec![JoinCondition::Column {
            column: "foreign_key".to_string(),
            other: "Packages.id".to_string(),
        }]
    }

    fn tag_on(keyname: &str) -> Vec<JoinCondition> {
        vec![
            JoinCondition::Column {
                column: "id".to_string(),
                other: "Tagged.tag_id".to_string(),
            },
            JoinCondition::Value {
                column: "keyname".to_string(),
                value: SqlValue::Text(keyname.to_string()),
            },
        ]
    }

    #[test]
    fn identical_joins_are_added_once() {
        let query = PackageQuery::new()
            .inner_join("Tagged", "tagged", tagged_on())
            .inner_join("Tagged", "tagged", tagged_on());

        assert_eq!(query.joins().len(), 1);
    }

    #[test]
    fn conflicting_aliases_take_the_next_number() {
        let query = PackageQuery::new()
            .inner_join("Tags", "tags", tag_on("model"))
            .inner_join("Tags", "tags", tag_on("auth"))
            .inner_join("Tags", "tags", tag_on("acl"));

        let aliases: Vec<&str> = query.joins().iter().map(|j| j.alias.as_str()).collect();
        assert_eq!(aliases, vec!["Tags", "Tags2", "Tags3"]);
    }

    #[test]
    fn renumbered_aliases_keep_their_conditions_valid() {
        let spec = PackageQuery::new()
            .inner_join("Tags", "tags", tag_on("model"))
            .inner_join("Tags", "tags", tag_on("auth"))
            .finish();
        let (sql, _) = spec.to_sql();

        assert!(sql.contains("INNER JOIN tags Tags ON Tags.id = Tagged.tag_id"));
        assert!(sql.contains("INNER JOIN tags Tags2 ON Tags2.id = Tagged.tag_id"));
    }

    #[test]
    fn order_by_replaces_the_earlier_clause() {
        let spec = PackageQuery::new()
            .order_by("Packages.name", SortDirection::Asc)
            .order_by("Maintainers.username", SortDirection::Desc)
            .finish();
        let (sql, _) = spec.to_sql();

        assert!(sql.ends_with("ORDER BY Maintainers.username DESC"));
        assert!(!sql.contains("Packages.name"));
    }

    #[test]
    fn package_shape_joins_maintainers() {
        let (sql, values) = PackageQuery::new().find(ResultShape::Package).finish().to_sql();

        assert_eq!(
            sql,
            "SELECT Packages.* FROM packages Packages \
             INNER JOIN maintainers Maintainers ON Maintainers.id = Packages.maintainer_id"
        );
        assert!(values.is_empty());
    }

    #[test]
    fn bare_shape_reads_the_base_table_only() {
        let (sql, _) = PackageQuery::new().finish().to_sql();
        assert_eq!(sql, "SELECT Packages.* FROM packages Packages");
    }

    #[test]
    fn placeholders_number_in_render_order() {
        let spec = PackageQuery::new()
            .inner_join("Tags", "tags", tag_on("model"))
            .and_where(Predicate::Compare {
                column: "Packages.forks".to_string(),
                op: CompareOp::GtEq,
                value: SqlValue::Int(5),
            })
            .finish();
        let (sql, values) = spec.to_sql();

        assert!(sql.contains("Tags.keyname = $1"));
        assert!(sql.contains("Packages.forks >= $2"));
        assert_eq!(
            values,
            vec![SqlValue::Text("model".to_string()), SqlValue::Int(5)]
        );
    }

    #[test]
    fn disjunction_renders_parenthesized() {
        let spec = PackageQuery::new()
            .and_where(Predicate::Any(vec![
                Predicate::Like {
                    column: "Packages.name".to_string(),
                    pattern: "%acl%".to_string(),
                },
                Predicate::Like {
                    column: "Packages.description".to_string(),
                    pattern: "%acl%".to_string(),
                },
            ]))
            .finish();
        let (sql, values) = spec.to_sql();

        assert!(sql.contains("WHERE (Packages.name LIKE $1 OR Packages.description LIKE $2)"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn association_match_joins_and_restricts() {
        let spec = PackageQuery::new()
            .matching(AssociationMatch {
                association: "Categories".to_string(),
                table: "categories".to_string(),
                on: vec![JoinCondition::Column {
                    column: "id".to_string(),
                    other: "Packages.category_id".to_string(),
                }],
                conditions: vec![Predicate::Compare {
                    column: "Categories.slug".to_string(),
                    op: CompareOp::Eq,
                    value: SqlValue::Text("auth".to_string()),
                }],
            })
            .finish();
        let (sql, values) = spec.to_sql();

        assert!(
            sql.contains("INNER JOIN categories Categories ON Categories.id = Packages.category_id")
        );
        assert!(sql.contains("WHERE Categories.slug = $1"));
        assert_eq!(values, vec![SqlValue::Text("auth".to_string())]);
    }
}
