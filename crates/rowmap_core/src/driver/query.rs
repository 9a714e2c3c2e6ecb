//! Structured select statements.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One projected column: a source column or aggregate expression plus the
/// alias the result row is keyed by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectColumn {
    /// Column name or aggregate expression, e.g. `full_name` or
    /// `COUNT(id)`.
    pub column: String,
    /// Key the value appears under in the result row. Defaults to the
    /// column itself.
    pub alias: String,
}

impl SelectColumn {
    /// Projects a column under an alias.
    pub fn aliased(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: alias.into(),
        }
    }

    /// Projects a column under its own name.
    pub fn plain(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            alias: column.clone(),
            column,
        }
    }

    /// Projects an aggregate expression such as `COUNT(id)`.
    pub fn expr(expression: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::aliased(expression, alias)
    }
}

/// One parameterized WHERE fragment.
///
/// The expression uses `?` as the bind placeholder, e.g. `status = ?`.
/// List conditions carry their operands inline (`id IN (1,2,3)`) with no
/// bind value, mirroring how the engine batches relationship fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// The fragment, column names already resolved.
    pub expr: String,
    /// The bind value for the `?` placeholder, if the fragment has one.
    pub value: Option<Value>,
}

impl Condition {
    /// A fragment with one bind value.
    pub fn bind(expr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            expr: expr.into(),
            value: Some(value.into()),
        }
    }

    /// A fragment with no bind value.
    pub fn raw(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            value: None,
        }
    }

    /// An `IN (…)` membership test over integer keys.
    pub fn in_list(column: impl Into<String>, ids: &[i64]) -> Self {
        let list = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self::raw(format!("{} IN ({list})", column.into()))
    }
}

/// A select statement under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    /// Source table.
    pub table: String,
    /// Projected columns. Empty means all columns, keyed by column name.
    pub columns: Vec<SelectColumn>,
    /// Conjunctive WHERE fragments.
    pub conditions: Vec<Condition>,
    /// Ordering fragments, e.g. `title DESC`.
    pub order: Vec<String>,
    /// Row cap.
    pub limit: Option<u64>,
    /// Rows to skip before the cap applies.
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// Starts a select over the given table and projection.
    pub fn new(table: impl Into<String>, columns: Vec<SelectColumn>) -> Self {
        Self {
            table: table.into(),
            columns,
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Adds a WHERE fragment; fragments are ANDed together.
    #[must_use]
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets the ordering fragments.
    #[must_use]
    pub fn order(mut self, order: Vec<String>) -> Self {
        self.order = order;
        self
    }

    /// Sets the row cap and offset.
    #[must_use]
    pub fn limit(mut self, limit: u64, offset: Option<u64>) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_list_renders_inline() {
        let condition = Condition::in_list("course_id", &[10, 11]);
        assert_eq!(condition.expr, "course_id IN (10,11)");
        assert!(condition.value.is_none());
    }

    #[test]
    fn builder_accumulates() {
        let query = SelectQuery::new("books", vec![SelectColumn::plain("id")])
            .and_where(Condition::bind("author_id = ?", 1))
            .order(vec!["title ASC".into()])
            .limit(50, Some(10));

        assert_eq!(query.conditions.len(), 1);
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.offset, Some(10));
    }
}
