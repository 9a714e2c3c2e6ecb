//! In-memory reference implementation of the driver contract.

use parking_lot::Mutex;
use rowmap_core::driver::{Condition, Driver, SelectQuery};
use rowmap_core::error::{DriverError, DriverResult};
use rowmap_core::value::{Row, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Declarative schema for one in-memory table.
///
/// ```
/// use rowmap_testkit::TableSpec;
///
/// let books = TableSpec::new("books")
///     .auto_id("id")
///     .unique("title")
///     .references("author_id", "authors", "id");
/// ```
#[derive(Debug, Clone)]
pub struct TableSpec {
    name: String,
    auto_id: Option<String>,
    unique: Vec<String>,
    required: Vec<String>,
    foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone)]
struct ForeignKey {
    column: String,
    ref_table: String,
    ref_column: String,
}

impl TableSpec {
    /// Starts a spec for the named table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_id: None,
            unique: Vec::new(),
            required: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Declares the auto-increment identity column.
    #[must_use]
    pub fn auto_id(mut self, column: impl Into<String>) -> Self {
        self.auto_id = Some(column.into());
        self
    }

    /// Declares a single-column uniqueness constraint.
    #[must_use]
    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.unique.push(column.into());
        self
    }

    /// Declares a column that must be present and non-null on insert.
    #[must_use]
    pub fn require(mut self, column: impl Into<String>) -> Self {
        self.required.push(column.into());
        self
    }

    /// Declares an outbound foreign key.
    #[must_use]
    pub fn references(
        mut self,
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
        });
        self
    }
}

#[derive(Debug, Clone)]
struct Table {
    spec: TableSpec,
    rows: Vec<Row>,
    next_id: i64,
}

/// Statement counters, for asserting on write activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statements {
    /// Select statements executed.
    pub selects: u64,
    /// Insert statements executed.
    pub inserts: u64,
    /// Update statements executed.
    pub updates: u64,
    /// Delete statements executed.
    pub deletes: u64,
}

impl Statements {
    /// Total write statements (insert + update + delete).
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.inserts + self.updates + self.deletes
    }
}

#[derive(Debug, Default)]
struct Store {
    tables: BTreeMap<String, Table>,
    snapshot: Option<BTreeMap<String, Table>>,
    last_insert_id: i64,
    statements: Statements,
}

/// An in-memory database driver with constraint simulation.
///
/// Supports auto-increment identities, single-column uniqueness,
/// outbound foreign keys (validated on insert/update, checked inbound on
/// delete), and one open transaction implemented as a whole-store
/// snapshot restored on rollback. WHERE fragments understand
/// `col = ?`, `col != ?`, the four ordering comparisons, and
/// `col IN (…)`; selects honor ordering fragments, limit/offset, column
/// aliasing, and `COUNT(col)` projections.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    store: Mutex<Store>,
}

impl MemoryDriver {
    /// Creates an empty driver with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table.
    pub fn create_table(&self, spec: TableSpec) {
        let mut store = self.store.lock();
        store.tables.insert(
            spec.name.clone(),
            Table {
                spec,
                rows: Vec::new(),
                next_id: 1,
            },
        );
    }

    /// Snapshot of the statement counters.
    #[must_use]
    pub fn statements(&self) -> Statements {
        self.store.lock().statements
    }

    /// All rows of a table, for direct assertions.
    ///
    /// # Panics
    ///
    /// Panics if the table is not registered.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.store
            .lock()
            .tables
            .get(table)
            .unwrap_or_else(|| panic!("no such table: {table}"))
            .rows
            .clone()
    }

    /// True while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.store.lock().snapshot.is_some()
    }
}

impl Driver for MemoryDriver {
    fn begin_transaction(&self) -> DriverResult<()> {
        let mut store = self.store.lock();
        if store.snapshot.is_some() {
            return Err(DriverError::database("transaction already open"));
        }
        store.snapshot = Some(store.tables.clone());
        Ok(())
    }

    fn commit(&self) -> DriverResult<()> {
        let mut store = self.store.lock();
        if store.snapshot.take().is_none() {
            return Err(DriverError::database("no open transaction to commit"));
        }
        Ok(())
    }

    fn rollback(&self) -> DriverResult<()> {
        let mut store = self.store.lock();
        match store.snapshot.take() {
            Some(tables) => {
                store.tables = tables;
                Ok(())
            }
            None => Err(DriverError::database("no open transaction to roll back")),
        }
    }

    fn select(&self, query: &SelectQuery) -> DriverResult<Vec<Row>> {
        let mut store = self.store.lock();
        store.statements.selects += 1;
        let table = lookup(&store.tables, &query.table)?;

        let mut matched: Vec<Row> = Vec::new();
        for row in &table.rows {
            if matches_all(row, &query.conditions)? {
                matched.push(row.clone());
            }
        }

        // COUNT projection short-circuits row shaping.
        if let [column] = query.columns.as_slice() {
            if column.column.to_uppercase().starts_with("COUNT(") {
                let mut row = Row::new();
                row.insert(
                    column.alias.clone(),
                    Value::Integer(i64::try_from(matched.len()).unwrap_or(i64::MAX)),
                );
                return Ok(vec![row]);
            }
        }

        sort_rows(&mut matched, &query.order)?;

        let offset = usize::try_from(query.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let mut rows: Vec<Row> = matched.into_iter().skip(offset).collect();
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        if query.columns.is_empty() {
            return Ok(rows);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut projected = Row::new();
                for column in &query.columns {
                    if let Some(value) = row.get(&column.column) {
                        projected.insert(column.alias.clone(), value.clone());
                    }
                }
                projected
            })
            .collect())
    }

    fn insert(&self, table_name: &str, values: &BTreeMap<String, Value>) -> DriverResult<()> {
        let mut store = self.store.lock();
        store.statements.inserts += 1;

        let mut row: Row = values.clone();
        let spec = lookup(&store.tables, table_name)?.spec.clone();

        for column in &spec.required {
            if row.get(column).map_or(true, |v| *v == Value::Null) {
                return Err(DriverError::database(format!(
                    "column `{table_name}.{column}` cannot be null"
                )));
            }
        }
        check_outbound(&store.tables, &spec, &row)?;
        check_unique(&store.tables, table_name, &spec, &row, None)?;

        let mut assigned = None;
        if let Some(id_column) = &spec.auto_id {
            let table = store
                .tables
                .get_mut(table_name)
                .ok_or_else(|| DriverError::database(format!("no such table: {table_name}")))?;
            let id = match row.get(id_column).and_then(Value::as_i64) {
                Some(id) => {
                    table.next_id = table.next_id.max(id + 1);
                    id
                }
                None => {
                    let id = table.next_id;
                    table.next_id += 1;
                    row.insert(id_column.clone(), Value::Integer(id));
                    id
                }
            };
            assigned = Some(id);
        }
        if let Some(id) = assigned {
            store.last_insert_id = id;
        }
        store
            .tables
            .get_mut(table_name)
            .ok_or_else(|| DriverError::database(format!("no such table: {table_name}")))?
            .rows
            .push(row);
        Ok(())
    }

    fn last_insert_id(&self) -> DriverResult<i64> {
        Ok(self.store.lock().last_insert_id)
    }

    fn update(
        &self,
        table_name: &str,
        values: &BTreeMap<String, Value>,
        conditions: &[Condition],
    ) -> DriverResult<()> {
        let mut store = self.store.lock();
        store.statements.updates += 1;
        let table = lookup(&store.tables, table_name)?;
        let spec = table.spec.clone();

        let mut indices = Vec::new();
        for (index, row) in table.rows.iter().enumerate() {
            if matches_all(row, conditions)? {
                indices.push(index);
            }
        }

        for index in indices {
            let mut updated = store.tables[table_name].rows[index].clone();
            for (column, value) in values {
                updated.insert(column.clone(), value.clone());
            }
            check_outbound(&store.tables, &spec, &updated)?;
            check_unique(&store.tables, table_name, &spec, &updated, Some(index))?;
            store
                .tables
                .get_mut(table_name)
                .expect("table checked above")
                .rows[index] = updated;
        }
        Ok(())
    }

    fn delete(&self, table_name: &str, conditions: &[Condition]) -> DriverResult<()> {
        let mut store = self.store.lock();
        store.statements.deletes += 1;
        let table = lookup(&store.tables, table_name)?;

        let mut doomed = Vec::new();
        for row in &table.rows {
            if matches_all(row, conditions)? {
                doomed.push(row.clone());
            }
        }

        // Inbound references block the delete.
        for row in &doomed {
            for other in store.tables.values() {
                for fk in &other.spec.foreign_keys {
                    if fk.ref_table != table_name {
                        continue;
                    }
                    let Some(referenced) = row.get(&fk.ref_column) else {
                        continue;
                    };
                    if other
                        .rows
                        .iter()
                        .any(|r| r.get(&fk.column) == Some(referenced))
                    {
                        return Err(DriverError::foreign_key(format!(
                            "`{}.{}` references {table_name}",
                            other.spec.name, fk.column
                        )));
                    }
                }
            }
        }

        let table = store
            .tables
            .get_mut(table_name)
            .expect("table checked above");
        table.rows.retain(|row| !doomed.contains(row));
        Ok(())
    }
}

fn lookup<'a>(tables: &'a BTreeMap<String, Table>, name: &str) -> DriverResult<&'a Table> {
    tables
        .get(name)
        .ok_or_else(|| DriverError::database(format!("no such table: {name}")))
}

fn check_outbound(
    tables: &BTreeMap<String, Table>,
    spec: &TableSpec,
    row: &Row,
) -> DriverResult<()> {
    for fk in &spec.foreign_keys {
        let Some(value) = row.get(&fk.column) else {
            continue;
        };
        if *value == Value::Null {
            continue;
        }
        let target = lookup(tables, &fk.ref_table)?;
        if !target
            .rows
            .iter()
            .any(|r| r.get(&fk.ref_column) == Some(value))
        {
            return Err(DriverError::foreign_key(format!(
                "`{}.{}` = {value} has no match in `{}.{}`",
                spec.name, fk.column, fk.ref_table, fk.ref_column
            )));
        }
    }
    Ok(())
}

fn check_unique(
    tables: &BTreeMap<String, Table>,
    table_name: &str,
    spec: &TableSpec,
    row: &Row,
    skip_index: Option<usize>,
) -> DriverResult<()> {
    let table = lookup(tables, table_name)?;
    for column in &spec.unique {
        let Some(value) = row.get(column) else {
            continue;
        };
        for (index, existing) in table.rows.iter().enumerate() {
            if Some(index) == skip_index {
                continue;
            }
            if existing.get(column) == Some(value) {
                return Err(DriverError::duplicate_key(format!(
                    "`{table_name}.{column}` = {value}"
                )));
            }
        }
    }
    Ok(())
}

fn matches_all(row: &Row, conditions: &[Condition]) -> DriverResult<bool> {
    for condition in conditions {
        if !matches_condition(row, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_condition(row: &Row, condition: &Condition) -> DriverResult<bool> {
    let expr = condition.expr.trim();

    if let Some(open) = expr.find(" IN (") {
        let column = expr[..open].trim();
        let candidates: Vec<i64> = expr[open + 5..]
            .trim_end_matches(')')
            .split(',')
            .filter_map(|item| item.trim().parse().ok())
            .collect();
        let Some(actual) = row.get(column).and_then(Value::as_i64) else {
            return Ok(false);
        };
        return Ok(candidates.contains(&actual));
    }

    let mut parts = expr.splitn(3, ' ');
    let (Some(column), Some(op), Some("?")) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DriverError::database(format!(
            "unsupported expression: {expr}"
        )));
    };
    let Some(bound) = condition.value.as_ref() else {
        return Err(DriverError::database(format!(
            "expression has a placeholder but no bind value: {expr}"
        )));
    };
    let actual = row.get(column);

    let ordering = actual.and_then(|a| compare(a, bound));
    Ok(match op {
        "=" => ordering == Some(Ordering::Equal),
        "!=" | "<>" => actual.is_some() && ordering != Some(Ordering::Equal),
        "<" => ordering == Some(Ordering::Less),
        ">" => ordering == Some(Ordering::Greater),
        "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        ">=" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        other => {
            return Err(DriverError::database(format!(
                "unsupported operator: {other}"
            )))
        }
    })
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        _ => None,
    }
}

fn sort_rows(rows: &mut [Row], order: &[String]) -> DriverResult<()> {
    // Apply fragments right-to-left so the leftmost wins, relying on
    // stable sort.
    for fragment in order.iter().rev() {
        let mut parts = fragment.split_whitespace();
        let Some(column) = parts.next() else {
            continue;
        };
        let descending = match parts.next() {
            None => false,
            Some(direction) if direction.eq_ignore_ascii_case("asc") => false,
            Some(direction) if direction.eq_ignore_ascii_case("desc") => true,
            Some(other) => {
                return Err(DriverError::database(format!(
                    "unsupported order direction: {other}"
                )))
            }
        };
        rows.sort_by(|a, b| {
            let ordering = match (a.get(column), b.get(column)) {
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowmap_core::driver::SelectColumn;

    fn driver() -> MemoryDriver {
        let driver = MemoryDriver::new();
        driver.create_table(TableSpec::new("authors").auto_id("id").unique("name"));
        driver.create_table(
            TableSpec::new("books")
                .auto_id("id")
                .references("author_id", "authors", "id"),
        );
        driver
    }

    fn insert(driver: &MemoryDriver, table: &str, pairs: &[(&str, Value)]) {
        let values = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        driver.insert(table, &values).unwrap();
    }

    #[test]
    fn auto_increment_and_last_insert_id() {
        let driver = driver();
        insert(&driver, "authors", &[("name", Value::from("Orwell"))]);
        assert_eq!(driver.last_insert_id().unwrap(), 1);
        insert(&driver, "authors", &[("name", Value::from("Huxley"))]);
        assert_eq!(driver.last_insert_id().unwrap(), 2);
    }

    #[test]
    fn unique_constraint_rejects_duplicates() {
        let driver = driver();
        insert(&driver, "authors", &[("name", Value::from("Orwell"))]);
        let result = driver.insert(
            "authors",
            &[("name".to_owned(), Value::from("Orwell"))].into_iter().collect(),
        );
        assert!(matches!(result, Err(DriverError::DuplicateKey { .. })));
    }

    #[test]
    fn outbound_foreign_key_checked_on_insert() {
        let driver = driver();
        let result = driver.insert(
            "books",
            &[
                ("title".to_owned(), Value::from("1984")),
                ("author_id".to_owned(), Value::Integer(99)),
            ]
            .into_iter()
            .collect(),
        );
        assert!(matches!(result, Err(DriverError::ForeignKey { .. })));
    }

    #[test]
    fn inbound_foreign_key_blocks_delete() {
        let driver = driver();
        insert(&driver, "authors", &[("name", Value::from("Orwell"))]);
        insert(
            &driver,
            "books",
            &[
                ("title", Value::from("1984")),
                ("author_id", Value::Integer(1)),
            ],
        );

        let result = driver.delete("authors", &[Condition::bind("id = ?", 1)]);
        assert!(matches!(result, Err(DriverError::ForeignKey { .. })));
        assert_eq!(driver.rows("authors").len(), 1);
    }

    #[test]
    fn rollback_restores_snapshot() {
        let driver = driver();
        insert(&driver, "authors", &[("name", Value::from("Orwell"))]);

        driver.begin_transaction().unwrap();
        insert(&driver, "authors", &[("name", Value::from("Huxley"))]);
        assert_eq!(driver.rows("authors").len(), 2);
        driver.rollback().unwrap();
        assert_eq!(driver.rows("authors").len(), 1);
    }

    #[test]
    fn nested_begin_is_rejected() {
        let driver = driver();
        driver.begin_transaction().unwrap();
        assert!(driver.begin_transaction().is_err());
        driver.commit().unwrap();
        assert!(driver.commit().is_err());
    }

    #[test]
    fn select_supports_aliases_order_and_limit() {
        let driver = driver();
        for name in ["Carroll", "Austen", "Borges"] {
            insert(&driver, "authors", &[("name", Value::from(name))]);
        }

        let query = SelectQuery::new(
            "authors",
            vec![SelectColumn::aliased("name", "authorName")],
        )
        .order(vec!["name ASC".into()])
        .limit(2, None);
        let rows = driver.select(&query).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("authorName"), Some(&Value::from("Austen")));
        assert_eq!(rows[1].get("authorName"), Some(&Value::from("Borges")));
    }

    #[test]
    fn select_counts() {
        let driver = driver();
        insert(&driver, "authors", &[("name", Value::from("Orwell"))]);
        insert(&driver, "authors", &[("name", Value::from("Huxley"))]);

        let query = SelectQuery::new("authors", vec![SelectColumn::expr("COUNT(id)", "count")]);
        let rows = driver.select(&query).unwrap();
        assert_eq!(rows[0].get("count"), Some(&Value::Integer(2)));
    }

    #[test]
    fn in_list_conditions() {
        let driver = driver();
        for name in ["a", "b", "c"] {
            insert(&driver, "authors", &[("name", Value::from(name))]);
        }
        let query = SelectQuery::new("authors", Vec::new())
            .and_where(Condition::in_list("id", &[1, 3]));
        assert_eq!(driver.select(&query).unwrap().len(), 2);
    }
}
