//! The database collaborator contract.
//!
//! RowMap does not talk SQL to a server itself; it issues structured
//! statements through a [`Driver`] implementation injected into the entity
//! manager. Parameter binding and value escaping are entirely the
//! driver's responsibility. A reference in-memory implementation lives in
//! `rowmap_testkit`.

mod query;

pub use query::{Condition, SelectColumn, SelectQuery};

use crate::error::DriverResult;
use crate::value::{Row, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A synchronous connection to a relational database.
///
/// One driver instance represents one shared connection; transaction
/// state lives on the connection, so `begin_transaction`, `commit`, and
/// `rollback` scope every statement issued in between.
///
/// Constraint violations must be reported through the classified
/// [`DriverError`](crate::error::DriverError) variants so the repository
/// can translate them into user-facing failure reports.
pub trait Driver {
    /// Starts a transaction on the connection.
    fn begin_transaction(&self) -> DriverResult<()>;

    /// Commits the open transaction.
    fn commit(&self) -> DriverResult<()>;

    /// Rolls back the open transaction.
    fn rollback(&self) -> DriverResult<()>;

    /// Executes a select and returns the matching rows, keyed by the
    /// query's column aliases.
    fn select(&self, query: &SelectQuery) -> DriverResult<Vec<Row>>;

    /// Inserts one row.
    fn insert(&self, table: &str, values: &BTreeMap<String, Value>) -> DriverResult<()>;

    /// The identity generated by the most recent insert on this
    /// connection.
    fn last_insert_id(&self) -> DriverResult<i64>;

    /// Updates rows matching the conditions.
    fn update(
        &self,
        table: &str,
        values: &BTreeMap<String, Value>,
        conditions: &[Condition],
    ) -> DriverResult<()>;

    /// Deletes rows matching the conditions.
    fn delete(&self, table: &str, conditions: &[Condition]) -> DriverResult<()>;
}

impl fmt::Debug for dyn Driver + Send + Sync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Driver")
    }
}
