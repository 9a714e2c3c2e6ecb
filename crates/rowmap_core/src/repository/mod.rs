//! Per-entity-type persistence gateway.
//!
//! A [`Repository`] owns all CRUD and relationship-cascade logic for one
//! entity type. It is built by the entity manager, borrows it for sibling
//! lookups during cascades, and keeps the last find's result set for
//! indexed access and iteration.

mod relations;
mod report;
mod save;

pub use report::{
    ConstraintKind, SaveOutcome, SaveReport, DUPLICATE_MESSAGE, FK_REMOVE_MESSAGE,
};

use crate::driver::{Condition, SelectColumn, SelectQuery};
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::manager::EntityManager;
use crate::meta::Resolver;
use crate::value::Value;
use std::ops::Index;
use std::sync::Arc;

/// The default page size applied when a find gives no explicit limit.
///
/// A deliberate safety cap: an unqualified `find_by` never turns into an
/// unbounded full-table scan.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// A set of parameterized WHERE fragments, ANDed together.
///
/// Fragments are written with field-name tokens (`"status = ?"`); the
/// repository rewrites tokens to column names through its binding map
/// before the driver sees them.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    items: Vec<(String, Option<Value>)>,
}

impl Criteria {
    /// An empty criteria set (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fragment with one bind value.
    #[must_use]
    pub fn and(mut self, expr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.items.push((expr.into(), Some(value.into())));
        self
    }

    /// Adds a fragment with its operands inline (e.g. `id IN (1,2)`).
    #[must_use]
    pub fn and_raw(mut self, expr: impl Into<String>) -> Self {
        self.items.push((expr.into(), None));
        self
    }

    /// True if no fragments were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates the fragments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.items.iter().map(|(e, v)| (e.as_str(), v.as_ref()))
    }
}

/// Options for a find call.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Eagerly resolve and attach relationship fields per row.
    pub deep: bool,
    /// Ordering fragments in field-name tokens, e.g. `"title DESC"`.
    pub order_by: Vec<String>,
    /// Row cap; `None` applies the repository's page size.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
}

impl FindOptions {
    /// Options with eager relationship loading enabled.
    #[must_use]
    pub fn deep() -> Self {
        Self {
            deep: true,
            ..Self::default()
        }
    }

    /// Options with an explicit row cap.
    #[must_use]
    pub fn limited(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Persistence gateway for one entity type.
///
/// Stateless apart from the cached result set: retaining a repository
/// across operations is safe, but each find replaces (never merges) the
/// result set.
#[derive(Debug)]
pub struct Repository<'em> {
    em: &'em EntityManager,
    resolver: Arc<Resolver>,
    models: Vec<Entity>,
    page_size: u64,
    default_order: Vec<String>,
}

impl<'em> Repository<'em> {
    pub(crate) fn new(
        em: &'em EntityManager,
        resolver: Arc<Resolver>,
        page_size: u64,
        default_order: Vec<String>,
    ) -> Self {
        Self {
            em,
            resolver,
            models: Vec::new(),
            page_size,
            default_order,
        }
    }

    /// The entity type this repository persists.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        self.resolver.entity_name()
    }

    /// The table backing the entity type.
    #[must_use]
    pub fn table(&self) -> &str {
        self.resolver.table()
    }

    /// The identity column.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        self.resolver.primary_key()
    }

    /// The metadata resolver backing this repository.
    #[must_use]
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// The entity manager this repository was built by.
    #[must_use]
    pub fn entity_manager(&self) -> &'em EntityManager {
        self.em
    }

    /// Creates an empty entity of this repository's type.
    #[must_use]
    pub fn new_entity(&self) -> Entity {
        Entity::new(Arc::clone(&self.resolver))
    }

    /// Finds a single entity by primary key.
    ///
    /// # Errors
    ///
    /// Driver failures and metadata errors propagate; no matching row is
    /// `Ok(None)`.
    pub fn find(&mut self, id: i64, deep: bool) -> CoreResult<Option<Entity>> {
        let expr = format!("{} = ?", self.resolver.primary_field());
        self.find_one_by(&Criteria::new().and(expr, id), deep, Vec::new())
    }

    /// Finds all entities, subject to the default page size.
    pub fn find_all(&mut self) -> CoreResult<&[Entity]> {
        self.find_by(&Criteria::new(), &FindOptions::default())
    }

    /// Finds entities by criteria, replacing the result set.
    ///
    /// Field-name tokens in criteria and ordering fragments are rewritten
    /// to column names. Without an explicit limit the page size applies.
    pub fn find_by(&mut self, criteria: &Criteria, options: &FindOptions) -> CoreResult<&[Entity]> {
        let order = if options.order_by.is_empty() {
            self.default_order.clone()
        } else {
            options.order_by.clone()
        };
        let order = order
            .iter()
            .map(|fragment| self.resolver.rewrite_fragment(fragment))
            .collect();

        let mut query = SelectQuery::new(self.resolver.table(), self.select_columns())
            .order(order)
            .limit(options.limit.unwrap_or(self.page_size), options.offset);
        for (expr, value) in criteria.iter() {
            query = query.and_where(Condition {
                expr: self.resolver.rewrite_fragment(expr),
                value: value.cloned(),
            });
        }

        let rows = self.em.driver().select(&query)?;
        let mut models = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entity = Entity::from_row(self.em.resolvers(), self.entity_name(), row)?;
            if options.deep {
                self.resolve_relationships(&mut entity)?;
            }
            models.push(entity);
        }
        self.models = models;
        Ok(&self.models)
    }

    /// Finds the first entity matching the criteria.
    pub fn find_one_by(
        &mut self,
        criteria: &Criteria,
        deep: bool,
        order_by: Vec<String>,
    ) -> CoreResult<Option<Entity>> {
        self.find_by(
            criteria,
            &FindOptions {
                deep,
                order_by,
                limit: Some(1),
                offset: None,
            },
        )?;
        Ok(self.models.first().cloned())
    }

    /// Counts rows matching the criteria. No entities are hydrated.
    pub fn count_where(&self, criteria: &Criteria) -> CoreResult<u64> {
        let expression = format!("COUNT({})", self.resolver.primary_key());
        let mut query = SelectQuery::new(
            self.resolver.table(),
            vec![SelectColumn::expr(expression, "count")],
        );
        for (expr, value) in criteria.iter() {
            query = query.and_where(Condition {
                expr: self.resolver.rewrite_fragment(expr),
                value: value.cloned(),
            });
        }

        let rows = self.em.driver().select(&query)?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        u64::try_from(count).map_err(|_| {
            CoreError::invalid_argument(format!("driver returned negative count: {count}"))
        })
    }

    /// The result set from the most recent find.
    #[must_use]
    pub fn models(&self) -> &[Entity] {
        &self.models
    }

    /// Number of entities in the result set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True if the result set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Appends an entity to the result set.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the entity is of a different type.
    pub fn add_model(&mut self, entity: Entity) -> CoreResult<()> {
        if entity.name() != self.entity_name() {
            return Err(CoreError::invalid_argument(format!(
                "expected an entity of type `{}`, got `{}`",
                self.entity_name(),
                entity.name()
            )));
        }
        self.models.push(entity);
        Ok(())
    }

    /// Replaces the result set.
    pub fn set_models(&mut self, models: Vec<Entity>) {
        self.models = models;
    }

    /// Takes the result set, leaving it empty.
    pub fn take_models(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.models)
    }

    /// Projects the result set to `(key, value)` scalar pairs, skipping
    /// entities missing either field. Handy for select-list style output.
    #[must_use]
    pub fn to_key_value(&self, key_field: &str, value_field: &str) -> Vec<(Value, Value)> {
        self.models
            .iter()
            .filter_map(|entity| {
                let key = entity.scalar(key_field)?.clone();
                let value = entity.scalar(value_field)?.clone();
                Some((key, value))
            })
            .collect()
    }

    /// The projection for hydrating selects: every bound column aliased
    /// back to its field name.
    fn select_columns(&self) -> Vec<SelectColumn> {
        self.resolver
            .column_bindings()
            .iter()
            .map(|(field, column)| SelectColumn::aliased(column.clone(), field.clone()))
            .collect()
    }
}

impl Index<usize> for Repository<'_> {
    type Output = Entity;

    fn index(&self, index: usize) -> &Entity {
        &self.models[index]
    }
}

impl<'a> IntoIterator for &'a Repository<'_> {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
