//! The entity manager: driver handle, metadata cache, repository
//! resolution, and the transaction boundary.

use crate::driver::Driver;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::meta::{MetadataRegistry, ResolverCache};
use crate::repository::{Criteria, Repository, DEFAULT_PAGE_SIZE};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-entity-type repository configuration.
///
/// Registering a config under an entity name specializes the repository
/// the manager hands out for that name; unregistered names get generic
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct RepositoryConfig {
    /// Page size applied when a find has no explicit limit.
    pub page_size: Option<u64>,
    /// Ordering applied when a find has no explicit ordering, in
    /// field-name tokens.
    pub order_by: Vec<String>,
}

/// Process-wide entry point for persistence.
///
/// Owns the shared database driver, the metadata registry with its
/// per-type resolver cache, and the repository specializations.
/// Constructed once and passed to whatever needs persistence; there is no
/// global registry.
///
/// Transaction control is a pass-through to the driver with no nested
/// bookkeeping; nesting correctness is the caller's responsibility.
#[derive(Debug)]
pub struct EntityManager {
    driver: Arc<dyn Driver + Send + Sync>,
    resolvers: Arc<ResolverCache>,
    configs: BTreeMap<String, RepositoryConfig>,
    last_message: Mutex<Option<String>>,
}

impl EntityManager {
    /// Creates a manager over a driver and a metadata registry.
    #[must_use]
    pub fn new(driver: Arc<dyn Driver + Send + Sync>, registry: MetadataRegistry) -> Self {
        Self {
            driver,
            resolvers: Arc::new(ResolverCache::new(registry)),
            configs: BTreeMap::new(),
            last_message: Mutex::new(None),
        }
    }

    /// Registers a repository specialization for an entity name.
    pub fn register_repository(
        &mut self,
        entity_name: impl Into<String>,
        config: RepositoryConfig,
    ) -> &mut Self {
        self.configs.insert(entity_name.into(), config);
        self
    }

    /// The shared database driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver + Send + Sync> {
        &self.driver
    }

    /// The per-type resolver cache.
    #[must_use]
    pub fn resolvers(&self) -> &Arc<ResolverCache> {
        &self.resolvers
    }

    /// Builds the repository for an entity name.
    ///
    /// Resolution is purely name-based and a fresh instance is returned
    /// per call; callers that need a stable result set hold the returned
    /// repository.
    ///
    /// # Errors
    ///
    /// Metadata errors for the name surface here.
    pub fn repository(&self, entity_name: &str) -> CoreResult<Repository<'_>> {
        let resolver = self.resolvers.resolver(entity_name)?;
        let config = self.configs.get(entity_name).cloned().unwrap_or_default();
        Ok(Repository::new(
            self,
            resolver,
            config.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            config.order_by,
        ))
    }

    /// Creates an empty entity of the named type.
    ///
    /// # Errors
    ///
    /// Metadata errors for the name surface here.
    pub fn new_entity(&self, entity_name: &str) -> CoreResult<Entity> {
        Ok(Entity::new(self.resolvers.resolver(entity_name)?))
    }

    /// Finds an entity by identity. Shortcut for
    /// `repository(name)?.find(id, deep)`.
    pub fn find(&self, entity_name: &str, id: i64, deep: bool) -> CoreResult<Option<Entity>> {
        self.repository(entity_name)?.find(id, deep)
    }

    /// Saves the entity inside its own transaction, normalizing the
    /// report to a boolean. On failure the message is retained for
    /// [`last_message`](Self::last_message).
    ///
    /// # Errors
    ///
    /// Metadata and argument errors propagate.
    pub fn persist(&self, entity: &mut Entity) -> CoreResult<bool> {
        let report = self.repository(entity.name())?.save(entity, true)?;
        let ok = report.is_ok();
        *self.last_message.lock() = if ok { None } else { report.message };
        Ok(ok)
    }

    /// Removes the entity's row, normalizing the report to a boolean. On
    /// failure the message is retained for
    /// [`last_message`](Self::last_message).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the entity has no identity; metadata errors
    /// propagate.
    pub fn remove(&self, entity: &Entity) -> CoreResult<bool> {
        let id = entity.id().ok_or_else(|| {
            CoreError::invalid_argument("cannot remove an entity without an identity")
        })?;
        let report = self.repository(entity.name())?.remove(id, true)?;
        let ok = report.is_ok();
        *self.last_message.lock() = if ok { None } else { report.message };
        Ok(ok)
    }

    /// Unfiltered row count for the entity's table, independent of any
    /// repository result set.
    pub fn count(&self, entity_name: &str) -> CoreResult<u64> {
        self.repository(entity_name)?.count_where(&Criteria::new())
    }

    /// The failure message of the most recent unsuccessful persist or
    /// remove, cleared by the next successful one.
    #[must_use]
    pub fn last_message(&self) -> Option<String> {
        self.last_message.lock().clone()
    }

    /// Starts a transaction on the shared driver.
    pub fn begin_transaction(&self) -> CoreResult<()> {
        Ok(self.driver.begin_transaction()?)
    }

    /// Commits the open transaction.
    pub fn commit(&self) -> CoreResult<()> {
        Ok(self.driver.commit()?)
    }

    /// Rolls back the open transaction.
    pub fn rollback(&self) -> CoreResult<()> {
        Ok(self.driver.rollback()?)
    }
}
