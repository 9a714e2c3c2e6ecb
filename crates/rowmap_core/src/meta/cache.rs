//! Shared per-type resolver cache.

use crate::error::CoreResult;
use crate::meta::registry::MetadataRegistry;
use crate::meta::resolver::Resolver;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caches one [`Resolver`] per entity type.
///
/// Resolution walks field descriptors and validates them, so it runs once
/// per type; every later request returns the shared instance. The cache is
/// owned by the entity manager and consulted during entity construction
/// for nested rows.
#[derive(Debug)]
pub struct ResolverCache {
    registry: MetadataRegistry,
    resolvers: Mutex<BTreeMap<String, Arc<Resolver>>>,
}

impl ResolverCache {
    /// Creates a cache over the given registry.
    #[must_use]
    pub fn new(registry: MetadataRegistry) -> Self {
        Self {
            registry,
            resolvers: Mutex::new(BTreeMap::new()),
        }
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// Returns the cached resolver for the named type, building it on
    /// first use.
    ///
    /// # Errors
    ///
    /// Propagates metadata errors from [`Resolver::build`].
    pub fn resolver(&self, entity_name: &str) -> CoreResult<Arc<Resolver>> {
        if let Some(resolver) = self.resolvers.lock().get(entity_name) {
            return Ok(Arc::clone(resolver));
        }
        let resolver = Arc::new(Resolver::build(&self.registry, entity_name)?);
        self.resolvers
            .lock()
            .insert(entity_name.to_owned(), Arc::clone(&resolver));
        Ok(resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::EntityMeta;

    #[test]
    fn resolver_is_shared_across_calls() {
        let mut registry = MetadataRegistry::new();
        registry.register(EntityMeta::new("Author").table("authors").id("id", "id"));
        let cache = ResolverCache::new(registry);

        let a = cache.resolver("Author").unwrap();
        let b = cache.resolver("Author").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
