//! Ready-made schemas and a wired store for persistence tests.
//!
//! The sample domain covers every relationship shape: `Author` and
//! `Book` (one-to-many with a many-to-one back-reference), `Student` and
//! `Course` (many-to-many through `enrollments`), and `User` and
//! `Profile` (bidirectional one-to-one, `Profile` owning the key).

use crate::memory::{MemoryDriver, TableSpec};
use rowmap_core::{Driver, EntityManager, EntityMeta, JoinTable, MetadataRegistry};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Declarations for the sample domain.
#[must_use]
pub fn sample_registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    registry
        .register(
            EntityMeta::new("Author")
                .table("authors")
                .id("id", "id")
                .column("name", "name")
                .one_to_many("books", "Book"),
        )
        .register(
            EntityMeta::new("Book")
                .table("books")
                .id("id", "id")
                .column("title", "title")
                .many_to_one("author", "Author", "author_id"),
        )
        .register(
            EntityMeta::new("Student")
                .table("students")
                .id("id", "id")
                .column("name", "name")
                .many_to_many(
                    "courses",
                    "Course",
                    JoinTable::new("enrollments", "student_id", "course_id"),
                ),
        )
        .register(
            EntityMeta::new("Course")
                .table("courses")
                .id("id", "id")
                .column("title", "title")
                .column("active", "active"),
        )
        .register(
            EntityMeta::new("User")
                .table("users")
                .id("id", "id")
                .column("email", "email")
                .one_to_one_unowned("profile", "Profile"),
        )
        .register(
            EntityMeta::new("Profile")
                .table("profiles")
                .id("id", "id")
                .column("bio", "bio")
                .one_to_one("user", "User", "user_id"),
        );
    registry
}

/// A driver with the tables backing [`sample_registry`], including the
/// unique and foreign-key constraints the scenarios lean on.
#[must_use]
pub fn sample_driver() -> Arc<MemoryDriver> {
    let driver = MemoryDriver::new();
    driver.create_table(TableSpec::new("authors").auto_id("id").unique("name"));
    driver.create_table(
        TableSpec::new("books")
            .auto_id("id")
            .require("title")
            .references("author_id", "authors", "id"),
    );
    driver.create_table(TableSpec::new("students").auto_id("id"));
    driver.create_table(TableSpec::new("courses").auto_id("id"));
    driver.create_table(
        TableSpec::new("enrollments")
            .references("student_id", "students", "id")
            .references("course_id", "courses", "id"),
    );
    driver.create_table(TableSpec::new("users").auto_id("id").unique("email"));
    driver.create_table(
        TableSpec::new("profiles")
            .auto_id("id")
            .references("user_id", "users", "id"),
    );
    Arc::new(driver)
}

/// An entity manager over the sample schema, with the driver kept
/// alongside for statement-level assertions.
pub struct TestStore {
    /// The in-memory driver, shared with the manager.
    pub driver: Arc<MemoryDriver>,
    /// The manager under test.
    pub em: EntityManager,
}

impl TestStore {
    /// Wires a fresh driver and manager over the sample domain.
    #[must_use]
    pub fn new() -> Self {
        let driver = sample_driver();
        let shared: Arc<dyn Driver + Send + Sync> = driver.clone();
        let em = EntityManager::new(shared, sample_registry());
        Self { driver, em }
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestStore {
    type Target = EntityManager;

    fn deref(&self) -> &Self::Target {
        &self.em
    }
}

impl DerefMut for TestStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.em
    }
}

/// Runs a test against a fresh store.
///
/// # Example
///
/// ```rust,ignore
/// use rowmap_testkit::with_store;
///
/// #[test]
/// fn my_test() {
///     with_store(|store| {
///         let mut author = store.new_entity("Author").unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::new();
    f(&store)
}

/// Seeded scenario helpers.
pub mod scenarios {
    use super::TestStore;
    use rowmap_core::Entity;

    /// A store holding `count` authors named `author-0` through
    /// `author-{count - 1}`.
    #[must_use]
    pub fn authors(count: usize) -> TestStore {
        let store = TestStore::new();
        for index in 0..count {
            let mut author = store
                .new_entity("Author")
                .expect("Author is registered");
            author
                .set("name", format!("author-{index}"))
                .expect("name is declared");
            assert!(store.persist(&mut author).expect("seed author"));
        }
        store
    }

    /// A store with one saved author, returned alongside the store.
    #[must_use]
    pub fn single_author(name: &str) -> (TestStore, Entity) {
        let store = TestStore::new();
        let mut author = store.new_entity("Author").expect("Author is registered");
        author.set("name", name).expect("name is declared");
        assert!(store.persist(&mut author).expect("seed author"));
        (store, author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_wires_manager_and_driver() {
        let store = TestStore::new();
        assert_eq!(store.count("Author").unwrap(), 0);
        assert!(store.driver.rows("authors").is_empty());
    }

    #[test]
    fn seeded_authors_are_countable() {
        let store = scenarios::authors(3);
        assert_eq!(store.count("Author").unwrap(), 3);
    }

    #[test]
    fn registry_declares_every_relationship_shape() {
        let registry = sample_registry();
        for name in ["Author", "Book", "Student", "Course", "User", "Profile"] {
            assert!(registry.contains(name), "missing {name}");
        }
    }
}
