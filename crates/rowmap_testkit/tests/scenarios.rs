//! Cross-component persistence scenarios over the in-memory driver.

use rowmap_core::driver::Driver;
use rowmap_core::repository::{DUPLICATE_MESSAGE, FK_REMOVE_MESSAGE};
use rowmap_core::value::Row;
use rowmap_core::{Criteria, Entity, FindOptions, Value, DEFAULT_PAGE_SIZE};
use rowmap_testkit::fixtures::scenarios;
use rowmap_testkit::{with_store, TestStore};

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

fn saved_book(store: &TestStore, title: &str, author_id: i64) -> Entity {
    let mut book = store.new_entity("Book").unwrap();
    book.set("title", title).unwrap();
    book.set("authorId", author_id).unwrap();
    assert!(store.persist(&mut book).unwrap());
    book
}

#[test]
fn scalar_fields_round_trip() {
    with_store(|store| {
        let mut author = store.new_entity("Author").unwrap();
        author.set("name", "Orwell").unwrap();
        assert!(store.persist(&mut author).unwrap());
        assert_eq!(author.id(), Some(1));

        let found = store.find("Author", 1, false).unwrap().unwrap();
        assert_eq!(found.scalar("name"), Some(&Value::from("Orwell")));
        assert!(!found.is_modified());
    });
}

#[test]
fn find_of_missing_row_is_none() {
    with_store(|store| {
        assert!(store.find("Author", 42, false).unwrap().is_none());
    });
}

#[test]
fn clean_entity_save_issues_no_writes() {
    let (store, mut author) = scenarios::single_author("Orwell");
    let before = store.driver.statements();

    assert!(store.persist(&mut author).unwrap());
    assert_eq!(store.driver.statements().writes(), before.writes());
}

#[test]
fn owning_relation_binds_the_join_column() {
    let (store, author) = scenarios::single_author("Orwell");
    let book = saved_book(&store, "1984", author.id().unwrap());

    let rows = store.driver.rows("books");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("author_id"), Some(&Value::Integer(1)));

    let found = store.find("Book", book.id().unwrap(), true).unwrap().unwrap();
    let attached = found.related("author").unwrap();
    assert_eq!(attached.scalar("name"), Some(&Value::from("Orwell")));
}

#[test]
fn reassigning_a_relation_after_deep_find_writes_the_new_key() {
    let (store, orwell) = scenarios::single_author("Orwell");
    let mut huxley = store.new_entity("Author").unwrap();
    huxley.set("name", "Huxley").unwrap();
    assert!(store.persist(&mut huxley).unwrap());

    let book = saved_book(&store, "1984", orwell.id().unwrap());

    // The deep-loaded book carries both the hydrated key scalar and the
    // attached author; swapping the attachment must dirty the entity.
    let mut found = store.find("Book", book.id().unwrap(), true).unwrap().unwrap();
    assert!(!found.is_modified());
    found.set_related("author", huxley).unwrap();
    assert!(found.is_modified());
    assert!(store.persist(&mut found).unwrap());

    let rows = store.driver.rows("books");
    assert_eq!(rows[0].get("author_id"), Some(&Value::Integer(2)));
}

#[test]
fn deep_find_attaches_one_to_many_children() {
    let (store, author) = scenarios::single_author("Tolkien");
    saved_book(&store, "The Hobbit", author.id().unwrap());
    saved_book(&store, "The Silmarillion", author.id().unwrap());

    let found = store.find("Author", 1, true).unwrap().unwrap();
    let books = found.collection("books").unwrap();
    assert_eq!(books.len(), 2);
    assert!(!found.is_modified());
}

#[test]
fn one_to_many_cascade_saves_children_with_back_reference() {
    with_store(|store| {
        let mut first = store.new_entity("Book").unwrap();
        first.set("title", "The Fellowship of the Ring").unwrap();
        let mut second = store.new_entity("Book").unwrap();
        second.set("title", "The Two Towers").unwrap();

        let mut author = store.new_entity("Author").unwrap();
        author.set("name", "Tolkien").unwrap();
        author.add_related("books", first).unwrap();
        author.add_related("books", second).unwrap();
        assert!(store.persist(&mut author).unwrap());

        let rows = store.driver.rows("books");
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.get("author_id"), Some(&Value::Integer(1)));
        }
        // Children picked up their driver-assigned identities.
        let ids: Vec<_> = author
            .collection("books")
            .unwrap()
            .iter()
            .map(Entity::id)
            .collect();
        assert_eq!(ids, [Some(1), Some(2)]);
    });
}

#[test]
fn one_to_one_cascades_and_loads_back() {
    with_store(|store| {
        let mut profile = store.new_entity("Profile").unwrap();
        profile.set("bio", "mathematician").unwrap();

        let mut user = store.new_entity("User").unwrap();
        user.set("email", "ada@example.com").unwrap();
        user.set_related("profile", profile).unwrap();
        assert!(store.persist(&mut user).unwrap());

        let rows = store.driver.rows("profiles");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("user_id"), Some(&Value::Integer(1)));

        // Inverse side: the user finds its profile through the target's key.
        let found = store.find("User", 1, true).unwrap().unwrap();
        let attached = found.related("profile").unwrap();
        assert_eq!(attached.scalar("bio"), Some(&Value::from("mathematician")));

        // Owning side: the profile finds its user through the join column.
        let found = store.find("Profile", 1, true).unwrap().unwrap();
        let attached = found.related("user").unwrap();
        assert_eq!(attached.scalar("email"), Some(&Value::from("ada@example.com")));
    });
}

#[test]
fn many_to_many_replaces_join_rows_wholesale() {
    let store = TestStore::new();
    store
        .driver
        .insert(
            "students",
            &row(&[("id", Value::Integer(5)), ("name", Value::from("Ada"))]),
        )
        .unwrap();
    for (id, title) in [(10, "Analysis"), (11, "Mechanics")] {
        store
            .driver
            .insert(
                "courses",
                &row(&[("id", Value::Integer(id)), ("title", Value::from(title))]),
            )
            .unwrap();
    }

    let analysis = store.find("Course", 10, false).unwrap().unwrap();
    let mechanics = store.find("Course", 11, false).unwrap().unwrap();
    let mut student = store.find("Student", 5, false).unwrap().unwrap();

    student
        .set_collection("courses", vec![analysis.clone(), mechanics])
        .unwrap();
    assert!(store.persist(&mut student).unwrap());
    assert_eq!(
        store.driver.rows("enrollments"),
        [
            row(&[
                ("student_id", Value::Integer(5)),
                ("course_id", Value::Integer(10)),
            ]),
            row(&[
                ("student_id", Value::Integer(5)),
                ("course_id", Value::Integer(11)),
            ]),
        ]
    );

    // Shrinking the set drops the row that fell out.
    student.set_collection("courses", vec![analysis]).unwrap();
    assert!(store.persist(&mut student).unwrap());
    assert_eq!(
        store.driver.rows("enrollments"),
        [row(&[
            ("student_id", Value::Integer(5)),
            ("course_id", Value::Integer(10)),
        ])]
    );

    // An attached empty set clears every join row.
    student.set_collection("courses", Vec::new()).unwrap();
    assert!(store.persist(&mut student).unwrap());
    assert!(store.driver.rows("enrollments").is_empty());
}

#[test]
fn deep_find_attaches_many_to_many_targets() {
    let store = TestStore::new();
    store
        .driver
        .insert(
            "students",
            &row(&[("id", Value::Integer(5)), ("name", Value::from("Ada"))]),
        )
        .unwrap();
    for (id, title) in [(10, "Analysis"), (11, "Mechanics")] {
        store
            .driver
            .insert(
                "courses",
                &row(&[("id", Value::Integer(id)), ("title", Value::from(title))]),
            )
            .unwrap();
        store
            .driver
            .insert(
                "enrollments",
                &row(&[
                    ("student_id", Value::Integer(5)),
                    ("course_id", Value::Integer(id)),
                ]),
            )
            .unwrap();
    }

    let student = store.find("Student", 5, true).unwrap().unwrap();
    let courses = student.collection("courses").unwrap();
    assert_eq!(courses.len(), 2);
    assert_eq!(courses[0].scalar("title"), Some(&Value::from("Analysis")));
}

#[test]
fn unqualified_finds_are_capped_at_the_page_size() {
    let store = scenarios::authors(60);
    let mut repo = store.repository("Author").unwrap();

    assert_eq!(repo.find_all().unwrap().len(), DEFAULT_PAGE_SIZE as usize);
    assert_eq!(store.count("Author").unwrap(), 60);

    // An explicit limit overrides the cap.
    let all = repo
        .find_by(&Criteria::new(), &FindOptions::limited(60))
        .unwrap();
    assert_eq!(all.len(), 60);
}

#[test]
fn criteria_tokens_are_rewritten_to_columns() {
    let (store, author) = scenarios::single_author("Orwell");
    saved_book(&store, "1984", author.id().unwrap());
    saved_book(&store, "Animal Farm", author.id().unwrap());

    let mut repo = store.repository("Book").unwrap();
    let books = repo
        .find_by(
            &Criteria::new().and("authorId = ?", 1),
            &FindOptions {
                order_by: vec!["title DESC".into()],
                ..FindOptions::default()
            },
        )
        .unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].scalar("title"), Some(&Value::from("Animal Farm")));
    assert_eq!(books[1].scalar("title"), Some(&Value::from("1984")));
}

#[test]
fn count_where_filters_without_hydrating() {
    with_store(|store| {
        for index in 0..7 {
            let mut course = store.new_entity("Course").unwrap();
            course.set("title", format!("course-{index}")).unwrap();
            course.set("active", index < 3).unwrap();
            assert!(store.persist(&mut course).unwrap());
        }

        let repo = store.repository("Course").unwrap();
        let active = repo
            .count_where(&Criteria::new().and("active = ?", true))
            .unwrap();
        assert_eq!(active, 3);
        assert_eq!(store.count("Course").unwrap(), 7);
    });
}

#[test]
fn removing_a_referenced_row_fails_and_leaves_it_in_place() {
    let (store, author) = scenarios::single_author("Orwell");
    saved_book(&store, "1984", author.id().unwrap());

    assert!(!store.remove(&author).unwrap());
    assert_eq!(store.last_message().as_deref(), Some(FK_REMOVE_MESSAGE));
    assert_eq!(store.driver.rows("authors").len(), 1);
    assert!(!store.driver.in_transaction());
}

#[test]
fn remove_succeeds_once_references_are_gone() {
    let (store, author) = scenarios::single_author("Orwell");
    let book = saved_book(&store, "1984", author.id().unwrap());

    assert!(store.remove(&book).unwrap());
    assert!(store.remove(&author).unwrap());
    assert!(store.last_message().is_none());
    assert_eq!(store.count("Author").unwrap(), 0);
}

#[test]
fn duplicate_values_are_rejected_and_rolled_back() {
    let (store, _) = scenarios::single_author("Orwell");

    let mut twin = store.new_entity("Author").unwrap();
    twin.set("name", "Orwell").unwrap();
    assert!(!store.persist(&mut twin).unwrap());

    assert_eq!(store.last_message().as_deref(), Some(DUPLICATE_MESSAGE));
    assert_eq!(store.driver.rows("authors").len(), 1);
    assert!(!twin.has_id());
    assert!(!store.driver.in_transaction());
}

#[test]
fn cascade_failure_rolls_back_the_parent_insert() {
    let (store, _) = scenarios::single_author("Orwell");

    // The child has no title, which the schema requires, so the cascaded
    // insert fails after the parent row went in.
    let untitled = store.new_entity("Book").unwrap();
    let mut author = store.new_entity("Author").unwrap();
    author.set("name", "Tolkien").unwrap();
    author.add_related("books", untitled).unwrap();

    assert!(!store.persist(&mut author).unwrap());
    assert_eq!(store.driver.rows("authors").len(), 1);
    assert!(store.driver.rows("books").is_empty());
    assert!(!store.driver.in_transaction());
}

#[test]
fn repository_result_set_supports_indexing_and_iteration() {
    let store = scenarios::authors(3);
    let mut repo = store.repository("Author").unwrap();
    repo.find_by(
        &Criteria::new(),
        &FindOptions {
            order_by: vec!["name".into()],
            ..FindOptions::default()
        },
    )
    .unwrap();

    assert_eq!(repo.len(), 3);
    assert_eq!(repo[0].scalar("name"), Some(&Value::from("author-0")));
    let names: Vec<_> = (&repo)
        .into_iter()
        .filter_map(|author| author.scalar("name"))
        .collect();
    assert_eq!(names.len(), 3);

    let pairs = repo.to_key_value("id", "name");
    assert_eq!(pairs[0], (Value::Integer(1), Value::from("author-0")));
}
