mod common;

use common::{CountingBackend, user_schema, users};
use docresource::{memory::InMemoryStore, prelude::*};

#[tokio::test]
async fn create_then_read_returns_the_stored_document() {
    let users = users(InMemoryStore::new()).await;

    let alice = users
        .create(doc! { "username": "alice", "email": "a@example.com" })
        .await
        .unwrap();

    let id = alice.get("id").cloned().expect("identity assigned");
    assert_eq!(alice.get_str("username").unwrap(), "alice");
    assert_eq!(alice.get_i64("uid").unwrap(), 0);

    assert_eq!(users.read(id.clone()).await.unwrap(), alice);
    assert_eq!(users.read_by_key("alice").await.unwrap(), alice);
    assert_eq!(users.read_by_index(0).await.unwrap(), alice);
}

#[tokio::test]
async fn invalid_documents_never_reach_the_backend() {
    let backend = CountingBackend::new();
    let users = users(&backend).await;

    let err = users
        .create(doc! { "username": 42 })
        .await
        .unwrap_err();

    assert!(matches!(err, ResourceError::Validation(ref c) if c == "users"));
    assert_eq!(backend.queries(), 0);
    assert_eq!(backend.writes(), 0);
}

#[tokio::test]
async fn any_schema_may_accept() {
    let things = Resource::builder(InMemoryStore::new(), "things")
        .schema(|doc: &Document| doc.get_str("name").is_ok())
        .schema(|doc: &Document| doc.get_str("title").is_ok())
        .build()
        .await
        .unwrap();

    things.create(doc! { "name": "a" }).await.unwrap();
    things.create(doc! { "title": "b" }).await.unwrap();
    assert!(matches!(
        things.create(doc! { "label": "c" }).await,
        Err(ResourceError::Validation(_))
    ));
}

#[tokio::test]
async fn resources_without_schemas_accept_anything() {
    let notes = Resource::builder(InMemoryStore::new(), "notes")
        .build()
        .await
        .unwrap();

    let note = notes.create(doc! { "free": { "form": [1, 2] } }).await.unwrap();

    assert_eq!(note.get_document("free").unwrap(), &doc! { "form": [1, 2] });
}

#[tokio::test]
async fn duplicate_key_is_a_conflict() {
    let backend = CountingBackend::new();
    let users = users(&backend).await;

    users.create(doc! { "username": "alice" }).await.unwrap();
    let writes = backend.writes();

    match users.create(doc! { "username": "alice", "email": "other@example.com" }).await {
        Err(ResourceError::Conflict { collection, fields }) => {
            assert_eq!(collection, "users");
            assert_eq!(fields, vec!["username".to_string()]);
        }
        other => panic!("expected a conflict, got {other:?}"),
    }

    assert_eq!(backend.writes(), writes);
    assert_eq!(users.read_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn any_shared_unique_value_conflicts() {
    let users = users(InMemoryStore::new()).await;

    users
        .create(doc! { "username": "alice", "email": "a@example.com" })
        .await
        .unwrap();

    let err = users
        .create(doc! { "username": "bob", "email": "a@example.com" })
        .await
        .unwrap_err();

    assert!(matches!(err, ResourceError::Conflict { ref fields, .. } if fields == &["email"]));
}

#[tokio::test]
async fn caller_index_value_in_use_is_a_conflict() {
    let users = users(InMemoryStore::new()).await;

    users.create(doc! { "username": "a" }).await.unwrap();

    let err = users
        .create(doc! { "username": "b", "uid": 0_i64 })
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Conflict { ref fields, .. } if fields == &["uid"]));

    // Integer width does not matter when comparing index values.
    assert!(matches!(
        users.is_admissible(doc! { "username": "b", "uid": 0 }).await,
        Err(ResourceError::Conflict { .. })
    ));
    assert_eq!(users.read_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unused_caller_index_values_are_replaced() {
    let users = users(InMemoryStore::new()).await;

    users.create(doc! { "username": "a" }).await.unwrap();
    let b = users.create(doc! { "username": "b", "uid": 99 }).await.unwrap();
    let c = users.create(doc! { "username": "c" }).await.unwrap();

    assert_eq!(b.get_i64("uid").unwrap(), 1);
    assert_eq!(c.get_i64("uid").unwrap(), 2);
}

#[tokio::test]
async fn sequential_creates_allocate_increasing_indexes() {
    let users = users(InMemoryStore::new()).await;

    let mut indexes = Vec::new();
    for name in ["a", "b", "c", "d"] {
        let created = users.create(doc! { "username": name }).await.unwrap();
        indexes.push(created.get_i64("uid").unwrap());
    }

    assert_eq!(indexes, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn only_whitelisted_properties_are_stored() {
    let users = users(InMemoryStore::new()).await;

    let stored = users
        .create(doc! { "username": "alice", "age": 30, "is_admin": true })
        .await
        .unwrap();

    assert!(!stored.contains_key("is_admin"));
    assert_eq!(stored.get_i32("age").unwrap(), 30);
}

#[tokio::test]
async fn validation_sees_properties_the_whitelist_drops() {
    let accounts = Resource::builder(InMemoryStore::new(), "accounts")
        .schema(|doc: &Document| doc.get_str("name").is_ok() && doc.get_bool("accepted_terms").unwrap_or(false))
        .props(["name"])
        .build()
        .await
        .unwrap();

    let stored = accounts
        .create(doc! { "name": "a", "accepted_terms": true })
        .await
        .unwrap();

    assert!(!stored.contains_key("accepted_terms"));
    assert!(accounts.create(doc! { "name": "b" }).await.is_err());
}

#[tokio::test]
async fn explicit_props_win_over_schema_properties() {
    let users = Resource::builder(InMemoryStore::new(), "users")
        .schema(user_schema())
        .props(["username"])
        .build()
        .await
        .unwrap();

    let stored = users
        .create(doc! { "username": "a", "email": "a@example.com" })
        .await
        .unwrap();

    assert!(!stored.contains_key("email"));
    assert!(users.config().filter().is_filtering());
}

#[tokio::test]
async fn unique_properties_always_include_identity() {
    let plain = Resource::builder(InMemoryStore::new(), "plain")
        .build()
        .await
        .unwrap();

    assert!(plain.config().unique().contains("id"));

    let users = users(InMemoryStore::new()).await;
    let unique = users
        .config()
        .unique()
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>();
    assert_eq!(unique, ["email", "id", "uid", "username"]);
}

#[tokio::test]
async fn documents_without_unique_properties_skip_the_uniqueness_query() {
    let backend = CountingBackend::new();
    let notes = Resource::builder(&backend, "notes")
        .build()
        .await
        .unwrap();

    notes.create(doc! { "text": "hello" }).await.unwrap();

    assert_eq!(backend.queries(), 0);
    assert_eq!(backend.writes(), 1);
}

#[tokio::test]
async fn refused_insert_is_a_persistence_failure() {
    let users = users(CountingBackend::refusing()).await;

    match users.create(doc! { "username": "alice" }).await {
        Err(ResourceError::Persistence(message)) => assert_eq!(message, "document not created"),
        other => panic!("expected a persistence failure, got {other:?}"),
    }
}

#[tokio::test]
async fn is_admissible_checks_without_writing() {
    let backend = CountingBackend::new();
    let users = users(&backend).await;
    users.create(doc! { "username": "alice" }).await.unwrap();
    let writes = backend.writes();

    assert!(users.is_admissible(doc! { "username": "bob" }).await.is_ok());
    assert!(matches!(
        users.is_admissible(doc! { "username": "alice" }).await,
        Err(ResourceError::Conflict { .. })
    ));
    assert!(matches!(
        users.is_admissible(doc! { "name": "x" }).await,
        Err(ResourceError::Validation(_))
    ));
    assert_eq!(backend.writes(), writes);
}

#[tokio::test]
async fn updates_only_touch_existing_non_unique_properties() {
    let users = users(InMemoryStore::new()).await;
    let alice = users
        .create(doc! { "username": "alice", "email": "a@example.com", "age": 30 })
        .await
        .unwrap();

    let updated = users
        .update(
            alice.get("id").cloned().unwrap(),
            doc! { "age": 31, "username": "mallory", "email": "m@example.com", "uid": 7, "nickname": "al" },
        )
        .await
        .unwrap();

    assert_eq!(updated.get_i32("age").unwrap(), 31);
    assert_eq!(updated.get_str("username").unwrap(), "alice");
    assert_eq!(updated.get_str("email").unwrap(), "a@example.com");
    assert_eq!(updated.get_i64("uid").unwrap(), 0);
    assert!(!updated.contains_key("nickname"));
    assert_eq!(users.read_by_key("alice").await.unwrap(), updated);
}

#[tokio::test]
async fn updates_are_revalidated_after_merging() {
    let users = users(InMemoryStore::new()).await;
    users
        .create(doc! { "username": "alice", "age": 30 })
        .await
        .unwrap();

    let err = users
        .update_by_key("alice", doc! { "age": "thirty" })
        .await
        .unwrap_err();

    assert!(matches!(err, ResourceError::Validation(_)));
    assert_eq!(users.read_by_key("alice").await.unwrap().get_i32("age").unwrap(), 30);
}

#[tokio::test]
async fn update_by_index_addresses_the_allocated_index() {
    let users = users(InMemoryStore::new()).await;
    users.create(doc! { "username": "a", "age": 1 }).await.unwrap();
    users.create(doc! { "username": "b", "age": 2 }).await.unwrap();

    let b = users.update_by_index(1, doc! { "age": 20 }).await.unwrap();

    assert_eq!(b.get_str("username").unwrap(), "b");
    assert_eq!(b.get_i32("age").unwrap(), 20);
}

#[tokio::test]
async fn refused_update_is_a_persistence_failure() {
    let backend = CountingBackend::refusing();
    backend
        .inner()
        .insert_document(doc! { "id": "x", "username": "alice", "age": 1 }, "users")
        .await
        .unwrap();
    let users = users(backend).await;

    match users.update("x", doc! { "age": 2 }).await {
        Err(ResourceError::Persistence(message)) => assert_eq!(message, "document not updated"),
        other => panic!("expected a persistence failure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_documents_are_not_found() {
    let users = users(InMemoryStore::new()).await;

    assert!(matches!(users.read("nope").await, Err(ResourceError::NotFound(..))));
    assert!(matches!(users.read_by_key("nope").await, Err(ResourceError::NotFound(..))));
    assert!(matches!(users.read_by_index(3).await, Err(ResourceError::NotFound(..))));
    assert!(matches!(
        users.update("nope", doc! { "age": 1 }).await,
        Err(ResourceError::NotFound(..))
    ));
    assert!(matches!(users.delete("nope").await, Err(ResourceError::NotFound(..))));
}

#[tokio::test]
async fn key_and_index_operations_need_configuration() {
    let notes = Resource::builder(InMemoryStore::new(), "notes")
        .build()
        .await
        .unwrap();

    assert!(matches!(notes.read_by_key("a").await, Err(ResourceError::Configuration(_))));
    assert!(matches!(notes.read_by_index(0).await, Err(ResourceError::Configuration(_))));
    assert!(matches!(
        notes.update_by_key("a", doc! {}).await,
        Err(ResourceError::Configuration(_))
    ));
    assert!(matches!(notes.delete_by_index(0).await, Err(ResourceError::Configuration(_))));
}

#[tokio::test]
async fn deletes_report_missing_documents() {
    let users = users(InMemoryStore::new()).await;
    let alice = users.create(doc! { "username": "alice" }).await.unwrap();
    users.create(doc! { "username": "bob" }).await.unwrap();
    users.create(doc! { "username": "carol" }).await.unwrap();

    let id = alice.get("id").cloned().unwrap();
    users.delete(id.clone()).await.unwrap();
    assert!(matches!(users.delete(id).await, Err(ResourceError::NotFound(..))));

    users.delete_by_key("bob").await.unwrap();
    assert!(matches!(users.delete_by_key("bob").await, Err(ResourceError::NotFound(..))));

    users.delete_by_index(2).await.unwrap();
    assert!(users.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn find_matches_every_predicate_property() {
    let users = users(InMemoryStore::new()).await;
    for (name, age) in [("a", 30), ("b", 30), ("c", 40)] {
        users
            .create(doc! { "username": name, "age": age })
            .await
            .unwrap();
    }

    let thirty = users.find(&doc! { "age": 30 }).await.unwrap();
    assert_eq!(thirty.len(), 2);

    let b = users.find(&doc! { "age": 30, "username": "b" }).await.unwrap();
    assert_eq!(b.len(), 1);

    assert!(users.find(&doc! { "age": 40, "username": "a" }).await.unwrap().is_empty());

    let names = users
        .read_all()
        .await
        .unwrap()
        .iter()
        .map(|u| u.get_str("username").unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, ["a", "b", "c"]);
}

#[tokio::test]
async fn structured_queries_sort_and_paginate() {
    let users = users(InMemoryStore::new()).await;
    for (name, age) in [("a", 30), ("b", 20), ("c", 40)] {
        users.create(doc! { "username": name, "age": age }).await.unwrap();
    }

    let youngest = users
        .query(
            Query::builder()
                .filter(Filter::gte("age", 25))
                .sort("age", SortDirection::Asc)
                .limit(1)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(youngest.len(), 1);
    assert_eq!(youngest[0].get_str("username").unwrap(), "a");
}

#[tokio::test]
async fn transforms_apply_on_the_way_in_and_out() {
    let users = Resource::builder(InMemoryStore::new(), "users")
        .schema(user_schema())
        .key("username")
        .map_in(|mut doc: Document| {
            if let Ok(name) = doc.get_str("username") {
                let lower = name.to_lowercase();
                doc.insert("username", lower);
            }
            doc
        })
        .map_out(|mut doc: Document| {
            doc.remove("id");
            doc
        })
        .build()
        .await
        .unwrap();

    let created = users.create(doc! { "username": "Alice" }).await.unwrap();
    assert_eq!(created, doc! { "username": "alice" });

    assert!(matches!(
        users.create(doc! { "username": "ALICE" }).await,
        Err(ResourceError::Conflict { .. })
    ));

    let read = users.read_by_key("alice").await.unwrap();
    assert!(!read.contains_key("id"));
}

#[tokio::test]
async fn options_configure_resources_declaratively() {
    let options: ResourceOptions = serde_json::from_str(
        r#"{ "key": "sku", "index": "n", "uniq": ["barcode"], "props": ["sku", "barcode", "price"], "path": "products" }"#,
    )
    .unwrap();

    let products = Resource::builder(InMemoryStore::new(), "catalog")
        .options(options)
        .build()
        .await
        .unwrap();

    let created = products
        .create(doc! { "sku": "A1", "barcode": "123", "price": 10, "secret": true })
        .await
        .unwrap();

    assert_eq!(created.get_i64("n").unwrap(), 0);
    assert!(!created.contains_key("secret"));
    assert_eq!(products.config().path(), Some("products"));
    assert!(matches!(
        products.create(doc! { "sku": "B2", "barcode": "123" }).await,
        Err(ResourceError::Conflict { .. })
    ));
}

#[tokio::test]
async fn resources_run_over_the_runtime_selected_backend() {
    let users = users(Backend::from(InMemoryStore::new())).await;

    users.create(doc! { "username": "alice" }).await.unwrap();

    assert_eq!(users.backend().id_field(), "id");
    assert_eq!(users.read_by_index(0).await.unwrap().get_str("username").unwrap(), "alice");
}

#[tokio::test]
async fn backend_failures_pass_through() {
    #[derive(Debug)]
    struct Broken;

    #[async_trait::async_trait]
    impl StoreBackend for Broken {
        fn id_field(&self) -> &str {
            "id"
        }

        async fn init_collection(&self, _: &str, _: &[IndexSpec]) -> StoreResult<()> {
            Ok(())
        }

        async fn query_documents(&self, _: Query, _: &str) -> StoreResult<Vec<Document>> {
            Err(StoreError::Backend("connection reset".into()))
        }

        async fn get_document(&self, _: &Bson, _: &str) -> StoreResult<Option<Document>> {
            Err(StoreError::Backend("connection reset".into()))
        }

        async fn insert_document(&self, _: Document, _: &str) -> StoreResult<Option<Document>> {
            Err(StoreError::Backend("connection reset".into()))
        }

        async fn update_document(&self, _: &Bson, _: Document, _: &str) -> StoreResult<Option<Document>> {
            Err(StoreError::Backend("connection reset".into()))
        }

        async fn delete_document(&self, _: &Bson, _: &str) -> StoreResult<bool> {
            Err(StoreError::Backend("connection reset".into()))
        }
    }

    let users = users(Broken).await;

    assert!(matches!(
        users.create(doc! { "username": "alice" }).await,
        Err(ResourceError::Store(StoreError::Backend(_)))
    ));
    assert!(matches!(
        users.read("x").await,
        Err(ResourceError::Store(StoreError::Backend(_)))
    ));
}

#[tokio::test]
async fn closed_merge_on_caller_supplied_identity() {
    let people = Resource::builder(InMemoryStore::new(), "people")
        .build()
        .await
        .unwrap();
    people
        .create(doc! { "id": 1, "name": "a", "age": 5 })
        .await
        .unwrap();

    let updated = people.update(1, doc! { "age": 6, "extra": 9 }).await.unwrap();

    assert_eq!(updated, doc! { "id": 1, "name": "a", "age": 6 });
    assert_eq!(people.read(1).await.unwrap(), updated);
}

#[tokio::test]
async fn read_after_create_equals_the_mapped_cleaned_input() {
    let users = Resource::builder(InMemoryStore::new(), "users")
        .schema(user_schema())
        .index("uid")
        .map_in(|mut doc: Document| {
            doc.insert("age", 18);
            doc
        })
        .map_out(|mut doc: Document| {
            doc.insert("seen", true);
            doc
        })
        .build()
        .await
        .unwrap();

    let input = doc! { "username": "alice", "nickname": "al" };
    let created = users.create(input).await.unwrap();
    let mut read = users.read(created.get("id").cloned().unwrap()).await.unwrap();

    read.remove("id");
    read.remove("uid");
    assert_eq!(read, doc! { "username": "alice", "age": 18, "seen": true });
}

#[tokio::test]
async fn key_and_index_lookups_fetch_a_single_document() {
    let backend = CountingBackend::new();
    let users = users(&backend).await;

    for age in [1, 2, 3] {
        backend
            .inner()
            .insert_document(doc! { "username": "twin", "uid": 5_i64, "age": age }, "users")
            .await
            .unwrap();
    }

    let before = backend.returned();
    let by_key = users.read_by_key("twin").await.unwrap();
    let by_index = users.read_by_index(5).await.unwrap();

    assert_eq!(backend.returned() - before, 2);
    assert_eq!(by_key.get_i32("age").unwrap(), 1);
    assert_eq!(by_index, by_key);
}
