mod common;

use common::users;
use docresource::{bson::Uuid, memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<i32>,
}

impl User {
    fn new(username: &str) -> Self {
        Self {
            id: None,
            username: username.to_string(),
            uid: None,
            age: None,
        }
    }
}

#[tokio::test]
async fn typed_values_go_through_the_same_lifecycle() {
    let resource = users(InMemoryStore::new()).await;
    let users = resource.typed::<User>();

    let alice = users.create(&User::new("alice")).await.unwrap();
    assert!(alice.id.is_some());
    assert_eq!(alice.uid, Some(0));

    assert_eq!(users.read_by_key("alice").await.unwrap(), alice);
    assert_eq!(users.read_by_index(0).await.unwrap(), alice);
    assert_eq!(users.read(alice.id.unwrap()).await.unwrap(), alice);

    assert!(matches!(
        users.create(&User::new("alice")).await,
        Err(ResourceError::Conflict { .. })
    ));
}

#[tokio::test]
async fn typed_updates_and_deletes() {
    let resource = users(InMemoryStore::new()).await;
    let users = resource.typed::<User>();

    let bob = users
        .create(&User {
            age: Some(40),
            ..User::new("bob")
        })
        .await
        .unwrap();
    let id = bob.id.unwrap();

    let older = users.update(id, doc! { "age": 41 }).await.unwrap();
    assert_eq!(older.age, Some(41));
    assert_eq!(older.username, "bob");

    assert_eq!(users.find(&doc! { "age": 41 }).await.unwrap(), vec![older]);

    users.delete(id).await.unwrap();
    assert!(users.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn stored_documents_that_do_not_fit_the_type_fail_to_decode() {
    let resource = Resource::builder(InMemoryStore::new(), "users")
        .key("username")
        .build()
        .await
        .unwrap();

    resource.create(doc! { "username": 7 }).await.unwrap();

    assert!(matches!(
        resource.typed::<User>().read_by_key(7).await,
        Err(ResourceError::Store(StoreError::Serialization(_)))
    ));
}
