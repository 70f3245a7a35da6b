//! In-memory storage implementation.
//!
//! Documents live in insertion order inside per-collection vectors guarded by an
//! async-aware read-write lock. Each call takes the lock once, so every single call is
//! atomic; sequences of calls are not.

use async_trait::async_trait;
use bson::{Bson, Document, Uuid};
use mea::rwlock::RwLock;
use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use tracing::debug;

use docresource_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    error::StoreResult,
    query::{Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, values_equal};

/// Property holding the native identity of in-memory documents.
pub const ID_FIELD: &str = "id";

#[derive(Debug, Default)]
struct CollectionState {
    documents: Vec<Document>,
    /// Properties with a unique index.
    unique: BTreeSet<String>,
}

impl CollectionState {
    fn position(&self, id: &Bson) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| doc.get(ID_FIELD).is_some_and(|value| values_equal(value, id)))
    }

    /// First unique property for which a document other than `skip` holds the same value.
    fn violation(&self, candidate: &Document, skip: Option<usize>) -> Option<&str> {
        self.unique
            .iter()
            .find(|field| {
                candidate.get(field.as_str()).is_some_and(|value| {
                    self.documents
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| Some(*i) != skip)
                        .any(|(_, doc)| {
                            doc.get(field.as_str())
                                .is_some_and(|other| values_equal(other, value))
                        })
                })
            })
            .map(String::as_str)
    }
}

type StoreMap = HashMap<String, CollectionState>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to
/// be shared across async tasks. Clones share the same underlying data.
///
/// Identities are stored under `"id"`; documents inserted without one get a fresh
/// UUID. Queries scan the whole collection.
///
/// Unique indexes requested at init are enforced: an insert or update that would
/// duplicate an indexed value is refused with `Ok(None)`.
///
/// # Example
///
/// ```ignore
/// use docresource_memory::InMemoryStore;
/// use docresource_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let stored = store.insert_document(doc! { "name": "Alice" }, "users").await?.unwrap();
/// assert!(stored.contains_key("id"));
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents and indexes
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Names of the collections created so far.
    pub async fn collections(&self) -> Vec<String> {
        self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect()
    }

    /// Number of documents in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, |state| state.documents.len())
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    fn id_field(&self) -> &str {
        ID_FIELD
    }

    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let state = store
            .entry(collection.to_string())
            .or_default();

        state.unique.extend(
            indexes
                .iter()
                .filter(|index| index.unique)
                .map(|index| index.field.clone()),
        );

        Ok(())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(state) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(&state.documents, filter)?,
            None => state.documents.clone(),
        };

        if let Some(sort) = &query.sort {
            // Stable sort: ties keep insertion order.
            documents.sort_by(|a, b| {
                let left = a
                    .get(&sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = b
                    .get(&sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match sort.direction {
                    SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                    SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
                }
            });
        }

        Ok(documents
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>> {
        let store = self.store.read().await;

        Ok(store.get(collection).and_then(|state| {
            state
                .position(id)
                .map(|i| state.documents[i].clone())
        }))
    }

    async fn insert_document(&self, mut document: Document, collection: &str) -> StoreResult<Option<Document>> {
        let mut store = self.store.write().await;
        let state = store
            .entry(collection.to_string())
            .or_default();

        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::from(Uuid::new());
                document.insert(ID_FIELD, id.clone());
                id
            }
        };

        if state.position(&id).is_some() {
            debug!(collection, id = %id, "insert refused: duplicate id");
            return Ok(None);
        }

        if let Some(field) = state.violation(&document, None) {
            debug!(collection, field, "insert refused: unique index violation");
            return Ok(None);
        }

        state.documents.push(document.clone());

        Ok(Some(document))
    }

    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(collection) else {
            return Ok(None);
        };
        let Some(position) = state.position(id) else {
            return Ok(None);
        };

        let mut updated = state.documents[position].clone();
        for (key, value) in changes {
            if key != ID_FIELD {
                updated.insert(key, value);
            }
        }

        if let Some(field) = state.violation(&updated, Some(position)) {
            debug!(collection, field, "update refused: unique index violation");
            return Ok(None);
        }

        state.documents[position] = updated.clone();

        Ok(Some(updated))
    }

    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool> {
        let mut store = self.store.write().await;
        let Some(state) = store.get_mut(collection) else {
            return Ok(false);
        };

        Ok(match state.position(id) {
            Some(position) => {
                state.documents.remove(position);
                true
            }
            None => false,
        })
    }
}

/// Builder for [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
