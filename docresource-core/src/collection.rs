//! A backend bound to one collection.
//!
//! [`Collection`] is the adapter view a resource works through: the Database Adapter
//! contract operations with the collection name already applied, taking property/value
//! mappings and native identities instead of backend queries.

use bson::{Bson, Document};

use crate::{
    backend::{IndexSpec, StoreBackend},
    error::StoreResult,
    query::{Filter, Query},
};

/// A named collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: &'a str,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub fn new(name: &'a str, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Name of the backend's native identity property.
    pub fn id_field(&self) -> &str {
        self.backend.id_field()
    }

    /// Idempotent setup: ensures the collection and the given indexes exist.
    pub async fn init(&self, indexes: &[IndexSpec]) -> StoreResult<()> {
        self.backend
            .init_collection(self.name, indexes)
            .await
    }

    /// Documents whose properties equal every entry of `predicate`.
    /// An empty predicate returns the whole collection.
    pub async fn find_matching(&self, predicate: &Document) -> StoreResult<Vec<Document>> {
        self.query(Query::matching(predicate)).await
    }

    /// Documents sharing at least one property value with `properties`.
    /// An empty mapping matches nothing and skips the backend entirely.
    pub async fn find_any(&self, properties: &Document) -> StoreResult<Vec<Document>> {
        match Filter::any_equal(properties) {
            Some(filter) => {
                self.query(Query::builder().filter(filter).build())
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Runs a structured query against the collection.
    pub async fn query(&self, query: Query) -> StoreResult<Vec<Document>> {
        self.backend
            .query_documents(query, self.name)
            .await
    }

    pub async fn get_by_id(&self, id: &Bson) -> StoreResult<Option<Document>> {
        self.backend.get_document(id, self.name).await
    }

    pub async fn insert(&self, document: Document) -> StoreResult<Option<Document>> {
        self.backend
            .insert_document(document, self.name)
            .await
    }

    pub async fn update_by_id(&self, id: &Bson, changes: Document) -> StoreResult<Option<Document>> {
        self.backend
            .update_document(id, changes, self.name)
            .await
    }

    pub async fn delete_by_id(&self, id: &Bson) -> StoreResult<bool> {
        self.backend
            .delete_document(id, self.name)
            .await
    }

    pub async fn next_index_value(&self, field: &str) -> StoreResult<i64> {
        self.backend
            .next_index_value(self.name, field)
            .await
    }
}
