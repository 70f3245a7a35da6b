//! Storage backend abstraction.
//!
//! [`StoreBackend`] is the Database Adapter contract: every supported document
//! database gets one implementation, and the resource layer only ever talks to a
//! backend through it. Arguments are abstract (a [`Query`] built from property/value
//! mappings, a native identity value), so the resource layer never sees backend
//! query syntax.
//!
//! # Identity
//!
//! Each backend names the property holding its native identity
//! ([`StoreBackend::id_field`]) and assigns a value on insert when the document does
//! not carry one.
//!
//! # Consistency
//!
//! Nothing in this contract is transactional across calls. In particular
//! [`StoreBackend::next_index_value`] is read-then-compute: two concurrent callers can
//! receive the same value. Backends that can enforce unique indexes do so when asked
//! through [`IndexSpec::unique`] at [`StoreBackend::init_collection`] time.
//!
//! ```ignore
//! use docresource::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let stored = backend.insert_document(doc! { "name": "Alice" }, "users").await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::StoreResult,
    query::{Filter, Query, SortDirection},
};

/// Index requested by a resource when its collection is initialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Indexed property.
    pub field: String,
    /// Whether the backend should reject duplicate values for the property.
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>, unique: bool) -> Self {
        Self { field: field.into(), unique }
    }
}

/// Abstract interface for document storage backends.
///
/// All implementations must be thread-safe and support concurrent access from
/// multiple async tasks.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Name of the property holding the backend's native document identity.
    fn id_field(&self) -> &str;

    /// Prepares a collection for use. Must be idempotent.
    ///
    /// Creates the collection when the backend needs it to exist and ensures the
    /// requested indexes exist.
    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()>;

    /// Returns the documents matching `query`.
    ///
    /// Result order is backend-defined unless the query carries a sort.
    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>>;

    /// Fetches one document by native identity.
    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>>;

    /// Inserts a document and returns it as persisted, identity included.
    ///
    /// Returns `Ok(None)` when the backend refused the write, e.g. because a unique
    /// constraint was violated.
    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>>;

    /// Sets the given properties on the document with identity `id` and returns the
    /// document after the update.
    ///
    /// Returns `Ok(None)` when no such document exists or the backend refused the write.
    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>>;

    /// Deletes the document with identity `id`. Returns whether a document was removed.
    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool>;

    /// Next unused value for an auto-increment property: the current numeric maximum
    /// plus one, or `0` when no document holds a number there.
    async fn next_index_value(&self, collection: &str, field: &str) -> StoreResult<i64> {
        let highest = self
            .query_documents(
                Query::builder()
                    .filter(Filter::gte(field, 0))
                    .sort(field, SortDirection::Desc)
                    .limit(1)
                    .build(),
                collection,
            )
            .await?
            .first()
            .and_then(|doc| doc.get(field))
            .and_then(integer_value)
            .unwrap_or(-1);

        Ok(highest + 1)
    }

    /// Cleanly shuts down the backend, releasing all resources.
    async fn shutdown(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Reads an integral value out of any BSON numeric type.
pub fn integer_value(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    fn id_field(&self) -> &str {
        (**self).id_field()
    }

    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        (**self)
            .init_collection(collection, indexes)
            .await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        (**self)
            .query_documents(query, collection)
            .await
    }

    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>> {
        (**self).get_document(id, collection).await
    }

    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        (**self)
            .insert_document(document, collection)
            .await
    }

    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        (**self)
            .update_document(id, changes, collection)
            .await
    }

    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool> {
        (**self).delete_document(id, collection).await
    }

    async fn next_index_value(&self, collection: &str, field: &str) -> StoreResult<i64> {
        (**self)
            .next_index_value(collection, field)
            .await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    fn id_field(&self) -> &str {
        (**self).id_field()
    }

    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        (**self)
            .init_collection(collection, indexes)
            .await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        (**self)
            .query_documents(query, collection)
            .await
    }

    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>> {
        (**self).get_document(id, collection).await
    }

    async fn insert_document(
        &self,
        document: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        (**self)
            .insert_document(document, collection)
            .await
    }

    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        (**self)
            .update_document(id, changes, collection)
            .await
    }

    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool> {
        (**self).delete_document(id, collection).await
    }

    async fn next_index_value(&self, collection: &str, field: &str) -> StoreResult<i64> {
        (**self)
            .next_index_value(collection, field)
            .await
    }
}

/// Factory for backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
