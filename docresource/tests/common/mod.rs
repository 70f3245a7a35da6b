#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use docresource::{memory::InMemoryStore, prelude::*};

/// Counts the calls that reach the wrapped store, and can refuse every write.
#[derive(Debug, Clone, Default)]
pub struct CountingBackend {
    inner: InMemoryStore,
    queries: Arc<AtomicUsize>,
    returned: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    refuse_writes: bool,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose inserts and updates always come back empty.
    pub fn refusing() -> Self {
        Self {
            refuse_writes: true,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Documents handed back by queries so far.
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreBackend for CountingBackend {
    fn id_field(&self) -> &str {
        self.inner.id_field()
    }

    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        self.inner.init_collection(collection, indexes).await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let documents = self.inner.query_documents(query, collection).await?;
        self.returned.fetch_add(documents.len(), Ordering::SeqCst);
        Ok(documents)
    }

    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>> {
        self.inner.get_document(id, collection).await
    }

    async fn insert_document(&self, document: Document, collection: &str) -> StoreResult<Option<Document>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.refuse_writes {
            return Ok(None);
        }
        self.inner.insert_document(document, collection).await
    }

    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.refuse_writes {
            return Ok(None);
        }
        self.inner.update_document(id, changes, collection).await
    }

    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_document(id, collection).await
    }
}

/// Yields to the scheduler before every call, so concurrent operations polled in
/// the same task interleave step by step.
#[derive(Debug, Clone, Default)]
pub struct YieldingBackend {
    inner: InMemoryStore,
}

impl YieldingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for YieldingBackend {
    fn id_field(&self) -> &str {
        self.inner.id_field()
    }

    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        self.inner.init_collection(collection, indexes).await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        tokio::task::yield_now().await;
        self.inner.query_documents(query, collection).await
    }

    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>> {
        tokio::task::yield_now().await;
        self.inner.get_document(id, collection).await
    }

    async fn insert_document(&self, document: Document, collection: &str) -> StoreResult<Option<Document>> {
        tokio::task::yield_now().await;
        self.inner.insert_document(document, collection).await
    }

    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        tokio::task::yield_now().await;
        self.inner.update_document(id, changes, collection).await
    }

    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        self.inner.delete_document(id, collection).await
    }
}

pub fn user_schema() -> ObjectSchema {
    ObjectSchema::new()
        .required("username", FieldType::String)
        .optional("email", FieldType::String)
        .optional("age", FieldType::Integer)
}

/// `users`: schema-described whitelist, key `username`, index `uid`, unique `email`.
pub async fn users<B: StoreBackend>(backend: B) -> Resource<B> {
    Resource::builder(backend, "users")
        .schema(user_schema())
        .key("username")
        .index("uid")
        .unique(["email"])
        .build()
        .await
        .unwrap()
}
