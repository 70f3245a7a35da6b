//! Storage backends.
//!
//! Re-exports the backend contract and adds [`Backend`], a store selected at runtime.
//! A resource built over [`Backend`] has one concrete type whichever store it wraps.
//!
//! ```ignore
//! let backend = match settings.store.as_str() {
//!     "mongodb" => Backend::from(MongoDbStore::builder(&settings.dsn, "app").build().await?),
//!     _ => Backend::from(InMemoryStore::new()),
//! };
//! let users = Resource::builder(backend, "users").key("username").build().await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};

pub use docresource_core::backend::{IndexSpec, StoreBackend, StoreBackendBuilder, integer_value};

use docresource_core::{error::StoreResult, query::Query};
use docresource_memory::InMemoryStore;
#[cfg(feature = "mongodb")]
use docresource_mongodb::MongoDbStore;

/// One of the bundled backends.
#[derive(Debug)]
pub enum Backend {
    Memory(InMemoryStore),
    #[cfg(feature = "mongodb")]
    MongoDb(MongoDbStore),
}

impl From<InMemoryStore> for Backend {
    fn from(store: InMemoryStore) -> Self {
        Backend::Memory(store)
    }
}

#[cfg(feature = "mongodb")]
impl From<MongoDbStore> for Backend {
    fn from(store: MongoDbStore) -> Self {
        Backend::MongoDb(store)
    }
}

macro_rules! delegate {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Backend::Memory($store) => $call,
            #[cfg(feature = "mongodb")]
            Backend::MongoDb($store) => $call,
        }
    };
}

#[async_trait]
impl StoreBackend for Backend {
    fn id_field(&self) -> &str {
        delegate!(self, store => store.id_field())
    }

    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        delegate!(self, store => store.init_collection(collection, indexes).await)
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        delegate!(self, store => store.query_documents(query, collection).await)
    }

    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>> {
        delegate!(self, store => store.get_document(id, collection).await)
    }

    async fn insert_document(&self, document: Document, collection: &str) -> StoreResult<Option<Document>> {
        delegate!(self, store => store.insert_document(document, collection).await)
    }

    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        delegate!(self, store => store.update_document(id, changes, collection).await)
    }

    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool> {
        delegate!(self, store => store.delete_document(id, collection).await)
    }

    async fn next_index_value(&self, collection: &str, field: &str) -> StoreResult<i64> {
        delegate!(self, store => store.next_index_value(collection, field).await)
    }

    async fn shutdown(self) -> StoreResult<()> {
        delegate!(self, store => store.shutdown().await)
    }
}
