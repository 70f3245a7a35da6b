use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions, ReturnDocument},
};
use tracing::debug;

use docresource_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
    query::{Query, QueryVisitor, SortDirection},
};

use crate::{query::MongoQueryTranslator, sanitizer::KeySanitizer};

/// Property holding MongoDB's native identity.
pub const ID_FIELD: &str = "_id";

const DUPLICATE_KEY: i32 = 11000;
const NAMESPACE_EXISTS: i32 = 48;

fn backend_error(err: MongoError) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn error_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        _ => None,
    }
}

/// Builds the index for one property. Unique indexes only cover documents that hold
/// the property, so any number of documents may omit it.
fn index_model(index: &IndexSpec) -> IndexModel {
    let field = KeySanitizer::sanitize_key(&index.field);

    let mut keys = Document::new();
    keys.insert(field.as_str(), 1);

    let present = index.unique.then(|| {
        let mut filter = Document::new();
        filter.insert(field.as_str(), doc! { "$exists": true });
        filter
    });

    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(index.unique)
                .partial_filter_expression(present)
                .build(),
        )
        .build()
}

/// MongoDB storage backend.
///
/// Documents are identified by `_id`; inserts without one get a fresh `ObjectId`.
/// Unique indexes requested at init become MongoDB unique indexes, and writes the
/// server rejects with a duplicate-key error come back as `Ok(None)`.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::sanitize_key(collection_name))
    }

    fn find_options(query: &Query) -> FindOptions {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            let field = KeySanitizer::sanitize_key(&sort.field);
            options.sort = Some(doc! {
                field: match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            });
        }

        options
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    fn id_field(&self) -> &str {
        ID_FIELD
    }

    async fn init_collection(&self, collection: &str, indexes: &[IndexSpec]) -> StoreResult<()> {
        let database = self.client.database(&self.database);
        let name = KeySanitizer::sanitize_key(collection);

        let existing = database
            .list_collection_names()
            .await
            .map_err(backend_error)?;

        if !existing.contains(&name) {
            match database.create_collection(&name).await {
                Ok(()) => debug!(collection, "collection created"),
                // Another process created it in the meantime.
                Err(err) if error_code(&err) == Some(NAMESPACE_EXISTS) => {}
                Err(err) => return Err(backend_error(err)),
            }
        }

        if indexes.is_empty() {
            return Ok(());
        }

        // Creating an index that already exists with the same options is a no-op.
        self.get_collection(collection)
            .create_indexes(indexes.iter().map(index_model))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Document>> {
        let filter = match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr)?,
            None => doc! {},
        };

        Ok(self
            .get_collection(collection)
            .find(filter)
            .with_options(Self::find_options(&query))
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .iter()
            .map(KeySanitizer::restore_document)
            .collect())
    }

    async fn get_document(&self, id: &Bson, collection: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .get_collection(collection)
            .find_one(doc! { "_id": id.clone() })
            .await
            .map_err(backend_error)?
            .as_ref()
            .map(KeySanitizer::restore_document))
    }

    async fn insert_document(&self, document: Document, collection: &str) -> StoreResult<Option<Document>> {
        let mut prepared = KeySanitizer::sanitize_document(&document);
        if !prepared.contains_key(ID_FIELD) {
            prepared.insert(ID_FIELD, ObjectId::new());
        }

        match self
            .get_collection(collection)
            .insert_one(&prepared)
            .await
        {
            Ok(_) => Ok(Some(KeySanitizer::restore_document(&prepared))),
            Err(err) if error_code(&err) == Some(DUPLICATE_KEY) => {
                debug!(collection, error = %err, "insert refused: duplicate key");
                Ok(None)
            }
            Err(err) => Err(backend_error(err)),
        }
    }

    async fn update_document(
        &self,
        id: &Bson,
        changes: Document,
        collection: &str,
    ) -> StoreResult<Option<Document>> {
        let mut changes = KeySanitizer::sanitize_document(&changes);
        changes.remove(ID_FIELD);

        // `$set` rejects an empty document.
        if changes.is_empty() {
            return self.get_document(id, collection).await;
        }

        match self
            .get_collection(collection)
            .find_one_and_update(doc! { "_id": id.clone() }, doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await
        {
            Ok(updated) => Ok(updated
                .as_ref()
                .map(KeySanitizer::restore_document)),
            Err(err) if error_code(&err) == Some(DUPLICATE_KEY) => {
                debug!(collection, error = %err, "update refused: duplicate key");
                Ok(None)
            }
            Err(err) => Err(backend_error(err)),
        }
    }

    async fn delete_document(&self, id: &Bson, collection: &str) -> StoreResult<bool> {
        Ok(self
            .get_collection(collection)
            .delete_one(doc! { "_id": id.clone() })
            .await
            .map_err(backend_error)?
            .deleted_count
            > 0)
    }

    async fn shutdown(self) -> StoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| StoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| StoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_indexes_skip_documents_without_the_property() {
        let model = index_model(&IndexSpec::new("email", true));
        let options = model.options.unwrap();

        assert_eq!(model.keys, doc! { "email": 1 });
        assert_eq!(options.unique, Some(true));
        assert_eq!(
            options.partial_filter_expression,
            Some(doc! { "email": { "$exists": true } })
        );
    }

    #[test]
    fn plain_indexes_cover_every_document() {
        let options = index_model(&IndexSpec::new("age", false)).options.unwrap();

        assert_eq!(options.unique, Some(false));
        assert_eq!(options.partial_filter_expression, None);
    }

    #[test]
    fn index_keys_are_sanitized() {
        let model = index_model(&IndexSpec::new("$score", true));
        let key = KeySanitizer::sanitize_key("$score");

        assert_eq!(model.keys.keys().next(), Some(&key));
    }
}
