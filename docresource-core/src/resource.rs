//! The resource manager.
//!
//! A [`Resource`] owns the configuration of one logical collection and runs every
//! document through the same lifecycle:
//!
//! ```text
//! create:  in-map -> validate -> uniqueness check -> clean -> allocate index -> insert -> out-map
//! update:  read -> in-map updates -> closed merge -> validate -> strip unique -> clean -> update -> out-map
//! ```
//!
//! Each step awaits the previous one. Across concurrent calls there is no ordering and
//! no mutual exclusion: the uniqueness check and the index allocation both read state
//! that a concurrent create may change before this create writes. Two creates can
//! therefore both pass the uniqueness check for the same value, or both receive the
//! same index. Exclusivity has to come from the backend (see
//! [`ResourceBuilder::unique_indexes`]) or from serialisation above the resource.
//!
//! ```ignore
//! use docresource::prelude::*;
//!
//! let users = Resource::builder(InMemoryStore::new(), "users")
//!     .schema(|doc: &bson::Document| doc.get_str("username").is_ok())
//!     .key("username")
//!     .index("uid")
//!     .build()
//!     .await?;
//!
//! let alice = users.create(doc! { "username": "alice" }).await?;
//! let same = users.read_by_key("alice").await?;
//! ```

use bson::{Bson, Document};
use tracing::{debug, trace};

use crate::{
    backend::{StoreBackend, integer_value},
    collection::Collection,
    config::{ResourceBuilder, ResourceConfig},
    error::{ResourceError, ResourceResult, StoreError},
    props,
    query::Query,
    typed::TypedResource,
};

/// One configured collection of documents with schema, key and uniqueness policy.
///
/// The resource holds only immutable configuration and the backend handle, so a
/// single instance can serve many concurrent callers.
#[derive(Debug)]
pub struct Resource<B: StoreBackend> {
    backend: B,
    config: ResourceConfig,
}

impl<B: StoreBackend> Resource<B> {
    /// Starts configuring a resource over `collection` in `backend`.
    pub fn builder(backend: B, collection: impl Into<String>) -> ResourceBuilder<B> {
        ResourceBuilder::new(backend, collection)
    }

    pub(crate) async fn initialise(backend: B, config: ResourceConfig) -> ResourceResult<Self> {
        let resource = Self { backend, config };
        let indexes = resource
            .config
            .indexes(resource.backend.id_field());

        resource.collection().init(&indexes).await?;

        debug!(
            collection = %resource.config.collection,
            indexes = indexes.len(),
            "resource initialised"
        );

        Ok(resource)
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The adapter view of this resource's collection.
    pub fn collection(&self) -> Collection<'_, B> {
        Collection::new(&self.config.collection, &self.backend)
    }

    /// Serde-typed view over this resource.
    pub fn typed<T>(&self) -> TypedResource<'_, B, T> {
        TypedResource::new(self)
    }

    /// Whether any schema accepts `document`, as given.
    pub fn is_valid(&self, document: &Document) -> bool {
        self.config.validator.is_valid(document)
    }

    /// Applies the property whitelist to `document`.
    pub fn clean(&self, document: Document) -> Document {
        self.config.filter.clean(document)
    }

    /// Runs the validity and uniqueness gates of `create` without writing anything.
    pub async fn is_admissible(&self, document: Document) -> ResourceResult<()> {
        self.admit(document).await.map(|_| ())
    }

    /// Creates a document.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::Validation`] when no schema accepts the mapped document;
    ///   the backend is not touched.
    /// - [`ResourceError::Conflict`] when a document already holds one of its unique
    ///   property values.
    /// - [`ResourceError::Persistence`] when the backend refuses the insert after
    ///   both gates passed.
    pub async fn create(&self, document: Document) -> ResourceResult<Document> {
        let document = self.admit(document).await?;
        let mut document = self.config.filter.clean(document);

        // An admissible caller-supplied index value is still replaced.
        if let Some(index) = &self.config.index {
            let value = self
                .collection()
                .next_index_value(index)
                .await?;

            trace!(collection = %self.config.collection, index = %index, value, "index allocated");
            document.insert(index.as_str(), value);
        }

        let persisted = self
            .collection()
            .insert(document)
            .await?
            .ok_or_else(|| ResourceError::Persistence("document not created".to_string()))?;

        debug!(collection = %self.config.collection, "document created");

        Ok(self.config.apply_out(persisted))
    }

    /// Reads a document by native identity.
    pub async fn read(&self, id: impl Into<Bson>) -> ResourceResult<Document> {
        let document = self.fetch(&id.into()).await?;

        Ok(self.config.apply_out(document))
    }

    /// Reads the first document whose key property equals `key`.
    pub async fn read_by_key(&self, key: impl Into<Bson>) -> ResourceResult<Document> {
        let document = self.fetch_by_key(key.into()).await?;

        Ok(self.config.apply_out(document))
    }

    /// Reads the first document whose index property equals `index`.
    pub async fn read_by_index(&self, index: i64) -> ResourceResult<Document> {
        let document = self.fetch_by_index(index).await?;

        Ok(self.config.apply_out(document))
    }

    /// Documents whose properties equal every entry of `predicate`.
    pub async fn find(&self, predicate: &Document) -> ResourceResult<Vec<Document>> {
        Ok(self
            .collection()
            .find_matching(predicate)
            .await?
            .into_iter()
            .map(|document| self.config.apply_out(document))
            .collect())
    }

    /// Every document of the resource.
    pub async fn read_all(&self) -> ResourceResult<Vec<Document>> {
        self.find(&Document::new()).await
    }

    /// Documents matching a structured query (filter, sort, limit, offset).
    pub async fn query(&self, query: Query) -> ResourceResult<Vec<Document>> {
        Ok(self
            .collection()
            .query(query)
            .await?
            .into_iter()
            .map(|document| self.config.apply_out(document))
            .collect())
    }

    /// Updates the document with native identity `id`.
    ///
    /// Only properties the stored document already has are changed; unique properties
    /// cannot be changed this way.
    pub async fn update(&self, id: impl Into<Bson>, updates: Document) -> ResourceResult<Document> {
        let current = self.fetch(&id.into()).await?;

        self.apply_update(current, updates).await
    }

    pub async fn update_by_key(
        &self,
        key: impl Into<Bson>,
        updates: Document,
    ) -> ResourceResult<Document> {
        let current = self.fetch_by_key(key.into()).await?;

        self.apply_update(current, updates).await
    }

    pub async fn update_by_index(&self, index: i64, updates: Document) -> ResourceResult<Document> {
        let current = self.fetch_by_index(index).await?;

        self.apply_update(current, updates).await
    }

    /// Deletes the document with native identity `id`.
    pub async fn delete(&self, id: impl Into<Bson>) -> ResourceResult<()> {
        self.remove(id.into()).await
    }

    pub async fn delete_by_key(&self, key: impl Into<Bson>) -> ResourceResult<()> {
        let current = self.fetch_by_key(key.into()).await?;

        self.remove(self.native_id(&current)?).await
    }

    pub async fn delete_by_index(&self, index: i64) -> ResourceResult<()> {
        let current = self.fetch_by_index(index).await?;

        self.remove(self.native_id(&current)?).await
    }

    /// In-map, then the validity and uniqueness gates. Returns the mapped document.
    async fn admit(&self, document: Document) -> ResourceResult<Document> {
        let document = self.config.apply_in(document);

        if !self.config.validator.is_valid(&document) {
            debug!(collection = %self.config.collection, "document rejected by schema");
            return Err(ResourceError::Validation(self.config.collection.clone()));
        }

        self.check_unique(&document).await?;

        Ok(document)
    }

    async fn check_unique(&self, document: &Document) -> ResourceResult<()> {
        let projected = props::project(document, &self.config.unique);

        if projected.is_empty() {
            trace!(collection = %self.config.collection, "no unique properties present");
            return Ok(());
        }

        let existing = self.collection().find_any(&projected).await?;
        if existing.is_empty() {
            return Ok(());
        }

        let mut fields = projected
            .iter()
            .filter(|(field, value)| {
                existing
                    .iter()
                    .any(|doc| doc.get(field.as_str()).is_some_and(|held| same_value(held, value)))
            })
            .map(|(field, _)| field.clone())
            .collect::<Vec<_>>();

        if fields.is_empty() {
            fields = projected.keys().cloned().collect();
        }

        debug!(collection = %self.config.collection, ?fields, "unique property collision");

        Err(ResourceError::Conflict {
            collection: self.config.collection.clone(),
            fields,
        })
    }

    async fn apply_update(&self, current: Document, updates: Document) -> ResourceResult<Document> {
        let id = self.native_id(&current)?;
        let updates = self.config.apply_in(updates);
        let merged = props::merge_existing(current, &updates);

        if !self.config.validator.is_valid(&merged) {
            debug!(collection = %self.config.collection, "merged document rejected by schema");
            return Err(ResourceError::Validation(self.config.collection.clone()));
        }

        let changes = self
            .config
            .filter
            .clean(props::strip(merged, &self.config.unique));

        let updated = self
            .collection()
            .update_by_id(&id, changes)
            .await?
            .ok_or_else(|| ResourceError::Persistence("document not updated".to_string()))?;

        debug!(collection = %self.config.collection, id = %id, "document updated");

        Ok(self.config.apply_out(updated))
    }

    async fn remove(&self, id: Bson) -> ResourceResult<()> {
        if !self.collection().delete_by_id(&id).await? {
            return Err(self.not_found(&id));
        }

        debug!(collection = %self.config.collection, id = %id, "document deleted");

        Ok(())
    }

    async fn fetch(&self, id: &Bson) -> ResourceResult<Document> {
        self.collection()
            .get_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    async fn fetch_by_key(&self, key: Bson) -> ResourceResult<Document> {
        let property = self
            .config
            .key
            .as_deref()
            .ok_or_else(|| ResourceError::Configuration(format!(
                "resource {} does not define a key property",
                self.config.collection
            )))?;

        self.fetch_first(property, key).await
    }

    async fn fetch_by_index(&self, index: i64) -> ResourceResult<Document> {
        let property = self
            .config
            .index
            .as_deref()
            .ok_or_else(|| ResourceError::Configuration(format!(
                "resource {} does not define an index property",
                self.config.collection
            )))?;

        self.fetch_first(property, Bson::Int64(index)).await
    }

    async fn fetch_first(&self, property: &str, value: Bson) -> ResourceResult<Document> {
        let mut predicate = Document::new();
        predicate.insert(property, value.clone());

        let query = Query {
            limit: Some(1),
            ..Query::matching(&predicate)
        };

        self.collection()
            .query(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(&value))
    }

    fn native_id(&self, document: &Document) -> ResourceResult<Bson> {
        let id_field = self.backend.id_field();

        document
            .get(id_field)
            .cloned()
            .ok_or_else(|| {
                StoreError::InvalidDocument(format!(
                    "stored document in {} has no {} property",
                    self.config.collection, id_field
                ))
                .into()
            })
    }

    fn not_found(&self, id: &Bson) -> ResourceError {
        ResourceError::NotFound(id.to_string(), self.config.collection.clone())
    }
}

/// Equality that treats numerically equal integers of different widths as the same value.
fn same_value(a: &Bson, b: &Bson) -> bool {
    match (integer_value(a), integer_value(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}
