//! Resource configuration.
//!
//! A resource is configured once, at construction, through [`ResourceBuilder`]. The
//! result is an immutable [`ResourceConfig`]; nothing about a resource changes after
//! `build()` returns.
//!
//! Declarative settings (key/index policy, unique properties, whitelist, REST path) can
//! also come from configuration files through [`ResourceOptions`]:
//!
//! ```ignore
//! let options: ResourceOptions = serde_json::from_str(r#"{
//!     "key": "username",
//!     "index": "uid",
//!     "uniq": ["email"],
//!     "path": "users"
//! }"#)?;
//!
//! let users = Resource::builder(store, "users")
//!     .options(options)
//!     .schema(user_schema)
//!     .build()
//!     .await?;
//! ```

use bson::Document;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, sync::Arc};

use crate::{
    backend::{IndexSpec, StoreBackend},
    error::ResourceResult,
    props::PropertyFilter,
    resource::Resource,
    schema::{Schema, Validator},
};

/// Document-to-document mapping applied on the write path (`in`) or read path (`out`).
pub type Transform = Arc<dyn Fn(Document) -> Document + Send + Sync>;

/// Serializable subset of a resource's configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ResourceOptions {
    /// Caller-facing business key property.
    pub key: Option<String>,
    /// Auto-incrementing pseudo-key property.
    pub index: Option<String>,
    /// Additional unique properties.
    pub uniq: Vec<String>,
    /// Explicit property whitelist.
    pub props: Option<Vec<String>>,
    /// REST path segment.
    pub path: Option<String>,
    /// Ask the backend for unique indexes on the unique properties.
    pub unique_indexes: bool,
}

/// Immutable configuration of one resource.
#[derive(Clone)]
pub struct ResourceConfig {
    pub(crate) collection: String,
    pub(crate) validator: Validator,
    pub(crate) filter: PropertyFilter,
    pub(crate) key: Option<String>,
    pub(crate) index: Option<String>,
    pub(crate) unique: BTreeSet<String>,
    pub(crate) map_in: Option<Transform>,
    pub(crate) map_out: Option<Transform>,
    pub(crate) path: Option<String>,
    pub(crate) unique_indexes: bool,
}

impl ResourceConfig {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn filter(&self) -> &PropertyFilter {
        &self.filter
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Unique properties, always including the backend's identity property.
    pub fn unique(&self) -> &BTreeSet<String> {
        &self.unique
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub(crate) fn apply_in(&self, document: Document) -> Document {
        match &self.map_in {
            Some(map) => map(document),
            None => document,
        }
    }

    pub(crate) fn apply_out(&self, document: Document) -> Document {
        match &self.map_out {
            Some(map) => map(document),
            None => document,
        }
    }

    /// Indexes requested from the backend at init: one per unique property other
    /// than the native identity, which every backend already indexes.
    pub(crate) fn indexes(&self, id_field: &str) -> Vec<IndexSpec> {
        self.unique
            .iter()
            .filter(|field| field.as_str() != id_field)
            .map(|field| IndexSpec::new(field.as_str(), self.unique_indexes))
            .collect()
    }
}

impl fmt::Debug for ResourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("collection", &self.collection)
            .field("validator", &self.validator)
            .field("filter", &self.filter)
            .field("key", &self.key)
            .field("index", &self.index)
            .field("unique", &self.unique)
            .field("map_in", &self.map_in.is_some())
            .field("map_out", &self.map_out.is_some())
            .field("path", &self.path)
            .field("unique_indexes", &self.unique_indexes)
            .finish()
    }
}

/// Builder for [`Resource`].
pub struct ResourceBuilder<B: StoreBackend> {
    backend: B,
    collection: String,
    validator: Validator,
    filter: Option<PropertyFilter>,
    key: Option<String>,
    index: Option<String>,
    uniq: Vec<String>,
    map_in: Option<Transform>,
    map_out: Option<Transform>,
    path: Option<String>,
    unique_indexes: bool,
}

impl<B: StoreBackend> ResourceBuilder<B> {
    pub fn new(backend: B, collection: impl Into<String>) -> Self {
        Self {
            backend,
            collection: collection.into(),
            validator: Validator::new(),
            filter: None,
            key: None,
            index: None,
            uniq: Vec::new(),
            map_in: None,
            map_out: None,
            path: None,
            unique_indexes: false,
        }
    }

    /// Applies declarative options on top of the current settings.
    pub fn options(mut self, options: ResourceOptions) -> Self {
        if options.key.is_some() {
            self.key = options.key;
        }
        if options.index.is_some() {
            self.index = options.index;
        }
        if let Some(props) = options.props {
            self.filter = Some(PropertyFilter::only(props));
        }
        if options.path.is_some() {
            self.path = options.path;
        }
        self.uniq.extend(options.uniq);
        self.unique_indexes |= options.unique_indexes;
        self
    }

    /// Adds a schema. Documents are valid when any schema accepts them.
    pub fn schema(mut self, schema: impl Schema + 'static) -> Self {
        self.validator = self.validator.with(schema);
        self
    }

    /// Replaces the whole validator.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Explicit property whitelist; takes precedence over schema-described properties.
    pub fn props<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(PropertyFilter::only(names));
        self
    }

    /// Replaces the property filter.
    pub fn filter(mut self, filter: PropertyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn key(mut self, property: impl Into<String>) -> Self {
        self.key = Some(property.into());
        self
    }

    pub fn index(mut self, property: impl Into<String>) -> Self {
        self.index = Some(property.into());
        self
    }

    /// Additional unique properties.
    pub fn unique<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniq
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn map_in<F>(mut self, map: F) -> Self
    where
        F: Fn(Document) -> Document + Send + Sync + 'static,
    {
        self.map_in = Some(Arc::new(map));
        self
    }

    pub fn map_out<F>(mut self, map: F) -> Self
    where
        F: Fn(Document) -> Document + Send + Sync + 'static,
    {
        self.map_out = Some(Arc::new(map));
        self
    }

    pub fn path(mut self, segment: impl Into<String>) -> Self {
        self.path = Some(segment.into());
        self
    }

    /// Whether init asks the backend to enforce uniqueness with unique indexes.
    pub fn unique_indexes(mut self, enabled: bool) -> Self {
        self.unique_indexes = enabled;
        self
    }

    /// Freezes the configuration and initialises the collection.
    ///
    /// The returned resource is only handed out once the backend's init has
    /// completed, so every operation runs after it.
    pub async fn build(self) -> ResourceResult<Resource<B>> {
        let config = self.freeze();

        Resource::initialise(self.backend, config).await
    }

    pub(crate) fn freeze(&self) -> ResourceConfig {
        let mut filter = match &self.filter {
            Some(filter) => filter.clone(),
            None => self
                .validator
                .describe_properties()
                .map(PropertyFilter::only)
                .unwrap_or_default(),
        };

        // Key allocation happens after cleaning; the index must survive it.
        if let Some(index) = &self.index {
            filter.allow(index.as_str());
        }

        let unique = std::iter::once(self.backend.id_field().to_string())
            .chain(self.key.iter().cloned())
            .chain(self.index.iter().cloned())
            .chain(self.uniq.iter().cloned())
            .collect();

        ResourceConfig {
            collection: self.collection.clone(),
            validator: self.validator.clone(),
            filter,
            key: self.key.clone(),
            index: self.index.clone(),
            unique,
            map_in: self.map_in.clone(),
            map_out: self.map_out.clone(),
            path: self.path.clone(),
            unique_indexes: self.unique_indexes,
        }
    }
}
