//! Serde-typed view over a [`Resource`].
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     username: String,
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     uid: Option<i64>,
//! }
//!
//! let users = resource.typed::<User>();
//! let alice = users.create(&User { username: "alice".into(), uid: None }).await?;
//! assert_eq!(alice.uid, Some(0));
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    error::{ResourceResult, StoreError},
    resource::Resource,
};

/// Converts values of `T` to and from documents around every resource call.
///
/// The lifecycle (validation, uniqueness, whitelisting, key allocation) is the
/// resource's; the view only changes the representation.
#[derive(Debug)]
pub struct TypedResource<'a, B: StoreBackend, T> {
    resource: &'a Resource<B>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, B: StoreBackend, T> TypedResource<'a, B, T> {
    pub(crate) fn new(resource: &'a Resource<B>) -> Self {
        Self {
            resource,
            _marker: PhantomData,
        }
    }

    pub fn resource(&self) -> &Resource<B> {
        self.resource
    }
}

impl<B, T> TypedResource<'_, B, T>
where
    B: StoreBackend,
    T: Serialize + DeserializeOwned,
{
    pub async fn create(&self, value: &T) -> ResourceResult<T> {
        let document = self
            .resource
            .create(to_document(value)?)
            .await?;

        from_document(document)
    }

    pub async fn read(&self, id: impl Into<Bson>) -> ResourceResult<T> {
        from_document(self.resource.read(id).await?)
    }

    pub async fn read_by_key(&self, key: impl Into<Bson>) -> ResourceResult<T> {
        from_document(self.resource.read_by_key(key).await?)
    }

    pub async fn read_by_index(&self, index: i64) -> ResourceResult<T> {
        from_document(self.resource.read_by_index(index).await?)
    }

    pub async fn find(&self, predicate: &Document) -> ResourceResult<Vec<T>> {
        self.resource
            .find(predicate)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn read_all(&self) -> ResourceResult<Vec<T>> {
        self.find(&Document::new()).await
    }

    /// Partial update; `updates` is a document so callers can send a subset of fields.
    pub async fn update(&self, id: impl Into<Bson>, updates: Document) -> ResourceResult<T> {
        from_document(self.resource.update(id, updates).await?)
    }

    pub async fn delete(&self, id: impl Into<Bson>) -> ResourceResult<()> {
        self.resource.delete(id).await
    }
}

fn to_document<T: Serialize>(value: &T) -> ResourceResult<Document> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(StoreError::Serialization(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))
        .into()),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> ResourceResult<T> {
    Ok(deserialize_from_bson(Bson::Document(document))?)
}
