//! Error types and result types for resource and backend operations.
//!
//! Two layers of errors exist:
//!
//! - [`StoreError`] is raised by storage backends for I/O, serialization and
//!   driver failures. The resource layer never inspects these; they travel to the
//!   caller unchanged inside [`ResourceError::Store`].
//! - [`ResourceError`] is the taxonomy of the resource lifecycle gates
//!   (validation, uniqueness, persistence, lookup, configuration).

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document has a structure the backend cannot store.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` type for backend operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Failure outcome of a resource operation.
///
/// Every public operation of [`Resource`](crate::resource::Resource) fails fast with
/// exactly one of these kinds. None of them are retried by the resource itself.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The candidate (or merged) document was rejected by every schema.
    /// Raised before any write reaches the backend.
    #[error("Document failed validation for collection {0}")]
    Validation(String),
    /// An existing document shares a value for one of the listed unique properties.
    #[error("Document conflicts with an existing document in {collection} on {}", fields.join(", "))]
    Conflict {
        /// Collection that was checked.
        collection: String,
        /// Unique properties that were part of the uniqueness query.
        fields: Vec<String>,
    },
    /// The backend did not persist a write that passed every earlier gate.
    #[error("{0}")]
    Persistence(String),
    /// The addressed document does not exist.
    #[error("Document {0} not found in collection {1}")]
    NotFound(String, String),
    /// The operation needs a key or index property the resource does not define.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Backend failure, passed through untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResourceError {
    /// Returns `true` for failures caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ResourceError::Validation(_)
                | ResourceError::Conflict { .. }
                | ResourceError::NotFound(..)
        )
    }
}

/// A specialized `Result` type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

impl From<BsonError> for ResourceError {
    fn from(err: BsonError) -> Self {
        ResourceError::Store(err.into())
    }
}
