//! Schema-validated, uniqueness-aware resources over pluggable document stores.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! `docresource-core` and gives access to the bundled storage backends.
//!
//! A *resource* is one logical collection plus the policy that governs it: which
//! schemas documents must satisfy, which properties are stored, which properties must
//! be unique, an optional caller-facing key and an optional auto-incrementing index.
//!
//! # Features
//!
//! - **Validation** - Documents must satisfy at least one schema before anything is written
//! - **Uniqueness** - Creates are refused when a unique property value is already taken
//! - **Keys and indexes** - Address documents by business key or by allocated integer index
//! - **Closed updates** - Updates only touch properties a document already has, never unique ones
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docresource::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let users = Resource::builder(InMemoryStore::new(), "users")
//!         .schema(
//!             ObjectSchema::new()
//!                 .required("username", FieldType::String)
//!                 .optional("age", FieldType::Integer),
//!         )
//!         .key("username")
//!         .index("uid")
//!         .build()
//!         .await?;
//!
//!     let alice = users.create(doc! { "username": "alice", "age": 30 }).await?;
//!     assert_eq!(alice.get_i64("uid")?, 0);
//!
//!     // Unknown properties are ignored; unique ones cannot change.
//!     let older = users
//!         .update_by_key("alice", doc! { "age": 31, "username": "mallory" })
//!         .await?;
//!     assert_eq!(older.get_str("username")?, "alice");
//!
//!     match users.create(doc! { "username": "alice" }).await {
//!         Err(ResourceError::Conflict { fields, .. }) => assert_eq!(fields, ["username"]),
//!         other => panic!("unexpected {other:?}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! Resources hold no locks. Concurrent creates can both pass the uniqueness check, or
//! both be handed the same index, because both read before either writes. Ask the
//! backend to enforce uniqueness with [`ResourceBuilder::unique_indexes`] when that
//! matters; the losing create then fails with [`ResourceError::Persistence`].
//!
//! [`ResourceBuilder::unique_indexes`]: config::ResourceBuilder::unique_indexes
//! [`ResourceError::Persistence`]: error::ResourceError::Persistence
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires `mongodb` feature)
//! - [`backend::Backend`] - Either of the above, selected at runtime

pub mod backend;
pub mod prelude;

pub use docresource_core::{collection, config, error, props, query, resource, rest, schema, typed};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docresource_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docresource_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
