//! In-memory document storage backend for docresource.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion order** - Unsorted queries return documents in the order they were inserted
//! - **Full query support** - Filtering, sorting and pagination
//! - **Unique indexes** - Enforced when a resource asks for them
//!
//! # Quick Start
//!
//! ```ignore
//! use docresource::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let users = Resource::builder(backend, "users")
//!         .key("username")
//!         .build()
//!         .await?;
//!
//!     users.create(doc! { "username": "alice" }).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod evaluator;
pub mod store;

pub use store::{ID_FIELD, InMemoryStore, InMemoryStoreBuilder};
