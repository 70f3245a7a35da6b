//! MongoDB backend implementation for docresource.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docresource = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Native queries** - Filters, sorting and pagination run in MongoDB's query engine
//! - **Unique indexes** - Resources can ask for server-enforced uniqueness
//!
//! # Example
//!
//! ```ignore
//! use docresource::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod query;
pub mod sanitizer;
pub mod store;

pub use store::{ID_FIELD, MongoDbStore, MongoDbStoreBuilder};
