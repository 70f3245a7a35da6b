//! Schema-validated, uniqueness-aware resources over pluggable document stores.
//!
//! This crate is the core of the docresource project and provides:
//!
//! - **Store backend abstraction** ([`backend`]) - The contract every document database adapter implements
//! - **Query and filtering API** ([`query`]) - Backend-neutral filter expressions
//! - **Collections interface** ([`collection`]) - A backend bound to one collection
//! - **Schemas** ([`schema`]) - Validity predicates combined with OR semantics
//! - **Property whitelisting** ([`props`]) - Projection of documents onto allowed properties
//! - **Resources** ([`resource`], [`config`]) - The create/read/update/delete lifecycle with keys and uniqueness
//! - **Typed access** ([`typed`]) - Serde structs in, serde structs out
//! - **REST bridge** ([`rest`]) - Operation outcomes as HTTP-style responses
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docresource_core::{resource::Resource, schema::{ObjectSchema, FieldType}};
//! use bson::doc;
//!
//! let users = Resource::builder(backend, "users")
//!     .schema(
//!         ObjectSchema::new()
//!             .required("username", FieldType::String)
//!             .optional("email", FieldType::String),
//!     )
//!     .key("username")
//!     .index("uid")
//!     .unique(["email"])
//!     .build()
//!     .await?;
//!
//! let alice = users.create(doc! { "username": "alice", "email": "a@example.com" }).await?;
//! assert_eq!(alice.get_i64("uid")?, 0);
//! ```

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod props;
pub mod query;
pub mod resource;
pub mod rest;
pub mod schema;
pub mod typed;
