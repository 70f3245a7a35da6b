//! Convenient re-exports of commonly used types from docresource.
//!
//! ```ignore
//! use docresource::prelude::*;
//! ```

pub use bson::{Bson, Document, doc};

pub use docresource_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::{ResourceBuilder, ResourceConfig, ResourceOptions},
    error::{ResourceError, ResourceResult, StoreError, StoreResult},
    props::PropertyFilter,
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    resource::Resource,
    rest::{RestEndpoint, RestResponse},
    schema::{FieldType, ObjectSchema, Schema, Validator},
    typed::TypedResource,
};

pub use crate::backend::Backend;
