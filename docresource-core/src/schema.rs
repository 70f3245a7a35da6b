//! Document validation.
//!
//! A resource accepts a document when **any** of its schemas accepts it. This lets one
//! resource take several shapes at once (a current shape and a legacy shape, say).
//! A resource with no schemas accepts everything.
//!
//! Schemas are plain predicates. Any `Fn(&Document) -> bool` works:
//!
//! ```ignore
//! use docresource::schema::Validator;
//!
//! let validator = Validator::new()
//!     .with(|doc: &bson::Document| doc.get_str("name").is_ok());
//! ```
//!
//! [`ObjectSchema`] additionally describes its properties, which resources use as the
//! property whitelist when none is configured explicitly.

use bson::{Bson, Document};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

/// A validity predicate over documents.
///
/// Implementations must be pure: no I/O, no side effects, same answer for the same
/// document. Invalid input is a `false`, never a panic.
pub trait Schema: Send + Sync {
    /// Returns whether `document` has an acceptable shape.
    fn is_valid(&self, document: &Document) -> bool;

    /// Property names this schema knows about, if it can tell.
    fn describe_properties(&self) -> Option<BTreeSet<String>> {
        None
    }
}

impl<F> Schema for F
where
    F: Fn(&Document) -> bool + Send + Sync,
{
    fn is_valid(&self, document: &Document) -> bool {
        self(document)
    }
}

/// Ordered set of schemas combined with OR semantics.
#[derive(Clone, Default)]
pub struct Validator {
    schemas: Vec<Arc<dyn Schema>>,
}

impl Validator {
    /// A validator with no schemas; every document is valid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a schema.
    pub fn with(mut self, schema: impl Schema + 'static) -> Self {
        self.schemas.push(Arc::new(schema));
        self
    }

    /// Appends an already shared schema.
    pub fn with_shared(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// True iff at least one schema accepts `document`, or there are no schemas.
    pub fn is_valid(&self, document: &Document) -> bool {
        self.schemas.is_empty()
            || self
                .schemas
                .iter()
                .any(|schema| schema.is_valid(document))
    }

    /// Union of the properties described by the schemas that describe themselves.
    /// `None` when no schema does.
    pub fn describe_properties(&self) -> Option<BTreeSet<String>> {
        self.schemas
            .iter()
            .filter_map(|schema| schema.describe_properties())
            .reduce(|mut all, props| {
                all.extend(props);
                all
            })
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("schemas", &self.schemas.len())
            .finish()
    }
}

/// Value types an [`ObjectSchema`] field can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// 32- or 64-bit integer.
    Integer,
    /// Any numeric value.
    Number,
    Boolean,
    Document,
    Array,
    DateTime,
    /// Present with any value, including null.
    Any,
}

impl FieldType {
    fn accepts(&self, value: &Bson) -> bool {
        match self {
            FieldType::String => matches!(value, Bson::String(_)),
            FieldType::Integer => matches!(value, Bson::Int32(_) | Bson::Int64(_)),
            FieldType::Number => {
                matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
            }
            FieldType::Boolean => matches!(value, Bson::Boolean(_)),
            FieldType::Document => matches!(value, Bson::Document(_)),
            FieldType::Array => matches!(value, Bson::Array(_)),
            FieldType::DateTime => matches!(value, Bson::DateTime(_)),
            FieldType::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldRule {
    kind: FieldType,
    required: bool,
}

/// Structural schema: named fields with a type and a required flag.
///
/// Unknown properties are accepted unless [`ObjectSchema::strict`] is set; the
/// property filter drops them before storage anyway.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: BTreeMap<String, FieldRule>,
    strict: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field that must be present with a value of type `kind`.
    pub fn required(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields
            .insert(name.into(), FieldRule { kind, required: true });
        self
    }

    /// Adds a field that, when present, must hold a value of type `kind`.
    pub fn optional(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields
            .insert(name.into(), FieldRule { kind, required: false });
        self
    }

    /// Rejects documents carrying properties the schema does not name.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Schema for ObjectSchema {
    fn is_valid(&self, document: &Document) -> bool {
        let fields_ok = self
            .fields
            .iter()
            .all(|(name, rule)| match document.get(name) {
                Some(value) => rule.kind.accepts(value),
                None => !rule.required,
            });

        fields_ok
            && (!self.strict
                || document
                    .keys()
                    .all(|key| self.fields.contains_key(key)))
    }

    fn describe_properties(&self) -> Option<BTreeSet<String>> {
        Some(self.fields.keys().cloned().collect())
    }
}
