//! Mapping of resource outcomes to HTTP-style responses.
//!
//! This is presentation only. Transport (routing, request parsing, writing the
//! response) belongs to whatever server embeds the resource; [`RestEndpoint`] just
//! runs a resource operation and turns the outcome into a [`RestResponse`].
//!
//! | outcome                               | status |
//! |---------------------------------------|--------|
//! | created                               | 201 + `Location: /{path}/{key}` |
//! | read / updated                        | 200 + document body |
//! | listed                                | 200 + array body |
//! | deleted                               | 204 |
//! | `Validation`, body not a JSON object  | 400 |
//! | `NotFound`                            | 404 |
//! | `Conflict`, `Persistence` on create   | 409 |
//! | anything else                         | 500 |

use bson::{Bson, Document, ser::serialize_to_bson};
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    backend::{StoreBackend, integer_value},
    config::ResourceConfig,
    error::{ResourceError, ResourceResult},
    resource::Resource,
};

/// Status, optional `Location` header and optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: Option<Value>,
}

impl RestResponse {
    fn new(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: None,
        }
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Outcome of a create. The location addresses the new document by key, else
    /// index, else native identity.
    pub fn created(config: &ResourceConfig, id_field: &str, outcome: ResourceResult<Document>) -> Self {
        match outcome {
            Ok(document) => {
                let mut response = Self::new(201);
                response.location = location(config, id_field, &document);
                response.with_body(to_json(document))
            }
            Err(err @ (ResourceError::Conflict { .. } | ResourceError::Persistence(_))) => {
                debug!(error = %err, "create rejected");
                Self::error_body(409, &err)
            }
            Err(err) => Self::failed(err),
        }
    }

    /// Outcome of a read or an update.
    pub fn document(outcome: ResourceResult<Document>) -> Self {
        match outcome {
            Ok(document) => Self::new(200).with_body(to_json(document)),
            Err(err) => Self::failed(err),
        }
    }

    /// Outcome of a listing.
    pub fn list(outcome: ResourceResult<Vec<Document>>) -> Self {
        match outcome {
            Ok(documents) => Self::new(200).with_body(Value::Array(
                documents
                    .into_iter()
                    .map(to_json)
                    .collect(),
            )),
            Err(err) => Self::failed(err),
        }
    }

    /// Outcome of a delete.
    pub fn deleted(outcome: ResourceResult<()>) -> Self {
        match outcome {
            Ok(()) => Self::new(204),
            Err(err) => Self::failed(err),
        }
    }

    fn failed(err: ResourceError) -> Self {
        let status = match &err {
            ResourceError::Validation(_) => 400,
            ResourceError::NotFound(..) => 404,
            _ => 500,
        };

        if status == 500 {
            error!(error = %err, "resource operation failed");
        } else {
            debug!(error = %err, status, "resource operation rejected");
        }

        Self::error_body(status, &err)
    }

    fn error_body(status: u16, err: &ResourceError) -> Self {
        Self::new(status).with_body(serde_json::json!({ "error": err.to_string() }))
    }
}

/// A resource exposed under a REST path.
#[derive(Debug)]
pub struct RestEndpoint<'a, B: StoreBackend> {
    resource: &'a Resource<B>,
}

impl<'a, B: StoreBackend> RestEndpoint<'a, B> {
    pub fn new(resource: &'a Resource<B>) -> Self {
        Self { resource }
    }

    /// Path segment the resource is served under.
    pub fn path(&self) -> &str {
        base_path(self.resource.config())
    }

    /// `POST /{path}`.
    pub async fn create(&self, body: Value) -> RestResponse {
        let outcome = match from_json(&body, self.resource.config().collection()) {
            Ok(document) => self.resource.create(document).await,
            Err(err) => Err(err),
        };

        RestResponse::created(
            self.resource.config(),
            self.resource.backend().id_field(),
            outcome,
        )
    }

    /// `GET /{path}`.
    pub async fn list(&self) -> RestResponse {
        RestResponse::list(self.resource.read_all().await)
    }

    /// `GET /{path}/{segment}`, where the segment is the key when one is configured,
    /// else the index.
    pub async fn read(&self, segment: &str) -> RestResponse {
        RestResponse::document(self.fetch(segment).await)
    }

    /// `PATCH /{path}/{segment}`.
    pub async fn update(&self, segment: &str, body: Value) -> RestResponse {
        let updates = match from_json(&body, self.resource.config().collection()) {
            Ok(updates) => updates,
            Err(err) => return RestResponse::document(Err(err)),
        };

        let config = self.resource.config();
        let outcome = if config.key().is_some() {
            self.resource
                .update_by_key(segment, updates)
                .await
        } else {
            match parse_index(segment) {
                Ok(index) => self.resource.update_by_index(index, updates).await,
                Err(err) => Err(err),
            }
        };

        RestResponse::document(outcome)
    }

    /// `DELETE /{path}/{segment}`.
    pub async fn delete(&self, segment: &str) -> RestResponse {
        let outcome = if self.resource.config().key().is_some() {
            self.resource.delete_by_key(segment).await
        } else {
            match parse_index(segment) {
                Ok(index) => self.resource.delete_by_index(index).await,
                Err(err) => Err(err),
            }
        };

        RestResponse::deleted(outcome)
    }

    async fn fetch(&self, segment: &str) -> ResourceResult<Document> {
        if self.resource.config().key().is_some() {
            self.resource.read_by_key(segment).await
        } else {
            self.resource
                .read_by_index(parse_index(segment)?)
                .await
        }
    }
}

impl<B: StoreBackend> Resource<B> {
    /// REST view of this resource.
    pub fn rest(&self) -> RestEndpoint<'_, B> {
        RestEndpoint::new(self)
    }
}

fn base_path(config: &ResourceConfig) -> &str {
    config.path().unwrap_or(config.collection())
}

fn location(config: &ResourceConfig, id_field: &str, document: &Document) -> Option<String> {
    let value = config
        .key()
        .and_then(|key| document.get(key))
        .or_else(|| config.index().and_then(|index| document.get(index)))
        .or_else(|| document.get(id_field))?;

    Some(format!("/{}/{}", base_path(config), segment(value)))
}

fn segment(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::Binary(binary) => binary
            .to_uuid()
            .map(|uuid| uuid.to_string())
            .unwrap_or_else(|_| value.to_string()),
        other => integer_value(other)
            .map(|i| i.to_string())
            .unwrap_or_else(|| other.to_string()),
    }
}

fn parse_index(segment: &str) -> ResourceResult<i64> {
    segment
        .parse()
        .map_err(|_| ResourceError::NotFound(segment.to_string(), "index".to_string()))
}

/// Request bodies that are not JSON objects fail like documents no schema accepts.
fn from_json(body: &Value, collection: &str) -> ResourceResult<Document> {
    match serialize_to_bson(body)? {
        Bson::Document(document) => Ok(document),
        _ => {
            debug!(collection, "request body is not a JSON object");
            Err(ResourceError::Validation(collection.to_string()))
        }
    }
}

fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}
