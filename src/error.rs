use thiserror::Error;

use crate::etag::Etag;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Document {key}: missing {field} and no projection is set")]
    MissingState { key: String, field: &'static str },

    #[error("Document {key}: data contains reserved field {field}")]
    ReservedField { key: String, field: &'static str },

    #[error("Invalid etag: {0}")]
    InvalidEtag(String),

    #[error("Invalid Last-Modified: {0}")]
    InvalidLastModified(String),

    #[error("Document {key}: metadata has no etag")]
    MissingEtag { key: String },

    #[error("Invalid document body: expected object")]
    NotAnObject,

    #[error("Invalid document body: {field} must be an object")]
    MetadataNotAnObject { field: &'static str },

    #[error("Concurrency conflict on {key}: expected etag {expected}, found {}", display_actual(.actual))]
    ConcurrencyConflict {
        key: String,
        expected: Etag,
        actual: Option<Etag>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn display_actual(actual: &Option<Etag>) -> String {
    match actual {
        Some(etag) => etag.to_string(),
        None => "no document".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
