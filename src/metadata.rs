//! Document metadata and the reserved system fields stamped into it.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnvelopeError, Result};
use crate::etag::Etag;

// ============================================================================
// Reserved field names
// ============================================================================

/// Body field that carries the document's metadata object.
pub const METADATA_FIELD: &str = "@metadata";
/// Metadata field that carries the document's etag as a string.
pub const ETAG_FIELD: &str = "@etag";
/// Metadata field that carries the document key, when requested.
pub const ID_FIELD: &str = "@id";
/// Metadata field holding the RFC 3339 time of the last write.
pub const LAST_MODIFIED_FIELD: &str = "Last-Modified";

// ============================================================================
// Metadata
// ============================================================================

/// Ordered metadata map (content type, collection name, custom headers, ...).
///
/// Keys are unique and keep their insertion order; overwriting a key keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Metadata(map)
    }

    /// Insert or overwrite a field. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The stamped etag, if any. A present but malformed value is an error.
    pub fn etag(&self) -> Result<Option<Etag>> {
        match self.0.get(ETAG_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => s.parse().map(Some),
            Some(other) => Err(EnvelopeError::InvalidEtag(other.to_string())),
        }
    }

    /// `Last-Modified` parsed as RFC 3339. A present but malformed value is an error.
    pub fn last_modified(&self) -> Result<Option<DateTime<FixedOffset>>> {
        match self.0.get(LAST_MODIFIED_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(Some)
                .map_err(|e| EnvelopeError::InvalidLastModified(format!("{s:?}: {e}"))),
            Some(other) => Err(EnvelopeError::InvalidLastModified(other.to_string())),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

// ============================================================================
// SystemFields
// ============================================================================

/// System values merged into metadata at serialization time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFields {
    pub etag: Etag,
    /// Document key, stamped as `@id` when set.
    pub id: Option<String>,
}

impl SystemFields {
    pub fn new(etag: Etag) -> Self {
        Self { etag, id: None }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Stamp the etag into `metadata`, overwriting a stale value in place.
    /// This is the only change made to the document's own metadata.
    pub fn stamp(&self, metadata: &mut Metadata) {
        let previous = metadata.insert(ETAG_FIELD, self.etag.to_string());
        if let Some(prev) = previous {
            tracing::trace!(previous = %prev, etag = %self.etag, "overwrote stamped etag");
        }
    }

    /// Owned copy of `metadata` for output, with `@id` added when set.
    /// `metadata` itself is left untouched.
    pub fn render(&self, metadata: &Metadata) -> Map<String, Value> {
        let mut out = metadata.as_map().clone();
        if let Some(ref id) = self.id {
            out.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        }
        out
    }
}
