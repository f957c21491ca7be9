//! DocumentEnvelope — a document as returned to callers.
//!
//! An envelope holds either the full document (data + metadata) or a
//! precomputed projection (e.g. a query-result row). Serializing a full
//! document stamps the current etag into its metadata and nests the metadata
//! under `@metadata`; serializing a projection returns it verbatim.
//!
//! The serialized body is always an owned snapshot: mutating it never reaches
//! back into the envelope, and vice versa.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnvelopeError, Result};
use crate::etag::Etag;
use crate::metadata::{Metadata, SystemFields, METADATA_FIELD};

// ============================================================================
// Body
// ============================================================================

/// What an envelope carries: the full document, or a projection that replaces it.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Full {
        data: Map<String, Value>,
        metadata: Metadata,
    },
    Projected {
        fields: Map<String, Value>,
    },
}

// ============================================================================
// SerializeOptions
// ============================================================================

/// Options controlling serialization.
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Also stamp the document key as `@id` inside `@metadata`.
    /// Ignored for projections.
    pub include_id: bool,
}

// ============================================================================
// SerializedBody
// ============================================================================

/// The externally visible form of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedBody(Map<String, Value>);

impl SerializedBody {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

// ============================================================================
// DocumentEnvelope
// ============================================================================

/// A document's data, metadata, key and etag, or a projection standing in for them.
///
/// Lives for a single request: built when a document is read (or a query row
/// is produced), serialized once, then dropped. Not synchronized; `serialize`
/// takes `&mut self` because it stamps the etag into the envelope's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEnvelope {
    key: String,
    etag: Etag,
    body: Body,
}

impl DocumentEnvelope {
    /// Envelope for a full document.
    ///
    /// Fails if `data` uses the reserved `@metadata` field. Serialization never
    /// overwrites a user field with the nested metadata; the collision is
    /// rejected here instead, the same way adding a duplicate key to the
    /// document fails.
    pub fn full(
        key: impl Into<String>,
        etag: Etag,
        data: Map<String, Value>,
        metadata: Metadata,
    ) -> Result<Self> {
        let key = key.into();
        if data.contains_key(METADATA_FIELD) {
            return Err(EnvelopeError::ReservedField {
                key,
                field: METADATA_FIELD,
            });
        }
        Ok(Self {
            key,
            etag,
            body: Body::Full { data, metadata },
        })
    }

    /// Envelope for a projection. Its fields are returned verbatim on serialization.
    pub fn projected(key: impl Into<String>, etag: Etag, fields: Map<String, Value>) -> Self {
        Self {
            key: key.into(),
            etag,
            body: Body::Projected { fields },
        }
    }

    /// Build from the nullable parts a storage layer hands over.
    ///
    /// A projection wins when present. Otherwise both `data` and `metadata`
    /// are required; a missing one is caller misuse and is returned as
    /// `EnvelopeError::MissingState`.
    pub fn from_parts(
        key: impl Into<String>,
        etag: Etag,
        data: Option<Map<String, Value>>,
        metadata: Option<Metadata>,
        projection: Option<Map<String, Value>>,
    ) -> Result<Self> {
        let key = key.into();
        if let Some(fields) = projection {
            return Ok(Self::projected(key, etag, fields));
        }
        let Some(data) = data else {
            return Err(EnvelopeError::MissingState { key, field: "data" });
        };
        let Some(metadata) = metadata else {
            return Err(EnvelopeError::MissingState {
                key,
                field: "metadata",
            });
        };
        Self::full(key, etag, data, metadata)
    }

    /// Rebuild a full envelope from a serialized body, splitting off `@metadata`
    /// and reading the etag stamped in it.
    pub fn from_serialized(key: impl Into<String>, body: Value) -> Result<Self> {
        let key = key.into();
        let Value::Object(mut data) = body else {
            return Err(EnvelopeError::NotAnObject);
        };

        let metadata = match data.shift_remove(METADATA_FIELD) {
            None => Metadata::new(),
            Some(Value::Object(map)) => Metadata::from_map(map),
            Some(_) => {
                return Err(EnvelopeError::MetadataNotAnObject {
                    field: METADATA_FIELD,
                })
            }
        };

        let etag = metadata
            .etag()?
            .ok_or_else(|| EnvelopeError::MissingEtag { key: key.clone() })?;

        Ok(Self {
            key,
            etag,
            body: Body::Full { data, metadata },
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn etag(&self) -> Etag {
        self.etag
    }

    /// Record a new write. The next serialization stamps this etag.
    pub fn set_etag(&mut self, etag: Etag) {
        self.etag = etag;
    }

    pub fn is_projection(&self) -> bool {
        matches!(self.body, Body::Projected { .. })
    }

    /// Document data, `None` for projections.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            Body::Full { data, .. } => Some(data),
            Body::Projected { .. } => None,
        }
    }

    /// Document metadata, `None` for projections.
    pub fn metadata(&self) -> Option<&Metadata> {
        match &self.body {
            Body::Full { metadata, .. } => Some(metadata),
            Body::Projected { .. } => None,
        }
    }

    /// Mutable metadata, for layers that annotate the document before it is returned.
    pub fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        match &mut self.body {
            Body::Full { metadata, .. } => Some(metadata),
            Body::Projected { .. } => None,
        }
    }

    pub fn projection(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            Body::Projected { fields } => Some(fields),
            Body::Full { .. } => None,
        }
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    /// Serialize with default options. See [`DocumentEnvelope::serialize_with`].
    pub fn serialize(&mut self) -> SerializedBody {
        self.serialize_with(&SerializeOptions::default())
    }

    /// Produce the externally visible body.
    ///
    /// - Projection: its fields, unchanged. Nothing is stamped.
    /// - Full document: stamps `@etag` (the current etag) into the envelope's
    ///   metadata, then returns the data fields followed by `@metadata`.
    ///   `@id` from `opts` goes into the returned copy only, so options never
    ///   carry over to later calls.
    pub fn serialize_with(&mut self, opts: &SerializeOptions) -> SerializedBody {
        match &mut self.body {
            Body::Projected { fields } => {
                tracing::trace!(key = %self.key, "serializing projection");
                SerializedBody(fields.clone())
            }
            Body::Full { data, metadata } => {
                let mut system = SystemFields::new(self.etag);
                if opts.include_id {
                    system = system.with_id(self.key.as_str());
                }
                system.stamp(metadata);

                tracing::debug!(key = %self.key, etag = %self.etag, "serializing document");

                let mut out = data.clone();
                out.insert(
                    METADATA_FIELD.to_string(),
                    Value::Object(system.render(metadata)),
                );
                SerializedBody(out)
            }
        }
    }
}
