//! Document envelope: a stored document's data, metadata, etag and optional
//! projection, and the serialization that turns it into the externally visible body.

pub mod envelope;
pub mod error;
pub mod etag;
pub mod metadata;

pub use envelope::{Body, DocumentEnvelope, SerializeOptions, SerializedBody};
pub use error::{EnvelopeError, Result};
pub use etag::{ConcurrencyCheck, Etag, EtagGenerator};
pub use metadata::{
    Metadata, SystemFields, ETAG_FIELD, ID_FIELD, LAST_MODIFIED_FIELD, METADATA_FIELD,
};
