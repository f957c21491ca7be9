//! Etags: 128-bit concurrency tokens that change on every write to a document.
//!
//! Etags issued by one `EtagGenerator` are strictly increasing, so comparing two
//! tokens also tells which write happened later. Callers use `ConcurrencyCheck`
//! to turn a token they read earlier into a conditional write.

use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EnvelopeError, Result};

// ============================================================================
// Etag
// ============================================================================

/// Opaque version marker for a document. Renders as a hyphenated lowercase UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Etag(Uuid);

impl Etag {
    /// The all-zero etag. Never issued for a real write.
    pub const EMPTY: Etag = Etag(Uuid::nil());

    pub fn from_u128(value: u128) -> Self {
        Etag(Uuid::from_u128(value))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Etag(uuid)
    }

    /// Random etag, for documents created outside a generator.
    pub fn random() -> Self {
        Etag(Uuid::new_v4())
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }

    /// The etag one step after this one (wraps at the maximum value).
    pub fn increment(&self) -> Etag {
        Etag::from_u128(self.as_u128().wrapping_add(1))
    }
}

impl Default for Etag {
    fn default() -> Self {
        Etag::EMPTY
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Etag {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Etag)
            .map_err(|e| EnvelopeError::InvalidEtag(format!("{s:?}: {e}")))
    }
}

impl From<Uuid> for Etag {
    fn from(uuid: Uuid) -> Self {
        Etag(uuid)
    }
}

// ============================================================================
// EtagGenerator
// ============================================================================

/// Issues strictly increasing etags. Safe to share across threads.
pub struct EtagGenerator {
    last: Mutex<Etag>,
}

impl EtagGenerator {
    /// Create a generator whose first issued etag is `seed.increment()`.
    pub fn starting_after(seed: Etag) -> Self {
        Self {
            last: Mutex::new(seed),
        }
    }

    /// Issue the next etag.
    pub fn next_etag(&self) -> Etag {
        let mut last = self.last.lock();
        *last = last.increment();
        *last
    }

    /// The most recently issued etag (or the seed if none was issued yet).
    pub fn last_etag(&self) -> Etag {
        *self.last.lock()
    }
}

impl Default for EtagGenerator {
    fn default() -> Self {
        Self::starting_after(Etag::EMPTY)
    }
}

// ============================================================================
// ConcurrencyCheck
// ============================================================================

/// Optimistic concurrency condition attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyCheck {
    /// Write regardless of the stored etag.
    #[default]
    Any,
    /// Write only if the stored etag still equals this one.
    Expect(Etag),
}

impl ConcurrencyCheck {
    /// Check the condition against the document's current etag
    /// (`None` when the document does not exist).
    pub fn verify(&self, key: &str, current: Option<Etag>) -> Result<()> {
        match self {
            ConcurrencyCheck::Any => Ok(()),
            ConcurrencyCheck::Expect(expected) if current == Some(*expected) => Ok(()),
            ConcurrencyCheck::Expect(expected) => {
                tracing::warn!(
                    key,
                    expected = %expected,
                    actual = ?current.map(|e| e.to_string()),
                    "etag mismatch, rejecting write"
                );
                Err(EnvelopeError::ConcurrencyConflict {
                    key: key.to_string(),
                    expected: *expected,
                    actual: current,
                })
            }
        }
    }
}

impl From<Option<Etag>> for ConcurrencyCheck {
    fn from(etag: Option<Etag>) -> Self {
        match etag {
            Some(etag) => ConcurrencyCheck::Expect(etag),
            None => ConcurrencyCheck::Any,
        }
    }
}
