//! Chunk references, storage keys and query windows.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Identifies one immutable chunk object in the log index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRef {
    /// Owning tenant (never empty).
    pub tenant: String,
    /// Stream identity hash.
    pub fingerprint: u64,
    /// First sample timestamp in milliseconds.
    pub from: i64,
    /// Last sample timestamp in milliseconds.
    pub through: i64,
    /// Chunk content checksum.
    pub checksum: u32,
}

impl ChunkRef {
    /// Create a chunk reference, rejecting an empty tenant or an inverted range.
    pub fn new(
        tenant: impl Into<String>,
        fingerprint: u64,
        from: i64,
        through: i64,
        checksum: u32,
    ) -> crate::Result<Self> {
        let tenant = tenant.into();
        if tenant.is_empty() {
            return Err(crate::Error::InvalidChunkRef(
                "tenant must not be empty".to_string(),
            ));
        }
        if from > through {
            return Err(crate::Error::InvalidChunkRef(format!(
                "from ({from}) is after through ({through})"
            )));
        }
        Ok(Self {
            tenant,
            fingerprint,
            from,
            through,
            checksum,
        })
    }

    /// Derive the object store key for this chunk.
    ///
    /// Layout: `<tenant>/<fingerprint:016x>/<from:x>:<through:x>:<checksum:x>`.
    /// The fingerprint is zero-padded to the full 64-bit width so lexical and
    /// numeric ordering agree within a tenant.
    pub fn storage_key(&self) -> StorageKey {
        StorageKey(format!(
            "{}/{:016x}/{}:{}:{:x}",
            self.tenant,
            self.fingerprint,
            signed_hex(self.from),
            signed_hex(self.through),
            self.checksum
        ))
    }

    /// Whether this chunk intersects the given window.
    pub fn overlaps(&self, range: &TimeRange) -> bool {
        self.from <= range.through_ms && self.through >= range.from_ms
    }
}

/// Lowercase hex with a leading `-` for negative values.
fn signed_hex(value: i64) -> String {
    if value < 0 {
        format!("-{:x}", value.unsigned_abs())
    } else {
        format!("{value:x}")
    }
}

/// Key addressing a chunk object in the object store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Inclusive query window in milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from_ms: i64,
    pub through_ms: i64,
}

impl TimeRange {
    /// Create a window from millisecond bounds.
    pub fn new(from_ms: i64, through_ms: i64) -> crate::Result<Self> {
        if from_ms > through_ms {
            return Err(crate::Error::InvalidTimeRange(format!(
                "start ({from_ms}) is after end ({through_ms})"
            )));
        }
        Ok(Self {
            from_ms,
            through_ms,
        })
    }

    /// Create a window from two instants, truncated to millisecond precision.
    pub fn from_datetimes(start: OffsetDateTime, end: OffsetDateTime) -> crate::Result<Self> {
        Self::new(unix_millis(start), unix_millis(end))
    }
}

fn unix_millis(at: OffsetDateTime) -> i64 {
    // OffsetDateTime is bounded to +/-9999 years, which always fits in i64 milliseconds.
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}
