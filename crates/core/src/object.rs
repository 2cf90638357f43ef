//! Object state classification.

use serde::{Deserialize, Serialize};

/// Storage class marker for archived objects (matched case-insensitively).
pub const ARCHIVE_MARKER: &str = "ARCHIVE";

/// Restore status marker for restores already issued (matched case-insensitively).
pub const ONGOING_RESTORE_MARKER: &str = "ongoing-request";

/// Raw metadata returned by an object store HEAD request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadMetadata {
    /// Object size in bytes.
    pub size: u64,
    /// Storage class as reported by the backend (absent for the default class).
    pub storage_class: Option<String>,
    /// Restore status, in the format of the S3 `x-amz-restore` header.
    pub restore: Option<String>,
}

/// Classified state of one object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    pub size_bytes: u64,
    pub storage_class: String,
    /// A restore has already been issued for this object.
    pub restore_pending: bool,
    /// Archived and no restore issued yet.
    pub needs_restore: bool,
}

impl ObjectState {
    /// Classify raw probe metadata.
    ///
    /// An object needs a restore when its storage class mentions `ARCHIVE`
    /// and its restore status does not mention `ongoing-request`. A restore
    /// status of either `ongoing-request="true"` or `ongoing-request="false"`
    /// (restore complete) therefore suppresses a new request.
    pub fn classify(meta: &HeadMetadata) -> Self {
        let storage_class = meta.storage_class.clone().unwrap_or_default();
        let archived = storage_class.to_uppercase().contains(ARCHIVE_MARKER);
        let restore_pending = meta
            .restore
            .as_deref()
            .is_some_and(|status| status.to_lowercase().contains(ONGOING_RESTORE_MARKER));

        Self {
            size_bytes: meta.size,
            storage_class,
            restore_pending,
            needs_restore: archived && !restore_pending,
        }
    }

    /// State used when an object could not be probed.
    pub fn unknown() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(storage_class: &str, restore: &str) -> HeadMetadata {
        HeadMetadata {
            size: 42,
            storage_class: Some(storage_class.to_string()),
            restore: Some(restore.to_string()),
        }
    }

    #[test]
    fn test_archive_without_restore_needs_restore() {
        let state = ObjectState::classify(&meta("ARCHIVE", ""));
        assert!(state.needs_restore);
        assert!(!state.restore_pending);
        assert_eq!(state.size_bytes, 42);
    }

    #[test]
    fn test_archive_with_ongoing_restore_is_skipped() {
        let state = ObjectState::classify(&meta("ARCHIVE", "ongoing-request"));
        assert!(!state.needs_restore);
        assert!(state.restore_pending);

        let state = ObjectState::classify(&meta("ARCHIVE", "ongoing-request=\"true\""));
        assert!(!state.needs_restore);
    }

    #[test]
    fn test_completed_restore_is_skipped() {
        let state = ObjectState::classify(&meta(
            "DEEP_ARCHIVE",
            "ongoing-request=\"false\", expiry-date=\"Fri, 21 Dec 2012 00:00:00 GMT\"",
        ));
        assert!(!state.needs_restore);
    }

    #[test]
    fn test_standard_does_not_need_restore() {
        let state = ObjectState::classify(&meta("STANDARD", ""));
        assert!(!state.needs_restore);
        assert_eq!(state.storage_class, "STANDARD");
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert!(ObjectState::classify(&meta("deep_archive", "")).needs_restore);
        assert!(ObjectState::classify(&meta("Glacier_Deep_Archive", "")).needs_restore);
        assert!(!ObjectState::classify(&meta("ARCHIVE", "ONGOING-REQUEST=\"true\"")).needs_restore);
    }

    #[test]
    fn test_missing_headers() {
        let state = ObjectState::classify(&HeadMetadata {
            size: 7,
            storage_class: None,
            restore: None,
        });
        assert_eq!(state.size_bytes, 7);
        assert_eq!(state.storage_class, "");
        assert!(!state.needs_restore);
    }

    #[test]
    fn test_unknown_state_is_zero() {
        let state = ObjectState::unknown();
        assert_eq!(state.size_bytes, 0);
        assert!(!state.needs_restore);
        assert!(!state.restore_pending);
    }
}
