use crate::Fingerprint;

pub type Result<T> = std::result::Result<T, VaultError>;

/// Failures that can abort an ingestion or a lookup.
///
/// Optional scan data that is missing never shows up here; the normalizer
/// turns it into empty strings.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The uploaded bytes are not well-formed XML.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A scan with the same fingerprint is already stored.
    #[error("duplicate scan entry: {0}")]
    DuplicateScan(Fingerprint),

    /// A required field is missing or cannot be coerced.
    #[error("invalid record: {field}: {reason}")]
    InvalidRecord { field: String, reason: String },

    /// The storage backend failed; the whole request may be retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A uniqueness constraint fired at insert time.
    #[error("conflicting insert: {0}")]
    Conflict(String),
}

impl VaultError {
    pub fn invalid_record(field: impl Into<String>, reason: impl Into<String>) -> Self {
        VaultError::InvalidRecord { field: field.into(), reason: reason.into() }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        VaultError::StorageUnavailable(msg.into())
    }

    /// Duplicates and insert-time conflicts look the same to a client.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, VaultError::DuplicateScan(_) | VaultError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_counts_as_duplicate() {
        assert!(VaultError::Conflict("metadata.id".into()).is_duplicate());
        assert!(VaultError::DuplicateScan(Fingerprint::from("abc")).is_duplicate());
        assert!(!VaultError::storage("disk full").is_duplicate());
    }

    #[test]
    fn invalid_record_names_field() {
        let err = VaultError::invalid_record("port@portid", "not a number: abc");
        assert_eq!(err.to_string(), "invalid record: port@portid: not a number: abc");
    }
}
