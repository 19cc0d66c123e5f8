use rusqlite::ffi;
use scanvault_core::VaultError;

/// Sorts SQLite failures into the gateway's error kinds: key collisions are
/// conflicts, other constraint failures mean a bad record, anything else is
/// the backend being unavailable.
pub(crate) fn storage_err(err: rusqlite::Error) -> VaultError {
    if let rusqlite::Error::SqliteFailure(e, msg) = &err {
        if e.code == ffi::ErrorCode::ConstraintViolation {
            let detail = msg.clone().unwrap_or_else(|| e.to_string());
            return match e.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => VaultError::Conflict(detail),
                _ => VaultError::invalid_record("results", detail),
            };
        }
    }
    VaultError::storage(err.to_string())
}
