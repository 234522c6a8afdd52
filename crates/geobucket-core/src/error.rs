// crates/geobucket-core/src/error.rs

use crate::model::{BucketId, BucketKey};
use thiserror::Error;

/// Input rejected before any store interaction. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    #[error("location name is empty after normalization")]
    EmptyName,
}

/// Every failure the engine can surface.
///
/// Create races on a bucket key are not part of this type: they are absorbed
/// by [`crate::registry::BucketRegistry`] and only show up as
/// [`GeoBucketError::Contention`] when the retry bound is exhausted.
#[derive(Debug, Error)]
pub enum GeoBucketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("geo bucket {0} not found")]
    NotFound(BucketId),

    #[error("bucket store unavailable: {0}")]
    StoreUnavailable(String),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("bucket {key} did not settle after {attempts} create/merge attempts")]
    Contention { key: BucketKey, attempts: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl GeoBucketError {
    /// `true` for caller mistakes (bad coordinates, empty names).
    pub fn is_validation(&self) -> bool {
        matches!(self, GeoBucketError::Validation(_))
    }
}

/// Busy, locked, unopenable or failing database files become
/// [`GeoBucketError::StoreUnavailable`]; statement-level failures stay
/// [`GeoBucketError::Sqlite`].
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for GeoBucketError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::CannotOpen
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::DiskFull
                        | ErrorCode::NotADatabase
                        | ErrorCode::PermissionDenied
                ) =>
            {
                GeoBucketError::StoreUnavailable(err.to_string())
            }
            _ => GeoBucketError::Sqlite(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoBucketError>;
