use sea_orm::error::DbErr;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::document::DocumentType;

/// Service-level error taxonomy.
///
/// Workflow validation failures are detected before any mutation is applied;
/// when one surfaces mid-confirmation the surrounding transaction rolls back,
/// so callers never observe partial effects.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Document number already exists: {0}")]
    DuplicateDocumentNumber(String),

    #[error("Invalid document type: expected {expected:?}, got {actual:?}")]
    InvalidDocumentType {
        expected: DocumentType,
        actual: DocumentType,
    },

    #[error("Invalid document state: {0}")]
    InvalidDocumentState(String),

    #[error("Document {0} has no lines to confirm")]
    EmptyDocument(String),

    #[error("Item unavailable: {0}")]
    ItemUnavailable(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Item {0} has no current shelf location")]
    NoCurrentLocation(Uuid),

    #[error("Item {0} is already on the target shelf")]
    SameLocation(Uuid),

    #[error("Item {0} has already been sold and cannot be retracted")]
    ItemAlreadyDisposed(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Concurrent modification of item {0}")]
    ConcurrentModification(Uuid),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// True when the error is a caller mistake rather than an infrastructure
    /// failure; callers use this to decide between user feedback and alerting.
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::DatabaseError(_) | Self::EventError(_) | Self::InternalError(_) | Self::Other(_)
        )
    }
}
