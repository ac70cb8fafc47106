// ⚠️ Error taxonomy
//
// Collaborator failures (storage, uploads, validation) are CatalogError.
// Session-level outcomes wrap them in SessionError so callers can tell a
// failed save from a failed upload. Lookup misses and cycles in the
// category graph are not errors at all: see schema::WalkEnd.

use crate::session::SessionState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote collaborator could not be reached or answered garbage
    #[error("transport error: {0}")]
    Transport(String),
}

impl CatalogError {
    pub fn category_not_found(id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            entity: "category",
            id: id.into(),
        }
    }

    pub fn product_not_found(id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            entity: "product",
            id: id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Create/update was rejected; session is back in Editing with all edits intact
    #[error("failed to save product: {0}")]
    PersistenceFailure(#[source] CatalogError),

    /// Upload batch failed; image sequence is unchanged
    #[error("failed to upload images: {0}")]
    UploadFailure(#[source] CatalogError),

    #[error("session is not editable in state {state:?}")]
    NotEditable { state: SessionState },

    #[error("no save in flight")]
    NoSaveInFlight,

    /// Rejected field edit; the previous value is kept
    #[error("invalid edit: {0}")]
    InvalidEdit(#[source] CatalogError),

    #[error("an upload is already in flight")]
    UploadInFlight,

    #[error("no upload in flight")]
    NoUploadInFlight,
}

pub type CatalogResult<T> = Result<T, CatalogError>;
