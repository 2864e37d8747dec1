use super::schema::DocumentId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Which lookup stage came up empty.
///
/// Both stages surface as the same NotFound status at the boundary; the
/// variant exists so diagnostics can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("no document with id {0}")]
    Record(DocumentId),

    #[error("backing file `{filename}` for document {id} cannot be opened")]
    File { id: DocumentId, filename: String },
}

/// Errors returned by every catalog operation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(#[from] Missing),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The metadata store could not be reached or failed mid-query.
    /// Never retried here.
    #[error("metadata store unavailable: {message}")]
    StoreUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CatalogError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// The missing stage, if this is a NotFound.
    pub fn missing(&self) -> Option<&Missing> {
        match self {
            Self::NotFound(missing) => Some(missing),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StoreUnavailable {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::StoreUnavailable {
            message: format!("store task did not complete: {err}"),
            source: Some(Box::new(err)),
        }
    }
}
