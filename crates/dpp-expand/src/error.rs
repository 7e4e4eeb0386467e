use dpp_store::StoreError;

/// Errors surfaced while rendering a passport document.
#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    /// A capability accepted by the interface but outside the current
    /// scope, e.g. any signature mode other than `unsigned`.
    #[error("{0} is not implemented")]
    NotImplemented(String),

    /// Storage-layer failure, including the addressed passport being
    /// absent.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An embedded entity failed to serialize into the output document.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for expansion operations.
pub type ExpandResult<T> = Result<T, ExpandError>;
