use dpp_attach::AttachError;
use dpp_expand::ExpandError;
use dpp_ingest::IngestError;
use dpp_store::StoreError;
use dpp_types::TypeError;

/// Unified error surface of the service facade.
///
/// Each layer keeps its own error type; the facade only collects them so
/// a boundary can map the whole family in one place (`NotFound`-style
/// variants to 404-equivalents, `NotImplemented` to 501, invalid format
/// selectors to 400, the rest to 500).
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Attach(#[from] AttachError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    /// Invalid format/mode selector strings parsed at the boundary.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Template instantiation and credential management are outside the
    /// current scope and always fail.
    #[error("{0} is not implemented")]
    NotImplemented(String),
}

/// Result alias for service operations.
pub type SdkResult<T> = Result<T, SdkError>;
