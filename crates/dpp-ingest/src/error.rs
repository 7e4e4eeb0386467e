use dpp_store::StoreError;

/// Errors that abort an ingestion.
///
/// Only structural problems abort: a bad envelope, an unidentifiable or
/// unparsable passport body, or a malformed sub-passport (which aborts
/// its ancestors too). Unresolvable attachment and event references are
/// soft conditions handled inside the pipeline with a logged skip.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The document did not have exactly one top-level key naming the
    /// passport type, or its value was not an object.
    #[error("document must carry exactly one top-level passport-type key with an object body")]
    MalformedEnvelope,

    /// A required scalar field was absent or not a string.
    #[error("missing or invalid field `{field}` in passport `{context}`")]
    MissingField { field: String, context: String },

    /// A structural field failed to parse.
    #[error("invalid field `{field}` in passport `{passport}`: {source}")]
    InvalidField {
        field: String,
        passport: String,
        source: serde_json::Error,
    },

    /// A nested sub-passport failed to ingest; the whole document is
    /// aborted.
    #[error("unable to parse subpassport for `{parent}`: {source}")]
    Subpassport {
        parent: String,
        #[source]
        source: Box<IngestError>,
    },

    /// Storage-layer failure during staging or commit.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;
