/// Errors from attachment index and byte storage operations.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    /// The identifier is absent from the attachment index.
    #[error("attachment not found: {0}")]
    NotFound(String),

    /// The reference exists but its bytes were never stored.
    #[error("attachment {0} found, but not available in store")]
    Unavailable(String),

    /// The reference lacks the fields needed to derive a storage path.
    #[error("cannot derive storage path: {0}")]
    PathUnderivable(String),

    /// I/O error from the byte-storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoding or encoding failure during thumbnail rendering.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result alias for attachment operations.
pub type AttachResult<T> = Result<T, AttachError>;
