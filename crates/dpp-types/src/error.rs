/// Errors from parsing and validating foundation types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// Unrecognized content format selector.
    #[error("invalid content format: {0}")]
    InvalidContentFormat(String),

    /// Unrecognized output shape selector.
    #[error("invalid output shape: {0}")]
    InvalidOutputShape(String),

    /// Unrecognized signature mode selector.
    #[error("invalid signature mode: {0}")]
    InvalidSignatureMode(String),

    /// Unrecognized event type tag.
    #[error("invalid event type: {0}")]
    InvalidEventType(String),

    /// Unrecognized attachment type tag.
    #[error("invalid attachment type: {0}")]
    InvalidAttachmentType(String),

    /// Unrecognized attachment source tag.
    #[error("invalid attachment source: {0}")]
    InvalidAttachmentSource(String),

    /// An object carried neither an `@id` nor an `id` field.
    #[error("unidentifiable object: no `@id` or `id` field")]
    UnidentifiableObject,
}

/// Result alias for type-level operations.
pub type TypeResult<T> = Result<T, TypeError>;
