/// Errors from passport graph and event log operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed passport is absent from the graph.
    #[error("passport not found: {0}")]
    PassportNotFound(String),

    /// The addressed event is absent from the log.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// Detach was requested for a child that is not attached to the
    /// named parent.
    #[error("subpassport {child} is not attached to {parent}")]
    NotAttached { parent: String, child: String },

    /// Attaching the child would make a passport its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected { parent: String, child: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
