//! Service facade over the DPP core.
//!
//! [`PassportService`] binds the passport graph, event log, and
//! attachment index behind the single operation surface a request layer
//! consumes: document rendering, ingestion, hierarchy edits, event CRUD,
//! attachment transfer, search, and statistics.
//!
//! # Design rules
//!
//! 1. The facade adds no storage semantics of its own. Locking,
//!    first-write-wins reconciliation, and hierarchy consistency live in
//!    the stores; the facade composes and converts.
//! 2. Every layer error arrives unmodified inside [`SdkError`], so a
//!    boundary maps the whole family in one place.
//! 3. Time-dependent operations take an explicit clock value.

pub mod error;
pub mod search;
pub mod service;

pub use error::{SdkError, SdkResult};
pub use search::{FilterConditions, SearchHit};
pub use service::PassportService;
