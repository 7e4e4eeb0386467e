//! Passport graph and event log for the DPP core.
//!
//! Two of the three normalized stores live here. The passport graph maps
//! passport identifiers to [`dpp_types::PassportRecord`]s and maintains
//! the parent/sub-passport forest; the event log maps event identifiers to
//! opaque event bodies. Cross-references between the stores are always by
//! identifier.
//!
//! # Storage backends
//!
//! Both stores are defined as traits so a persistent backend can be
//! substituted without touching ingestion or expansion logic:
//!
//! - [`PassportGraph`] -- implemented by [`InMemoryPassportGraph`]
//! - [`EventLog`] -- implemented by [`InMemoryEventLog`]
//!
//! # Design rules
//!
//! 1. Records are cloned on read and write; no references escape a lock.
//! 2. Concurrent reads are always safe; each store serializes its own
//!    mutations behind one `RwLock`.
//! 3. Multi-record mutations (ingestion commits) take the write lock once,
//!    so a reader never observes a partially linked subtree.
//! 4. The forest is acyclic: attach rejects any link that would make a
//!    passport its own ancestor, and traversals are bounded by a visited
//!    set regardless.
//! 5. Duplicate event inserts are first-write-wins; a content mismatch is
//!    a reported conflict, never an error.

pub mod aggregate;
pub mod error;
pub mod memory;
pub mod ordering;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use aggregate::{collect_subtree_ids, subtree_events};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryEventLog, InMemoryPassportGraph};
pub use ordering::sort_events;
pub use traits::{EventInsert, EventLog, GraphBatch, PassportGraph};
