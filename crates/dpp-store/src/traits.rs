use dpp_types::{EventType, PassportRecord};
use serde_json::Value;

use crate::error::StoreResult;

/// A batch of graph mutations applied atomically.
///
/// Ingestion stages a whole nested document into one batch so that a
/// concurrent reader sees either the entire subtree or none of it.
#[derive(Debug, Default)]
pub struct GraphBatch {
    /// Records to insert or fully replace, root last.
    pub records: Vec<PassportRecord>,
    /// `(child_id, parent_id)` links to establish on commit: the child's
    /// `parent` is set and the parent's `subpassports` gains the child.
    /// Used for bare sub-passport references resolved at ingestion and
    /// for linking an ingested root under an existing parent.
    pub parent_links: Vec<(String, String)>,
}

impl GraphBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.parent_links.is_empty()
    }
}

/// Outcome of inserting an event under an identifier already considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventInsert {
    /// The identifier was new; the body is now stored.
    Inserted,
    /// The identifier existed with an identical body; nothing changed.
    Duplicate,
    /// The identifier existed with a different body; the original body
    /// was kept (first-write-wins).
    Conflict,
}

/// The passport forest: identifier-keyed records with parent/sub-passport
/// links.
///
/// Implementations must keep the forest bidirectionally consistent: a
/// child's `parent` names exactly the passport whose `subpassports` lists
/// the child. [`PassportGraph::attach`] and [`PassportGraph::detach`]
/// establish and tear down both sides under one lock acquisition.
pub trait PassportGraph: Send + Sync {
    /// Insert or fully replace a record under its own identifier.
    fn put(&self, record: PassportRecord) -> StoreResult<()>;

    /// Read a record by identifier. Returns `Ok(None)` if absent.
    fn get(&self, id: &str) -> StoreResult<Option<PassportRecord>>;

    /// All passport identifiers currently stored, in arbitrary order.
    fn ids(&self) -> StoreResult<Vec<String>>;

    /// Snapshot of all records, in arbitrary order.
    ///
    /// Used by search and statistics; implementations clone under a single
    /// read-lock acquisition so the snapshot is internally consistent.
    fn records(&self) -> StoreResult<Vec<PassportRecord>>;

    /// Number of records stored.
    fn count(&self) -> StoreResult<usize>;

    /// Link `child_id` under `parent_id`.
    ///
    /// Fails `PassportNotFound` if either side is absent and
    /// `CycleDetected` if the link would make a passport its own
    /// ancestor. Re-attaching an already attached child is a no-op.
    fn attach(&self, parent_id: &str, child_id: &str) -> StoreResult<()>;

    /// Unlink `child_id` from `parent_id`.
    ///
    /// Fails `NotAttached` if neither side records the relationship. If
    /// only one side records it, consistency is forced and the
    /// discrepancy logged rather than failing.
    fn detach(&self, parent_id: &str, child_id: &str) -> StoreResult<()>;

    /// Append an event identifier to a passport's reference list of the
    /// given type, under the write lock.
    ///
    /// Fails `PassportNotFound` if the passport is absent; the event
    /// body's presence in the log is not checked here.
    fn append_event_ref(
        &self,
        passport_id: &str,
        event_type: EventType,
        event_id: &str,
    ) -> StoreResult<()>;

    /// Apply a [`GraphBatch`] under a single write-lock acquisition.
    ///
    /// The batch is validated before anything becomes visible: a record
    /// or parent link that would make a passport its own ancestor fails
    /// `CycleDetected` and leaves the graph unchanged. Re-parented
    /// children are removed from their previous parent's sub-passport
    /// list, keeping the forest bidirectionally consistent on this path
    /// as well.
    fn commit(&self, batch: GraphBatch) -> StoreResult<()>;
}

/// The event log: identifier-keyed opaque event bodies.
///
/// The log never interprets bodies beyond equality comparison for
/// duplicate detection and timestamp extraction for presentation
/// ordering. Passports reference events by identifier only; `update` and
/// `delete` act on the log alone and never cascade into passport
/// reference lists.
pub trait EventLog: Send + Sync {
    /// Insert a body under an identifier, first-write-wins.
    fn insert(&self, event_id: &str, body: Value) -> StoreResult<EventInsert>;

    /// Read a body by identifier. Returns `Ok(None)` if absent.
    fn get(&self, event_id: &str) -> StoreResult<Option<Value>>;

    /// Overwrite an existing body. Fails `EventNotFound` if absent.
    fn update(&self, event_id: &str, body: Value) -> StoreResult<()>;

    /// Remove a body. Fails `EventNotFound` if absent.
    fn delete(&self, event_id: &str) -> StoreResult<()>;

    /// Number of events stored.
    fn count(&self) -> StoreResult<usize>;

    /// Snapshot of all event bodies, in arbitrary order. Used by
    /// statistics.
    fn bodies(&self) -> StoreResult<Vec<Value>>;

    /// Insert many events under a single write-lock acquisition,
    /// returning the per-event outcome in input order.
    fn insert_batch(&self, entries: Vec<(String, Value)>) -> StoreResult<Vec<EventInsert>>;
}
