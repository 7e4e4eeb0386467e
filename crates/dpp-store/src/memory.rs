use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use dpp_types::{EventType, PassportRecord};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{EventInsert, EventLog, GraphBatch, PassportGraph};

/// In-memory, HashMap-based passport graph.
///
/// All records are held in memory behind a `RwLock` and cloned on
/// read/write. Suitable for a single-process server; swap in a persistent
/// [`PassportGraph`] implementation for anything else.
pub struct InMemoryPassportGraph {
    records: RwLock<HashMap<String, PassportRecord>>,
}

impl InMemoryPassportGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Walk parent pointers from `start`, returning `true` if `target` is
    /// an ancestor of `start` (or `start` itself).
    ///
    /// Bounded by a visited set so a corrupted chain cannot loop forever.
    fn is_ancestor(
        records: &HashMap<String, PassportRecord>,
        start: &str,
        target: &str,
    ) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(start.to_string());
        while let Some(id) = current {
            if id == target {
                return true;
            }
            if !visited.insert(id.clone()) {
                warn!(passport = %id, "parent chain contains a cycle");
                return false;
            }
            current = records.get(&id).and_then(|r| r.parent.clone());
        }
        false
    }

    /// Remove `child_id` from `parent_id`'s sub-passport list, if listed.
    fn unlist_child(
        records: &mut HashMap<String, PassportRecord>,
        parent_id: &str,
        child_id: &str,
    ) {
        if let Some(parent) = records.get_mut(parent_id) {
            parent.subpassports.retain(|id| id != child_id);
        }
    }
}

impl Default for InMemoryPassportGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PassportGraph for InMemoryPassportGraph {
    fn put(&self, record: PassportRecord) -> StoreResult<()> {
        let mut records = self.records.write().expect("lock poisoned");
        debug!(passport = %record.id, "passport stored");
        records.insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<PassportRecord>> {
        let records = self.records.read().expect("lock poisoned");
        Ok(records.get(id).cloned())
    }

    fn ids(&self) -> StoreResult<Vec<String>> {
        let records = self.records.read().expect("lock poisoned");
        Ok(records.keys().cloned().collect())
    }

    fn records(&self) -> StoreResult<Vec<PassportRecord>> {
        let records = self.records.read().expect("lock poisoned");
        Ok(records.values().cloned().collect())
    }

    fn count(&self) -> StoreResult<usize> {
        let records = self.records.read().expect("lock poisoned");
        Ok(records.len())
    }

    fn attach(&self, parent_id: &str, child_id: &str) -> StoreResult<()> {
        let mut records = self.records.write().expect("lock poisoned");
        if !records.contains_key(parent_id) {
            return Err(StoreError::PassportNotFound(parent_id.to_string()));
        }
        if !records.contains_key(child_id) {
            return Err(StoreError::PassportNotFound(child_id.to_string()));
        }

        // Reject any link that would make a passport its own ancestor.
        if Self::is_ancestor(&records, parent_id, child_id) {
            return Err(StoreError::CycleDetected {
                parent: parent_id.to_string(),
                child: child_id.to_string(),
            });
        }

        let previous_parent = records
            .get(child_id)
            .and_then(|child| child.parent.clone());
        match previous_parent.as_deref() {
            Some(existing) if existing == parent_id => {
                // Already attached; idempotent.
                let parent = records.get_mut(parent_id).expect("checked above");
                if !parent.subpassports.iter().any(|id| id == child_id) {
                    warn!(parent = %parent_id, child = %child_id,
                        "child claimed parent without listing; restoring");
                    parent.subpassports.push(child_id.to_string());
                }
                return Ok(());
            }
            Some(existing) => {
                warn!(parent = %existing, child = %child_id,
                    "re-attaching child away from previous parent");
                let existing = existing.to_string();
                Self::unlist_child(&mut records, &existing, child_id);
            }
            None => {}
        }

        let parent = records.get_mut(parent_id).expect("checked above");
        if !parent.subpassports.iter().any(|id| id == child_id) {
            parent.subpassports.push(child_id.to_string());
        }
        let child = records.get_mut(child_id).expect("checked above");
        child.parent = Some(parent_id.to_string());
        debug!(parent = %parent_id, child = %child_id, "subpassport attached");
        Ok(())
    }

    fn append_event_ref(
        &self,
        passport_id: &str,
        event_type: EventType,
        event_id: &str,
    ) -> StoreResult<()> {
        let mut records = self.records.write().expect("lock poisoned");
        let record = records
            .get_mut(passport_id)
            .ok_or_else(|| StoreError::PassportNotFound(passport_id.to_string()))?;
        record.events.get_mut(event_type).push(event_id.to_string());
        Ok(())
    }

    fn detach(&self, parent_id: &str, child_id: &str) -> StoreResult<()> {
        let mut records = self.records.write().expect("lock poisoned");
        if !records.contains_key(parent_id) {
            return Err(StoreError::PassportNotFound(parent_id.to_string()));
        }
        if !records.contains_key(child_id) {
            return Err(StoreError::PassportNotFound(child_id.to_string()));
        }

        let listed = records
            .get(parent_id)
            .map(|parent| parent.subpassports.iter().any(|id| id == child_id))
            .unwrap_or(false);
        let claimed = records
            .get(child_id)
            .map(|child| child.parent.as_deref() == Some(parent_id))
            .unwrap_or(false);

        if !listed && !claimed {
            return Err(StoreError::NotAttached {
                parent: parent_id.to_string(),
                child: child_id.to_string(),
            });
        }
        if listed != claimed {
            // One side recorded the link, the other did not. Force
            // consistency rather than failing.
            warn!(parent = %parent_id, child = %child_id,
                "partially attached subpassport; detaching fully");
        }

        Self::unlist_child(&mut records, parent_id, child_id);
        let child = records.get_mut(child_id).expect("checked above");
        child.parent = None;
        debug!(parent = %parent_id, child = %child_id,
            "subpassport detached, record retained");
        Ok(())
    }

    fn commit(&self, batch: GraphBatch) -> StoreResult<()> {
        let mut records = self.records.write().expect("lock poisoned");
        // Applied to a copy first so a failed validation leaves the live
        // graph untouched.
        let mut staged = records.clone();
        let mut new_links: Vec<(String, String)> = Vec::new();

        for record in batch.records {
            let previous_parent = staged.get(&record.id).and_then(|r| r.parent.clone());
            if let Some(old) = &previous_parent {
                if record.parent.as_deref() != Some(old.as_str()) {
                    Self::unlist_child(&mut staged, old, &record.id);
                }
            }
            if let Some(parent) = &record.parent {
                new_links.push((record.id.clone(), parent.clone()));
            }
            staged.insert(record.id.clone(), record);
        }

        for (child_id, parent_id) in batch.parent_links {
            let previous_parent = match staged.get(&child_id) {
                Some(child) => child.parent.clone(),
                None => {
                    warn!(child = %child_id,
                        "batch parent link targets a missing passport");
                    continue;
                }
            };
            if let Some(old) = &previous_parent {
                if *old != parent_id {
                    Self::unlist_child(&mut staged, old, &child_id);
                }
            }
            let child = staged.get_mut(&child_id).expect("presence checked");
            child.parent = Some(parent_id.clone());
            match staged.get_mut(&parent_id) {
                Some(parent) => {
                    if !parent.subpassports.iter().any(|id| id == &child_id) {
                        parent.subpassports.push(child_id.clone());
                    }
                }
                None => warn!(parent = %parent_id, child = %child_id,
                    "batch parent link names a missing parent"),
            }
            new_links.push((child_id, parent_id));
        }

        // Every new cycle must pass through one of the edges this batch
        // introduced, so checking those edges suffices.
        for (child_id, parent_id) in &new_links {
            if Self::is_ancestor(&staged, parent_id, child_id) {
                return Err(StoreError::CycleDetected {
                    parent: parent_id.clone(),
                    child: child_id.clone(),
                });
            }
        }

        *records = staged;
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryPassportGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.records.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryPassportGraph")
            .field("passport_count", &count)
            .finish()
    }
}

/// In-memory, HashMap-based event log.
pub struct InMemoryEventLog {
    events: RwLock<HashMap<String, Value>>,
}

impl InMemoryEventLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }

    fn insert_locked(
        events: &mut HashMap<String, Value>,
        event_id: &str,
        body: Value,
    ) -> EventInsert {
        match events.get(event_id) {
            None => {
                events.insert(event_id.to_string(), body);
                debug!(event = %event_id, "event added");
                EventInsert::Inserted
            }
            Some(existing) if *existing == body => {
                warn!(event = %event_id, "event was already present");
                EventInsert::Duplicate
            }
            Some(_) => {
                // First-write-wins: keep the stored body.
                warn!(event = %event_id,
                    "input event differs from existing event with the same id");
                EventInsert::Conflict
            }
        }
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for InMemoryEventLog {
    fn insert(&self, event_id: &str, body: Value) -> StoreResult<EventInsert> {
        let mut events = self.events.write().expect("lock poisoned");
        Ok(Self::insert_locked(&mut events, event_id, body))
    }

    fn get(&self, event_id: &str) -> StoreResult<Option<Value>> {
        let events = self.events.read().expect("lock poisoned");
        Ok(events.get(event_id).cloned())
    }

    fn update(&self, event_id: &str, body: Value) -> StoreResult<()> {
        let mut events = self.events.write().expect("lock poisoned");
        match events.get_mut(event_id) {
            Some(existing) => {
                *existing = body;
                Ok(())
            }
            None => Err(StoreError::EventNotFound(event_id.to_string())),
        }
    }

    fn delete(&self, event_id: &str) -> StoreResult<()> {
        let mut events = self.events.write().expect("lock poisoned");
        if events.remove(event_id).is_none() {
            return Err(StoreError::EventNotFound(event_id.to_string()));
        }
        Ok(())
    }

    fn count(&self) -> StoreResult<usize> {
        let events = self.events.read().expect("lock poisoned");
        Ok(events.len())
    }

    fn bodies(&self) -> StoreResult<Vec<Value>> {
        let events = self.events.read().expect("lock poisoned");
        Ok(events.values().cloned().collect())
    }

    fn insert_batch(&self, entries: Vec<(String, Value)>) -> StoreResult<Vec<EventInsert>> {
        let mut events = self.events.write().expect("lock poisoned");
        Ok(entries
            .into_iter()
            .map(|(event_id, body)| Self::insert_locked(&mut events, &event_id, body))
            .collect())
    }
}

impl std::fmt::Debug for InMemoryEventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.events.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryEventLog")
            .field("event_count", &count)
            .finish()
    }
}
