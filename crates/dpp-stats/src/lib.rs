//! Aggregate statistics over the passport graph and event log.
//!
//! [`StatsSnapshot::capture`] clones both stores once, so every number
//! derived from one snapshot describes the same instant. Time-windowed
//! counts take an explicit `now` rather than reading the clock, so the
//! boundary layer supplies wall time and tests pin it.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use dpp_store::{EventLog, PassportGraph, StoreResult};
use dpp_types::time::parse_instant;
use dpp_types::PassportRecord;
use serde_json::{json, Value};

/// Reported event-type key for events carrying neither `@type` nor
/// `type`.
pub const UNTYPED_EVENT: &str = "untyped";

/// A point-in-time copy of both stores, ready for aggregation.
pub struct StatsSnapshot {
    records: Vec<PassportRecord>,
    events: Vec<Value>,
}

impl StatsSnapshot {
    pub fn capture(graph: &dyn PassportGraph, log: &dyn EventLog) -> StoreResult<Self> {
        Ok(Self {
            records: graph.records()?,
            events: log.bodies()?,
        })
    }

    // ---- passport groupings ----

    /// Passport count per batch identifier; unbatched passports are not
    /// counted.
    pub fn passports_by_batch(&self) -> BTreeMap<String, usize> {
        let mut batches = BTreeMap::new();
        for record in &self.records {
            if let Some(batch_id) = &record.batch_id {
                *batches.entry(batch_id.clone()).or_insert(0) += 1;
            }
        }
        batches
    }

    pub fn number_of_batches(&self) -> usize {
        self.records
            .iter()
            .filter_map(|r| r.batch_id.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Passport count per tag; a passport contributes to every tag it
    /// carries.
    pub fn passports_by_tag(&self) -> BTreeMap<String, usize> {
        let mut tags = BTreeMap::new();
        for record in &self.records {
            for tag in &record.tags {
                *tags.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        tags
    }

    pub fn number_of_unique_tags(&self) -> usize {
        self.records
            .iter()
            .flat_map(|r| r.tags.iter().map(String::as_str))
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn passports_by_type(&self) -> BTreeMap<String, usize> {
        let mut types = BTreeMap::new();
        for record in &self.records {
            *types.entry(record.passport_type.clone()).or_insert(0) += 1;
        }
        types
    }

    /// Passports with neither a parent nor sub-passports.
    pub fn number_of_single_passports(&self) -> usize {
        self.records.iter().filter(|r| !r.is_connected()).count()
    }

    /// Passports linked into a hierarchy on either side.
    pub fn number_of_connected_passports(&self) -> usize {
        self.records.iter().filter(|r| r.is_connected()).count()
    }

    // ---- creation-time windows ----

    /// Passports whose creation timestamp parses and falls inside
    /// `[start, end]`. Unparseable timestamps are treated as absent.
    pub fn created_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        self.records
            .iter()
            .filter_map(|r| r.creation_timestamp.as_deref())
            .filter_map(parse_instant)
            .filter(|instant| (start..=end).contains(instant))
            .count()
    }

    pub fn created_last_day(&self, now: DateTime<Utc>) -> usize {
        self.created_in_range(now - Duration::days(1), now)
    }

    pub fn created_last_week(&self, now: DateTime<Utc>) -> usize {
        self.created_in_range(now - Duration::weeks(1), now)
    }

    pub fn created_last_month(&self, now: DateTime<Utc>) -> usize {
        self.created_in_range(now - Duration::days(30), now)
    }

    pub fn created_last_year(&self, now: DateTime<Utc>) -> usize {
        self.created_in_range(now - Duration::days(365), now)
    }

    pub fn created_last_5_years(&self, now: DateTime<Utc>) -> usize {
        self.created_in_range(now - Duration::days(365 * 5), now)
    }

    /// Passports carrying any creation timestamp at all.
    pub fn created_all_time(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.creation_timestamp.is_some())
            .count()
    }

    // ---- events ----

    pub fn events_all_time(&self) -> usize {
        self.events.len()
    }

    /// Event count per semantic type, read from the body's `@type` with a
    /// `type` fallback; events carrying neither group under
    /// [`UNTYPED_EVENT`].
    pub fn events_by_type(&self) -> BTreeMap<String, usize> {
        let mut types = BTreeMap::new();
        for event in &self.events {
            let event_type = event
                .get("@type")
                .or_else(|| event.get("type"))
                .and_then(Value::as_str)
                .unwrap_or(UNTYPED_EVENT);
            *types.entry(event_type.to_string()).or_insert(0) += 1;
        }
        types
    }

    /// The full aggregate report, shaped for direct serialization at the
    /// boundary.
    pub fn to_report(&self, now: DateTime<Utc>) -> Value {
        json!({
            "passport": {
                "passports_by_batch": self.passports_by_batch(),
                "number_batches": self.number_of_batches(),
                "passports_by_tag": self.passports_by_tag(),
                "number_tags": self.number_of_unique_tags(),
                "passports_by_type": self.passports_by_type(),
                "number_single_passports": self.number_of_single_passports(),
                "number_connected_passports": self.number_of_connected_passports(),
                "passports_created_last_day": self.created_last_day(now),
                "passports_created_last_week": self.created_last_week(now),
                "passports_created_last_month": self.created_last_month(now),
                "passports_created_last_year": self.created_last_year(now),
                "passports_created_last_5_years": self.created_last_5_years(now),
                "passports_created_all_time": self.created_all_time(),
                "total_dpp_documents": self.records.len(),
            },
            "event": {
                "events_all_time": self.events_all_time(),
                "number_event_types": self.events_by_type(),
            },
        })
    }
}
