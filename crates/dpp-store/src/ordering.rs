//! Presentation ordering for event lists.
//!
//! Events are stored unordered; lists are sorted only when handed out.

use dpp_types::time::event_instant;
use serde_json::Value;

/// Sort event bodies stable-ascending by their extracted instant.
///
/// Events carrying no recognized timestamp field sort to the earliest
/// position (`None < Some(_)`), preserving their relative order.
pub fn sort_events(mut events: Vec<Value>) -> Vec<Value> {
    events.sort_by_key(event_instant);
    events
}
