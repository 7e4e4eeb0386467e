//! Cycle-safe subtree traversal and event aggregation.

use std::collections::HashSet;

use dpp_types::EventType;
use serde_json::Value;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::ordering::sort_events;
use crate::traits::{EventLog, PassportGraph};

/// Identifiers of `root` and every descendant reachable through
/// `subpassports`, depth-first pre-order.
///
/// Each passport appears once even if reachable through multiple paths;
/// the visited set also bounds traversal if the forest invariant has been
/// violated. Fails `PassportNotFound` if the root is absent; a missing
/// descendant is logged and skipped.
pub fn collect_subtree_ids(graph: &dyn PassportGraph, root: &str) -> StoreResult<Vec<String>> {
    if graph.get(root)?.is_none() {
        return Err(StoreError::PassportNotFound(root.to_string()));
    }

    let mut ordered = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![root.to_string()];
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        match graph.get(&id)? {
            Some(record) => {
                // Push children reversed so they pop in declaration order.
                for child in record.subpassports.iter().rev() {
                    stack.push(child.clone());
                }
                ordered.push(id);
            }
            None => warn!(passport = %id, "subtree references a missing passport"),
        }
    }
    Ok(ordered)
}

/// All events of the given type across `root`'s full subtree, sorted
/// ascending by extracted timestamp.
///
/// Event identifiers are deduplicated across descendants before
/// resolution, so an event shared by several passports contributes one
/// body. Identifiers that no longer resolve in the log are logged and
/// skipped.
pub fn subtree_events(
    graph: &dyn PassportGraph,
    log: &dyn EventLog,
    root: &str,
    event_type: EventType,
) -> StoreResult<Vec<Value>> {
    let mut seen = HashSet::new();
    let mut bodies = Vec::new();
    for id in collect_subtree_ids(graph, root)? {
        let record = match graph.get(&id)? {
            Some(record) => record,
            None => continue,
        };
        for event_id in record.events.get(event_type) {
            if !seen.insert(event_id.clone()) {
                continue;
            }
            match log.get(event_id)? {
                Some(body) => bodies.push(body),
                None => warn!(event = %event_id, passport = %id,
                    "passport references a missing event"),
            }
        }
    }
    Ok(sort_events(bodies))
}
