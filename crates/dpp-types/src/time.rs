//! Timestamp parsing shared by event ordering, latest-id selection, and
//! time-windowed statistics.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Parse an ISO-8601 instant (`2024-01-01T00:00:00Z` or offset form).
///
/// Returns `None` on any parse failure; callers treat unparseable
/// timestamps as absent rather than erroring.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Extract the ordering instant of an event body.
///
/// Events are expected (not required) to carry one of two recognized
/// timestamp fields, each wrapped as `{"@value": "<instant>"}`:
/// `prov:atTime` first, `prov:endedAtTime` second. Events lacking both
/// sort to the earliest position.
pub fn event_instant(event: &Value) -> Option<DateTime<Utc>> {
    for field in ["prov:atTime", "prov:endedAtTime"] {
        if let Some(raw) = event
            .get(field)
            .and_then(|wrapped| wrapped.get("@value"))
            .and_then(Value::as_str)
        {
            return parse_instant(raw);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_zulu_suffix() {
        let instant = parse_instant("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn parses_explicit_offset() {
        assert!(parse_instant("2024-01-01T02:00:00+02:00").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_instant("yesterday").is_none());
    }

    #[test]
    fn at_time_preferred_over_ended_at() {
        let event = json!({
            "prov:atTime": {"@value": "2024-01-01T00:00:00Z"},
            "prov:endedAtTime": {"@value": "2024-06-01T00:00:00Z"}
        });
        let instant = event_instant(&event).unwrap();
        assert_eq!(instant, parse_instant("2024-01-01T00:00:00Z").unwrap());
    }

    #[test]
    fn ended_at_used_when_at_time_absent() {
        let event = json!({"prov:endedAtTime": {"@value": "2024-06-01T00:00:00Z"}});
        assert!(event_instant(&event).is_some());
    }

    #[test]
    fn missing_fields_yield_none() {
        assert!(event_instant(&json!({"id": "E1"})).is_none());
    }
}
