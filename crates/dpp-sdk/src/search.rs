//! Passport search over a graph snapshot.

use serde::{Deserialize, Serialize};
use dpp_types::PassportRecord;

/// Conjunction of search filters; an unset filter matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConditions {
    /// Case-insensitive substring match against the passport identifier.
    #[serde(default)]
    pub name_contains: Option<String>,
    /// Accepted passport types.
    #[serde(default)]
    pub passport_type: Vec<String>,
    /// Tags the passport must all carry.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Accepted batch identifiers.
    #[serde(default)]
    pub batch_ids: Vec<String>,
    /// Substring match against the registration identifier.
    #[serde(default)]
    pub registration_id: Option<String>,
    /// Accepted country codes of the current owner's first facility.
    #[serde(default)]
    pub current_country_codes: Vec<String>,
    /// Accepted country codes of the manufacturer's first facility.
    #[serde(default)]
    pub origin_country_codes: Vec<String>,
}

/// One search result, shaped for selection widgets at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub label: String,
    pub value: String,
}

impl FilterConditions {
    /// Whether `record` satisfies every supplied filter.
    ///
    /// Country filters only constrain passports that carry the relevant
    /// entity; the registration filter only constrains passports that
    /// carry a registration identifier. A passport missing those fields
    /// passes the respective filter.
    pub fn matches(&self, record: &PassportRecord) -> bool {
        if let Some(needle) = &self.name_contains {
            if !record.id.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if !self.passport_type.is_empty() && !self.passport_type.contains(&record.passport_type) {
            return false;
        }
        if !self.tags.iter().all(|tag| record.tags.contains(tag)) {
            return false;
        }
        if !self.batch_ids.is_empty() {
            match &record.batch_id {
                Some(batch_id) if self.batch_ids.contains(batch_id) => {}
                _ => return false,
            }
        }
        if let (Some(needle), Some(registration_id)) =
            (&self.registration_id, &record.registration_id)
        {
            if !registration_id.contains(needle.as_str()) {
                return false;
            }
        }
        if !self.current_country_codes.is_empty() {
            if let Some(owner) = &record.current_owner {
                let in_range = owner
                    .country_code()
                    .is_some_and(|code| self.current_country_codes.iter().any(|c| c == code));
                if !in_range {
                    return false;
                }
            }
        }
        if !self.origin_country_codes.is_empty() {
            if let Some(manufacturer) = &record.manufacturer {
                let in_range = manufacturer
                    .country_code()
                    .is_some_and(|code| self.origin_country_codes.iter().any(|c| c == code));
                if !in_range {
                    return false;
                }
            }
        }
        true
    }
}

/// Filter `records` and return hits ordered by identifier.
pub fn search(records: &[PassportRecord], filters: &FilterConditions) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = records
        .iter()
        .filter(|record| filters.matches(record))
        .map(|record| SearchHit {
            label: record.id.clone(),
            value: record.id.clone(),
        })
        .collect();
    hits.sort_by(|a, b| a.label.cmp(&b.label));
    hits
}
