//! Ingestion pipeline for the DPP core.
//!
//! [`import_document`] consumes an externally supplied nested document --
//! a passport with inline sub-passports, inline or referenced events, and
//! inline or referenced attachments -- and normalizes it into the three
//! stores. The document shape is a single top-level key naming the
//! passport type, with the passport body beneath it.
//!
//! The pipeline runs in two phases:
//!
//! 1. **Stage**: the whole subtree is parsed and resolved against the
//!    stores using reads only, producing one batch of passport records,
//!    parent links, and event bodies. Structural problems (bad envelope,
//!    unidentifiable passport, malformed sub-passport) abort here with
//!    nothing written. Unresolvable attachment and event references are
//!    soft: logged and skipped, the surrounding passport survives.
//! 2. **Commit**: events are inserted first (first-write-wins, conflicts
//!    logged), then the graph batch is applied under a single write-lock
//!    acquisition, so a concurrent reader sees either the whole subtree
//!    or none of it.

pub mod error;

use std::collections::HashSet;

use dpp_attach::AttachmentIndex;
use dpp_store::{EventLog, GraphBatch, PassportGraph};
use dpp_types::ident::extract_id;
use dpp_types::{Entity, EventRefs, EventType, PassportRecord};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

pub use error::{IngestError, IngestResult};

/// Everything a single nested document normalizes into, before commit.
#[derive(Default)]
struct Staged {
    records: Vec<PassportRecord>,
    parent_links: Vec<(String, String)>,
    events: Vec<(String, Value)>,
}

/// Normalize `document` into the stores, recursively, and return the
/// root passport's identifier.
///
/// With `parent_id` set, the root record is staged as a child of that
/// passport and the parent's sub-passport list gains the root on commit.
pub fn import_document(
    graph: &dyn PassportGraph,
    log: &dyn EventLog,
    attachments: &AttachmentIndex,
    document: &Value,
    parent_id: Option<&str>,
) -> IngestResult<String> {
    let mut staged = Staged::default();
    let root_id = stage_passport(graph, attachments, document, parent_id, &mut staged)?;
    if let Some(parent) = parent_id {
        staged.parent_links.push((root_id.clone(), parent.to_string()));
    }

    // Events first: a passport visible in the graph must never reference
    // an event the log has not seen yet.
    log.insert_batch(staged.events)?;
    graph.commit(GraphBatch {
        records: staged.records,
        parent_links: staged.parent_links,
    })?;
    info!(passport = %root_id, "document imported");
    Ok(root_id)
}

fn stage_passport(
    graph: &dyn PassportGraph,
    attachments: &AttachmentIndex,
    document: &Value,
    parent_id: Option<&str>,
    staged: &mut Staged,
) -> IngestResult<String> {
    let envelope = document.as_object().ok_or(IngestError::MalformedEnvelope)?;
    if envelope.len() != 1 {
        return Err(IngestError::MalformedEnvelope);
    }
    let (passport_type, body_value) = envelope.iter().next().expect("length checked");
    let body = body_value
        .as_object()
        .ok_or(IngestError::MalformedEnvelope)?;

    let passport_id = extract_id(body_value)
        .map_err(|_| IngestError::MissingField {
            field: "id".into(),
            context: passport_type.clone(),
        })?
        .to_string();

    let mut record = PassportRecord::new(
        passport_type.clone(),
        passport_id.clone(),
        req_string(body, "title", &passport_id)?,
    );
    record.manufacturer = entity_opt(body, "manufacturer", &passport_id)?;
    record.economic_operator = entity_list(body, "economic_operator", &passport_id)?;
    record.current_owner = entity_opt(body, "current_owner", &passport_id)?;
    record.known_past_owners = entity_list(body, "known_past_owners", &passport_id)?;
    record.registration_id = opt_string(body, "registration_id");
    record.batch_id = opt_string(body, "batch_id");
    record.creation_timestamp = opt_string(body, "creation_timestamp");
    record.destruction_timestamp = opt_string(body, "destruction_timestamp");
    record.tags = parsed_field(body, "tags", &passport_id)?.unwrap_or_default();
    record.parent = parent_id.map(str::to_string);
    // Opaque payloads go in as-is; the core never destructures them.
    record.attributes = body
        .get("attributes")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    record.credentials = match body.get("credentials") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    };

    record.attachments = resolve_attachments(attachments, body, &passport_id);
    record.subpassports = stage_subpassports(graph, attachments, body, &passport_id, staged)?;
    record.events = stage_events(body, &passport_id, staged);

    debug!(passport = %passport_id, title = %record.title, "passport staged");
    staged.records.push(record);
    Ok(passport_id)
}

/// Step 3: resolve the body's attachment entries to known identifiers.
///
/// A bare identifier is kept only if the index knows it; an inline object
/// is kept only if its declared identifier is indexed *and* the bytes
/// exist. Anything else is dropped with a logged error -- one missing
/// attachment never fails the passport.
fn resolve_attachments(
    attachments: &AttachmentIndex,
    body: &Map<String, Value>,
    passport_id: &str,
) -> Vec<String> {
    let mut resolved = Vec::new();
    let mut seen = HashSet::new();
    for entry in list_field(body, "attachments") {
        let kept = match entry {
            Value::String(attachment_id) => {
                if attachments.contains(attachment_id) {
                    Some(attachment_id.clone())
                } else {
                    error!(attachment = %attachment_id, passport = %passport_id,
                        "unknown attachment reference dropped");
                    None
                }
            }
            Value::Object(fields) => match fields.get("attachment_id").and_then(Value::as_str) {
                Some(attachment_id) if attachments.is_resolvable(attachment_id) => {
                    Some(attachment_id.to_string())
                }
                Some(attachment_id) => {
                    error!(attachment = %attachment_id, passport = %passport_id,
                        "no file found for importing attachment; try uploading at an endpoint");
                    None
                }
                None => {
                    error!(passport = %passport_id, "cannot read attachment data");
                    None
                }
            },
            _ => {
                error!(passport = %passport_id, "cannot read attachment data");
                None
            }
        };
        if let Some(attachment_id) = kept {
            if seen.insert(attachment_id.clone()) {
                resolved.push(attachment_id);
            }
        }
    }
    debug!(count = resolved.len(), passport = %passport_id, "attachments resolved");
    resolved
}

/// Step 4: resolve the body's sub-passport entries.
///
/// Bare identifiers must already resolve (in the graph, or earlier in
/// this staging); unresolvable ones are logged and dropped, never
/// fetched. Inline objects recurse through the whole pipeline; a failure
/// there aborts this passport and all its ancestors.
fn stage_subpassports(
    graph: &dyn PassportGraph,
    attachments: &AttachmentIndex,
    body: &Map<String, Value>,
    passport_id: &str,
    staged: &mut Staged,
) -> IngestResult<Vec<String>> {
    let mut children = Vec::new();
    for entry in list_field(body, "subpassports") {
        match entry {
            Value::String(child_id) => {
                debug!(subpassport = %child_id, "attempting subpassport import (ref)");
                let known = graph.get(child_id)?.is_some()
                    || staged.records.iter().any(|r| &r.id == child_id);
                if known {
                    staged
                        .parent_links
                        .push((child_id.clone(), passport_id.to_string()));
                    children.push(child_id.clone());
                } else {
                    error!(subpassport = %child_id, passport = %passport_id,
                        "cannot find subpassport; continuing with remaining subpassports");
                }
            }
            inline => {
                let child_id = stage_passport(graph, attachments, inline, Some(passport_id), staged)
                .map_err(|err| IngestError::Subpassport {
                    parent: passport_id.to_string(),
                    source: Box::new(err),
                })?;
                debug!(subpassport = %child_id, "attempting subpassport import (obj)");
                children.push(child_id);
            }
        }
    }
    Ok(children)
}

/// Step 6: derive identifiers for the body's event entries and stage
/// their bodies.
///
/// Unlike the explicit add-event operation, ingestion never mints event
/// identifiers: an entry without one is logged and skipped. Every
/// identified entry lands in the passport's reference list; the log
/// itself applies first-write-wins on commit.
fn stage_events(
    body: &Map<String, Value>,
    passport_id: &str,
    staged: &mut Staged,
) -> EventRefs {
    let mut refs = EventRefs::default();
    let events = match body.get("events") {
        Some(Value::Object(events)) => events.clone(),
        Some(_) | None => {
            error!(passport = %passport_id, "cannot read events");
            Map::new()
        }
    };
    for event_type in EventType::ALL {
        let entries = events
            .get(event_type.as_str())
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for event in entries {
            let event_id = match extract_id(&event) {
                Ok(id) => id.to_string(),
                Err(_) => {
                    error!(passport = %passport_id, kind = event_type.as_str(),
                        "cannot find id for event");
                    continue;
                }
            };
            refs.get_mut(event_type).push(event_id.clone());
            staged.events.push((event_id, event));
        }
        debug!(count = refs.get(event_type).len(), passport = %passport_id,
            kind = event_type.as_str(), "events staged");
    }
    refs
}

fn list_field<'a>(body: &'a Map<String, Value>, field: &str) -> &'a [Value] {
    body.get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn req_string(
    body: &Map<String, Value>,
    field: &str,
    context: &str,
) -> IngestResult<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingField {
            field: field.to_string(),
            context: context.to_string(),
        })
}

fn opt_string(body: &Map<String, Value>, field: &str) -> Option<String> {
    body.get(field).and_then(Value::as_str).map(str::to_string)
}

fn parsed_field<T: serde::de::DeserializeOwned>(
    body: &Map<String, Value>,
    field: &str,
    passport_id: &str,
) -> IngestResult<Option<T>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| IngestError::InvalidField {
                field: field.to_string(),
                passport: passport_id.to_string(),
                source,
            }),
    }
}

fn entity_opt(
    body: &Map<String, Value>,
    field: &str,
    passport_id: &str,
) -> IngestResult<Option<Entity>> {
    parsed_field(body, field, passport_id)
}

/// Entity fields that accept a single record or a list normalize to a
/// list here, so the ambiguity never reaches the stored record.
fn entity_list(
    body: &Map<String, Value>,
    field: &str,
    passport_id: &str,
) -> IngestResult<Vec<Entity>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value @ Value::Array(_)) => {
            Ok(parsed_field_value(value, field, passport_id)?)
        }
        Some(single) => {
            let entity: Entity = parsed_field_value(single, field, passport_id)?;
            Ok(vec![entity])
        }
    }
}

fn parsed_field_value<T: serde::de::DeserializeOwned>(
    value: &Value,
    field: &str,
    passport_id: &str,
) -> IngestResult<T> {
    serde_json::from_value(value.clone()).map_err(|source| IngestError::InvalidField {
        field: field.to_string(),
        passport: passport_id.to_string(),
        source,
    })
}
