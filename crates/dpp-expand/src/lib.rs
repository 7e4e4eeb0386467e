//! Expansion engine for the DPP core.
//!
//! [`expand`] renders a stored passport as a document at one of four
//! content depths:
//!
//! - [`ContentFormat::Compact`]: scalar and entity fields plus bare
//!   reference lists, no resolution
//! - [`ContentFormat::Base`]: attachments resolved to their public
//!   reference form, both event lists resolved to sorted bodies,
//!   sub-passports left as bare identifiers
//! - [`ContentFormat::Full`]: as `base`, but each sub-passport replaced
//!   by its own `base` rendering (exactly one level of descent)
//! - [`ContentFormat::Complete`]: as `base`, but sub-passports rendered
//!   `complete` recursively, down to the leaves
//!
//! The result is the flat document under its passport-type envelope, or,
//! for [`OutputShape::JsonLd`], that document nested as the
//! `credentialSubject` of a verifiable-credential wrapper.

pub mod error;

use dpp_attach::AttachmentIndex;
use dpp_store::{sort_events, EventLog, PassportGraph, StoreError};
use dpp_types::{ContentFormat, EventType, OutputShape, PassportRecord, SignatureMode};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::warn;

pub use error::{ExpandError, ExpandResult};

/// Context identifier carried by every wrapped document.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";
/// Second `type` entry of every wrapped document.
pub const WRAPPER_TYPE: &str = "DigitalProductPassport";
/// `issuer` used when a passport has no current owner.
pub const UNKNOWN_ISSUER: &str = "unknown";
/// `validFrom` used when a passport has no creation timestamp.
pub const DEFAULT_VALID_FROM: &str = "2000-01-01T12:00:00Z";

/// Render the passport `id` at the requested depth and shape.
///
/// Only [`SignatureMode::Unsigned`] is implemented; the other modes are
/// accepted by the type but fail explicitly rather than silently
/// producing unsigned output.
pub fn expand(
    graph: &dyn PassportGraph,
    log: &dyn EventLog,
    attachments: &AttachmentIndex,
    id: &str,
    content_format: ContentFormat,
    output_shape: OutputShape,
    signature_mode: SignatureMode,
) -> ExpandResult<Value> {
    if signature_mode != SignatureMode::Unsigned {
        return Err(ExpandError::NotImplemented(format!(
            "signature mode `{}`",
            signature_mode.as_str()
        )));
    }
    let record = graph
        .get(id)?
        .ok_or_else(|| StoreError::PassportNotFound(id.to_string()))?;
    let mut visited = HashSet::from([record.id.clone()]);
    let content = render(graph, log, attachments, &record, content_format, &mut visited)?;
    match output_shape {
        OutputShape::Json => Ok(content),
        OutputShape::JsonLd => Ok(wrap(&record, content)),
    }
}

/// The lightweight display projection: scalar and entity fields only, no
/// reference lists and no passport-type envelope.
pub fn general_view(record: &PassportRecord) -> ExpandResult<Value> {
    Ok(Value::Object(scalar_fields(record)?))
}

fn render(
    graph: &dyn PassportGraph,
    log: &dyn EventLog,
    attachments: &AttachmentIndex,
    record: &PassportRecord,
    content_format: ContentFormat,
    visited: &mut HashSet<String>,
) -> ExpandResult<Value> {
    let mut body = scalar_fields(record)?;

    match content_format {
        ContentFormat::Compact => {
            body.insert("attachments".into(), json!(record.attachments));
            body.insert("events".into(), serde_json::to_value(&record.events)?);
            body.insert("subpassports".into(), json!(record.subpassports));
        }
        ContentFormat::Base | ContentFormat::Full | ContentFormat::Complete => {
            body.insert(
                "attachments".into(),
                Value::Array(resolve_attachments(attachments, record)),
            );
            body.insert(
                "events".into(),
                json!({
                    "activity": direct_events(log, record, EventType::Activity)?,
                    "ownership": direct_events(log, record, EventType::Ownership)?,
                }),
            );
            let child_format = match content_format {
                ContentFormat::Base => None,
                ContentFormat::Full => Some(ContentFormat::Base),
                ContentFormat::Complete => Some(ContentFormat::Complete),
                ContentFormat::Compact => unreachable!("handled above"),
            };
            let subpassports = match child_format {
                None => json!(record.subpassports),
                Some(child_format) => Value::Array(render_children(
                    graph,
                    log,
                    attachments,
                    record,
                    child_format,
                    visited,
                )?),
            };
            body.insert("subpassports".into(), subpassports);
        }
    }

    let mut envelope = Map::new();
    envelope.insert(record.passport_type.clone(), Value::Object(body));
    Ok(Value::Object(envelope))
}

/// Fields shared by every content format, in presentation order.
fn scalar_fields(record: &PassportRecord) -> ExpandResult<Map<String, Value>> {
    let mut body = Map::new();
    body.insert("id".into(), json!(record.id));
    body.insert("title".into(), json!(record.title));
    body.insert("attributes".into(), record.attributes.clone());
    body.insert("credentials".into(), json!(record.credentials));
    body.insert("current_owner".into(), serde_json::to_value(&record.current_owner)?);
    body.insert(
        "known_past_owners".into(),
        serde_json::to_value(&record.known_past_owners)?,
    );
    body.insert("manufacturer".into(), serde_json::to_value(&record.manufacturer)?);
    body.insert(
        "economic_operator".into(),
        serde_json::to_value(&record.economic_operator)?,
    );
    body.insert("tags".into(), json!(record.tags));
    body.insert("registration_id".into(), json!(record.registration_id));
    body.insert("batch_id".into(), json!(record.batch_id));
    body.insert("creation_timestamp".into(), json!(record.creation_timestamp));
    body.insert(
        "destruction_timestamp".into(),
        json!(record.destruction_timestamp),
    );
    body.insert("parent".into(), json!(record.parent));
    Ok(body)
}

/// Attachment identifiers resolved to their public reference form. A
/// reference the index no longer knows is logged and skipped.
fn resolve_attachments(attachments: &AttachmentIndex, record: &PassportRecord) -> Vec<Value> {
    let mut resolved = Vec::new();
    for attachment_id in &record.attachments {
        match attachments.get(attachment_id) {
            Some(reference) => resolved.push(reference.to_public_value()),
            None => warn!(attachment = %attachment_id, passport = %record.id,
                "passport references an unknown attachment"),
        }
    }
    resolved
}

/// This passport's own events of one type, resolved and sorted. Dangling
/// references are logged and skipped.
fn direct_events(
    log: &dyn EventLog,
    record: &PassportRecord,
    event_type: EventType,
) -> ExpandResult<Vec<Value>> {
    let mut bodies = Vec::new();
    for event_id in record.events.get(event_type) {
        match log.get(event_id)? {
            Some(body) => bodies.push(body),
            None => warn!(event = %event_id, passport = %record.id,
                "passport references a missing event"),
        }
    }
    Ok(sort_events(bodies))
}

/// Sub-passports rendered at `child_format`. A child the graph no longer
/// holds stays as its bare identifier, logged. `visited` holds every
/// passport already rendered on this expansion; a child seen twice is a
/// corrupted hierarchy and stays bare as well, so the descent always
/// terminates.
fn render_children(
    graph: &dyn PassportGraph,
    log: &dyn EventLog,
    attachments: &AttachmentIndex,
    record: &PassportRecord,
    child_format: ContentFormat,
    visited: &mut HashSet<String>,
) -> ExpandResult<Vec<Value>> {
    let mut children = Vec::new();
    for child_id in &record.subpassports {
        if !visited.insert(child_id.clone()) {
            warn!(subpassport = %child_id, passport = %record.id,
                "sub-passport already rendered on this expansion; hierarchy is cyclic");
            children.push(json!(child_id));
            continue;
        }
        match graph.get(child_id)? {
            Some(child) => children.push(render(
                graph,
                log,
                attachments,
                &child,
                child_format,
                visited,
            )?),
            None => {
                warn!(subpassport = %child_id, passport = %record.id,
                    "passport references a missing sub-passport");
                children.push(json!(child_id));
            }
        }
    }
    Ok(children)
}

/// Nest `content` as the `credentialSubject` of a verifiable-credential
/// wrapper carrying the fixed context, the passport's own identity,
/// `issuer` from the current owner, and `validFrom` from the creation
/// timestamp (sentinels where absent).
fn wrap(record: &PassportRecord, content: Value) -> Value {
    let issuer = record
        .current_owner
        .as_ref()
        .map(|owner| owner.id.clone())
        .unwrap_or_else(|| UNKNOWN_ISSUER.to_string());
    let valid_from = record
        .creation_timestamp
        .clone()
        .unwrap_or_else(|| DEFAULT_VALID_FROM.to_string());
    json!({
        "@context": [CREDENTIALS_CONTEXT],
        "id": record.id,
        "type": [record.passport_type, WRAPPER_TYPE],
        "issuer": issuer,
        "validFrom": valid_from,
        "credentialSubject": content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpp_store::{InMemoryEventLog, InMemoryPassportGraph};
    use dpp_types::{AttachmentReference, AttachmentSource, AttachmentType, Entity};
    use std::sync::Arc;

    fn empty_index() -> (AttachmentIndex, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = dpp_attach::FilesystemBlobStore::new(dir.path().to_path_buf(), false).unwrap();
        (AttachmentIndex::new(Arc::new(blobs)), dir)
    }

    fn record(id: &str, children: &[&str]) -> PassportRecord {
        let mut record = PassportRecord::new("Battery", id, format!("Passport {id}"));
        record.subpassports = children.iter().map(|c| c.to_string()).collect();
        record
    }

    /// A -> B -> C chain with one activity event on each level.
    fn chain() -> (InMemoryPassportGraph, InMemoryEventLog) {
        let graph = InMemoryPassportGraph::new();
        let log = InMemoryEventLog::new();
        for (id, children, event) in
            [("A", &["B"][..], "EA"), ("B", &["C"][..], "EB"), ("C", &[][..], "EC")]
        {
            let mut r = record(id, children);
            r.events.activity.push(event.into());
            graph.put(r).unwrap();
            log.insert(event, json!({"id": event})).unwrap();
        }
        (graph, log)
    }

    // ---- content formats ----

    #[test]
    fn compact_keeps_bare_references() {
        let (graph, log) = chain();
        let (attachments, _dir) = empty_index();
        let mut a = graph.get("A").unwrap().unwrap();
        a.attachments.push("att00001".into());
        graph.put(a).unwrap();

        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Compact,
            OutputShape::Json,
            SignatureMode::Unsigned,
        )
        .unwrap();
        let body = &doc["Battery"];
        assert_eq!(body["attachments"], json!(["att00001"]));
        assert_eq!(body["events"]["activity"], json!(["EA"]));
        assert_eq!(body["subpassports"], json!(["B"]));
    }

    #[test]
    fn base_resolves_events_but_not_subpassports() {
        let (graph, log) = chain();
        let (attachments, _dir) = empty_index();
        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Base,
            OutputShape::Json,
            SignatureMode::Unsigned,
        )
        .unwrap();
        let body = &doc["Battery"];
        assert_eq!(body["events"]["activity"], json!([{"id": "EA"}]));
        assert_eq!(body["subpassports"], json!(["B"]));
    }

    #[test]
    fn full_descends_exactly_one_level() {
        let (graph, log) = chain();
        let (attachments, _dir) = empty_index();
        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Full,
            OutputShape::Json,
            SignatureMode::Unsigned,
        )
        .unwrap();
        let child = &doc["Battery"]["subpassports"][0]["Battery"];
        assert_eq!(child["id"], json!("B"));
        // The child is rendered at base depth: its own children stay bare.
        assert_eq!(child["subpassports"], json!(["C"]));
    }

    #[test]
    fn complete_descends_to_leaves() {
        let (graph, log) = chain();
        let (attachments, _dir) = empty_index();
        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Complete,
            OutputShape::Json,
            SignatureMode::Unsigned,
        )
        .unwrap();
        let grandchild = &doc["Battery"]["subpassports"][0]["Battery"]["subpassports"][0]["Battery"];
        assert_eq!(grandchild["id"], json!("C"));
        assert_eq!(grandchild["subpassports"], json!([]));
    }

    #[test]
    fn base_hides_attachment_paths() {
        let (attachments, _dir) = empty_index();
        let reference = attachments
            .add(
                "datasheet.pdf",
                b"pdf bytes",
                AttachmentReference {
                    attachment_type: AttachmentType::Document,
                    source: AttachmentSource::Instance,
                    path: None,
                    source_id: Some("A".into()),
                    template_id: None,
                    template_version: None,
                    description: Some("Datasheet".into()),
                    is_default: true,
                    attachment_id: None,
                    file_size: None,
                    file_name: None,
                },
            )
            .unwrap();
        let graph = InMemoryPassportGraph::new();
        let log = InMemoryEventLog::new();
        let mut a = record("A", &[]);
        a.attachments.push(reference.attachment_id.clone().unwrap());
        graph.put(a).unwrap();

        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Base,
            OutputShape::Json,
            SignatureMode::Unsigned,
        )
        .unwrap();
        let entry = &doc["Battery"]["attachments"][0];
        assert_eq!(entry["file_name"], json!("datasheet.pdf"));
        assert!(entry.get("path").is_none());
    }

    #[test]
    fn complete_terminates_on_corrupted_cycle() {
        // `put` replaces records wholesale, so a cyclic hierarchy can be
        // forced past the linking guards.
        let graph = InMemoryPassportGraph::new();
        let log = InMemoryEventLog::new();
        let (attachments, _dir) = empty_index();
        graph.put(record("A", &["B"])).unwrap();
        graph.put(record("B", &["A"])).unwrap();

        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Complete,
            OutputShape::Json,
            SignatureMode::Unsigned,
        )
        .unwrap();
        // B renders once; the back-reference to A stays bare.
        let child = &doc["Battery"]["subpassports"][0]["Battery"];
        assert_eq!(child["id"], json!("B"));
        assert_eq!(child["subpassports"], json!(["A"]));
    }

    // ---- output shapes ----

    #[test]
    fn wrapped_shape_carries_issuer_and_valid_from() {
        let graph = InMemoryPassportGraph::new();
        let log = InMemoryEventLog::new();
        let (attachments, _dir) = empty_index();
        let mut a = record("A", &[]);
        a.current_owner = Some(Entity {
            id: "owner-1".into(),
            name: "Owner One".into(),
            full_name: None,
            facility: Vec::new(),
            repository_address: Vec::new(),
            batch_id: None,
        });
        a.creation_timestamp = Some("2024-03-01T08:00:00Z".into());
        graph.put(a).unwrap();

        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Compact,
            OutputShape::JsonLd,
            SignatureMode::Unsigned,
        )
        .unwrap();
        assert_eq!(doc["@context"], json!([CREDENTIALS_CONTEXT]));
        assert_eq!(doc["type"], json!(["Battery", WRAPPER_TYPE]));
        assert_eq!(doc["issuer"], json!("owner-1"));
        assert_eq!(doc["validFrom"], json!("2024-03-01T08:00:00Z"));
        assert_eq!(doc["credentialSubject"]["Battery"]["id"], json!("A"));
    }

    #[test]
    fn wrapped_shape_uses_sentinels_when_fields_absent() {
        let graph = InMemoryPassportGraph::new();
        let log = InMemoryEventLog::new();
        let (attachments, _dir) = empty_index();
        graph.put(record("A", &[])).unwrap();

        let doc = expand(
            &graph,
            &log,
            &attachments,
            "A",
            ContentFormat::Compact,
            OutputShape::JsonLd,
            SignatureMode::Unsigned,
        )
        .unwrap();
        assert_eq!(doc["issuer"], json!(UNKNOWN_ISSUER));
        assert_eq!(doc["validFrom"], json!(DEFAULT_VALID_FROM));
    }

    // ---- failure modes ----

    #[test]
    fn unknown_passport_fails_not_found() {
        let graph = InMemoryPassportGraph::new();
        let log = InMemoryEventLog::new();
        let (attachments, _dir) = empty_index();
        let err = expand(
            &graph,
            &log,
            &attachments,
            "GHOST",
            ContentFormat::Base,
            OutputShape::Json,
            SignatureMode::Unsigned,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExpandError::Store(StoreError::PassportNotFound(_))
        ));
    }

    #[test]
    fn signed_modes_fail_explicitly() {
        let (graph, log) = chain();
        let (attachments, _dir) = empty_index();
        for mode in [SignatureMode::SelfSigned, SignatureMode::Signed] {
            let err = expand(
                &graph,
                &log,
                &attachments,
                "A",
                ContentFormat::Base,
                OutputShape::Json,
                mode,
            )
            .unwrap_err();
            assert!(matches!(err, ExpandError::NotImplemented(_)));
        }
    }

    #[test]
    fn general_view_is_flat_and_unenveloped() {
        let mut a = record("A", &["B"]);
        a.tags.push("demo".into());
        let view = general_view(&a).unwrap();
        assert_eq!(view["id"], json!("A"));
        assert_eq!(view["tags"], json!(["demo"]));
        // Reference lists are not part of the projection.
        assert!(view.get("subpassports").is_none());
        assert!(view.get("Battery").is_none());
    }
}
