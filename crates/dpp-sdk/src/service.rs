//! The service facade consumed by a request layer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dpp_attach::{AttachmentIndex, FilesystemBlobStore, ManifestEntry};
use dpp_expand::general_view;
use dpp_stats::StatsSnapshot;
use dpp_store::{
    sort_events, subtree_events, EventLog, InMemoryEventLog, InMemoryPassportGraph,
    PassportGraph, StoreError,
};
use dpp_types::ident::{extract_id, new_event_id};
use dpp_types::time::parse_instant;
use dpp_types::{
    AttachmentReference, ContentFormat, EventType, OutputShape, PassportRecord, SignatureMode,
};
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{SdkError, SdkResult};
use crate::search::{search, FilterConditions, SearchHit};

/// One handle over the three stores, exposing the full operation surface:
/// documents, hierarchy, events, attachments, search, and statistics.
///
/// All methods take `&self`; the stores carry their own locking, so a
/// service handle can be shared across request handlers.
pub struct PassportService {
    graph: Arc<dyn PassportGraph>,
    log: Arc<dyn EventLog>,
    attachments: Arc<AttachmentIndex>,
}

impl PassportService {
    pub fn new(
        graph: Arc<dyn PassportGraph>,
        log: Arc<dyn EventLog>,
        attachments: Arc<AttachmentIndex>,
    ) -> Self {
        Self {
            graph,
            log,
            attachments,
        }
    }

    /// In-memory stores over a filesystem blob root; the standard
    /// single-process deployment.
    pub fn in_memory(blob_root: impl Into<PathBuf>, reset: bool) -> SdkResult<Self> {
        let blobs = FilesystemBlobStore::new(blob_root, reset)?;
        Ok(Self::new(
            Arc::new(InMemoryPassportGraph::new()),
            Arc::new(InMemoryEventLog::new()),
            Arc::new(AttachmentIndex::new(Arc::new(blobs))),
        ))
    }

    pub fn attachments(&self) -> &AttachmentIndex {
        &self.attachments
    }

    // ---- documents ----

    /// Render the passport at the requested depth, shape, and signature
    /// mode.
    pub fn get_document(
        &self,
        id: &str,
        content_format: ContentFormat,
        output_shape: OutputShape,
        signature_mode: SignatureMode,
    ) -> SdkResult<Value> {
        Ok(dpp_expand::expand(
            self.graph.as_ref(),
            self.log.as_ref(),
            &self.attachments,
            id,
            content_format,
            output_shape,
            signature_mode,
        )?)
    }

    /// The normalized record itself.
    pub fn get_object(&self, id: &str) -> SdkResult<PassportRecord> {
        self.graph
            .get(id)?
            .ok_or_else(|| StoreError::PassportNotFound(id.to_string()).into())
    }

    /// The lightweight scalar/entity projection.
    pub fn get_general_view(&self, id: &str) -> SdkResult<Value> {
        Ok(general_view(&self.get_object(id)?)?)
    }

    /// Normalize and store a nested document; returns the root
    /// identifier.
    pub fn import_document(&self, document: &Value) -> SdkResult<String> {
        Ok(dpp_ingest::import_document(
            self.graph.as_ref(),
            self.log.as_ref(),
            &self.attachments,
            document,
            None,
        )?)
    }

    /// A uniformly random passport identifier, `None` on an empty store.
    pub fn random_id(&self) -> SdkResult<Option<String>> {
        let ids = self.graph.ids()?;
        Ok(ids.choose(&mut rand::thread_rng()).cloned())
    }

    /// The identifier with the most recent parseable creation timestamp,
    /// `None` if no passport carries one.
    pub fn latest_id(&self) -> SdkResult<Option<String>> {
        let latest = self
            .graph
            .records()?
            .into_iter()
            .filter_map(|record| {
                let instant = record
                    .creation_timestamp
                    .as_deref()
                    .and_then(parse_instant)?;
                Some((instant, record.id))
            })
            .max_by_key(|(instant, _)| *instant);
        Ok(latest.map(|(_, id)| id))
    }

    /// Quick store counts, cheaper than the full statistics report.
    pub fn metadata(&self) -> SdkResult<Value> {
        Ok(json!({
            "total_dpp_documents": self.graph.count()?,
            "total_events": self.log.count()?,
        }))
    }

    /// Filter the store; results are ordered by identifier.
    pub fn search(&self, filters: &FilterConditions) -> SdkResult<Vec<SearchHit>> {
        Ok(search(&self.graph.records()?, filters))
    }

    // ---- hierarchy ----

    /// Link an already stored passport under a parent.
    pub fn attach_subpassport(&self, parent_id: &str, child_id: &str) -> SdkResult<()> {
        Ok(self.graph.attach(parent_id, child_id)?)
    }

    /// Ingest `document` and link its root under `parent_id`. The link is
    /// part of the ingestion batch, so both sides appear together.
    pub fn attach_subpassport_document(
        &self,
        parent_id: &str,
        document: &Value,
    ) -> SdkResult<String> {
        self.get_object(parent_id)?;
        Ok(dpp_ingest::import_document(
            self.graph.as_ref(),
            self.log.as_ref(),
            &self.attachments,
            document,
            Some(parent_id),
        )?)
    }

    /// Unlink a child from its parent. The child remains stored.
    pub fn detach_subpassport(&self, parent_id: &str, child_id: &str) -> SdkResult<()> {
        Ok(self.graph.detach(parent_id, child_id)?)
    }

    // ---- events ----

    /// Record an event body against a passport.
    ///
    /// An event without its own identifier gets a minted one. An unknown
    /// passport is logged rather than failing, so event producers ahead
    /// of passport registration are tolerated; the body still lands in
    /// the log under first-write-wins.
    pub fn add_event(
        &self,
        passport_id: &str,
        mut event: Value,
        event_type: EventType,
    ) -> SdkResult<String> {
        let event_id = match extract_id(&event) {
            Ok(id) => id.to_string(),
            Err(_) => {
                let id = new_event_id();
                if let Some(body) = event.as_object_mut() {
                    body.insert("id".into(), json!(id));
                }
                id
            }
        };
        match self.graph.append_event_ref(passport_id, event_type, &event_id) {
            Ok(()) => {}
            Err(StoreError::PassportNotFound(_)) => {
                warn!(event = %event_id, passport = %passport_id,
                    "adding event with unknown passport reference");
            }
            Err(err) => return Err(err.into()),
        }
        self.log.insert(&event_id, event)?;
        Ok(event_id)
    }

    /// Record several events; `types` defaults to activity and is zipped
    /// against the bodies.
    pub fn add_events(
        &self,
        passport_id: &str,
        events: Vec<Value>,
        types: Option<Vec<EventType>>,
    ) -> SdkResult<Vec<String>> {
        let types = types.unwrap_or_else(|| vec![EventType::Activity; events.len()]);
        events
            .into_iter()
            .zip(types)
            .map(|(event, event_type)| self.add_event(passport_id, event, event_type))
            .collect()
    }

    pub fn get_event(&self, event_id: &str) -> SdkResult<Option<Value>> {
        Ok(self.log.get(event_id)?)
    }

    /// This passport's own events of one type, sorted ascending by
    /// extracted timestamp. Dangling references are logged and skipped.
    pub fn get_events(&self, passport_id: &str, event_type: EventType) -> SdkResult<Vec<Value>> {
        let record = self.get_object(passport_id)?;
        let mut bodies = Vec::new();
        for event_id in record.events.get(event_type) {
            match self.log.get(event_id)? {
                Some(body) => bodies.push(body),
                None => warn!(event = %event_id, passport = %passport_id,
                    "passport references a missing event"),
            }
        }
        Ok(sort_events(bodies))
    }

    /// Events of one type across the passport's full subtree, sorted.
    pub fn get_full_events(
        &self,
        passport_id: &str,
        event_type: EventType,
    ) -> SdkResult<Vec<Value>> {
        Ok(subtree_events(
            self.graph.as_ref(),
            self.log.as_ref(),
            passport_id,
            event_type,
        )?)
    }

    /// Overwrite a stored event body. Passport reference lists are not
    /// touched.
    pub fn update_event(&self, event_id: &str, body: Value) -> SdkResult<()> {
        Ok(self.log.update(event_id, body)?)
    }

    /// Remove an event body. Passport reference lists are not touched;
    /// readers skip the dangling reference.
    pub fn delete_event(&self, event_id: &str) -> SdkResult<()> {
        Ok(self.log.delete(event_id)?)
    }

    // ---- attachments ----

    /// Store uploaded bytes and return the completed reference.
    pub fn add_attachment(
        &self,
        file_name: &str,
        bytes: &[u8],
        partial: AttachmentReference,
    ) -> SdkResult<AttachmentReference> {
        Ok(self.attachments.add(file_name, bytes, partial)?)
    }

    pub fn get_attachment(&self, attachment_id: &str) -> SdkResult<AttachmentReference> {
        self.attachments
            .get(attachment_id)
            .ok_or_else(|| dpp_attach::AttachError::NotFound(attachment_id.to_string()).into())
    }

    pub fn retrieve_attachment(&self, attachment_id: &str) -> SdkResult<Vec<u8>> {
        Ok(self.attachments.retrieve(attachment_id)?)
    }

    pub fn retrieve_attachment_thumbnail(
        &self,
        attachment_id: &str,
        max_width: Option<u32>,
        max_height: Option<u32>,
    ) -> SdkResult<Vec<u8>> {
        Ok(self
            .attachments
            .retrieve_thumbnail(attachment_id, max_width, max_height)?)
    }

    pub fn update_attachment(
        &self,
        attachment_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> SdkResult<AttachmentReference> {
        Ok(self.attachments.update(attachment_id, file_name, bytes)?)
    }

    pub fn delete_attachment(&self, attachment_id: &str) -> SdkResult<()> {
        Ok(self.attachments.delete(attachment_id)?)
    }

    /// Register pre-seeded attachments from a manifest; returns how many
    /// were indexed.
    pub fn import_attachments(&self, manifest: &HashMap<String, ManifestEntry>) -> usize {
        self.attachments.import_bulk(manifest)
    }

    // ---- statistics ----

    /// The full aggregate report; `now` anchors the time-windowed counts.
    pub fn statistics(&self, now: DateTime<Utc>) -> SdkResult<Value> {
        let snapshot = StatsSnapshot::capture(self.graph.as_ref(), self.log.as_ref())?;
        Ok(snapshot.to_report(now))
    }

    // ---- templates (out of scope) ----

    /// Template instantiation is outside the current scope.
    pub fn instantiate_template(
        &self,
        _template_id: &str,
        _data_mapping: &Value,
    ) -> SdkResult<String> {
        Err(SdkError::NotImplemented("template instantiation".into()))
    }

    /// Template retrieval is outside the current scope.
    pub fn get_template(&self, _template_id: &str, _version: &str) -> SdkResult<Value> {
        Err(SdkError::NotImplemented("template retrieval".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpp_types::{AttachmentSource, AttachmentType};

    fn service() -> (PassportService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let service = PassportService::in_memory(dir.path().join("attachments"), false).unwrap();
        (service, dir)
    }

    fn battery_doc() -> Value {
        json!({"Battery": {
            "id": "B1",
            "title": "Cell",
            "creation_timestamp": "2024-01-05T00:00:00Z",
            "subpassports": [{"Pack": {
                "id": "P1",
                "title": "Pack",
                "events": {"activity": [
                    {"id": "EP", "prov:atTime": {"@value": "2024-02-01T00:00:00Z"}}
                ], "ownership": []}
            }}],
            "events": {"activity": [
                {"id": "EB", "prov:atTime": {"@value": "2024-01-10T00:00:00Z"}}
            ], "ownership": []}
        }})
    }

    #[test]
    fn import_then_render_full_document() {
        let (service, _dir) = service();
        let id = service.import_document(&battery_doc()).unwrap();
        let doc = service
            .get_document(
                &id,
                ContentFormat::Full,
                OutputShape::Json,
                SignatureMode::Unsigned,
            )
            .unwrap();
        assert_eq!(
            doc["Battery"]["subpassports"][0]["Pack"]["id"],
            json!("P1")
        );
    }

    #[test]
    fn object_and_general_view() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();
        let record = service.get_object("P1").unwrap();
        assert_eq!(record.parent.as_deref(), Some("B1"));
        let view = service.get_general_view("P1").unwrap();
        assert_eq!(view["parent"], json!("B1"));

        assert!(matches!(
            service.get_object("GHOST").unwrap_err(),
            SdkError::Store(StoreError::PassportNotFound(_))
        ));
    }

    #[test]
    fn random_and_latest_ids() {
        let (service, _dir) = service();
        assert_eq!(service.random_id().unwrap(), None);
        assert_eq!(service.latest_id().unwrap(), None);

        service.import_document(&battery_doc()).unwrap();
        assert!(service.random_id().unwrap().is_some());
        // Only B1 carries a creation timestamp.
        assert_eq!(service.latest_id().unwrap().as_deref(), Some("B1"));
    }

    #[test]
    fn metadata_counts() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();
        let metadata = service.metadata().unwrap();
        assert_eq!(metadata["total_dpp_documents"], json!(2));
        assert_eq!(metadata["total_events"], json!(2));
    }

    #[test]
    fn add_event_mints_identifier_when_absent() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();
        let event_id = service
            .add_event("B1", json!({"step": "assembled"}), EventType::Activity)
            .unwrap();
        let body = service.get_event(&event_id).unwrap().unwrap();
        assert_eq!(body["id"], json!(event_id));
        let record = service.get_object("B1").unwrap();
        assert!(record.events.activity.contains(&event_id));
    }

    #[test]
    fn add_event_with_unknown_passport_still_logs_body() {
        let (service, _dir) = service();
        let event_id = service
            .add_event("GHOST", json!({"id": "EX"}), EventType::Ownership)
            .unwrap();
        assert_eq!(event_id, "EX");
        assert!(service.get_event("EX").unwrap().is_some());
    }

    #[test]
    fn add_events_defaults_to_activity() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();
        let ids = service
            .add_events("B1", vec![json!({"id": "E2"}), json!({"id": "E3"})], None)
            .unwrap();
        assert_eq!(ids, vec!["E2", "E3"]);
        let record = service.get_object("B1").unwrap();
        assert!(record.events.activity.contains(&"E2".to_string()));
        assert!(record.events.activity.contains(&"E3".to_string()));
    }

    #[test]
    fn direct_and_subtree_events() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();

        let direct = service.get_events("B1", EventType::Activity).unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0]["id"], json!("EB"));

        let full = service.get_full_events("B1", EventType::Activity).unwrap();
        assert_eq!(full.len(), 2);
        // Sorted ascending by timestamp: EB (Jan) before EP (Feb).
        assert_eq!(full[0]["id"], json!("EB"));
        assert_eq!(full[1]["id"], json!("EP"));
    }

    #[test]
    fn update_and_delete_are_log_scoped() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();

        service
            .update_event("EB", json!({"id": "EB", "revised": true}))
            .unwrap();
        assert_eq!(
            service.get_event("EB").unwrap().unwrap()["revised"],
            json!(true)
        );

        service.delete_event("EB").unwrap();
        assert!(service.get_event("EB").unwrap().is_none());
        // The passport still references the deleted event; readers skip it.
        let record = service.get_object("B1").unwrap();
        assert_eq!(record.events.activity, vec!["EB"]);
        assert!(service.get_events("B1", EventType::Activity).unwrap().is_empty());

        assert!(matches!(
            service.delete_event("EB").unwrap_err(),
            SdkError::Store(StoreError::EventNotFound(_))
        ));
    }

    #[test]
    fn attach_detach_through_facade() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();
        service
            .import_document(&json!({"Module": {"id": "M1", "title": "Module"}}))
            .unwrap();

        service.attach_subpassport("B1", "M1").unwrap();
        assert!(service
            .get_object("B1")
            .unwrap()
            .subpassports
            .contains(&"M1".to_string()));

        service.detach_subpassport("B1", "M1").unwrap();
        assert_eq!(service.get_object("M1").unwrap().parent, None);
    }

    #[test]
    fn attach_document_links_both_sides() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();
        let child_id = service
            .attach_subpassport_document(
                "B1",
                &json!({"Module": {"id": "M2", "title": "Module"}}),
            )
            .unwrap();
        assert_eq!(child_id, "M2");
        assert!(service
            .get_object("B1")
            .unwrap()
            .subpassports
            .contains(&"M2".to_string()));
        assert_eq!(service.get_object("M2").unwrap().parent.as_deref(), Some("B1"));
        // The forward link is established exactly once.
        let listed = service
            .get_object("B1")
            .unwrap()
            .subpassports
            .iter()
            .filter(|id| *id == "M2")
            .count();
        assert_eq!(listed, 1);
    }

    #[test]
    fn attach_document_requires_existing_parent() {
        let (service, _dir) = service();
        assert!(matches!(
            service
                .attach_subpassport_document(
                    "GHOST",
                    &json!({"Module": {"id": "M3", "title": "Module"}}),
                )
                .unwrap_err(),
            SdkError::Store(StoreError::PassportNotFound(_))
        ));
        // Nothing was ingested.
        assert!(matches!(
            service.get_object("M3").unwrap_err(),
            SdkError::Store(StoreError::PassportNotFound(_))
        ));
    }

    #[test]
    fn attachment_lifecycle_through_facade() {
        let (service, _dir) = service();
        let reference = service
            .add_attachment(
                "manual.pdf",
                b"manual bytes",
                AttachmentReference {
                    attachment_type: AttachmentType::Document,
                    source: AttachmentSource::Instance,
                    path: None,
                    source_id: Some("B1".into()),
                    template_id: None,
                    template_version: None,
                    description: None,
                    is_default: false,
                    attachment_id: None,
                    file_size: None,
                    file_name: None,
                },
            )
            .unwrap();
        let attachment_id = reference.attachment_id.clone().unwrap();

        assert_eq!(
            service.retrieve_attachment(&attachment_id).unwrap(),
            b"manual bytes"
        );
        service
            .update_attachment(&attachment_id, "manual-v2.pdf", b"new bytes")
            .unwrap();
        assert_eq!(
            service.get_attachment(&attachment_id).unwrap().file_name,
            Some("manual-v2.pdf".to_string())
        );
        service.delete_attachment(&attachment_id).unwrap();
        assert!(matches!(
            service.get_attachment(&attachment_id).unwrap_err(),
            SdkError::Attach(dpp_attach::AttachError::NotFound(_))
        ));
    }

    #[test]
    fn statistics_report() {
        let (service, _dir) = service();
        service.import_document(&battery_doc()).unwrap();
        let now: DateTime<Utc> = "2024-01-06T00:00:00Z".parse().unwrap();
        let report = service.statistics(now).unwrap();
        assert_eq!(report["passport"]["total_dpp_documents"], json!(2));
        assert_eq!(report["passport"]["passports_created_last_day"], json!(1));
        assert_eq!(report["event"]["events_all_time"], json!(2));
    }

    #[test]
    fn templates_are_not_implemented() {
        let (service, _dir) = service();
        assert!(matches!(
            service.instantiate_template("tmpl-1", &json!({})),
            Err(SdkError::NotImplemented(_))
        ));
        assert!(matches!(
            service.get_template("tmpl-1", "vLatest"),
            Err(SdkError::NotImplemented(_))
        ));
    }
}
