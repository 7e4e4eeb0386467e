use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use dpp_types::ident::new_attachment_id;
use dpp_types::{AttachmentReference, AttachmentSource, AttachmentType};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::blob::BlobStore;
use crate::error::{AttachError, AttachResult};
use crate::thumbnail::render_thumbnail;

/// Fixed version segment for template attachment paths. Published
/// template versions are conceptually immutable and would resolve to a
/// version-qualified path; only the latest case is implemented.
const TEMPLATE_LATEST: &str = "vLatest";

/// One record of an externally declared attachment manifest.
///
/// Unlike uploads, manifest records declare their own identifier (the
/// manifest key) and are registered only if their physical file already
/// exists at the derived path.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    pub source: AttachmentSource,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    pub file_name: String,
}

/// The attachment index: identifier-keyed metadata records over a
/// [`BlobStore`].
///
/// The index lock is never held across blob I/O; bytes move first, then
/// the metadata map is updated under a short write lock.
pub struct AttachmentIndex {
    entries: RwLock<HashMap<String, AttachmentReference>>,
    blobs: Arc<dyn BlobStore>,
}

impl AttachmentIndex {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            blobs,
        }
    }

    /// Derive the deterministic storage path for a reference.
    ///
    /// Instance attachments live under their owning passport; template
    /// attachments under the template's latest-version directory.
    fn derive_path(reference: &AttachmentReference, file_name: &str) -> AttachResult<String> {
        match reference.source {
            AttachmentSource::Instance => {
                let source_id = reference.source_id.as_deref().ok_or_else(|| {
                    AttachError::PathUnderivable("instance attachment without source_id".into())
                })?;
                Ok(format!("dpps/{source_id}/{file_name}"))
            }
            AttachmentSource::Template => {
                let template_id = reference.template_id.as_deref().ok_or_else(|| {
                    AttachError::PathUnderivable("template attachment without template_id".into())
                })?;
                Ok(format!("templates/{template_id}/{TEMPLATE_LATEST}/{file_name}"))
            }
        }
    }

    /// Store uploaded bytes and register the completed reference.
    ///
    /// A fresh identifier is minted; the returned reference carries it
    /// along with the derived path, size, and name.
    pub fn add(
        &self,
        file_name: &str,
        bytes: &[u8],
        partial: AttachmentReference,
    ) -> AttachResult<AttachmentReference> {
        let path = Self::derive_path(&partial, file_name)?;
        self.blobs.store(&path, bytes)?;

        let attachment_id = new_attachment_id();
        let completed = AttachmentReference {
            path: Some(path),
            attachment_id: Some(attachment_id.clone()),
            file_size: Some(bytes.len() as u64),
            file_name: Some(file_name.to_string()),
            ..partial
        };
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.insert(attachment_id.clone(), completed.clone());
        debug!(attachment = %attachment_id, "attachment stored");
        Ok(completed)
    }

    /// Read a reference by identifier.
    pub fn get(&self, attachment_id: &str) -> Option<AttachmentReference> {
        let entries = self.entries.read().expect("lock poisoned");
        entries.get(attachment_id).cloned()
    }

    /// Whether the identifier is known to the index at all.
    pub fn contains(&self, attachment_id: &str) -> bool {
        let entries = self.entries.read().expect("lock poisoned");
        entries.contains_key(attachment_id)
    }

    /// Whether the identifier is known *and* its bytes exist in the blob
    /// store. Ingestion uses this to validate re-supplied references.
    pub fn is_resolvable(&self, attachment_id: &str) -> bool {
        let Some(reference) = self.get(attachment_id) else {
            return false;
        };
        let Some(path) = reference.path else {
            return false;
        };
        self.blobs.exists(&path).unwrap_or(false)
    }

    /// Number of indexed references.
    pub fn count(&self) -> usize {
        let entries = self.entries.read().expect("lock poisoned");
        entries.len()
    }

    /// Fetch the raw bytes of an attachment.
    ///
    /// Fails `NotFound` for an unknown identifier and `Unavailable` for a
    /// reference whose bytes were never stored.
    pub fn retrieve(&self, attachment_id: &str) -> AttachResult<Vec<u8>> {
        let reference = self
            .get(attachment_id)
            .ok_or_else(|| AttachError::NotFound(attachment_id.to_string()))?;
        let path = reference
            .path
            .ok_or_else(|| AttachError::Unavailable(attachment_id.to_string()))?;
        self.blobs.read(&path)
    }

    /// Fetch a resized raster derivative of an image attachment.
    ///
    /// Resolution follows [`AttachmentIndex::retrieve`]; sizing semantics
    /// are documented on [`render_thumbnail`].
    pub fn retrieve_thumbnail(
        &self,
        attachment_id: &str,
        max_width: Option<u32>,
        max_height: Option<u32>,
    ) -> AttachResult<Vec<u8>> {
        let bytes = self.retrieve(attachment_id)?;
        render_thumbnail(&bytes, max_width, max_height)
    }

    /// Replace an attachment's bytes in place.
    ///
    /// The identifier and storage path are unchanged; size and name are
    /// refreshed from the new upload.
    pub fn update(
        &self,
        attachment_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> AttachResult<AttachmentReference> {
        let reference = self
            .get(attachment_id)
            .ok_or_else(|| AttachError::NotFound(attachment_id.to_string()))?;
        let path = reference
            .path
            .clone()
            .ok_or_else(|| AttachError::Unavailable(attachment_id.to_string()))?;
        self.blobs.store(&path, bytes)?;

        let mut entries = self.entries.write().expect("lock poisoned");
        let entry = entries
            .get_mut(attachment_id)
            .ok_or_else(|| AttachError::NotFound(attachment_id.to_string()))?;
        entry.file_size = Some(bytes.len() as u64);
        entry.file_name = Some(file_name.to_string());
        Ok(entry.clone())
    }

    /// Remove the index entry and release the physical bytes.
    ///
    /// Bytes already absent from the blob store are tolerated silently;
    /// an unknown identifier fails `NotFound` and leaves the index
    /// unchanged.
    pub fn delete(&self, attachment_id: &str) -> AttachResult<()> {
        let removed = {
            let mut entries = self.entries.write().expect("lock poisoned");
            entries
                .remove(attachment_id)
                .ok_or_else(|| AttachError::NotFound(attachment_id.to_string()))?
        };
        if let Some(path) = removed.path {
            if let Err(err) = self.blobs.delete(&path) {
                warn!(attachment = %attachment_id, %err,
                    "attachment bytes already released");
            }
        }
        Ok(())
    }

    /// Register externally declared attachments whose files already exist.
    ///
    /// For each manifest record the expected path is recomputed the same
    /// way `add` derives it, the file's presence is verified, and the
    /// entry is indexed with its size read from the store. Records whose
    /// file is missing are logged and skipped, never raised. Returns the
    /// number of records registered.
    pub fn import_bulk(&self, manifest: &HashMap<String, ManifestEntry>) -> usize {
        let mut imported = 0;
        for (attachment_id, entry) in manifest {
            let partial = AttachmentReference {
                attachment_type: entry.attachment_type,
                source: entry.source,
                path: None,
                source_id: entry.source_id.clone(),
                template_id: entry.template_id.clone(),
                template_version: entry.template_version.clone(),
                description: entry.description.clone(),
                is_default: entry.is_default.unwrap_or(false),
                attachment_id: Some(attachment_id.clone()),
                file_size: None,
                file_name: Some(entry.file_name.clone()),
            };
            let path = match Self::derive_path(&partial, &entry.file_name) {
                Ok(path) => path,
                Err(err) => {
                    error!(attachment = %attachment_id, %err, "skipping manifest record");
                    continue;
                }
            };
            if !self.blobs.exists(&path).unwrap_or(false) {
                error!(attachment = %attachment_id, file = %entry.file_name, %path,
                    "unable to find attachment file; skipping");
                continue;
            }
            let file_size = match self.blobs.size(&path) {
                Ok(size) => size,
                Err(err) => {
                    error!(attachment = %attachment_id, %err, "skipping manifest record");
                    continue;
                }
            };

            let completed = AttachmentReference {
                path: Some(path),
                file_size: Some(file_size),
                description: partial
                    .description
                    .clone()
                    .or_else(|| Some("Default description".to_string())),
                ..partial
            };
            let mut entries = self.entries.write().expect("lock poisoned");
            entries.insert(attachment_id.clone(), completed);
            imported += 1;
        }
        info!(imported, "imported attachments");
        imported
    }
}

impl std::fmt::Debug for AttachmentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentIndex")
            .field("attachment_count", &self.count())
            .finish()
    }
}
