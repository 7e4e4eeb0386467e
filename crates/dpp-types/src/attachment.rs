use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::TypeError;

/// Kind of content an attachment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Document,
    Image,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
        }
    }
}

impl FromStr for AttachmentType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Self::Document),
            "image" => Ok(Self::Image),
            other => Err(TypeError::InvalidAttachmentType(other.to_string())),
        }
    }
}

/// Whether an attachment belongs to a passport instance or a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentSource {
    Instance,
    Template,
}

impl AttachmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Template => "template",
        }
    }
}

impl FromStr for AttachmentSource {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instance" => Ok(Self::Instance),
            "template" => Ok(Self::Template),
            other => Err(TypeError::InvalidAttachmentSource(other.to_string())),
        }
    }
}

/// Metadata record pointing at attachment bytes held by a byte-storage
/// backend.
///
/// Passports hold only attachment identifiers; this record is the indexed
/// side of that reference. `path` is the opaque storage handle (filesystem
/// path, object key). `None` means the reference is known but the bytes
/// were never stored.
///
/// When `source` is [`AttachmentSource::Instance`], `source_id` names the
/// owning passport; when it is [`AttachmentSource::Template`],
/// `template_id`/`template_version` name the owning template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentReference {
    pub attachment_type: AttachmentType,
    pub source: AttachmentSource,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl AttachmentReference {
    /// The public projection embedded in expanded passport documents.
    ///
    /// Never exposes `path` -- the storage handle stays internal; consumers
    /// fetch bytes through the retrieval operation instead.
    pub fn to_public_value(&self) -> Value {
        let mut output = json!({
            "type": self.attachment_type.as_str(),
            "source": self.source.as_str(),
            "attachment_id": self.attachment_id,
            "description": self.description,
            "file_name": self.file_name,
            "file_size": self.file_size,
        });
        let map = output.as_object_mut().expect("object literal");
        if self.source == AttachmentSource::Template {
            map.insert("template_id".into(), json!(self.template_id));
            map.insert("template_version".into(), json!(self.template_version));
        }
        if let Some(source_id) = &self.source_id {
            map.insert("source_id".into(), json!(source_id));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance_ref() -> AttachmentReference {
        AttachmentReference {
            attachment_type: AttachmentType::Image,
            source: AttachmentSource::Instance,
            path: Some("/data/dpps/dpp-1/photo.png".into()),
            source_id: Some("dpp-1".into()),
            template_id: None,
            template_version: None,
            description: Some("product photo".into()),
            is_default: true,
            attachment_id: Some("a1b2c3d4".into()),
            file_size: Some(1024),
            file_name: Some("photo.png".into()),
        }
    }

    #[test]
    fn tags_roundtrip_lowercase() {
        assert_eq!(
            serde_json::to_value(AttachmentType::Document).unwrap(),
            json!("document")
        );
        assert_eq!("image".parse::<AttachmentType>().unwrap(), AttachmentType::Image);
        assert_eq!(
            "template".parse::<AttachmentSource>().unwrap(),
            AttachmentSource::Template
        );
        assert!("s3".parse::<AttachmentSource>().is_err());
    }

    #[test]
    fn public_value_hides_path() {
        let public = instance_ref().to_public_value();
        assert!(public.get("path").is_none());
        assert_eq!(public["attachment_id"], json!("a1b2c3d4"));
        assert_eq!(public["source_id"], json!("dpp-1"));
        // Instance attachments carry no template fields.
        assert!(public.get("template_id").is_none());
    }

    #[test]
    fn public_value_template_fields() {
        let mut reference = instance_ref();
        reference.source = AttachmentSource::Template;
        reference.source_id = None;
        reference.template_id = Some("tpl-9".into());
        reference.template_version = Some("vLatest".into());

        let public = reference.to_public_value();
        assert_eq!(public["template_id"], json!("tpl-9"));
        assert_eq!(public["template_version"], json!("vLatest"));
        assert!(public.get("source_id").is_none());
    }
}
