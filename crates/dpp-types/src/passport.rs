use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::error::TypeError;

/// The two recognized event categories a passport tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Activity,
    Ownership,
}

impl EventType {
    pub const ALL: [EventType; 2] = [EventType::Activity, EventType::Ownership];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Ownership => "ownership",
        }
    }
}

impl FromStr for EventType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" => Ok(Self::Activity),
            "ownership" => Ok(Self::Ownership),
            other => Err(TypeError::InvalidEventType(other.to_string())),
        }
    }
}

/// Ordered event-identifier lists, one per [`EventType`].
///
/// Duplicate identifiers are allowed: repeated explicit adds of the same
/// activity are valid, so list semantics are preserved as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRefs {
    #[serde(default)]
    pub activity: Vec<String>,
    #[serde(default)]
    pub ownership: Vec<String>,
}

impl EventRefs {
    pub fn get(&self, event_type: EventType) -> &Vec<String> {
        match event_type {
            EventType::Activity => &self.activity,
            EventType::Ownership => &self.ownership,
        }
    }

    pub fn get_mut(&mut self, event_type: EventType) -> &mut Vec<String> {
        match event_type {
            EventType::Activity => &mut self.activity,
            EventType::Ownership => &mut self.ownership,
        }
    }
}

/// The normalized passport record held by the passport graph.
///
/// Design rule: everything relational is by reference. Attachments,
/// events, and sub-passports appear only as identifier lists resolved on
/// demand; entities are the one exception, embedded by value because they
/// are not separately stored. `attributes` and `credentials` are opaque
/// payloads -- the core stores and returns them without ever
/// destructuring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassportRecord {
    /// Semantic wrapper tag, e.g. a product category. This becomes the
    /// single outer key of every serialized document.
    pub passport_type: String,

    /// Globally unique identifier, immutable after creation.
    pub id: String,
    /// Display name.
    pub title: String,

    #[serde(default)]
    pub manufacturer: Option<Entity>,
    #[serde(default)]
    pub economic_operator: Vec<Entity>,
    #[serde(default)]
    pub current_owner: Option<Entity>,
    #[serde(default)]
    pub known_past_owners: Vec<Entity>,

    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<String>,
    #[serde(default)]
    pub destruction_timestamp: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    /// Back-reference to the owning parent passport, if attached.
    #[serde(default)]
    pub parent: Option<String>,
    /// Event identifier lists, keyed by event type.
    #[serde(default)]
    pub events: EventRefs,

    /// Opaque context-specific payload, stored verbatim.
    #[serde(default)]
    pub attributes: Value,
    /// Opaque credential payloads or credential references, stored verbatim.
    #[serde(default)]
    pub credentials: Vec<Value>,

    /// Attachment identifiers resolved against the attachment index.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Owned forward-references to nested sub-passports.
    #[serde(default)]
    pub subpassports: Vec<String>,
}

impl PassportRecord {
    /// A minimal record with the given type, id, and title; every other
    /// field empty.
    pub fn new(
        passport_type: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            passport_type: passport_type.into(),
            id: id.into(),
            title: title.into(),
            manufacturer: None,
            economic_operator: Vec::new(),
            current_owner: None,
            known_past_owners: Vec::new(),
            registration_id: None,
            batch_id: None,
            creation_timestamp: None,
            destruction_timestamp: None,
            tags: Vec::new(),
            parent: None,
            events: EventRefs::default(),
            attributes: Value::Object(serde_json::Map::new()),
            credentials: Vec::new(),
            attachments: Vec::new(),
            subpassports: Vec::new(),
        }
    }

    /// Returns `true` if this passport is linked into a hierarchy, either
    /// as a parent or as a child.
    pub fn is_connected(&self) -> bool {
        !self.subpassports.is_empty() || self.parent.is_some()
    }
}
