//! Core value types shared by every engine component.
//!
//! * [`TagId`]: opaque, immutable tag identity (UUID v7).
//! * [`Tag`]: a taxonomy entry as handed out to callers.
//! * [`EntityRef`]: `(entity_type, entity_id)` pair naming an object owned by
//!   an external system (a document, a connection, …).
//! * [`Attributes`]: field name → value map reported through the sync API.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attribute values for one entity, keyed by field name.
pub type Attributes = BTreeMap<String, String>;

// ── TagId ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(Uuid);

impl TagId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TagId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Tag ──────────────────────────────────────────────────────────────────────

/// A user-defined label in the taxonomy.
///
/// `normalized_key` is derived from `label` and is unique across live tags.
/// Usage counts are not stored here; see
/// [`TagEngine::counts_by_tag`](super::TagEngine::counts_by_tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
    pub normalized_key: String,
    /// Display hint only; the engine never interprets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A tag paired with its live usage count, as shown in a tag sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsage {
    pub tag: Tag,
    pub count: usize,
    /// `true` when no entity currently carries the tag.
    pub unused: bool,
}

// ── EntityRef ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_ids_are_unique() {
        let a = TagId::new();
        let b = TagId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn entity_ref_display() {
        let e = EntityRef::new("document", "D1");
        assert_eq!(e.to_string(), "document:D1");
    }

    #[test]
    fn tag_id_serializes_as_plain_uuid() {
        let id = TagId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
