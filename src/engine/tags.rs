//! Tag registry: identity, labels, and normalized-key uniqueness.
//!
//! Every live tag has a `normalized_key` (lower-cased, whitespace collapsed)
//! that no other live tag shares, so "ESG" and "esg " can never coexist.
//! Listing order is creation order, tracked by a monotonically increasing
//! sequence number.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;

use crate::error::EngineError;

use super::types::{Tag, TagId};

/// Maximum label length in characters, measured after trimming.
pub const MAX_LABEL_CHARS: usize = 64;

/// Lower-case `label` and collapse every whitespace run to a single space.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trim `label` and check its length. Returns the trimmed label.
fn validate_label(label: &str) -> Result<&str, EngineError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidLabel("label must not be empty".into()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_LABEL_CHARS {
        return Err(EngineError::InvalidLabel(format!(
            "label is {chars} characters, limit is {MAX_LABEL_CHARS}"
        )));
    }
    Ok(trimmed)
}

struct TagEntry {
    tag: Tag,
    seq: u64,
}

#[derive(Default)]
pub struct TagStore {
    tags: HashMap<TagId, TagEntry>,
    by_key: HashMap<String, TagId>,
    /// seq -> id, iterated for creation order.
    order: BTreeMap<u64, TagId>,
    next_seq: u64,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, label: &str, color_token: Option<String>) -> Result<Tag, EngineError> {
        let label = validate_label(label)?;
        let key = normalize_label(label);
        if self.by_key.contains_key(&key) {
            return Err(EngineError::DuplicateTag(label.to_string()));
        }

        let tag = Tag {
            id: TagId::new(),
            label: label.to_string(),
            normalized_key: key.clone(),
            color_token,
            created_at: Utc::now(),
        };
        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_key.insert(key, tag.id);
        self.order.insert(seq, tag.id);
        self.tags.insert(tag.id, TagEntry { tag: tag.clone(), seq });
        Ok(tag)
    }

    /// Rename `id`, keeping its identity. Colliding with the tag's own key is
    /// allowed (case or spacing changes); colliding with another tag is not.
    pub fn rename(&mut self, id: TagId, new_label: &str) -> Result<Tag, EngineError> {
        if !self.tags.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        let label = validate_label(new_label)?;
        let key = normalize_label(label);
        if let Some(owner) = self.by_key.get(&key) {
            if *owner != id {
                return Err(EngineError::DuplicateTag(label.to_string()));
            }
        }

        let entry = self.tags.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        self.by_key.remove(&entry.tag.normalized_key);
        entry.tag.label = label.to_string();
        entry.tag.normalized_key = key.clone();
        self.by_key.insert(key, id);
        Ok(entry.tag.clone())
    }

    pub fn set_color(&mut self, id: TagId, color_token: Option<String>) -> Result<Tag, EngineError> {
        let entry = self.tags.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        entry.tag.color_token = color_token;
        Ok(entry.tag.clone())
    }

    pub fn delete(&mut self, id: TagId) -> Result<Tag, EngineError> {
        let entry = self.tags.remove(&id).ok_or(EngineError::NotFound(id))?;
        self.by_key.remove(&entry.tag.normalized_key);
        self.order.remove(&entry.seq);
        Ok(entry.tag)
    }

    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id).map(|e| &e.tag)
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.tags.contains_key(&id)
    }

    /// Look up a tag by any label that normalizes to its key.
    pub fn find_by_label(&self, label: &str) -> Option<&Tag> {
        self.by_key
            .get(&normalize_label(label))
            .and_then(|id| self.get(*id))
    }

    /// All live tags in creation order.
    pub fn list(&self) -> Vec<&Tag> {
        self.order.values().filter_map(|id| self.get(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_label("  Quarterly   Report "), "quarterly report");
        assert_eq!(normalize_label("ESG"), "esg");
        assert_eq!(normalize_label("a\t\nb"), "a b");
    }

    #[test]
    fn create_trims_label() {
        let mut store = TagStore::new();
        let tag = store.create("  Performance ", None).unwrap();
        assert_eq!(tag.label, "Performance");
        assert_eq!(tag.normalized_key, "performance");
    }

    #[test]
    fn create_rejects_case_and_space_duplicates() {
        let mut store = TagStore::new();
        store.create("ESG", None).unwrap();
        let err = store.create("esg ", None).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTag(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_rejects_empty_and_oversized() {
        let mut store = TagStore::new();
        assert!(matches!(store.create("   ", None), Err(EngineError::InvalidLabel(_))));
        let long = "x".repeat(MAX_LABEL_CHARS + 1);
        assert!(matches!(store.create(&long, None), Err(EngineError::InvalidLabel(_))));
        let max = "y".repeat(MAX_LABEL_CHARS);
        assert!(store.create(&max, None).is_ok());
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let mut store = TagStore::new();
        let label = "é".repeat(MAX_LABEL_CHARS);
        assert!(store.create(&label, None).is_ok());
    }

    #[test]
    fn rename_to_own_key_succeeds() {
        let mut store = TagStore::new();
        let tag = store.create("Performance", None).unwrap();
        let renamed = store.rename(tag.id, "performance ").unwrap();
        assert_eq!(renamed.id, tag.id);
        assert_eq!(renamed.label, "performance");
        assert!(store.find_by_label("PERFORMANCE").is_some());
    }

    #[test]
    fn rename_collision_leaves_state_unchanged() {
        let mut store = TagStore::new();
        let a = store.create("Alpha", None).unwrap();
        store.create("Beta", None).unwrap();
        let err = store.rename(a.id, " beta").unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTag(_)));
        assert_eq!(store.get(a.id).unwrap().label, "Alpha");
        assert_eq!(store.find_by_label("alpha").unwrap().id, a.id);
    }

    #[test]
    fn rename_frees_old_key() {
        let mut store = TagStore::new();
        let a = store.create("Alpha", None).unwrap();
        store.rename(a.id, "Gamma").unwrap();
        assert!(store.find_by_label("alpha").is_none());
        assert!(store.create("Alpha", None).is_ok());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut store = TagStore::new();
        let ghost = TagId::new();
        assert!(matches!(store.rename(ghost, "x"), Err(EngineError::NotFound(_))));
        assert!(matches!(store.delete(ghost), Err(EngineError::NotFound(_))));
        assert!(matches!(store.set_color(ghost, None), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn list_is_creation_order_after_delete() {
        let mut store = TagStore::new();
        let a = store.create("Zeta", None).unwrap();
        let b = store.create("Alpha", None).unwrap();
        let c = store.create("Mid", None).unwrap();
        store.delete(b.id).unwrap();
        let ids: Vec<_> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn set_color_updates_hint() {
        let mut store = TagStore::new();
        let tag = store.create("Flagged", None).unwrap();
        let updated = store.set_color(tag.id, Some("red".into())).unwrap();
        assert_eq!(updated.color_token.as_deref(), Some("red"));
    }
}
