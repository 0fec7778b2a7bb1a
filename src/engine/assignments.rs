//! Bidirectional tag ↔ entity assignment index.
//!
//! Two views of the same edge set are kept in lockstep:
//!
//! ```text
//! tag_to_entities: TagId     → {EntityRef}
//! entity_to_tags:  EntityRef → {TagId}
//! ```
//!
//! `(t, e)` is in one view iff it is in the other. Empty sets are pruned so
//! "no entry" and "empty set" never diverge. Tag existence is checked by the
//! caller; this index only tracks edges and reports what actually changed so
//! usage counters can be adjusted by delta.

use std::collections::{HashMap, HashSet};

use super::types::{EntityRef, TagId};

#[derive(Debug, Default)]
pub struct AssignmentIndex {
    tag_to_entities: HashMap<TagId, HashSet<EntityRef>>,
    entity_to_tags: HashMap<EntityRef, HashSet<TagId>>,
}

impl AssignmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the edge. Returns `true` only on first insertion of the pair.
    pub fn assign(&mut self, tag: TagId, entity: &EntityRef) -> bool {
        let inserted = self
            .tag_to_entities
            .entry(tag)
            .or_default()
            .insert(entity.clone());
        if inserted {
            self.entity_to_tags
                .entry(entity.clone())
                .or_default()
                .insert(tag);
        }
        inserted
    }

    /// Remove the edge. Returns `true` only if the pair existed.
    pub fn unassign(&mut self, tag: TagId, entity: &EntityRef) -> bool {
        let removed = match self.tag_to_entities.get_mut(&tag) {
            Some(set) => {
                let removed = set.remove(entity);
                if set.is_empty() {
                    self.tag_to_entities.remove(&tag);
                }
                removed
            }
            None => false,
        };
        if removed {
            if let Some(set) = self.entity_to_tags.get_mut(entity) {
                set.remove(&tag);
                if set.is_empty() {
                    self.entity_to_tags.remove(entity);
                }
            }
        }
        removed
    }

    /// Tags currently on `entity`. Empty when the entity has none.
    pub fn tags_of(&self, entity: &EntityRef) -> HashSet<TagId> {
        self.entity_to_tags.get(entity).cloned().unwrap_or_default()
    }

    /// Entities currently carrying `tag`.
    pub fn entities_of(&self, tag: TagId) -> HashSet<EntityRef> {
        self.tag_to_entities.get(&tag).cloned().unwrap_or_default()
    }

    /// Borrowing view of a tag's posting list, for query narrowing.
    pub(crate) fn posting(&self, tag: TagId) -> Option<&HashSet<EntityRef>> {
        self.tag_to_entities.get(&tag)
    }

    /// `true` if `entity` carries every tag in `required`.
    pub fn has_all(&self, entity: &EntityRef, required: &[TagId]) -> bool {
        match self.entity_to_tags.get(entity) {
            Some(tags) => required.iter().all(|t| tags.contains(t)),
            None => required.is_empty(),
        }
    }

    /// Remove every edge touching `entity`. Returns the tags it carried.
    pub fn drop_entity(&mut self, entity: &EntityRef) -> Vec<TagId> {
        let Some(tags) = self.entity_to_tags.remove(entity) else {
            return Vec::new();
        };
        for tag in &tags {
            if let Some(set) = self.tag_to_entities.get_mut(tag) {
                set.remove(entity);
                if set.is_empty() {
                    self.tag_to_entities.remove(tag);
                }
            }
        }
        tags.into_iter().collect()
    }

    /// Remove every edge touching `tag`. Returns how many entities lost it.
    pub fn drop_tag(&mut self, tag: TagId) -> usize {
        let Some(entities) = self.tag_to_entities.remove(&tag) else {
            return 0;
        };
        for entity in &entities {
            if let Some(set) = self.entity_to_tags.get_mut(entity) {
                set.remove(&tag);
                if set.is_empty() {
                    self.entity_to_tags.remove(entity);
                }
            }
        }
        entities.len()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.tag_to_entities.values().map(HashSet::len).sum()
    }

    /// Check that both views describe the same edge set.
    pub fn is_consistent(&self) -> bool {
        let forward = self.tag_to_entities.iter().all(|(tag, entities)| {
            !entities.is_empty()
                && entities.iter().all(|e| {
                    self.entity_to_tags
                        .get(e)
                        .is_some_and(|tags| tags.contains(tag))
                })
        });
        let backward = self.entity_to_tags.iter().all(|(entity, tags)| {
            !tags.is_empty()
                && tags.iter().all(|t| {
                    self.tag_to_entities
                        .get(t)
                        .is_some_and(|entities| entities.contains(entity))
                })
        });
        forward && backward
    }
}
