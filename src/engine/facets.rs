//! Facet index: per `(entity_type, field)` inverted index.
//!
//! Maps each exact field value to the set of entity ids holding it. Values are
//! categorical (manager name, asset class, document type) so matching is exact
//! and case-sensitive. The index remembers what it last indexed for every
//! entity, so an upsert removes stale values before adding new ones.

use std::collections::{HashMap, HashSet};

use super::types::{Attributes, EntityRef};

/// value → entity ids
type Postings = HashMap<String, HashSet<String>>;

#[derive(Debug, Default)]
pub struct FacetIndex {
    /// entity_type → field → value → entity ids
    index: HashMap<String, HashMap<String, Postings>>,
    /// Facet values last indexed for each entity.
    indexed: HashMap<EntityRef, Attributes>,
}

impl FacetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entity's facet memberships with `attributes`.
    pub fn upsert(&mut self, entity_type: &str, entity_id: &str, attributes: Attributes) {
        let key = EntityRef::new(entity_type, entity_id);
        self.remove_memberships(&key);

        let fields = self.index.entry(entity_type.to_string()).or_default();
        for (field, value) in &attributes {
            fields
                .entry(field.clone())
                .or_default()
                .entry(value.clone())
                .or_default()
                .insert(entity_id.to_string());
        }
        self.indexed.insert(key, attributes);
    }

    /// Remove the entity from every posting list. Returns `true` if it was indexed.
    pub fn remove(&mut self, entity_type: &str, entity_id: &str) -> bool {
        self.remove_memberships(&EntityRef::new(entity_type, entity_id))
    }

    fn remove_memberships(&mut self, key: &EntityRef) -> bool {
        let Some(previous) = self.indexed.remove(key) else {
            return false;
        };
        let Some(fields) = self.index.get_mut(&key.entity_type) else {
            return true;
        };
        for (field, value) in &previous {
            let Some(postings) = fields.get_mut(field) else {
                continue;
            };
            if let Some(ids) = postings.get_mut(value) {
                ids.remove(&key.entity_id);
                if ids.is_empty() {
                    postings.remove(value);
                }
            }
            if postings.is_empty() {
                fields.remove(field);
            }
        }
        if fields.is_empty() {
            self.index.remove(&key.entity_type);
        }
        true
    }

    /// Entity ids whose `field` equals `value` exactly. Empty if unknown.
    pub fn candidates(&self, entity_type: &str, field: &str, value: &str) -> HashSet<String> {
        self.posting(entity_type, field, value)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn posting(&self, entity_type: &str, field: &str, value: &str) -> Option<&HashSet<String>> {
        self.index
            .get(entity_type)
            .and_then(|fields| fields.get(field))
            .and_then(|postings| postings.get(value))
    }

    /// Number of entities holding `value`; used to order constraints by selectivity.
    pub fn cardinality(&self, entity_type: &str, field: &str, value: &str) -> usize {
        self.posting(entity_type, field, value).map_or(0, HashSet::len)
    }

    /// Distinct values of a facet with their entity counts, sorted by value.
    pub fn values(&self, entity_type: &str, field: &str) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> = self
            .index
            .get(entity_type)
            .and_then(|fields| fields.get(field))
            .map(|postings| {
                postings
                    .iter()
                    .map(|(value, ids)| (value.clone(), ids.len()))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
