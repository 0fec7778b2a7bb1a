//! Entity table: the query universe.
//!
//! Holds the attribute values the owning repositories report for each entity,
//! plus a first-seen sequence number that gives queries their stable baseline
//! order. Re-upserting an entity replaces its attributes but keeps its place.

use std::collections::{BTreeMap, HashMap};

use super::types::{Attributes, EntityRef};

#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub entity: EntityRef,
    pub attributes: Attributes,
    pub(crate) seq: u64,
}

#[derive(Debug, Default)]
pub struct EntityTable {
    records: HashMap<EntityRef, EntityRecord>,
    /// seq → entity, across all types.
    order: BTreeMap<u64, EntityRef>,
    /// entity_type → number of live entities of that type.
    type_counts: HashMap<String, usize>,
    next_seq: u64,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns `true` when the entity is new.
    pub fn upsert(&mut self, entity: EntityRef, attributes: Attributes) -> bool {
        if let Some(record) = self.records.get_mut(&entity) {
            record.attributes = attributes;
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        *self.type_counts.entry(entity.entity_type.clone()).or_insert(0) += 1;
        self.order.insert(seq, entity.clone());
        self.records.insert(entity.clone(), EntityRecord { entity, attributes, seq });
        true
    }

    pub fn remove(&mut self, entity: &EntityRef) -> Option<EntityRecord> {
        let record = self.records.remove(entity)?;
        self.order.remove(&record.seq);
        if let Some(count) = self.type_counts.get_mut(&entity.entity_type) {
            *count -= 1;
            if *count == 0 {
                self.type_counts.remove(&entity.entity_type);
            }
        }
        Some(record)
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&EntityRecord> {
        self.records.get(entity)
    }

    /// Every live entity of `entity_type` (or of any type) in insertion order.
    pub fn universe<'a>(&'a self, entity_type: Option<&str>) -> impl Iterator<Item = &'a EntityRecord> + use<'a> {
        let entity_type = entity_type.map(str::to_owned);
        self.order
            .values()
            .filter(move |e| entity_type.as_deref().is_none_or(|t| e.entity_type == t))
            .filter_map(move |e| self.records.get(e))
    }

    /// Entity types with at least one live entity, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.type_counts.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn count(&self, entity_type: Option<&str>) -> usize {
        match entity_type {
            Some(t) => self.type_counts.get(t).copied().unwrap_or(0),
            None => self.records.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Attributes {
        Attributes::from([("name".to_string(), name.to_string())])
    }

    #[test]
    fn universe_is_insertion_order() {
        let mut table = EntityTable::new();
        table.upsert(EntityRef::new("document", "b"), named("B"));
        table.upsert(EntityRef::new("connection", "x"), named("X"));
        table.upsert(EntityRef::new("document", "a"), named("A"));

        let docs: Vec<_> = table.universe(Some("document")).map(|r| r.entity.entity_id.as_str()).collect();
        assert_eq!(docs, vec!["b", "a"]);
        assert_eq!(table.universe(None).count(), 3);
    }

    #[test]
    fn universe_outlives_type_filter() {
        let mut table = EntityTable::new();
        table.upsert(EntityRef::new("document", "d"), named("D"));
        let records: Vec<&EntityRecord> = {
            let ty = String::from("document");
            table.universe(Some(&ty)).collect()
        };
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn reupsert_keeps_position() {
        let mut table = EntityTable::new();
        assert!(table.upsert(EntityRef::new("document", "1"), named("One")));
        table.upsert(EntityRef::new("document", "2"), named("Two"));
        assert!(!table.upsert(EntityRef::new("document", "1"), named("Uno")));

        let first = table.universe(None).next().unwrap();
        assert_eq!(first.entity.entity_id, "1");
        assert_eq!(first.attributes["name"], "Uno");
    }

    #[test]
    fn remove_updates_type_counts() {
        let mut table = EntityTable::new();
        let e = EntityRef::new("connection", "c1");
        table.upsert(e.clone(), named("Acme"));
        assert_eq!(table.types(), vec!["connection"]);
        assert!(table.remove(&e).is_some());
        assert!(table.types().is_empty());
        assert_eq!(table.count(None), 0);
        assert!(table.remove(&e).is_none());
    }
}
