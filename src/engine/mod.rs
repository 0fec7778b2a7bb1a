//! Tagging and filtering engine.
//!
//! [`TagEngine`] is the single owned instance a hosting service constructs at
//! startup and shares via `Arc`. It hosts every component behind one
//! reader/writer lock:
//!
//! ```text
//! TagEngine
//! └── RwLock<EngineState>
//!     ├── TagStore             tag identity + normalized-key uniqueness
//!     ├── AssignmentIndex      tag ↔ entity edges, both directions
//!     ├── StatisticsAggregator usage counts, updated by delta
//!     ├── FacetIndex           (type, field) → value → entity ids
//!     ├── EntityTable          query universe + baseline order
//!     └── SchemaRegistry       per-type FieldExtractor
//! ```
//!
//! Each mutation, cascade included, runs under one write guard, so readers
//! see either the whole change or none of it. Nothing here blocks on I/O.

pub mod assignments;
pub mod entities;
pub mod facets;
pub mod filter;
pub mod schema;
pub mod sort;
pub mod stats;
pub mod tags;
pub mod types;

pub use filter::QuerySpec;
pub use schema::{EntitySchema, FieldExtractor};
pub use sort::SortKey;
pub use types::{Attributes, EntityRef, Tag, TagId, TagUsage};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::EngineError;

use assignments::AssignmentIndex;
use entities::{EntityRecord, EntityTable};
use facets::FacetIndex;
use filter::FilterEngine;
use schema::SchemaRegistry;
use stats::StatisticsAggregator;
use tags::TagStore;

#[derive(Default)]
struct EngineState {
    tags: TagStore,
    assignments: AssignmentIndex,
    stats: StatisticsAggregator,
    facets: FacetIndex,
    entities: EntityTable,
    schemas: SchemaRegistry,
}

impl EngineState {
    fn filter(&self) -> FilterEngine<'_> {
        FilterEngine {
            entities: &self.entities,
            facets: &self.facets,
            assignments: &self.assignments,
            schemas: &self.schemas,
        }
    }

    fn ensure_tag(&self, tag: TagId) -> Result<(), EngineError> {
        if self.tags.contains(tag) {
            Ok(())
        } else {
            Err(EngineError::NoSuchTag(tag))
        }
    }

    fn assign(&mut self, tag: TagId, entity: &EntityRef) -> bool {
        let added = self.assignments.assign(tag, entity);
        if added {
            self.stats.increment(tag);
        }
        added
    }

    /// Rebuild facet memberships of every `entity_type` entity from its
    /// attributes under the currently registered schema.
    fn reindex_facets(&mut self, entity_type: &str) -> usize {
        let mut reindexed = 0;
        for record in self.entities.universe(Some(entity_type)) {
            let facet_attrs = self.schemas.facet_attributes(entity_type, &record.attributes);
            self.facets.upsert(entity_type, &record.entity.entity_id, facet_attrs);
            reindexed += 1;
        }
        reindexed
    }

    fn sort(&self, entities: Vec<EntityRef>, key: SortKey) -> Vec<EntityRef> {
        let mut known: Vec<&EntityRecord> = Vec::with_capacity(entities.len());
        let mut unknown = Vec::new();
        for entity in entities {
            match self.entities.get(&entity) {
                Some(record) => known.push(record),
                None => unknown.push(entity),
            }
        }
        sort::sort_records(&mut known, key, &self.schemas);
        known
            .into_iter()
            .map(|r| r.entity.clone())
            .chain(unknown)
            .collect()
    }
}

/// Shared, thread-safe tagging and filtering engine.
#[derive(Default)]
pub struct TagEngine {
    state: RwLock<EngineState>,
}

impl TagEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine with schemas already registered.
    pub fn with_schemas<I>(schemas: I) -> Self
    where
        I: IntoIterator<Item = (String, EntitySchema)>,
    {
        let mut state = EngineState::default();
        for (entity_type, schema) in schemas {
            state.schemas.register(entity_type, Arc::new(schema));
        }
        Self { state: RwLock::new(state) }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState>, EngineError> {
        self.state.read().map_err(|_| EngineError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState>, EngineError> {
        self.state.write().map_err(|_| EngineError::LockPoisoned)
    }

    // ── Schemas ───────────────────────────────────────────────────────────

    /// Register (or replace) the field capabilities of `entity_type`.
    /// Existing entities of that type are re-indexed under the new facets.
    pub fn register_schema(
        &self,
        entity_type: impl Into<String>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Result<(), EngineError> {
        let entity_type = entity_type.into();
        let mut guard = self.write()?;
        let state = &mut *guard;
        state.schemas.register(entity_type.clone(), extractor);
        let reindexed = state.reindex_facets(&entity_type);
        info!(entity_type = %entity_type, reindexed, "schema registered");
        Ok(())
    }

    // ── Mutation API ──────────────────────────────────────────────────────

    pub fn create_tag(&self, label: &str) -> Result<Tag, EngineError> {
        self.create_tag_with_color(label, None)
    }

    pub fn create_tag_with_color(
        &self,
        label: &str,
        color_token: Option<String>,
    ) -> Result<Tag, EngineError> {
        let mut state = self.write()?;
        let tag = state.tags.create(label, color_token)?;
        state.stats.track(tag.id);
        info!(tag_id = %tag.id, label = %tag.label, "tag created");
        Ok(tag)
    }

    pub fn rename_tag(&self, id: TagId, new_label: &str) -> Result<Tag, EngineError> {
        let mut state = self.write()?;
        let tag = state.tags.rename(id, new_label)?;
        info!(tag_id = %id, label = %tag.label, "tag renamed");
        Ok(tag)
    }

    pub fn set_tag_color(&self, id: TagId, color_token: Option<String>) -> Result<Tag, EngineError> {
        let mut state = self.write()?;
        let tag = state.tags.set_color(id, color_token)?;
        debug!(tag_id = %id, color = ?tag.color_token, "tag color set");
        Ok(tag)
    }

    /// Delete a tag and every assignment referencing it.
    pub fn delete_tag(&self, id: TagId) -> Result<Tag, EngineError> {
        let mut state = self.write()?;
        let tag = state.tags.delete(id)?;
        let dropped = state.assignments.drop_tag(id);
        state.stats.remove(id);
        info!(tag_id = %id, label = %tag.label, dropped_assignments = dropped, "tag deleted");
        Ok(tag)
    }

    /// Attach `tag` to `entity`. Returns `false` if it was already attached.
    pub fn assign(&self, tag: TagId, entity: &EntityRef) -> Result<bool, EngineError> {
        let mut state = self.write()?;
        state.ensure_tag(tag)?;
        let added = state.assign(tag, entity);
        debug!(tag_id = %tag, entity = %entity, added, "assign");
        Ok(added)
    }

    /// Attach several tags at once. Fails without changes if any tag is unknown.
    /// Returns how many new assignments were made.
    pub fn assign_many(&self, tags: &[TagId], entity: &EntityRef) -> Result<usize, EngineError> {
        let mut state = self.write()?;
        for tag in tags {
            state.ensure_tag(*tag)?;
        }
        let mut added = 0;
        for tag in tags {
            if state.assign(*tag, entity) {
                added += 1;
            }
        }
        debug!(entity = %entity, requested = tags.len(), added, "assign many");
        Ok(added)
    }

    /// Detach `tag` from `entity`. Returns `false` if it was not attached,
    /// including when `tag` no longer exists.
    pub fn unassign(&self, tag: TagId, entity: &EntityRef) -> Result<bool, EngineError> {
        let mut state = self.write()?;
        let removed = state.assignments.unassign(tag, entity);
        if removed {
            state.stats.decrement(tag);
        }
        debug!(tag_id = %tag, entity = %entity, removed, "unassign");
        Ok(removed)
    }

    // ── Sync API ──────────────────────────────────────────────────────────

    /// Record the current attribute values of an entity owned elsewhere.
    pub fn upsert_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        attributes: Attributes,
    ) -> Result<(), EngineError> {
        let mut state = self.write()?;
        let facet_attrs = state.schemas.facet_attributes(entity_type, &attributes);
        state.facets.upsert(entity_type, entity_id, facet_attrs);
        let created = state
            .entities
            .upsert(EntityRef::new(entity_type, entity_id), attributes);
        debug!(entity_type, entity_id, created, "entity upserted");
        Ok(())
    }

    /// Forget an entity: its facet entries, its record, and its assignments.
    /// Returns `false` if the engine knew nothing about it.
    pub fn remove_entity(&self, entity_type: &str, entity_id: &str) -> Result<bool, EngineError> {
        let mut state = self.write()?;
        let entity = EntityRef::new(entity_type, entity_id);
        let had_facets = state.facets.remove(entity_type, entity_id);
        let had_record = state.entities.remove(&entity).is_some();
        let lost = state.assignments.drop_entity(&entity);
        for tag in &lost {
            state.stats.decrement(*tag);
        }
        info!(entity = %entity, dropped_assignments = lost.len(), "entity removed");
        Ok(had_facets || had_record || !lost.is_empty())
    }

    // ── Query API ─────────────────────────────────────────────────────────

    /// Matching entities in insertion order.
    pub fn query(&self, spec: &QuerySpec) -> Result<Vec<EntityRef>, EngineError> {
        let state = self.read()?;
        let filter = state.filter();
        filter.check(spec)?;
        let results = filter.query(spec);
        debug!(
            entity_type = ?spec.entity_type,
            facets = spec.facets.len(),
            tags = spec.tag_ids.len(),
            matched = results.len(),
            "query"
        );
        Ok(results)
    }

    /// Query and sort under a single snapshot.
    pub fn query_sorted(&self, spec: &QuerySpec, key: SortKey) -> Result<Vec<EntityRef>, EngineError> {
        let state = self.read()?;
        let filter = state.filter();
        filter.check(spec)?;
        let mut records = filter.select(spec);
        sort::sort_records(&mut records, key, &state.schemas);
        debug!(matched = records.len(), sort = %key, "sorted query");
        Ok(records.into_iter().map(|r| r.entity.clone()).collect())
    }

    /// Reorder `entities` by `key`. Entities unknown to the engine keep their
    /// relative order after the known ones.
    pub fn sort(&self, entities: Vec<EntityRef>, key: SortKey) -> Result<Vec<EntityRef>, EngineError> {
        Ok(self.read()?.sort(entities, key))
    }

    pub fn get_tag(&self, id: TagId) -> Result<Option<Tag>, EngineError> {
        Ok(self.read()?.tags.get(id).cloned())
    }

    pub fn find_tag(&self, label: &str) -> Result<Option<Tag>, EngineError> {
        Ok(self.read()?.tags.find_by_label(label).cloned())
    }

    /// All tags in creation order.
    pub fn list_tags(&self) -> Result<Vec<Tag>, EngineError> {
        Ok(self.read()?.tags.list().into_iter().cloned().collect())
    }

    pub fn counts_by_tag(&self) -> Result<HashMap<TagId, usize>, EngineError> {
        Ok(self.read()?.stats.counts())
    }

    /// Every tag with its usage count, in creation order.
    pub fn tags_with_counts(&self) -> Result<Vec<TagUsage>, EngineError> {
        let state = self.read()?;
        Ok(state
            .tags
            .list()
            .into_iter()
            .map(|tag| {
                let count = state.stats.count(tag.id);
                TagUsage { tag: tag.clone(), count, unused: count == 0 }
            })
            .collect())
    }

    /// Tags no entity currently carries, in creation order.
    pub fn unused_tags(&self) -> Result<Vec<Tag>, EngineError> {
        Ok(self
            .tags_with_counts()?
            .into_iter()
            .filter(|u| u.unused)
            .map(|u| u.tag)
            .collect())
    }

    pub fn tags_of(&self, entity: &EntityRef) -> Result<HashSet<TagId>, EngineError> {
        Ok(self.read()?.assignments.tags_of(entity))
    }

    pub fn entities_of(&self, tag: TagId) -> Result<HashSet<EntityRef>, EngineError> {
        Ok(self.read()?.assignments.entities_of(tag))
    }

    /// Facet values of `field` with entity counts, sorted by value.
    pub fn facet_values(&self, entity_type: &str, field: &str) -> Result<Vec<(String, usize)>, EngineError> {
        Ok(self.read()?.facets.values(entity_type, field))
    }

    pub fn entity_count(&self, entity_type: Option<&str>) -> Result<usize, EngineError> {
        Ok(self.read()?.entities.count(entity_type))
    }

    /// `true` when both assignment views agree and every counter matches its
    /// posting list. Intended for tests and debug assertions.
    pub fn is_consistent(&self) -> Result<bool, EngineError> {
        let state = self.read()?;
        let views_agree = state.assignments.is_consistent();
        let counts_match = state
            .tags
            .list()
            .iter()
            .all(|t| state.stats.count(t.id) == state.assignments.entities_of(t.id).len());
        let no_orphans = state.stats.counts().keys().all(|id| state.tags.contains(*id));
        Ok(views_agree && counts_match && no_orphans)
    }
}
