//! Query composition over facets, tags, and free text.
//!
//! Evaluation narrows cheapest-first:
//!
//! 1. entity-type universe
//! 2. facet equality constraints, smallest posting list first
//! 3. tag superset constraint, seeded from the smallest tag posting list
//! 4. case-insensitive substring scan over the already narrowed set
//!
//! Survivors come back in entity insertion order.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::assignments::AssignmentIndex;
use super::entities::{EntityRecord, EntityTable};
use super::facets::FacetIndex;
use super::schema::SchemaRegistry;
use super::types::{EntityRef, TagId};
use crate::error::EngineError;

/// A filter request. Every field is optional; an absent field is "All".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub facets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<TagId>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text_query = Some(text.into());
        self
    }

    pub fn facet(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.facets.insert(field.into(), value.into());
        self
    }

    pub fn tag(mut self, tag: TagId) -> Self {
        if !self.tag_ids.contains(&tag) {
            self.tag_ids.push(tag);
        }
        self
    }

    /// Lower-cased search needle, or `None` when the text query is blank.
    fn needle(&self) -> Option<String> {
        self.text_query
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

/// Read-only view over the indexes a query needs.
pub struct FilterEngine<'a> {
    pub(crate) entities: &'a EntityTable,
    pub(crate) facets: &'a FacetIndex,
    pub(crate) assignments: &'a AssignmentIndex,
    pub(crate) schemas: &'a SchemaRegistry,
}

impl<'a> FilterEngine<'a> {
    /// Reject facet constraints on fields no candidate type indexes.
    pub fn check(&self, spec: &QuerySpec) -> Result<(), EngineError> {
        let types = match spec.entity_type.as_deref() {
            Some(t) => vec![t],
            None => self.entities.types(),
        };
        if types.is_empty() {
            return Ok(());
        }
        for field in spec.facets.keys() {
            if !types.iter().any(|t| self.schemas.extractor(t).is_facet(field)) {
                return Err(EngineError::UnknownFacet {
                    entity_type: spec.entity_type.clone().unwrap_or_else(|| "any entity type".into()),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn query(&self, spec: &QuerySpec) -> Vec<EntityRef> {
        self.select(spec)
            .into_iter()
            .map(|r| r.entity.clone())
            .collect()
    }

    /// Matching records in insertion order.
    pub(crate) fn select(&self, spec: &QuerySpec) -> Vec<&'a EntityRecord> {
        let entity_type = spec.entity_type.as_deref();

        let mut candidates = self.narrow_by_facets(entity_type, &spec.facets);
        if !spec.tag_ids.is_empty() {
            candidates = Some(self.narrow_by_tags(entity_type, candidates, &spec.tag_ids));
        }

        let mut records: Vec<&'a EntityRecord> = match candidates {
            None => self.entities.universe(entity_type).collect(),
            Some(set) => {
                let mut found: Vec<&'a EntityRecord> =
                    set.iter().filter_map(|e| self.entities.get(e)).collect();
                found.sort_by_key(|r| r.seq);
                found
            }
        };

        if let Some(needle) = spec.needle() {
            records.retain(|r| {
                self.schemas
                    .extractor(&r.entity.entity_type)
                    .searchable_values(&r.attributes)
                    .iter()
                    .any(|v| v.to_lowercase().contains(&needle))
            });
        }
        records
    }

    /// `None` when there are no facet constraints.
    fn narrow_by_facets(
        &self,
        entity_type: Option<&str>,
        facets: &BTreeMap<String, String>,
    ) -> Option<HashSet<EntityRef>> {
        if facets.is_empty() {
            return None;
        }
        let types = match entity_type {
            Some(t) => vec![t],
            None => self.entities.types(),
        };

        let mut out = HashSet::new();
        for ty in types {
            let mut constraints: Vec<(&String, &String)> = facets.iter().collect();
            constraints.sort_by_key(|(field, value)| self.facets.cardinality(ty, field, value));

            let Some(((first_field, first_value), rest)) = constraints.split_first() else {
                continue;
            };
            let Some(seed) = self.facets.posting(ty, first_field, first_value) else {
                continue;
            };
            let rest: Vec<_> = rest
                .iter()
                .map(|(field, value)| self.facets.posting(ty, field, value))
                .collect();
            if rest.iter().any(Option::is_none) {
                continue;
            }
            out.extend(
                seed.iter()
                    .filter(|id| rest.iter().flatten().all(|p| p.contains(*id)))
                    .map(|id| EntityRef::new(ty, id.as_str())),
            );
        }
        Some(out)
    }

    fn narrow_by_tags(
        &self,
        entity_type: Option<&str>,
        candidates: Option<HashSet<EntityRef>>,
        tags: &[TagId],
    ) -> HashSet<EntityRef> {
        if let Some(set) = candidates {
            return set
                .into_iter()
                .filter(|e| self.assignments.has_all(e, tags))
                .collect();
        }

        let mut postings = Vec::with_capacity(tags.len());
        for tag in tags {
            match self.assignments.posting(*tag) {
                Some(p) => postings.push(p),
                // unknown or unused tag: nothing can hold every tag
                None => return HashSet::new(),
            }
        }
        postings.sort_by_key(|p| p.len());
        let Some((seed, rest)) = postings.split_first() else {
            return HashSet::new();
        };
        seed.iter()
            .filter(|e| entity_type.is_none_or(|t| e.entity_type == t))
            .filter(|e| rest.iter().all(|p| p.contains(*e)))
            .cloned()
            .collect()
    }
}
