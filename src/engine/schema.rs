//! Per-entity-type field capabilities.
//!
//! Documents and connections carry different attribute sets but share the same
//! filtering logic. Each entity type supplies a [`FieldExtractor`] describing
//! which attributes are searchable (in order), which are facets, and which
//! ones drive name / recency / type sorting.
//!
//! [`EntitySchema`] is the data-driven implementation loaded from config.
//! Types without a registered schema fall back to [`OpenSchema`]: every
//! attribute is a facet and every attribute is searchable.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::types::Attributes;

pub trait FieldExtractor: Send + Sync {
    /// Ordered list of fields the free-text predicate looks at.
    fn searchable_fields(&self) -> &[String];

    /// Whether `field` is indexed for exact-match facet lookups.
    fn is_facet(&self, field: &str) -> bool;

    fn name_field(&self) -> &str {
        "name"
    }

    fn recency_field(&self) -> Option<&str> {
        None
    }

    fn category_field(&self) -> &str {
        "category"
    }

    /// Searchable values present on `attributes`, in field order.
    fn searchable_values<'a>(&self, attributes: &'a Attributes) -> Vec<&'a str> {
        self.searchable_fields()
            .iter()
            .filter_map(|f| attributes.get(f).map(String::as_str))
            .collect()
    }
}

// ── EntitySchema ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    #[serde(default = "default_searchable")]
    pub searchable: Vec<String>,
    #[serde(default)]
    pub facets: Vec<String>,
    #[serde(default = "default_name_field")]
    pub name_field: String,
    #[serde(default)]
    pub recency_field: Option<String>,
    #[serde(default = "default_category_field")]
    pub category_field: String,
}

fn default_searchable() -> Vec<String> { vec![default_name_field()] }
fn default_name_field() -> String { "name".to_string() }
fn default_category_field() -> String { "category".to_string() }

impl Default for EntitySchema {
    fn default() -> Self {
        Self {
            searchable: default_searchable(),
            facets: Vec::new(),
            name_field: default_name_field(),
            recency_field: None,
            category_field: default_category_field(),
        }
    }
}

impl EntitySchema {
    pub fn new<S: Into<String>>(
        searchable: impl IntoIterator<Item = S>,
        facets: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            searchable: searchable.into_iter().map(Into::into).collect(),
            facets: facets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_recency_field(mut self, field: impl Into<String>) -> Self {
        self.recency_field = Some(field.into());
        self
    }

    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = field.into();
        self
    }

    pub fn with_category_field(mut self, field: impl Into<String>) -> Self {
        self.category_field = field.into();
        self
    }
}

impl FieldExtractor for EntitySchema {
    fn searchable_fields(&self) -> &[String] {
        &self.searchable
    }

    fn is_facet(&self, field: &str) -> bool {
        self.facets.iter().any(|f| f == field)
    }

    fn name_field(&self) -> &str {
        &self.name_field
    }

    fn recency_field(&self) -> Option<&str> {
        self.recency_field.as_deref()
    }

    fn category_field(&self) -> &str {
        &self.category_field
    }
}

// ── OpenSchema ───────────────────────────────────────────────────────────────

/// Fallback for entity types nobody registered a schema for.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenSchema;

impl FieldExtractor for OpenSchema {
    fn searchable_fields(&self) -> &[String] {
        &[]
    }

    fn is_facet(&self, _field: &str) -> bool {
        true
    }

    /// Every attribute value, in field-name order.
    fn searchable_values<'a>(&self, attributes: &'a Attributes) -> Vec<&'a str> {
        attributes.values().map(String::as_str).collect()
    }
}

// ── SchemaRegistry ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<dyn FieldExtractor>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity_type: impl Into<String>, extractor: Arc<dyn FieldExtractor>) {
        self.schemas.insert(entity_type.into(), extractor);
    }

    pub fn is_registered(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }

    /// Extractor for `entity_type`, or [`OpenSchema`] when none is registered.
    pub fn extractor(&self, entity_type: &str) -> &dyn FieldExtractor {
        match self.schemas.get(entity_type) {
            Some(schema) => schema.as_ref(),
            None => &OpenSchema,
        }
    }

    /// The subset of `attributes` that `entity_type` indexes as facets.
    pub fn facet_attributes(&self, entity_type: &str, attributes: &Attributes) -> Attributes {
        let extractor = self.extractor(entity_type);
        attributes
            .iter()
            .filter(|(field, _)| extractor.is_facet(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}

/// Parse an externally supplied timestamp: RFC 3339 or a bare `YYYY-MM-DD`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
