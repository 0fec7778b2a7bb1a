//! JSON seed catalog.
//!
//! A catalog is a snapshot of entities, tags, and assignments that the CLI
//! (or a test) replays into a fresh [`TagEngine`] through its public API.
//!
//! ```json
//! {
//!   "tags": [{ "label": "Performance", "color": "green" }],
//!   "entities": [{ "type": "document", "id": "D1", "attributes": { "name": "Q3 Letter" } }],
//!   "assignments": [{ "tag": "Performance", "type": "document", "id": "D1" }]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{Attributes, EntityRef, TagEngine};
use crate::error::EngineError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tags: Vec<CatalogTag>,
    #[serde(default)]
    pub entities: Vec<CatalogEntity>,
    #[serde(default)]
    pub assignments: Vec<CatalogAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTag {
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAssignment {
    /// Tag label; matched by normalized key.
    pub tag: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: String,
}

/// What [`Catalog::apply`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub tags_created: usize,
    pub entities: usize,
    pub assignments: usize,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| EngineError::Catalog(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
            .map_err(|e| EngineError::Catalog(format!("{}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        serde_json::from_str(raw).map_err(|e| EngineError::Catalog(format!("parse error: {e}")))
    }

    /// Replay into `engine`. Tags whose label already exists are reused.
    /// An assignment naming an unknown tag label is an error.
    pub fn apply(&self, engine: &TagEngine) -> Result<ApplySummary, EngineError> {
        let mut summary = ApplySummary::default();

        for tag in &self.tags {
            if engine.find_tag(&tag.label)?.is_none() {
                engine.create_tag_with_color(&tag.label, tag.color.clone())?;
                summary.tags_created += 1;
            }
        }

        for entity in &self.entities {
            engine.upsert_entity(&entity.entity_type, &entity.id, entity.attributes.clone())?;
            summary.entities += 1;
        }

        for assignment in &self.assignments {
            let tag = engine.find_tag(&assignment.tag)?.ok_or_else(|| {
                EngineError::Catalog(format!("assignment references unknown tag '{}'", assignment.tag))
            })?;
            let entity = EntityRef::new(&assignment.entity_type, &assignment.id);
            if engine.assign(tag.id, &entity)? {
                summary.assignments += 1;
            }
        }

        info!(
            tags_created = summary.tags_created,
            entities = summary.entities,
            assignments = summary.assignments,
            "catalog applied"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::engine::QuerySpec;

    const SEED: &str = r#"{
        "tags": [{ "label": "Performance" }, { "label": "Quarterly", "color": "blue" }],
        "entities": [
            { "type": "document", "id": "D1", "attributes": { "name": "Q3 Letter" } },
            { "type": "document", "id": "D2", "attributes": { "name": "Fact Sheet" } }
        ],
        "assignments": [
            { "tag": "Performance", "type": "document", "id": "D1" },
            { "tag": "quarterly", "type": "document", "id": "D1" },
            { "tag": "Performance", "type": "document", "id": "D2" },
            { "tag": "Performance", "type": "document", "id": "D2" }
        ]
    }"#;

    #[test]
    fn apply_replays_everything() {
        let engine = TagEngine::new();
        let summary = Catalog::from_json(SEED).unwrap().apply(&engine).unwrap();
        assert_eq!(summary, ApplySummary { tags_created: 2, entities: 2, assignments: 3 });

        let quarterly = engine.find_tag("QUARTERLY").unwrap().unwrap();
        assert_eq!(quarterly.color_token.as_deref(), Some("blue"));
        let hits = engine.query(&QuerySpec::new().tag(quarterly.id)).unwrap();
        assert_eq!(hits, vec![EntityRef::new("document", "D1")]);
    }

    #[test]
    fn apply_twice_reuses_tags() {
        let engine = TagEngine::new();
        let catalog = Catalog::from_json(SEED).unwrap();
        catalog.apply(&engine).unwrap();
        let again = catalog.apply(&engine).unwrap();
        assert_eq!(again.tags_created, 0);
        assert_eq!(again.assignments, 0);
        assert_eq!(engine.list_tags().unwrap().len(), 2);
    }

    #[test]
    fn unknown_tag_label_is_an_error() {
        let raw = r#"{ "assignments": [{ "tag": "Missing", "type": "document", "id": "D1" }] }"#;
        let err = Catalog::from_json(raw).unwrap().apply(&TagEngine::new()).unwrap_err();
        assert!(err.to_string().contains("unknown tag 'Missing'"));
    }

    #[test]
    fn load_reads_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(SEED.as_bytes()).unwrap();
        let catalog = Catalog::load(f.path()).unwrap();
        assert_eq!(catalog.entities.len(), 2);
    }

    #[test]
    fn load_reports_bad_json() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"{ not json").unwrap();
        assert!(matches!(Catalog::load(f.path()), Err(EngineError::Catalog(_))));
    }
}
