//! Stable ordering of query results.
//!
//! Every key sorts with a stable algorithm, so entities that compare equal
//! keep their relative input order and an interactive re-sort never shuffles
//! ties.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entities::EntityRecord;
use super::schema::{SchemaRegistry, parse_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Case-insensitive on the schema's name field; unnamed entities last.
    Name,
    /// Newest first on the schema's recency field; undated entities last.
    Recency,
    /// Entity type, then the schema's category field.
    Type,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Name => "name",
            SortKey::Recency => "recency",
            SortKey::Type => "type",
        };
        f.write_str(s)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "recency" | "recent" | "date" => Ok(SortKey::Recency),
            "type" | "category" => Ok(SortKey::Type),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// Reorder `records` in place by `key`.
pub fn sort_records(records: &mut [&EntityRecord], key: SortKey, schemas: &SchemaRegistry) {
    match key {
        SortKey::Name => records.sort_by_cached_key(|r| {
            let field = schemas.extractor(&r.entity.entity_type).name_field();
            let name = r.attributes.get(field).map(|v| v.to_lowercase());
            (name.is_none(), name)
        }),
        SortKey::Recency => records.sort_by_cached_key(|r| {
            let ts = schemas
                .extractor(&r.entity.entity_type)
                .recency_field()
                .and_then(|field| r.attributes.get(field))
                .and_then(|raw| parse_timestamp(raw));
            (ts.is_none(), Reverse(ts))
        }),
        SortKey::Type => records.sort_by_cached_key(|r| {
            let field = schemas.extractor(&r.entity.entity_type).category_field();
            (
                r.entity.entity_type.clone(),
                r.attributes.get(field).cloned().unwrap_or_default(),
            )
        }),
    }
}
