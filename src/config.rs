//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `TAGLENS_LOG_LEVEL` and `TAGLENS_CATALOG` env overrides.

use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::engine::{EntitySchema, TagEngine};
use crate::error::EngineError;

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Seed catalog for the CLI (already expanded, no `~`).
    pub catalog: Option<PathBuf>,
    /// entity_type -> searchable / facet / sort fields.
    pub entity_types: BTreeMap<String, EntitySchema>,
}

impl Config {
    /// Construct an engine with every configured schema registered.
    pub fn build_engine(&self) -> TagEngine {
        TagEngine::with_schemas(self.entity_types.clone())
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    engine: RawEngine,
    #[serde(default)]
    entity_types: BTreeMap<String, EntitySchema>,
}

#[derive(Deserialize)]
struct RawEngine {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    catalog: Option<String>,
}

impl Default for RawEngine {
    fn default() -> Self {
        Self { log_level: default_log_level(), catalog: None }
    }
}

fn default_log_level() -> String { "info".to_string() }

/// Load config from `path` (or `config/default.toml`), then apply env-var overrides.
pub fn load(path: Option<&Path>) -> Result<Config, EngineError> {
    let log_level_override = env::var("TAGLENS_LOG_LEVEL").ok();
    let catalog_override = env::var("TAGLENS_CATALOG").ok();
    load_from(
        path.unwrap_or(Path::new("config/default.toml")),
        log_level_override.as_deref(),
        catalog_override.as_deref(),
    )
}

/// Internal loader: accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    catalog_override: Option<&str>,
) -> Result<Config, EngineError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| EngineError::Config(format!("parse error in {}: {e}", path.display())))?;

    for (entity_type, schema) in &parsed.entity_types {
        if let Some(field) = schema.facets.iter().find(|f| f.trim().is_empty()) {
            return Err(EngineError::Config(format!(
                "entity type '{entity_type}' has a blank facet name: {field:?}"
            )));
        }
    }

    let e = parsed.engine;
    let log_level = log_level_override.unwrap_or(&e.log_level).to_string();
    let catalog = catalog_override
        .map(str::to_string)
        .or(e.catalog)
        .map(|c| expand_home(&c));

    Ok(Config {
        log_level,
        catalog,
        entity_types: parsed.entity_types,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Document + connection schemas matching the shipped `config/default.toml`.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        let document = EntitySchema::new(
            ["name", "category", "manager", "asset_class", "strategy", "allocator"],
            ["manager", "category", "asset_class"],
        )
        .with_recency_field("uploaded_at");
        let connection = EntitySchema::new(
            ["name", "contact_person", "category", "location", "focus_areas"],
            ["category", "location"],
        )
        .with_recency_field("connected_at");
        Self {
            log_level: "info".into(),
            catalog: None,
            entity_types: BTreeMap::from([
                ("document".to_string(), document),
                ("connection".to_string(), connection),
            ]),
        }
    }
}
