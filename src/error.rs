//! Crate-wide error types.

use thiserror::Error;

use crate::engine::TagId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid tag label: {0}")]
    InvalidLabel(String),

    #[error("a tag with this name already exists: {0}")]
    DuplicateTag(String),

    #[error("tag not found: {0}")]
    NotFound(TagId),

    #[error("no such tag: {0}")]
    NoSuchTag(TagId),

    #[error("'{field}' is not a facet of {entity_type}")]
    UnknownFacet { entity_type: String, field: String },

    #[error("engine state lock poisoned")]
    LockPoisoned,

    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("catalog error: {0}")]
    Catalog(String),
}

impl EngineError {
    /// `true` for failures caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidLabel(_)
                | EngineError::DuplicateTag(_)
                | EngineError::NotFound(_)
                | EngineError::NoSuchTag(_)
                | EngineError::UnknownFacet { .. }
        )
    }
}
