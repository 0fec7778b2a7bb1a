// Library root: the engine plus the config/logging/catalog plumbing the
// `taglens` binary is built from.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod logger;

pub use engine::{
    Attributes, EntityRef, EntitySchema, FieldExtractor, QuerySpec, SortKey, Tag, TagEngine,
    TagId, TagUsage,
};
pub use error::EngineError;
