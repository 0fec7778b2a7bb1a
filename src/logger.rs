//! Subscriber bootstrap for the `taglens` binary. The library only emits
//! `tracing` events.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Resolve the event filter from the configured `level` and `RUST_LOG`.
///
/// `prefer_level` picks which source wins; the other is tried only when the
/// winner does not parse.
fn build_filter(level: &str, prefer_level: bool) -> Result<EnvFilter, EngineError> {
    let from_level = || EnvFilter::try_new(level).map_err(|e| e.to_string());
    let from_env = || EnvFilter::try_from_default_env().map_err(|e| e.to_string());

    let resolved = if prefer_level {
        from_level().or_else(|_| from_env())
    } else {
        from_env().or_else(|_| from_level())
    };
    resolved.map_err(|e| EngineError::Logger(format!("no usable filter from '{level}' or RUST_LOG: {e}")))
}

/// Install the global stderr subscriber. Fails if one is already set.
pub fn init(level: &str, prefer_level: bool) -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level, prefer_level)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| EngineError::Logger(format!("subscriber already installed: {e}")))
}

pub fn parse_level(level: &str) -> Result<LevelFilter, EngineError> {
    if level.trim().is_empty() {
        return Err(EngineError::Logger("log level is blank".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| EngineError::Logger(format!("unknown log level '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_levels_parse() {
        for l in ["error", "warn", "info", "debug", "trace", "off"] {
            assert!(parse_level(l).is_ok(), "{l}");
        }
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn bad_levels_are_logger_errors() {
        assert!(matches!(parse_level("verbose"), Err(EngineError::Logger(_))));
        assert!(matches!(parse_level("  "), Err(EngineError::Logger(_))));
    }

    #[test]
    fn preferred_level_builds_filter() {
        assert!(build_filter("taglens=debug,info", true).is_ok());
    }

    #[test]
    fn second_init_reports_logger_error() {
        // Some other test may already own the global subscriber.
        let _ = init("warn", true);
        assert!(matches!(init("warn", true), Err(EngineError::Logger(_))));
    }
}
