//! taglens: run one faceted query against a seeded engine.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Init logger at default level
//!   3. Load config
//!   4. Build the engine with configured schemas and replay the catalog
//!   5. Run the query given on the command line and print the results

use std::path::PathBuf;
use std::process;

use tracing::info;

use taglens::catalog::Catalog;
use taglens::{config, logger, EngineError, QuerySpec, SortKey, TagEngine};

struct Args {
    config: Option<PathBuf>,
    spec: QuerySpec,
    tag_labels: Vec<String>,
    sort: Option<SortKey>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        spec: QuerySpec::new(),
        tag_labels: Vec::new(),
        sort: None,
    };
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| iter.next().ok_or_else(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--config" | "-c" => args.config = Some(PathBuf::from(value("--config")?)),
            "--type" | "-t" => args.spec.entity_type = Some(value("--type")?),
            "--text" | "-q" => args.spec.text_query = Some(value("--text")?),
            "--facet" | "-f" => {
                let raw = value("--facet")?;
                let (field, val) = raw
                    .split_once('=')
                    .ok_or_else(|| format!("--facet expects field=value, got '{raw}'"))?;
                args.spec.facets.insert(field.trim().to_string(), val.to_string());
            }
            "--tag" => args.tag_labels.push(value("--tag")?),
            "--sort" | "-s" => args.sort = Some(value("--sort")?.parse()?),
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(args)
}

fn print_help() {
    eprintln!("usage: taglens [flags]");
    eprintln!();
    eprintln!("flags:");
    eprintln!("  --config, -c <path>      config file (default config/default.toml)");
    eprintln!("  --type,   -t <type>      restrict to one entity type");
    eprintln!("  --text,   -q <text>      case-insensitive substring search");
    eprintln!("  --facet,  -f <f=v>       exact facet match, repeatable (AND)");
    eprintln!("  --tag        <label>     require tag, repeatable (AND)");
    eprintln!("  --sort,   -s <key>       name | recency | type");
    eprintln!("  --help,   -h             print this help");
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            print_help();
            process::exit(2);
        }
    };
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        process::exit(exit_code(&e));
    }
}

/// 2 for bad input (same as a usage error), 1 for everything else.
fn exit_code(err: &EngineError) -> i32 {
    if err.is_validation() { 2 } else { 1 }
}

fn run(mut args: Args) -> Result<(), EngineError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let config = config::load(args.config.as_deref())?;
    logger::parse_level(&config.log_level)?;
    logger::init(&config.log_level, true)?;

    let engine = config.build_engine();
    info!(
        entity_types = ?config.entity_types.keys().collect::<Vec<_>>(),
        catalog = ?config.catalog,
        "engine ready"
    );

    if let Some(path) = &config.catalog {
        Catalog::load(path)?.apply(&engine)?;
    }

    for label in &args.tag_labels {
        match engine.find_tag(label)? {
            Some(tag) => args.spec = args.spec.tag(tag.id),
            None => {
                println!("no tag named '{label}'");
                return Ok(());
            }
        }
    }

    let results = match args.sort {
        Some(key) => engine.query_sorted(&args.spec, key)?,
        None => engine.query(&args.spec)?,
    };

    print_results(&engine, &results)?;
    Ok(())
}

fn print_results(engine: &TagEngine, results: &[taglens::EntityRef]) -> Result<(), EngineError> {
    println!("{} match(es)", results.len());
    for entity in results {
        let mut labels = Vec::new();
        for id in engine.tags_of(entity)? {
            if let Some(tag) = engine.get_tag(id)? {
                labels.push(tag.label);
            }
        }
        labels.sort();
        println!("  {entity}  [{}]", labels.join(", "));
    }

    println!();
    println!("tags:");
    for usage in engine.tags_with_counts()? {
        let marker = if usage.unused { " (unused)" } else { "" };
        println!("  {:<24} {:>4}{marker}", usage.tag.label, usage.count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_exit_like_usage_errors() {
        let bad_facet = EngineError::UnknownFacet { entity_type: "document".into(), field: "x".into() };
        assert_eq!(exit_code(&bad_facet), 2);
        assert_eq!(exit_code(&EngineError::Config("missing".into())), 1);
    }
}
