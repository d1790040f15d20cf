use std::collections::BTreeMap;

use anyhow::Context;
use colored::Colorize;
use poolcfg_engine::{EngineConfig, FileScopeStore, ScopedConfig, BASE_SCOPE};
use serde_json::{json, Map, Value};

use crate::cli::*;

/// Records handled by the CLI are schema-free JSON objects.
type Entry = Map<String, Value>;

type Engine = ScopedConfig<FileScopeStore>;

const DEFAULT_NAMESPACE: &str = "default";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let engine = open_engine(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Show(args) => cmd_show(&engine, &format, args),
        Command::Pools(args) => cmd_pools(&engine, &format, args),
        Command::Set(args) => cmd_set(&engine, &format, args),
        Command::SetOnce(args) => cmd_set_once(&engine, &format, args),
        Command::Unset(args) => cmd_unset(&engine, &format, args),
        Command::Save(args) => cmd_save(&engine, &format, args),
        Command::Merge(args) => cmd_merge(&engine, &format, args),
        Command::Remove(args) => cmd_remove(&engine, &format, args),
    }
}

fn open_engine(cli: &Cli) -> anyhow::Result<Engine> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::new(DEFAULT_NAMESPACE),
    };
    if let Some(namespace) = &cli.namespace {
        config.namespace = namespace.clone();
    }
    config.allow_empty |= cli.allow_empty;
    config.shallow_merge |= cli.shallow;
    config.validate()?;

    let store = FileScopeStore::open(&cli.root)
        .with_context(|| format!("opening store at {}", cli.root.display()))?;
    tracing::debug!(root = %cli.root.display(), collection = %config.collection_name(), "store opened");
    Ok(ScopedConfig::new(store, config))
}

fn cmd_show(engine: &Engine, format: &OutputFormat, args: ShowArgs) -> anyhow::Result<()> {
    let entry: Entry = engine.load(&args.scope.pool)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entry)?),
        OutputFormat::Text => {
            println!("{}", scope_label(&args.scope.pool).bold());
            print_entry(&entry);
        }
    }
    Ok(())
}

fn cmd_pools(engine: &Engine, format: &OutputFormat, args: PoolsArgs) -> anyhow::Result<()> {
    let resolved: BTreeMap<String, Entry> = engine.load_pools(args.pools.as_slice())?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolved)?),
        OutputFormat::Text => {
            for (scope, entry) in &resolved {
                println!("{}", scope_label(scope).bold());
                print_entry(entry);
            }
        }
    }
    Ok(())
}

fn cmd_set(engine: &Engine, format: &OutputFormat, args: SetArgs) -> anyhow::Result<()> {
    let value = parse_value(&args.value);
    engine.set_field(&args.scope.pool, &args.field, &value)?;
    report(format, &args.scope.pool, true, || {
        format!("{} Set {} = {}", "✓".green().bold(), args.field.bold(), value)
    })
}

fn cmd_set_once(engine: &Engine, format: &OutputFormat, args: SetArgs) -> anyhow::Result<()> {
    let value = parse_value(&args.value);
    let applied = engine.set_field_atomic(&args.scope.pool, &args.field, &value)?;
    report(format, &args.scope.pool, applied, || {
        if applied {
            format!("{} Set {} = {}", "✓".green().bold(), args.field.bold(), value)
        } else {
            format!("{} {} is already set", "✗".yellow().bold(), args.field.bold())
        }
    })
}

fn cmd_unset(engine: &Engine, format: &OutputFormat, args: UnsetArgs) -> anyhow::Result<()> {
    engine.remove_field(&args.scope.pool, &args.field)?;
    report(format, &args.scope.pool, true, || {
        format!("{} Unset {}", "✓".green().bold(), args.field.bold())
    })
}

fn cmd_save(engine: &Engine, format: &OutputFormat, args: SaveArgs) -> anyhow::Result<()> {
    let entry = parse_entry(&args.record)?;
    engine.save(&args.scope.pool, &entry)?;
    report(format, &args.scope.pool, true, || {
        format!("{} Saved {}", "✓".green().bold(), scope_label(&args.scope.pool))
    })
}

fn cmd_merge(engine: &Engine, format: &OutputFormat, args: SaveArgs) -> anyhow::Result<()> {
    let entry = parse_entry(&args.record)?;
    engine.save_merge(&args.scope.pool, &entry)?;
    report(format, &args.scope.pool, true, || {
        format!("{} Merged into {}", "✓".green().bold(), scope_label(&args.scope.pool))
    })
}

fn cmd_remove(engine: &Engine, format: &OutputFormat, args: ScopeArgs) -> anyhow::Result<()> {
    engine
        .remove(&args.pool)
        .with_context(|| format!("removing {}", scope_label(&args.pool)))?;
    report(format, &args.pool, true, || {
        format!("{} Removed {}", "✓".green().bold(), scope_label(&args.pool))
    })
}

fn report(
    format: &OutputFormat,
    scope: &str,
    applied: bool,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", json!({ "scope": scope, "applied": applied })),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

fn print_entry(entry: &Entry) {
    if entry.is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for (key, value) in entry {
        println!("  {} = {}", key.cyan(), value);
    }
}

fn scope_label(scope: &str) -> String {
    if scope == BASE_SCOPE {
        "base".to_string()
    } else {
        format!("pool {scope}")
    }
}

/// Parse a field value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_entry(raw: &str) -> anyhow::Result<Entry> {
    serde_json::from_str(raw).context("record must be a JSON object")
}
