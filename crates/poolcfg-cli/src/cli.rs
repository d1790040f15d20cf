use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "poolcfg",
    about = "Pool-scoped configuration: a base record with per-pool overrides",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory holding the collection files
    #[arg(long, global = true, default_value = ".poolcfg")]
    pub root: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Namespace; overrides the configuration file
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Let zero values override inherited ones
    #[arg(long, global = true)]
    pub allow_empty: bool,

    /// Replace whole top-level fields; null fields keep the stored value
    #[arg(long, global = true)]
    pub shallow: bool,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the resolved configuration of a pool, or the base
    Show(ShowArgs),
    /// Show the base and the resolved configuration of several pools
    Pools(PoolsArgs),
    /// Set a single field
    Set(SetArgs),
    /// Set a single field only if it is unset or empty
    SetOnce(SetArgs),
    /// Remove a single field
    Unset(UnsetArgs),
    /// Replace a whole entry
    Save(SaveArgs),
    /// Merge a record into an entry
    Merge(SaveArgs),
    /// Delete a whole entry
    Remove(ScopeArgs),
}

#[derive(Args)]
pub struct ScopeArgs {
    /// Pool to address; the base entry when omitted
    #[arg(short, long, default_value = "")]
    pub pool: String,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args)]
pub struct PoolsArgs {
    /// Pools to resolve; every stored pool when empty
    pub pools: Vec<String>,
}

#[derive(Args)]
pub struct SetArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    /// Dot-separated field path, matched ignoring case
    pub field: String,
    /// JSON value; anything that is not valid JSON is taken as a string
    pub value: String,
}

#[derive(Args)]
pub struct UnsetArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    pub field: String,
}

#[derive(Args)]
pub struct SaveArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    /// JSON object
    pub record: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_show_defaults_to_base() {
        let cli = Cli::try_parse_from(["poolcfg", "show"]).unwrap();
        if let Command::Show(args) = cli.command {
            assert_eq!(args.scope.pool, "");
        } else { panic!("wrong command"); }
        assert_eq!(cli.root, PathBuf::from(".poolcfg"));
    }

    #[test]
    fn parse_show_pool() {
        let cli = Cli::try_parse_from(["poolcfg", "show", "--pool", "pool1"]).unwrap();
        if let Command::Show(args) = cli.command {
            assert_eq!(args.scope.pool, "pool1");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_pools() {
        let cli = Cli::try_parse_from(["poolcfg", "pools", "a", "b"]).unwrap();
        if let Command::Pools(args) = cli.command {
            assert_eq!(args.pools, vec!["a", "b"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set_once() {
        let cli = Cli::try_parse_from(["poolcfg", "set-once", "-p", "p1", "owner", "node3"]).unwrap();
        if let Command::SetOnce(args) = cli.command {
            assert_eq!(args.scope.pool, "p1");
            assert_eq!(args.field, "owner");
            assert_eq!(args.value, "node3");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_merge() {
        let cli = Cli::try_parse_from(["poolcfg", "merge", "--pool", "p1", r#"{"a":1}"#]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.record, r#"{"a":1}"#);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_engine_flags() {
        let cli = Cli::try_parse_from([
            "poolcfg", "unset", "x", "--namespace", "env", "--allow-empty", "--shallow", "--root", "/tmp/cfg",
        ])
        .unwrap();
        assert_eq!(cli.namespace.as_deref(), Some("env"));
        assert!(cli.allow_empty);
        assert!(cli.shallow);
        assert_eq!(cli.root, PathBuf::from("/tmp/cfg"));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["poolcfg", "--verbose", "show"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["poolcfg", "--format", "json", "pools"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn set_requires_value() {
        assert!(Cli::try_parse_from(["poolcfg", "set", "field"]).is_err());
    }
}
