//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Prune rule references whose repository is gone or untagged
#[derive(Parser, Debug)]
#[command(name = "rulesets")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to run (defaults to `sync`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Repository root holding the rulesets directory [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Config file to use instead of <root>/rulesets.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Organization hosting the rule repositories
    #[arg(long, global = true, value_name = "NAME")]
    pub org: Option<String>,

    /// Base URL of the GitHub REST API
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// Maximum repository lookups in flight
    #[arg(long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Remove references to missing or untagged rule repositories
    ///
    /// Examples:
    ///   rulesets sync              # Rewrite rulesets in place
    ///   rulesets sync --dry-run    # Show the diff without writing
    Sync {
        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fail when any ruleset would change
    Check {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show rulesets and their references (no network access)
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Sync {
            dry_run: false,
            json: false,
        }
    }
}
