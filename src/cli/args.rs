//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::application::{Reducer, RenderStyle};

/// Roll leaf values up a tree described by a parent/child adjacency file
#[derive(Parser, Debug)]
#[command(name = "rollup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Local config file (default: ./.rollup.toml if present)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Value the leaves and roll up to the root
    Aggregate {
        /// Tree file: `parent,child,...` per line, `None,<root>` for the root
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// Leaf values file: `name,value` per line
        #[arg(short = 'l', long = "values", value_hint = ValueHint::FilePath)]
        values: PathBuf,

        /// How child values combine (default from config: sum)
        #[arg(short, long, value_enum)]
        reduce: Option<Reducer>,

        /// Render only this node and its descendants
        #[arg(short = 'n', long)]
        focus: Option<String>,

        /// Maximum depth below the focus node
        #[arg(short, long)]
        depth: Option<usize>,

        /// Output format (default from config: human)
        #[arg(short, long, value_enum)]
        format: Option<RenderStyle>,

        /// Keep rows whose value is zero
        #[arg(long)]
        show_zero: bool,

        /// Title of the value column
        #[arg(long)]
        column: Option<String>,

        /// Value for leaves missing from the values file
        #[arg(long, allow_negative_numbers = true)]
        default_value: Option<f64>,
    },

    /// List leaf nodes
    Leaves {
        /// Tree file
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
    },

    /// Show hierarchy as tree
    Tree {
        /// Tree file
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,

        /// Start at this node
        #[arg(short = 'n', long)]
        focus: Option<String>,

        /// Maximum depth below the start node
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
