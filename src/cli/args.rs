//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Hierarchical calculators: scoped variables, child results, and upward change propagation
#[derive(Parser, Debug)]
#[command(name = "calctree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project snapshot (JSON); defaults to the configured snapshot
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the calculator hierarchy
    Tree,

    /// List all calculators breadth-first
    List,

    /// Show the evaluation scope of a calculator
    Scope {
        /// Calculator id
        calculator_id: i64,
    },

    /// Evaluate one calculator without changing anything
    Eval {
        /// Calculator id
        calculator_id: i64,
    },

    /// Change a variable and propagate results to the root
    Set {
        /// Calculator id
        calculator_id: i64,
        /// Variable id
        variable_id: i64,
        /// New value
        #[arg(allow_hyphen_values = true)]
        value: f64,
        /// Save the updated snapshot
        #[arg(short, long)]
        write: bool,
    },

    /// Change a calculator's expression and propagate results to the root
    Expr {
        /// Calculator id
        calculator_id: i64,
        /// New expression; omit to clear it
        expression: Option<String>,
        /// Save the updated snapshot
        #[arg(short, long)]
        write: bool,
    },

    /// Recompute every calculator, children first
    Recalc {
        /// Save the updated snapshot
        #[arg(short, long)]
        write: bool,
    },

    /// Print effective settings
    Config,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
