use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "Run Raven scripts")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a source file and print the value of its last statement
    Run {
        /// Path to the source file
        file: PathBuf,
    },

    /// Parse a source file and print its syntax tree
    Check {
        /// Path to the source file to check
        file: PathBuf,
    },

    /// Print the tokens of a source file
    Tokens {
        /// Path to the source file
        file: PathBuf,
    },
}

/// Options for the interactive `repl` binary.
#[derive(Parser, Debug)]
#[clap(version, about = "Interactive Raven session")]
pub struct ReplArgs {
    /// File to load history from and save it to
    #[arg(long, default_value = "raven_history.txt")]
    pub history: PathBuf,

    /// Use vi key bindings instead of emacs ones
    #[arg(long)]
    pub vi: bool,
}
