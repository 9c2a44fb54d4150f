use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lintd")]
#[command(about = "Validate documents against recorded analyzer findings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate one file and print its diagnostics (exit 1 on errors)
    Check {
        /// Source file to validate
        file: PathBuf,
        /// Analyzer output to replay, as JSON
        #[arg(long)]
        findings: PathBuf,
        /// Settings file (defaults to the user config location)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Lint configuration handed to the analyzer, as JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the edits that apply every non-overlapping auto fix
    FixAll {
        /// Source file to fix
        file: PathBuf,
        /// Analyzer output to replay, as JSON
        #[arg(long)]
        findings: PathBuf,
        /// Settings file (defaults to the user config location)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Lint configuration handed to the analyzer, as JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only include rules allowed by `auto_fix_on_save`
        #[arg(long)]
        on_save: bool,
    },
    /// Summarize a whole-project analyzer run
    Sweep {
        /// Analyzer output to replay, as JSON
        #[arg(long)]
        findings: PathBuf,
        /// Settings file (defaults to the user config location)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}
