use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fertadvisor",
    version,
    about = "Fertilizer recommendations from soil-test reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to advisor.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Model artifact to use instead of the configured one
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a fertilizer for a soil-test report (YAML or JSON)
    Recommend {
        /// Request file; use - for stdin
        file: PathBuf,

        /// Crop, overriding the one in the file
        #[arg(long)]
        crop: Option<String>,

        /// Print the full recommendation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and model artifact
    Check,
    /// List the decision table
    Rules,
    /// Explain the chemistry of a fertilizer or a topic
    Explain {
        /// Fertilizer name (e.g. DAP) or topic (e.g. ph)
        name: String,
    },
    /// Write a configuration file interactively
    Init,
}
