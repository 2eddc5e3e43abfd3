use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "quillnotes",
    version,
    about = "Tagged rich-text notes stored in a single local file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the stored notes
    #[clap(long, value_parser)]
    pub data_dir: Option<String>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the quillnotes application
    #[clap(subcommand)]
    pub command: Commands,
}
