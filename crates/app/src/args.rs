pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sealmail")]
#[command(about = "End-to-end encrypted email over permissioned mutable data")]
pub struct Args {
    /// Path to the sealmail config directory (defaults to ~/.sealmail)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
