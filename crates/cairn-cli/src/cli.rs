use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cairn",
    about = "Cairn: schema registry and indexing over a CRDT object store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed a bundle into a fresh store and report registry and index state
    Seed(SeedArgs),
    /// Check a bundle without writing anything
    Validate(ValidateArgs),
    /// Show the effective configuration
    Config,
}

#[derive(Args)]
pub struct SeedArgs {
    /// JSON seed bundle
    #[arg(short, long)]
    pub bundle: PathBuf,
    /// Seed again after the first run, replacing seeded instances
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON seed bundle
    #[arg(short, long)]
    pub bundle: PathBuf,
}
