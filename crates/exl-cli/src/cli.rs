use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "exl",
    about = "ExecLedger -- session resolution, chain verification, and bundle export",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a session and print its contract JSON
    Resolve(ResolveArgs),
    /// Replay a ledger file and report chain integrity
    Verify(VerifyArgs),
    /// Package a session into a deterministic bundle archive
    Export(ExportArgs),
    /// Run a command, capturing its output into a session ledger
    Record(RecordArgs),
}

/// Which session to operate on. With no selector, the most recent
/// session under the root is used.
#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Artifacts root holding exec_ directories
    #[arg(long)]
    pub root: PathBuf,

    /// Resolve the most recent session (the default)
    #[arg(long, conflicts_with_all = ["exec", "session"])]
    pub latest: bool,

    /// Exec directory name
    #[arg(long, requires = "session")]
    pub exec: Option<String>,

    /// Session directory name within the exec directory
    #[arg(long, requires = "exec")]
    pub session: Option<String>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Write the contract JSON to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Ledger or change-log file to verify
    #[arg(long)]
    pub ledger: PathBuf,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Directory the bundle archive is written into
    #[arg(long)]
    pub dest: PathBuf,

    /// Source tag recorded in the bundle manifest
    #[arg(long, default_value = "exl-cli")]
    pub source: String,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Session ledger file to append to (created when absent)
    #[arg(long)]
    pub ledger: PathBuf,

    /// Session identifier stamped on every event
    #[arg(long)]
    pub session: String,

    /// Override the cumulative output budget, in bytes
    #[arg(long)]
    pub max_output_bytes: Option<usize>,

    /// Command to run, after `--`
    #[arg(last = true)]
    pub command: Vec<String>,
}
