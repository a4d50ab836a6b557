//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{ArgAction, Args, Parser, Subcommand};

/// Flowkeeper - versioned backups for Node-RED flows
#[derive(Parser, Debug)]
#[command(name = "flowkeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Directory that holds the .flow-backups folder
    #[arg(long, global = true)]
    pub backup_path: Option<Utf8PathBuf>,

    /// Flow file to back up from and restore into
    #[arg(long, global = true)]
    pub flow_file: Option<Utf8PathBuf>,

    /// Print results as JSON tool results
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Snapshot the current flows
    Create(CreateArgs),

    /// List backups, newest first
    List(ListArgs),

    /// Show a verified backup
    Get(GetArgs),

    /// Check the archive for missing or corrupted backups
    Health,

    /// Delete a backup
    Delete(NameArg),

    /// Deploy a backup to the flow file
    Restore(RestoreArgs),

    /// Change the capacity settings stored in the archive
    Migrate(MigrateArgs),

    /// Invoke a tool by name with JSON arguments
    Tool(ToolArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Backup name (letters, digits, '_' and '-', up to 50 characters)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Why the backup was taken
    #[arg(short, long)]
    pub reason: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include flow, node and size details
    #[arg(short, long)]
    pub detailed: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Backup name
    pub name: String,

    /// Print the full flow payload
    #[arg(long)]
    pub flows: bool,
}

#[derive(Args, Debug)]
pub struct NameArg {
    /// Backup name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup name
    pub name: String,

    /// Skip backing up the current flows before restoring
    #[arg(long)]
    pub no_safety_backup: bool,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Maximum number of backups to keep
    #[arg(long)]
    pub max_backups: usize,

    /// Evict the oldest backups once the limit is exceeded
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub auto_cleanup: bool,
}

#[derive(Args, Debug)]
pub struct ToolArgs {
    /// Tool name (create_backup, list_backups, get_backup_flows, ...)
    pub tool: String,

    /// Arguments as a JSON object
    #[arg(long)]
    pub args: Option<String>,
}
