use clap::{Parser, Subcommand};
use std::path::PathBuf;

use burrow::BackupId;

/// burrow: back up and restore configured data-store targets
#[derive(Parser, Debug)]
#[command(name = "burrow", version, about = "Back up and restore configured data-store targets.", long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Path to the target definitions file
    #[arg(short = 'c', long = "config", default_value = "targets.json")]
    pub config: PathBuf,

    /// Directory holding backup artifacts
    #[arg(long = "store-dir", default_value = "backups")]
    pub store_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a backup of a configured source target
    Backup {
        /// Name of the source target
        target: String,
    },

    /// Restore a backup into a configured destination target
    Restore {
        /// Name of the destination target
        target: String,
        /// Identifier returned when the backup was created
        backup_id: BackupId,
        /// Drop existing collections/tables before writing
        #[arg(long)]
        drop: bool,
    },

    /// Check whether a target is reachable and usable
    Health {
        /// Name of the target to probe
        target: String,
    },

    /// Run configured scheduled backups until interrupted
    Run,

    /// List configured targets
    Targets,

    /// List stored backups
    Backups,

    /// Print CLI version
    Version,
}
