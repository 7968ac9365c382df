mod cli;
mod ops;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use burrow::adapters::AdapterSet;
use burrow::store::FsBackupStore;
use burrow::{BackupEngine, TargetRegistry, config};

use cli::{Cli, Commands};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(&cli.config)?;
    let registry = TargetRegistry::new(config.targets)?;
    let store = Arc::new(FsBackupStore::new(&cli.store_dir)?);
    let adapters = AdapterSet::embedded_for(registry.targets());
    let engine = Arc::new(BackupEngine::new(registry, adapters, store));

    match cli.command {
        Commands::Backup { target } => {
            ops::do_backup(&engine, &target)?;
        }
        Commands::Restore {
            target,
            backup_id,
            drop,
        } => {
            ops::do_restore(&engine, &target, backup_id, drop)?;
        }
        Commands::Health { target } => {
            ops::do_health(&engine, &target);
        }
        Commands::Run => {
            ops::do_run(Arc::clone(&engine), &config.scheduled_backups)?;
        }
        Commands::Targets => {
            ops::do_targets(&engine);
        }
        Commands::Backups => {
            ops::do_backups(&engine)?;
        }
        Commands::Version => {
            ops::do_version();
        }
    }

    Ok(())
}
