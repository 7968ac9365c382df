use std::sync::Arc;

use anyhow::Result;
use colored::*;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::UTF8_FULL};

use burrow::config::ScheduledBackup;
use burrow::{BackupEngine, BackupId, BackupScheduler};

pub fn do_backup(engine: &BackupEngine, target: &str) -> Result<()> {
    let backup_id = engine.create_backup(target)?;
    println!(
        "{} {}",
        "✔".green().bold(),
        format!("Backup {} of target '{}' created", backup_id, target).green()
    );
    Ok(())
}

pub fn do_restore(
    engine: &BackupEngine,
    target: &str,
    backup_id: BackupId,
    drop_existing: bool,
) -> Result<()> {
    if drop_existing
        && !prompt_confirm(&format!(
            "Restore will replace existing data in target '{}'. Continue? [y/N] ",
            target
        ))?
    {
        println!("Aborted.");
        return Ok(());
    }

    engine.restore_backup(target, backup_id, drop_existing)?;
    println!(
        "{} {}",
        "✔".green().bold(),
        format!("Backup {} restored into target '{}'", backup_id, target).green()
    );
    Ok(())
}

pub fn do_health(engine: &BackupEngine, target: &str) {
    let status = engine.check_health(target);
    if status.is_healthy {
        println!(
            "{} {}",
            "✔".green().bold(),
            format!("Target '{}' is healthy", target).green()
        );
    } else {
        println!(
            "{} {}",
            "!".yellow().bold(),
            format!("Target '{}' is unhealthy", target).yellow()
        );
    }
}

pub fn do_run(engine: Arc<BackupEngine>, schedules: &[ScheduledBackup]) -> Result<()> {
    if schedules.is_empty() {
        println!(
            "{} {}",
            "i".yellow().bold(),
            "No scheduled backups configured".yellow()
        );
        return Ok(());
    }

    let mut scheduler = BackupScheduler::new();
    for schedule in schedules {
        scheduler.start(Arc::clone(&engine), &schedule.target, &schedule.cron)?;
        println!(
            "{} {}",
            "✔".green().bold(),
            format!(
                "Scheduled backups of target '{}' ({})",
                schedule.target, schedule.cron
            )
            .green()
        );
    }
    println!(
        "{} {}",
        "i".yellow().bold(),
        "Scheduler running; press Ctrl-C to stop".yellow()
    );
    loop {
        std::thread::park();
    }
}

pub fn do_targets(engine: &BackupEngine) {
    let mut targets: Vec<_> = engine.registry().targets().collect();
    if targets.is_empty() {
        println!("{} {}", "i".yellow().bold(), "No targets configured".yellow());
        return;
    }
    targets.sort_by(|a, b| a.name.cmp(&b.name));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Technology").add_attribute(Attribute::Bold),
            Cell::new("Role").add_attribute(Attribute::Bold),
            Cell::new("Connection").add_attribute(Attribute::Bold),
        ]);
    for target in targets {
        table.add_row(vec![
            Cell::new(&target.name),
            Cell::new(target.technology.as_str()),
            Cell::new(target.role.as_str()),
            Cell::new(&target.connection),
        ]);
    }
    println!("{}", table);
}

pub fn do_backups(engine: &BackupEngine) -> Result<()> {
    let backups = engine.list_backups()?;
    if backups.is_empty() {
        println!("{} {}", "i".yellow().bold(), "No backups found".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Backup id").add_attribute(Attribute::Bold),
            Cell::new("Source").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
            Cell::new("Collections").add_attribute(Attribute::Bold),
        ]);
    for backup in &backups {
        table.add_row(vec![
            Cell::new(backup.backup_id),
            Cell::new(&backup.source_target),
            Cell::new(backup.created_at.format("%Y-%m-%d %H:%M:%S %z").to_string()),
            Cell::new(backup.collections),
        ]);
    }
    println!("{}", table);
    Ok(())
}

pub fn do_version() {
    println!("{} {}", "burrow".bold(), env!("CARGO_PKG_VERSION").cyan());
}

fn prompt_confirm(message: &str) -> Result<bool> {
    use std::io::{self, Write};
    print!("{} {}", "?".cyan().bold(), message.cyan());
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let ans = input.trim().to_lowercase();
    Ok(ans == "y" || ans == "yes")
}
