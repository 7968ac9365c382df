use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use log::{error, info, warn};

use crate::engine::BackupEngine;
use crate::errors::ScheduleError;

/// Runs recurring backups of configured source targets on cron schedules.
/// Each schedule gets its own thread that sleeps until the next fire time
/// and wakes early when stopped; `stop` (or dropping the scheduler) signals
/// every thread and joins it. A failed run is logged and the schedule keeps
/// going.
#[derive(Default)]
pub struct BackupScheduler {
    jobs: Vec<ScheduledJob>,
}

struct ScheduledJob {
    handle: JoinHandle<()>,
    stop: Sender<()>,
}

impl BackupScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a recurring backup of `target` firing per `cron`
    /// (seconds resolution: `sec min hour day month weekday`).
    pub fn start(
        &mut self,
        engine: Arc<BackupEngine>,
        target: &str,
        cron: &str,
    ) -> Result<(), ScheduleError> {
        let schedule = Schedule::from_str(cron).map_err(|source| ScheduleError::InvalidCron {
            target: target.to_string(),
            source,
        })?;
        if engine
            .registry()
            .resolve(target)
            .filter(|t| t.role.can_source())
            .is_none()
        {
            return Err(ScheduleError::UnknownTarget(target.to_string()));
        }

        let (stop, wake) = mpsc::channel();
        let target = target.to_string();
        let handle = thread::spawn(move || {
            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    warn!("schedule for target {target} has no future fire times, stopping");
                    return;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                match wake.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        info!("scheduled backups of target {target} stopped");
                        return;
                    }
                    Err(RecvTimeoutError::Timeout) => match engine.create_backup(&target) {
                        Ok(id) => info!("scheduled backup {id} of target {target} created"),
                        Err(err) => error!("scheduled backup of target {target} failed: {err}"),
                    },
                }
            }
        });
        self.jobs.push(ScheduledJob { handle, stop });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Signal every schedule thread and wait for it to finish.
    pub fn stop(&mut self) {
        for job in self.jobs.drain(..) {
            let _ = job.stop.send(());
            let _ = job.handle.join();
        }
    }
}

impl Drop for BackupScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
