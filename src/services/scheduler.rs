use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::services::automation::{AutomationService, DueRunSummary};

const JOB_NAME: &str = "run_automations";

/// Periodically runs the automations that are due.
pub struct Scheduler {
    automations: Arc<AutomationService>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
    pass_active: Arc<AtomicBool>,
}

/// Held for the duration of one pass over the due automations.
struct PassGuard(Arc<AtomicBool>);

impl PassGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scheduler {
    pub fn new(automations: Arc<AutomationService>, config: SchedulerConfig) -> Self {
        Self {
            automations,
            config,
            running: Arc::new(RwLock::new(false)),
            pass_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let automations = Arc::clone(&self.automations);
        let running = Arc::clone(&self.running);
        let pass_active = Arc::clone(&self.pass_active);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let automations = Arc::clone(&automations);
            let running = Arc::clone(&running);
            let pass_active = Arc::clone(&pass_active);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_due_job(&automations, &pass_active).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.check_interval_minutes.max(1);
        info!("Scheduler running: automations checked every {}m", interval_mins);

        let mut check_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));

        loop {
            check_interval.tick().await;
            if !*self.running.read().await {
                break;
            }
            run_due_job(&self.automations, &self.pass_active).await;
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One pass over the due automations, outside the timer.
    pub async fn run_once(&self) -> Result<DueRunSummary> {
        let Some(_guard) = PassGuard::try_acquire(&self.pass_active) else {
            anyhow::bail!("An automation pass is already running");
        };
        info!("Running manual automation check...");
        Ok(self.automations.run_due(Utc::now()).await?)
    }
}

async fn run_due_job(automations: &AutomationService, pass_active: &Arc<AtomicBool>) {
    // Cron ticks can fire while the previous pass is still running
    let Some(_guard) = PassGuard::try_acquire(pass_active) else {
        warn!(
            event = "job_skipped",
            job_name = JOB_NAME,
            "Previous automation pass still running, skipping"
        );
        return;
    };

    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = JOB_NAME, "Starting scheduled automation run");

    match automations.run_due(Utc::now()).await {
        Ok(summary) => info!(
            event = "job_finished",
            job_name = JOB_NAME,
            checked = summary.checked,
            succeeded = summary.succeeded,
            failed = summary.failed,
            new_results = summary.new_results,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled automation run finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = JOB_NAME,
            error = %e,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled automation run failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_guard_excludes_overlapping_passes() {
        let flag = Arc::new(AtomicBool::new(false));

        let first = PassGuard::try_acquire(&flag);
        assert!(first.is_some());
        assert!(PassGuard::try_acquire(&flag).is_none());

        drop(first);
        assert!(PassGuard::try_acquire(&flag).is_some());
    }
}
