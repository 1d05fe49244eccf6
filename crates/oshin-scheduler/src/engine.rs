//! Scheduler loop: sleep until the earliest due job, run everything due,
//! repeat until shutdown.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use oshin_core::error::Result;

use crate::daily::DailyTime;

/// A unit of scheduled work.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<()>;
}

struct Entry {
    schedule: DailyTime,
    job: Arc<dyn Job>,
    next_run: Option<DateTime<Utc>>,
}

pub struct SchedulerEngine {
    entries: Vec<Entry>,
    clock: Arc<dyn Clock>,
}

impl SchedulerEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Vec::new(),
            clock,
        }
    }

    /// Register `job` to run daily at `schedule`. The first run is the next
    /// occurrence after registration.
    pub fn add_job(&mut self, schedule: DailyTime, job: Arc<dyn Job>) -> Result<()> {
        let next_run = schedule.next_after(self.clock.utc())?;
        tracing::info!("Scheduled '{}' daily at {schedule}, next run {next_run}", job.name());
        self.entries.push(Entry {
            schedule,
            job,
            next_run: Some(next_run),
        });
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.entries.len()
    }

    /// Earliest pending run across all jobs.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().filter_map(|e| e.next_run).min()
    }

    /// Upcoming runs as `(job name, instant)`, in registration order.
    pub fn upcoming(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.entries
            .iter()
            .map(|e| (e.job.name().to_string(), e.next_run))
            .collect()
    }

    /// Run every job due at `now`, sequentially, then reschedule it.
    /// Job errors are logged and never stop later runs. Returns how many
    /// jobs ran.
    pub async fn run_due(&mut self, now: DateTime<Utc>) -> usize {
        let mut ran = 0;
        for entry in &mut self.entries {
            let Some(due) = entry.next_run else {
                continue;
            };
            if due > now {
                continue;
            }
            tracing::info!("⏰ Running '{}' (due {due})", entry.job.name());
            if let Err(e) = entry.job.run().await {
                tracing::error!("Job '{}' failed: {e}", entry.job.name());
            }
            ran += 1;

            entry.next_run = match entry.schedule.next_after(now) {
                Ok(next) => Some(next),
                Err(e) => {
                    tracing::error!("Cannot reschedule '{}': {e}", entry.job.name());
                    None
                }
            };
        }
        ran
    }

    /// Drive the schedule until `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        tracing::info!("Scheduler started with {} job(s)", self.entries.len());

        loop {
            let Some(due) = self.next_due() else {
                tracing::info!("No scheduled jobs left, waiting for shutdown");
                (&mut shutdown).await;
                break;
            };
            let wait = (due - self.clock.utc()).to_std().unwrap_or_default();
            tracing::debug!("Next job due at {due}, sleeping {}s", wait.as_secs());

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(wait) => {
                    let now = self.clock.utc();
                    self.run_due(now).await;
                }
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use oshin_core::error::OshinError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn local(&self) -> DateTime<Local> {
            self.0.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct CountingJob {
        name: &'static str,
        runs: AtomicUsize,
        fail: bool,
    }

    impl CountingJob {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                runs: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(OshinError::directory("invalid_auth"))
            } else {
                Ok(())
            }
        }
    }

    fn utc(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, mi, 0).unwrap()
    }

    fn engine_at(now: DateTime<Utc>) -> SchedulerEngine {
        SchedulerEngine::new(Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn test_runs_only_due_jobs_and_reschedules() {
        let mut engine = engine_at(utc(15, 8, 0));
        let digest = CountingJob::new("digest", false);
        let reminder = CountingJob::new("reminder", false);
        engine
            .add_job(DailyTime::parse("09:30", "UTC").unwrap(), digest.clone())
            .unwrap();
        engine
            .add_job(DailyTime::parse("10:00", "UTC").unwrap(), reminder.clone())
            .unwrap();
        assert_eq!(engine.next_due(), Some(utc(15, 9, 30)));

        assert_eq!(engine.run_due(utc(15, 9, 0)).await, 0);
        assert_eq!(engine.run_due(utc(15, 9, 30)).await, 1);
        assert_eq!(digest.runs.load(Ordering::SeqCst), 1);
        assert_eq!(reminder.runs.load(Ordering::SeqCst), 0);
        assert_eq!(engine.next_due(), Some(utc(15, 10, 0)));

        assert_eq!(engine.run_due(utc(15, 10, 0)).await, 1);
        assert_eq!(engine.next_due(), Some(utc(16, 9, 30)));
        let upcoming = engine.upcoming();
        assert_eq!(upcoming[0], ("digest".to_string(), Some(utc(16, 9, 30))));
        assert_eq!(upcoming[1], ("reminder".to_string(), Some(utc(16, 10, 0))));
    }

    #[tokio::test]
    async fn test_failed_job_is_rescheduled() {
        let mut engine = engine_at(utc(15, 8, 0));
        let job = CountingJob::new("digest", true);
        engine
            .add_job(DailyTime::parse("09:30", "UTC").unwrap(), job.clone())
            .unwrap();
        assert_eq!(engine.run_due(utc(15, 9, 30)).await, 1);
        assert_eq!(engine.next_due(), Some(utc(16, 9, 30)));
        assert_eq!(engine.run_due(utc(16, 9, 31)).await, 1);
        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut engine = engine_at(utc(15, 8, 0));
        let job = CountingJob::new("digest", false);
        engine
            .add_job(DailyTime::parse("09:30", "UTC").unwrap(), job.clone())
            .unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), engine.run(async {}))
            .await
            .unwrap();
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_without_jobs_waits_for_shutdown() {
        let engine = engine_at(utc(15, 8, 0));
        assert_eq!(engine.job_count(), 0);
        tokio::time::timeout(std::time::Duration::from_secs(5), engine.run(async {}))
            .await
            .unwrap();
    }
}
