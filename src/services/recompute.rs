//! Background payroll recomputation.
//!
//! Check-out hands the affected month to a [`RecomputeSink`] and returns
//! immediately. [`RecomputeQueue`] is the production sink: a single worker
//! task drains an mpsc channel, retries transient failures with linear
//! backoff, and keeps jobs that still fail in a bounded dead-letter list that
//! operators can inspect and replay.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PayrollSettings;

use super::payroll::SalaryCalculator;

/// One month of one user's pay to refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeJob {
    /// Whose pay to refresh.
    pub user_id: String,
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
}

/// A job that exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedJob {
    /// The job that failed.
    pub job: RecomputeJob,
    /// Attempts made; zero if it was never run.
    pub attempts: u32,
    /// The last error.
    pub error: String,
}

/// Accepts recompute jobs without waiting for them to run.
pub trait RecomputeSink: Send + Sync {
    /// Schedules `job`. Never blocks and never fails the caller.
    fn enqueue(&self, job: RecomputeJob);
}

/// Dead-lettered jobs kept before the oldest are dropped.
pub const DEAD_LETTER_CAPACITY: usize = 1024;

type DeadLetters = Arc<Mutex<VecDeque<FailedJob>>>;

fn dead_letter(dead_letters: &DeadLetters, failed: FailedJob) {
    let mut letters = lock(dead_letters);
    if letters.len() >= DEAD_LETTER_CAPACITY {
        if let Some(dropped) = letters.pop_front() {
            warn!(
                user_id = %dropped.job.user_id,
                month = dropped.job.month,
                year = dropped.job.year,
                "Dead-letter list full, dropping oldest failed job"
            );
        }
    }
    letters.push_back(failed);
}

/// Channel-backed recompute worker.
pub struct RecomputeQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<RecomputeJob>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    dead_letters: DeadLetters,
}

impl RecomputeQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(calculator: Arc<SalaryCalculator>, settings: &PayrollSettings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dead_letters: DeadLetters = Arc::default();
        let worker = tokio::spawn(run_worker(
            receiver,
            calculator,
            settings.max_attempts.max(1),
            Duration::from_millis(settings.retry_backoff_ms),
            Arc::clone(&dead_letters),
        ));

        Self {
            sender: Mutex::new(Some(sender)),
            worker: tokio::sync::Mutex::new(Some(worker)),
            dead_letters,
        }
    }

    /// Jobs that failed permanently, oldest first.
    pub fn failed_jobs(&self) -> Vec<FailedJob> {
        lock(&self.dead_letters).iter().cloned().collect()
    }

    /// Moves every dead-lettered job back onto the queue and returns how many
    /// were resubmitted. Jobs that fail again are dead-lettered anew.
    pub fn replay_failed(&self) -> usize {
        let jobs: Vec<RecomputeJob> = lock(&self.dead_letters)
            .drain(..)
            .map(|failed| failed.job)
            .collect();
        let count = jobs.len();
        for job in jobs {
            self.enqueue(job);
        }
        if count > 0 {
            info!(count, "Replaying failed payroll recompute jobs");
        }
        count
    }

    /// Stops accepting jobs, lets the worker drain what is queued, and waits for it.
    pub async fn shutdown(&self) {
        lock(&self.sender).take();
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                error!(error = %err, "Recompute worker terminated abnormally");
            }
        }
    }
}

impl RecomputeSink for RecomputeQueue {
    fn enqueue(&self, job: RecomputeJob) {
        let rejected = match lock(&self.sender).as_ref() {
            Some(sender) => sender.send(job).err().map(|e| e.0),
            None => Some(job),
        };

        if let Some(job) = rejected {
            error!(
                user_id = %job.user_id,
                month = job.month,
                year = job.year,
                "Recompute queue is closed, job dead-lettered"
            );
            dead_letter(
                &self.dead_letters,
                FailedJob {
                    job,
                    attempts: 0,
                    error: "recompute queue is closed".to_string(),
                },
            );
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<RecomputeJob>,
    calculator: Arc<SalaryCalculator>,
    max_attempts: u32,
    backoff: Duration,
    dead_letters: DeadLetters,
) {
    while let Some(job) = receiver.recv().await {
        let mut attempt = 1;
        loop {
            match calculator
                .recompute_for_attendance(&job.user_id, job.month, job.year)
                .await
            {
                Ok(record) => {
                    debug!(
                        user_id = %job.user_id,
                        month = job.month,
                        year = job.year,
                        attempt,
                        total_salary = %record.total_salary,
                        "Payroll recompute finished"
                    );
                    break;
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        user_id = %job.user_id,
                        month = job.month,
                        year = job.year,
                        attempt,
                        error = %err,
                        "Payroll recompute failed, retrying"
                    );
                    tokio::time::sleep(backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        user_id = %job.user_id,
                        month = job.month,
                        year = job.year,
                        attempts = attempt,
                        error = %err,
                        "Payroll recompute failed permanently"
                    );
                    dead_letter(
                        &dead_letters,
                        FailedJob {
                            job,
                            attempts: attempt,
                            error: err.to_string(),
                        },
                    );
                    break;
                }
            }
        }
    }
    debug!("Recompute worker stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
