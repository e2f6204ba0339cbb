//! Job runner: dispatches dataset jobs sequentially or on a bounded worker pool

use crate::config::{ExecutionConfig, ExecutionStrategy};
use crate::error::{Error, Result};
use crate::types::{DownloadJob, JobOutcome};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::DatasetDownloader;
use super::dataset::output_dir;

/// Result of one dispatched job
#[derive(Debug)]
pub struct JobReport {
    /// Job name
    pub name: String,
    /// Outcome, or the error the job failed with
    pub result: Result<JobOutcome>,
}

impl JobReport {
    /// Whether the job finished without error
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Short status word for log lines
    pub fn status(&self) -> &'static str {
        match &self.result {
            Ok(JobOutcome::Skipped { .. }) => "skipped",
            Ok(JobOutcome::Completed { .. }) => "completed",
            Err(_) => "failed",
        }
    }
}

/// Aggregate result of a runner invocation
#[derive(Debug)]
pub struct RunSummary {
    /// One report per dispatched job, in input order
    pub reports: Vec<JobReport>,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Time from dispatch of the first job to completion of the last
    pub elapsed: Duration,
}

impl RunSummary {
    /// True when every dispatched job succeeded
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(JobReport::is_success)
    }

    /// First failure in job order, with the job's name
    pub fn first_error(&self) -> Option<(&str, &Error)> {
        self.reports.iter().find_map(|report| match &report.result {
            Err(e) => Some((report.name.as_str(), e)),
            Ok(_) => None,
        })
    }

    /// Number of failed jobs
    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_success()).count()
    }
}

/// Dispatches a set of jobs with the configured strategy
///
/// Parallel runs spawn one task per job and bound concurrency with a semaphore.
/// A failing job never cancels its siblings.
pub struct JobRunner {
    downloader: Arc<DatasetDownloader>,
    strategy: ExecutionStrategy,
    fail_fast: bool,
}

impl JobRunner {
    /// Create a runner over a shared downloader
    pub fn new(downloader: Arc<DatasetDownloader>, execution: &ExecutionConfig) -> Self {
        Self {
            downloader,
            strategy: execution.strategy,
            fail_fast: execution.fail_fast,
        }
    }

    /// Run every job and collect one report per dispatched job
    pub async fn run(&self, jobs: Vec<DownloadJob>) -> RunSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        let job_count = jobs.len();

        info!(jobs = job_count, strategy = ?self.strategy, "starting dataset jobs");

        if let Err(e) = self.truncate_shared_dirs(&jobs).await {
            error!(error = %e, code = e.error_code(), "failed to truncate output directory");
            // Every job would have hit the same truncate failure
            let message = e.to_string();
            let reports = jobs
                .into_iter()
                .map(|job| JobReport {
                    name: job.name,
                    result: Err(Error::TaskFailed(format!(
                        "output directory truncation failed: {}",
                        message
                    ))),
                })
                .collect();
            return RunSummary {
                reports,
                started_at,
                elapsed: start.elapsed(),
            };
        }
        let jobs: Vec<DownloadJob> = jobs
            .into_iter()
            .map(|job| job.with_truncate_existing(false))
            .collect();

        let reports = match self.strategy {
            ExecutionStrategy::Sequential => self.run_sequential(jobs).await,
            ExecutionStrategy::Parallel { max_workers } => {
                self.run_parallel(jobs, max_workers).await
            }
        };

        for report in &reports {
            match &report.result {
                Ok(_) => info!(job = %report.name, status = report.status(), "dataset job finished"),
                Err(e) => error!(
                    job = %report.name,
                    status = report.status(),
                    code = e.error_code(),
                    error = %e,
                    "dataset job finished"
                ),
            }
        }

        if reports.len() < job_count {
            warn!(
                not_started = job_count - reports.len(),
                "stopped after first failure, remaining jobs were not started"
            );
        }

        RunSummary {
            reports,
            started_at,
            elapsed: start.elapsed(),
        }
    }

    async fn run_sequential(&self, jobs: Vec<DownloadJob>) -> Vec<JobReport> {
        let mut reports = Vec::with_capacity(jobs.len());

        for job in jobs {
            let result = self.downloader.download_dataset(&job).await;
            let failed = result.is_err();
            reports.push(JobReport {
                name: job.name,
                result,
            });

            if failed && self.fail_fast {
                break;
            }
        }

        reports
    }

    async fn run_parallel(
        &self,
        jobs: Vec<DownloadJob>,
        max_workers: Option<usize>,
    ) -> Vec<JobReport> {
        let workers = max_workers.unwrap_or(jobs.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let downloader = Arc::clone(&self.downloader);
            let semaphore = Arc::clone(&semaphore);
            let name = job.name.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::TaskFailed(format!("worker pool closed: {}", e)))?;
                downloader.download_dataset(&job).await
            });
            handles.push((name, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::TaskFailed(format!("dataset task panicked: {}", e))),
            };
            reports.push(JobReport { name, result });
        }

        reports
    }

    /// Truncate each distinct output directory once, before any job starts
    ///
    /// Jobs usually share one output directory; truncating it per job would let a
    /// later job wipe an earlier job's output, or one in flight.
    async fn truncate_shared_dirs(&self, jobs: &[DownloadJob]) -> Result<()> {
        let mut truncated: HashSet<PathBuf> = HashSet::new();

        for job in jobs.iter().filter(|job| job.truncate_existing) {
            if let Some(dir) = output_dir(&job.output_path)
                && !truncated.insert(dir.to_path_buf())
            {
                continue;
            }
            self.downloader
                .truncate_output_dir(&job.output_path)
                .await?;
        }

        Ok(())
    }
}
