//! Single dataset job: prepare, idempotency check, fetch, unpack

use crate::error::{Error, FileOperation, Result};
use crate::extraction::{is_archive, strip_archive_suffix, unpack_recursive};
use crate::fetch::FetchProgress;
use crate::types::{DownloadJob, Event, JobOutcome};
use crate::utils::{display_paths, partial_path};
use std::path::{Path, PathBuf};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::DatasetDownloader;

impl DatasetDownloader {
    /// Download a dataset and unpack it if it is an archive
    ///
    /// Steps, in order:
    /// 1. Wipe the output directory when `truncate_existing` is set, then make sure it exists
    /// 2. Skip if `output_path` or its unpacked directory is already present
    /// 3. Stream the URL into `<output_path>.part`, then rename it into place
    /// 4. Unpack the archive next to it and resolve every nested archive
    ///
    /// Failures in steps 3 and 4 publish [`Event::Failed`] and are returned unchanged.
    /// Nothing already written is rolled back.
    ///
    /// # Example
    /// ```no_run
    /// use dataset_dl::{Config, DatasetDownloader, DownloadJob};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> dataset_dl::Result<()> {
    /// let downloader = DatasetDownloader::new(&Config::default())?;
    /// let job = DownloadJob::new(
    ///     "yelp_json",
    ///     "https://business.yelp.com/external-assets/files/Yelp-JSON.zip",
    ///     "artifacts/datasets/yelp_json.zip",
    /// );
    /// let outcome = downloader.download_dataset(&job).await?;
    /// println!("{:?}", outcome);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download_dataset(&self, job: &DownloadJob) -> Result<JobOutcome> {
        let span = info_span!("dataset", job = %job.name);

        async {
            let result = self.run_job(job).await;
            if let Err(e) = &result {
                error!(error = %e, code = e.error_code(), "dataset job failed");
                self.emit(Event::Failed {
                    job: job.name.clone(),
                    error: e.to_string(),
                });
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_job(&self, job: &DownloadJob) -> Result<JobOutcome> {
        debug!(url = %job.url, output_path = ?job.output_path, "preparing dataset job");

        if job.truncate_existing {
            self.truncate_output_dir(&job.output_path).await?;
        }
        ensure_parent_dir(&job.output_path).await?;

        if let Some(existing) = existing_output(&job.output_path).await {
            info!(path = ?existing, "dataset already present, skipping download");
            self.emit(Event::Skipped {
                job: job.name.clone(),
                path: existing.clone(),
            });
            return Ok(JobOutcome::Skipped { existing });
        }

        self.emit(Event::Started {
            job: job.name.clone(),
            url: job.url.clone(),
        });

        let size = self.fetch_to_path(job).await?;
        info!(path = ?job.output_path, size, "dataset downloaded");
        self.emit(Event::Downloaded {
            job: job.name.clone(),
            path: job.output_path.clone(),
            size,
        });

        if !is_archive(&job.output_path) {
            debug!(path = ?job.output_path, "download is not an archive, nothing to unpack");
            self.emit(Event::Complete {
                job: job.name.clone(),
                path: job.output_path.clone(),
            });
            return Ok(JobOutcome::Completed {
                path: job.output_path.clone(),
                extracted_to: None,
                unpacked: Vec::new(),
            });
        }

        self.emit(Event::Extracting {
            job: job.name.clone(),
            archive: job.output_path.clone(),
        });

        let summary =
            unpack_recursive(&job.output_path, job.cleanup_archive, self.max_recursion_depth)
                .await?;

        self.emit(Event::Extracted {
            job: job.name.clone(),
            destination: summary.destination.clone(),
            nested: summary.nested.len(),
        });

        let mut touched = Vec::with_capacity(summary.nested.len() + 1);
        touched.push(summary.destination.clone());
        touched.extend(summary.nested.iter().cloned());
        info!(
            directories = %display_paths(&touched),
            "dataset downloaded and unpacked successfully"
        );

        self.emit(Event::Complete {
            job: job.name.clone(),
            path: summary.destination.clone(),
        });

        Ok(JobOutcome::Completed {
            path: job.output_path.clone(),
            extracted_to: Some(summary.destination),
            unpacked: summary.nested,
        })
    }

    /// Stream the job's URL into a partial file, then move it onto `output_path`
    async fn fetch_to_path(&self, job: &DownloadJob) -> Result<u64> {
        let partial = partial_path(&job.output_path);
        let event_tx = self.event_tx.clone();
        let job_name = job.name.clone();

        let on_progress = move |progress: FetchProgress| {
            event_tx
                .send(Event::Downloading {
                    job: job_name.clone(),
                    downloaded: progress.downloaded,
                    total: progress.total,
                })
                .ok();
        };

        let size = self
            .fetcher
            .fetch(&job.url, &partial, job.chunk_size_bytes, &on_progress)
            .await?;

        tokio::fs::rename(&partial, &job.output_path)
            .await
            .map_err(|e| Error::filesystem(&partial, FileOperation::Rename, e))?;

        Ok(size)
    }

    /// Recursively delete the directory that holds `output_path`
    ///
    /// A missing directory is not an error. An output path without a parent
    /// directory component is left alone rather than wiping the working directory.
    pub async fn truncate_output_dir(&self, output_path: &Path) -> Result<()> {
        let Some(dir) = output_dir(output_path) else {
            warn!(
                ?output_path,
                "output path has no parent directory, not truncating"
            );
            return Ok(());
        };

        info!(?dir, "truncating output directory");
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?dir, "output directory already absent");
                Ok(())
            }
            Err(e) => Err(Error::filesystem(dir, FileOperation::RemoveDir, e)),
        }
    }
}

/// Parent directory of an output path, if it names one
pub(crate) fn output_dir(output_path: &Path) -> Option<&Path> {
    output_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

async fn ensure_parent_dir(output_path: &Path) -> Result<()> {
    if let Some(dir) = output_dir(output_path) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::filesystem(dir, FileOperation::CreateDir, e))?;
    }
    Ok(())
}

/// The path that makes a fetch unnecessary, if any
///
/// Either the downloaded file itself or the directory it was unpacked into.
async fn existing_output(output_path: &Path) -> Option<PathBuf> {
    if tokio::fs::try_exists(output_path).await.unwrap_or(false) {
        return Some(output_path.to_path_buf());
    }

    if let Some(unpacked) = strip_archive_suffix(output_path)
        && tokio::fs::try_exists(&unpacked).await.unwrap_or(false)
    {
        return Some(unpacked);
    }

    None
}
