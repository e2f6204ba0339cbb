//! Configuration types for dataset-dl

use crate::error::{Error, FileOperation, Result};
use crate::extraction::strip_archive_suffix;
use crate::types::DownloadJob;
use crate::utils::file_name_from_url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Yelp open dataset, JSON export
pub const YELP_DATASET_JSON_URL: &str =
    "https://business.yelp.com/external-assets/files/Yelp-JSON.zip";

/// Yelp open dataset, photos export
pub const YELP_DATASET_PHOTOS_URL: &str =
    "https://business.yelp.com/external-assets/files/Yelp-Photos.zip";

/// A remote dataset to fetch and unpack
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSource {
    /// Short name used in logs, events and progress bars
    pub name: String,

    /// Source URL
    pub url: String,

    /// File name under the datasets directory (default: last URL path segment)
    #[serde(default)]
    pub file_name: Option<String>,
}

impl DatasetSource {
    /// Create a dataset source with an explicit output file name
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            file_name: Some(file_name.into()),
        }
    }

    /// File name the dataset is saved under
    pub fn resolved_file_name(&self) -> Result<String> {
        match &self.file_name {
            Some(name) if !name.is_empty() => Ok(name.clone()),
            _ => file_name_from_url(&self.url),
        }
    }
}

/// Download behavior configuration (transport, chunking, truncate/cleanup flags)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum bytes buffered in memory before a write (default: 10 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout (default: 30s)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Overall request timeout (None = unlimited, since datasets can be many GB)
    #[serde(default)]
    pub request_timeout: Option<Duration>,

    /// Delete the datasets directory before downloading (default: false)
    #[serde(default)]
    pub truncate_existing: bool,

    /// Delete archives after successful extraction (default: true)
    #[serde(default = "default_true")]
    pub cleanup_archives: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size(),
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            request_timeout: None,
            truncate_existing: false,
            cleanup_archives: true,
        }
    }
}

/// Nested archive extraction configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum archive nesting depth for recursive unpacking (default: 16)
    #[serde(default = "default_max_recursion")]
    pub max_recursion_depth: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: default_max_recursion(),
        }
    }
}

/// How the job runner schedules dataset jobs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One job at a time, in configuration order
    Sequential,
    /// All jobs spawned at once, bounded by a worker semaphore
    Parallel {
        /// Worker limit (None = one worker per job)
        #[serde(default)]
        max_workers: Option<usize>,
    },
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Parallel { max_workers: None }
    }
}

/// Job runner configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Scheduling strategy (default: parallel, one worker per job)
    #[serde(default)]
    pub strategy: ExecutionStrategy,

    /// Stop starting new jobs after the first failure (sequential only)
    #[serde(default)]
    pub fail_fast: bool,
}

/// Main configuration for dataset-dl
///
/// Fields are organized into sub-configs:
/// - [`download`](DownloadConfig) - transport, chunking, truncate/cleanup
/// - [`extraction`](ExtractionConfig) - nested archive handling
/// - [`execution`](ExecutionConfig) - job scheduling
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base output directory (default: "artifacts/datasets")
    #[serde(default = "default_datasets_dir")]
    pub datasets_dir: PathBuf,

    /// Datasets to fetch (default: Yelp JSON and photos exports)
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetSource>,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Recursive extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Job scheduling settings
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datasets_dir: default_datasets_dir(),
            datasets: default_datasets(),
            download: DownloadConfig::default(),
            extraction: ExtractionConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Config {
    /// Load a JSON configuration file, filling missing fields with defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::filesystem(path, FileOperation::Read, e))?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.chunk_size_bytes == 0 {
            return Err(config_error(
                "chunk size must be greater than zero",
                "chunk_size_bytes",
            ));
        }

        if let ExecutionStrategy::Parallel {
            max_workers: Some(0),
        } = self.execution.strategy
        {
            return Err(config_error(
                "parallel execution needs at least one worker",
                "max_workers",
            ));
        }

        if self.datasets.is_empty() {
            return Err(config_error("no datasets configured", "datasets"));
        }

        // Output files and extraction directories share `datasets_dir`; names are
        // compared case-insensitively
        let mut claimed: HashSet<String> = HashSet::new();
        for dataset in &self.datasets {
            let file_name = dataset.resolved_file_name()?;
            let extract_dir = strip_archive_suffix(Path::new(&file_name))
                .map(|dir| dir.to_string_lossy().into_owned());

            let mut names = vec![file_name.clone()];
            names.extend(extract_dir);
            for name in names {
                if !claimed.insert(name.to_lowercase()) {
                    return Err(config_error(
                        format!(
                            "dataset '{}' writes to '{}', which another dataset already uses",
                            dataset.name, name
                        ),
                        "datasets",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Build one download job per configured dataset
    pub fn jobs(&self) -> Result<Vec<DownloadJob>> {
        self.datasets
            .iter()
            .map(|dataset| {
                let output_path = self.datasets_dir.join(dataset.resolved_file_name()?);
                Ok(DownloadJob {
                    name: dataset.name.clone(),
                    url: dataset.url.clone(),
                    output_path,
                    truncate_existing: self.download.truncate_existing,
                    cleanup_archive: self.download.cleanup_archives,
                    chunk_size_bytes: self.download.chunk_size_bytes,
                })
            })
            .collect()
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

fn default_datasets_dir() -> PathBuf {
    PathBuf::from("artifacts/datasets")
}

fn default_datasets() -> Vec<DatasetSource> {
    vec![
        DatasetSource::new("yelp_json", YELP_DATASET_JSON_URL, "yelp_json.zip"),
        DatasetSource::new("yelp_photos", YELP_DATASET_PHOTOS_URL, "yelp_photos.zip"),
    ]
}

fn default_chunk_size() -> usize {
    10 * 1024 * 1024
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; YelpSparkProject/1.0)".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_max_recursion() -> u32 {
    16
}
