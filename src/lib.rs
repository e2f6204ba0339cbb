//! # dataset-dl
//!
//! Fetches remote dataset archives, unpacks them, and resolves archives nested
//! inside them until the extracted tree holds no archive left.
//!
//! ## Design Philosophy
//!
//! dataset-dl is designed to be:
//! - **Idempotent** - A job whose output is already on disk performs no network call
//! - **Memory-bounded** - Downloads are streamed to disk in fixed-size chunks
//! - **Sensible defaults** - `Config::default()` fetches the Yelp open dataset exports
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use dataset_dl::{Config, DatasetDownloader, JobRunner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let downloader = Arc::new(DatasetDownloader::new(&config)?);
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let runner = JobRunner::new(downloader, &config.execution);
//!     let summary = runner.run(config.jobs()?).await;
//!     if let Some((job, error)) = summary.first_error() {
//!         eprintln!("{} failed: {}", job, error);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Dataset download pipeline and job runner
pub mod downloader;
/// Error types
pub mod error;
/// Archive detection and extraction
pub mod extraction;
/// HTTP transport
pub mod fetch;
/// Terminal progress bars and log writer
pub mod progress;
/// Core types
pub mod types;
/// Path and URL helpers
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DatasetSource, ExecutionStrategy};
pub use downloader::{DatasetDownloader, JobReport, JobRunner, RunSummary};
pub use error::{DownloadError, Error, ExtractionError, Result};
pub use extraction::{is_archive, recursive_unpack, unpack};
pub use fetch::{Fetcher, HttpFetcher};
pub use progress::{IndicatifWriter, ProgressDisplay};
pub use types::{ArchiveType, DownloadJob, Event, JobOutcome};
