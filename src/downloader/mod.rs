//! Dataset download pipeline split into focused submodules.
//!
//! - [`dataset`] - One job: truncate, idempotency check, fetch, unpack
//! - [`runner`] - Sequential and bounded-parallel dispatch of many jobs

mod dataset;
mod runner;


pub use runner::{JobReport, JobRunner, RunSummary};

use crate::config::{Config, ExtractionConfig};
use crate::error::Result;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all shared state is Arc-wrapped)
///
/// Holds only immutable state, so one instance is shared by every job of a
/// parallel run.
#[derive(Clone)]
pub struct DatasetDownloader {
    /// Transport used to stream URLs to disk (trait object for pluggable implementations)
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Maximum archive nesting depth resolved after the top-level unpack
    pub(crate) max_recursion_depth: u32,
}

impl DatasetDownloader {
    /// Create a downloader with an HTTP fetcher built from `config`
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.download)?);
        Ok(Self::with_fetcher(fetcher, &config.extraction))
    }

    /// Create a downloader around any [`Fetcher`] implementation
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, extraction: &ExtractionConfig) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            fetcher,
            event_tx,
            max_recursion_depth: extraction.max_recursion_depth,
        }
    }

    /// Publish events on an existing channel instead of a private one
    ///
    /// Lets several downloaders feed one observer.
    pub fn with_event_sender(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = event_tx;
        self
    }

    /// Subscribe to job events
    ///
    /// Events published before the call are not replayed. A subscriber that falls
    /// more than the channel capacity behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
