//! Terminal progress for dataset jobs
//!
//! [`ProgressDisplay`] turns the downloader's [`Event`] stream into one progress bar
//! per job, all hosted by a single [`MultiProgress`] so concurrent jobs never draw
//! over each other. [`IndicatifWriter`] routes log output through the same
//! `MultiProgress` so log lines do not tear the bars.

use crate::types::{DownloadJob, Event};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing_subscriber::fmt::MakeWriter;

const PROGRESS_CHARS: &str = "━━╾─";
const SPINNER_TICK: Duration = Duration::from_millis(100);

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS)
}

/// Bar waiting for its job to start
fn pending_style() -> ProgressStyle {
    style("  {prefix:20!} {wide_msg:.dim}")
}

/// Bar of a download with a known size
fn bytes_style() -> ProgressStyle {
    style(
        "  {spinner:.dim} {prefix:20!} [{elapsed_precise}] [{bar:20!.bright.yellow/dim.white}] {bytes:>10}/{total_bytes:10} @ {bytes_per_sec:>12}",
    )
}

/// Bar of a download whose server sent no Content-Length
fn unknown_length_style() -> ProgressStyle {
    style("  {spinner:.dim} {prefix:20!} [{elapsed_precise}] {bytes:>10} @ {bytes_per_sec:>12}")
}

/// Spinner shown while archives are unpacked
fn extracting_style() -> ProgressStyle {
    style("  {spinner:.green} {prefix:20!} [{elapsed_precise}] {wide_msg}")
}

fn finished_style() -> ProgressStyle {
    style("  ✔ {prefix:20!} [{elapsed_precise}] {msg:.bold}")
}

fn errored_style() -> ProgressStyle {
    style("  ✗ {prefix:20!} [{elapsed_precise}] {msg:.bold.red}")
}

/// One progress bar per job, driven by downloader events
pub struct ProgressDisplay {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl ProgressDisplay {
    /// Create a display with one bar per job, in job order
    ///
    /// Bars are created up front so every job keeps a fixed line no matter which
    /// one starts first.
    pub fn new(multi: MultiProgress, jobs: &[DownloadJob]) -> Self {
        let mut bars = HashMap::with_capacity(jobs.len());
        for job in jobs {
            let bar = multi.add(ProgressBar::new(0));
            bar.set_style(pending_style());
            bar.set_prefix(job.name.clone());
            bar.set_message("waiting");
            bars.insert(job.name.clone(), bar);
        }
        Self { multi, bars }
    }

    /// The bar of a job, if the job is known to this display
    pub fn bar(&self, job: &str) -> Option<&ProgressBar> {
        self.bars.get(job)
    }

    /// Bar for `job`, adding one at the bottom for jobs not announced up front
    fn bar_for(&mut self, job: &str) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(job.to_string()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(0));
            bar.set_prefix(job.to_string());
            bar
        })
    }

    /// Apply one event to the matching bar
    pub fn handle_event(&mut self, event: &Event) {
        let bar = self.bar_for(event.job()).clone();

        match event {
            Event::Started { .. } => {
                bar.set_style(unknown_length_style());
                bar.set_position(0);
                bar.set_message("");
                bar.reset_elapsed();
            }
            Event::Downloading {
                downloaded, total, ..
            } => {
                if let Some(total) = total
                    && bar.length() != Some(*total)
                {
                    bar.set_length(*total);
                    bar.set_style(bytes_style());
                }
                bar.set_position(*downloaded);
            }
            Event::Downloaded { size, .. } => {
                bar.set_length(*size);
                bar.set_position(*size);
            }
            Event::Extracting { archive, .. } => {
                bar.set_style(extracting_style());
                bar.set_message(format!("extracting {}", archive.display()));
                bar.enable_steady_tick(SPINNER_TICK);
            }
            Event::Extracted { nested, .. } => {
                bar.set_message(format!("extracted ({} nested)", nested));
            }
            Event::Complete { path, .. } => {
                bar.set_style(finished_style());
                bar.finish_with_message(format!("done: {}", path.display()));
            }
            Event::Skipped { path, .. } => {
                bar.set_style(finished_style());
                bar.finish_with_message(format!("already present: {}", path.display()));
            }
            Event::Failed { error, .. } => {
                bar.set_style(errored_style());
                bar.abandon_with_message(error.clone());
            }
        }
    }

    /// Drive the display from an event subscription until every sender is dropped
    pub fn spawn(mut self, mut events: broadcast::Receiver<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "progress display fell behind, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Log writer that suspends the progress bars while a line is written
#[derive(Clone)]
pub struct IndicatifWriter {
    progress_bars: MultiProgress,
}

impl IndicatifWriter {
    /// Write through `progress_bars`
    pub fn new(progress_bars: MultiProgress) -> Self {
        Self { progress_bars }
    }
}

impl io::Write for IndicatifWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.progress_bars.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.progress_bars.suspend(|| io::stderr().flush())
    }
}

impl<'a> MakeWriter<'a> for IndicatifWriter {
    type Writer = IndicatifWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
