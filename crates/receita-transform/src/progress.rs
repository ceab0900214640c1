//! Byte-level progress reporting shared by every reader of a phase

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const BYTES_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})";

/// Progress of one phase, cheap to clone into reader tasks
///
/// Bytes read and bytes expected are tracked independently, so files opened
/// in parallel can each add their size to the total and advance the same bar.
#[derive(Clone)]
pub struct Progress {
    bar: ProgressBar,
    read: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl Progress {
    /// Visible progress bar with the given message
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template(BYTES_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(message.to_string());
        Self::with_bar(bar)
    }

    /// Progress tracking without any terminal output
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    /// Visible or hidden depending on `show`
    pub fn for_phase(message: &str, show: bool) -> Self {
        if show {
            Self::new(message)
        } else {
            Self::hidden()
        }
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            read: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn add_total(&self, bytes: u64) {
        self.total.fetch_add(bytes, Ordering::Relaxed);
        self.bar.inc_length(bytes);
    }

    pub fn advance(&self, bytes: u64) {
        self.read.fetch_add(bytes, Ordering::Relaxed);
        self.bar.inc(bytes);
    }

    pub fn read_bytes(&self) -> u64 {
        self.read.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

/// Reader adapter that reports every byte it yields to a [`Progress`]
pub struct CountingReader<R> {
    inner: R,
    progress: Progress,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R, progress: Progress) -> Self {
        Self { inner, progress }
    }
}

impl<R: std::io::Read> std::io::Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.progress.advance(n as u64);
        Ok(n)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_totals_and_reads_are_independent() {
        let progress = Progress::hidden();
        progress.add_total(100);
        progress.add_total(50);
        progress.advance(30);
        assert_eq!(progress.total_bytes(), 150);
        assert_eq!(progress.read_bytes(), 30);
    }

    #[test]
    fn test_counting_reader_reports_bytes() {
        let progress = Progress::hidden();
        let mut reader = CountingReader::new(&b"hello world"[..], progress.clone());
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
        assert_eq!(progress.read_bytes(), 11);
    }

    #[test]
    fn test_clones_share_counters() {
        let progress = Progress::hidden();
        let other = progress.clone();
        other.advance(7);
        assert_eq!(progress.read_bytes(), 7);
    }
}
