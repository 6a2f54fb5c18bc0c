//! Processing counters.
//!
//! Tracks how much data went through each stage and how much of it was
//! discarded, so that absent results can be told apart from empty input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters shared by the pipeline stages.
#[derive(Debug)]
pub struct ProcessingStats {
    /// Recordings that went through any analysis
    sessions_processed: AtomicU64,
    /// Windows produced by segmentation
    windows_produced: AtomicU64,
    /// Windows that produced no feature vector
    windows_discarded: AtomicU64,
    /// Feature rows handed to the classifier
    windows_classified: AtomicU64,
    /// Heart-rate intervals with an estimate
    seconds_estimated: AtomicU64,
    /// Heart-rate intervals without one
    seconds_absent: AtomicU64,
    /// Positional traces screened for tremor
    tremor_screens: AtomicU64,
    started_at: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            sessions_processed: AtomicU64::new(0),
            windows_produced: AtomicU64::new(0),
            windows_discarded: AtomicU64::new(0),
            windows_classified: AtomicU64::new(0),
            seconds_estimated: AtomicU64::new(0),
            seconds_absent: AtomicU64::new(0),
            tremor_screens: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters that continue from, and save back to, a file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!(error = %e, "Could not load previous processing stats");
        }

        stats
    }

    pub fn record_session(&self) {
        self.sessions_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of segmenting and extracting one session.
    pub fn record_windows(&self, produced: u64, discarded: u64) {
        self.windows_produced.fetch_add(produced, Ordering::Relaxed);
        self.windows_discarded.fetch_add(discarded, Ordering::Relaxed);
    }

    pub fn record_classified(&self, count: u64) {
        self.windows_classified.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_seconds(&self, estimated: u64, absent: u64) {
        self.seconds_estimated.fetch_add(estimated, Ordering::Relaxed);
        self.seconds_absent.fetch_add(absent, Ordering::Relaxed);
    }

    pub fn record_tremor_screen(&self) {
        self.tremor_screens.fetch_add(1, Ordering::Relaxed);
    }

    /// Current values of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sessions_processed: self.sessions_processed.load(Ordering::Relaxed),
            windows_produced: self.windows_produced.load(Ordering::Relaxed),
            windows_discarded: self.windows_discarded.load(Ordering::Relaxed),
            windows_classified: self.windows_classified.load(Ordering::Relaxed),
            seconds_estimated: self.seconds_estimated.load(Ordering::Relaxed),
            seconds_absent: self.seconds_absent.load(Ordering::Relaxed),
            tremor_screens: self.tremor_screens.load(Ordering::Relaxed),
            started_at: self.started_at,
        }
    }

    /// Human-readable summary for the terminal.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Processing Statistics:\n\
             - Sessions processed: {}\n\
             - Windows produced: {}\n\
             - Windows discarded: {}\n\
             - Windows classified: {}\n\
             - Heart-rate seconds estimated: {}\n\
             - Heart-rate seconds absent: {}\n\
             - Tremor screens: {}",
            stats.sessions_processed,
            stats.windows_produced,
            stats.windows_discarded,
            stats.windows_classified,
            stats.seconds_estimated,
            stats.seconds_absent,
            stats.tremor_screens,
        )
    }

    /// Write counters to the persistence file, if one is set.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let persisted = PersistedStats {
                counters: self.snapshot(),
                last_updated: Utc::now(),
            };
            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;
                let c = persisted.counters;

                self.sessions_processed.store(c.sessions_processed, Ordering::Relaxed);
                self.windows_produced.store(c.windows_produced, Ordering::Relaxed);
                self.windows_discarded.store(c.windows_discarded, Ordering::Relaxed);
                self.windows_classified.store(c.windows_classified, Ordering::Relaxed);
                self.seconds_estimated.store(c.seconds_estimated, Ordering::Relaxed);
                self.seconds_absent.store(c.seconds_absent, Ordering::Relaxed);
                self.tremor_screens.store(c.tremor_screens, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.sessions_processed.store(0, Ordering::Relaxed);
        self.windows_produced.store(0, Ordering::Relaxed);
        self.windows_discarded.store(0, Ordering::Relaxed);
        self.windows_classified.store(0, Ordering::Relaxed);
        self.seconds_estimated.store(0, Ordering::Relaxed);
        self.seconds_absent.store(0, Ordering::Relaxed);
        self.tremor_screens.store(0, Ordering::Relaxed);
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub sessions_processed: u64,
    pub windows_produced: u64,
    pub windows_discarded: u64,
    pub windows_classified: u64,
    pub seconds_estimated: u64,
    pub seconds_absent: u64,
    pub tremor_screens: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    counters: StatsSnapshot,
    last_updated: DateTime<Utc>,
}

/// Counters shared between threads.
pub type SharedStats = Arc<ProcessingStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(ProcessingStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = ProcessingStats::new();
        stats.record_session();
        stats.record_windows(10, 3);
        stats.record_windows(5, 0);
        stats.record_classified(12);
        stats.record_seconds(4, 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sessions_processed, 1);
        assert_eq!(snapshot.windows_produced, 15);
        assert_eq!(snapshot.windows_discarded, 3);
        assert_eq!(snapshot.windows_classified, 12);
        assert_eq!(snapshot.seconds_estimated, 4);
        assert_eq!(snapshot.seconds_absent, 1);
    }

    #[test]
    fn test_reset() {
        let stats = ProcessingStats::new();
        stats.record_windows(100, 50);
        stats.record_tremor_screen();
        stats.reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.windows_produced, 0);
        assert_eq!(snapshot.tremor_screens, 0);
    }

    #[test]
    fn test_summary_format() {
        let summary = ProcessingStats::new().summary();
        assert!(summary.contains("Windows discarded"));
        assert!(summary.contains("Heart-rate seconds absent"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir().join(format!("motion-sense-stats-{}.json", uuid::Uuid::new_v4()));

        let stats = ProcessingStats::with_persistence(path.clone());
        stats.record_session();
        stats.record_seconds(7, 2);
        stats.save().unwrap();

        let reloaded = ProcessingStats::with_persistence(path.clone());
        assert_eq!(reloaded.snapshot().sessions_processed, 1);
        assert_eq!(reloaded.snapshot().seconds_estimated, 7);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_shared_stats_across_threads() {
        let stats = create_shared_stats();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || stats.record_session())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().sessions_processed, 4);
    }
}
