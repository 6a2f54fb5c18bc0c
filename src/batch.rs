//! Batch analysis of a directory of recordings.
//!
//! Recordings are independent, so a fixed pool of worker threads pulls paths
//! from a bounded queue and sends one entry per recording back. Clearing the
//! run flag (Ctrl+C in the CLI) stops dispatch; recordings already handed to
//! a worker still finish.

use crate::core::report::ReportBuilder;
use crate::core::session::SessionAnalyzer;
use crate::ingest::load_recording;
use crossbeam_channel::{bounded, unbounded, RecvTimeoutError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Outcome for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub input: PathBuf,
    /// Written report, when the recording was analysed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremor_risk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    fn failed(input: &Path, error: impl std::fmt::Display) -> Self {
        Self {
            input: input.to_path_buf(),
            report: None,
            predicted: None,
            tremor_risk: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole batch, entries sorted by input path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
    pub succeeded: usize,
    pub failed: usize,
    /// Inputs never dispatched because the run was stopped
    pub skipped: usize,
}

/// Recordings (`.json` and `.csv`) directly inside `dir`, sorted by path.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let recognized = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && recognized {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Analyses many recordings on a pool of worker threads.
pub struct BatchRunner {
    analyzer: SessionAnalyzer,
    export_path: PathBuf,
    workers: usize,
    instance_id: Uuid,
    running: Arc<AtomicBool>,
}

impl BatchRunner {
    /// Write reports under `export_path`, one worker per available core.
    pub fn new(analyzer: SessionAnalyzer, export_path: PathBuf) -> Self {
        let workers = thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            analyzer,
            export_path,
            workers,
            instance_id: Uuid::new_v4(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Flag checked before each dispatch; store `false` to stop the run.
    pub fn run_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Analyse every input and wait for all dispatched work to finish.
    pub fn run(&self, inputs: Vec<PathBuf>) -> BatchSummary {
        let total = inputs.len();
        let (job_tx, job_rx) = bounded::<PathBuf>(self.workers);
        let (entry_tx, entry_rx) = unbounded::<BatchEntry>();

        tracing::info!(inputs = total, workers = self.workers, "Starting batch");

        let mut entries = Vec::with_capacity(total);
        let mut dispatched = 0usize;
        thread::scope(|scope| {
            for worker in 0..self.workers {
                let job_rx = job_rx.clone();
                let entry_tx = entry_tx.clone();
                scope.spawn(move || {
                    for input in job_rx.iter() {
                        let entry = self.process(&input);
                        tracing::debug!(worker, input = %input.display(), ok = entry.is_ok(), "Recording done");
                        if entry_tx.send(entry).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(entry_tx);

            for input in inputs {
                if !self.running.load(Ordering::SeqCst) {
                    tracing::warn!(remaining = total - dispatched, "Batch interrupted");
                    break;
                }
                if job_tx.send(input).is_err() {
                    break;
                }
                dispatched += 1;
            }
            drop(job_tx);

            loop {
                match entry_rx.recv_timeout(Duration::from_secs(1)) {
                    Ok(entry) => entries.push(entry),
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::debug!(done = entries.len(), dispatched, "Waiting for workers");
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        entries.sort_by(|a, b| a.input.cmp(&b.input));
        let succeeded = entries.iter().filter(|e| e.is_ok()).count();
        let summary = BatchSummary {
            failed: entries.len() - succeeded,
            succeeded,
            skipped: total - dispatched,
            entries,
        };
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Batch finished"
        );
        summary
    }

    /// Analyse one recording and write its report.
    fn process(&self, input: &Path) -> BatchEntry {
        let table = match load_recording(input) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "Could not read recording");
                return BatchEntry::failed(input, e);
            }
        };

        let analysis = match self.analyzer.analyze(&table, None) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "Analysis failed");
                return BatchEntry::failed(input, e);
            }
        };

        let predicted = analysis.gesture.as_ref().and_then(|g| g.predicted.clone());
        let tremor_risk = analysis.tremor.as_ref().map(|t| t.tremor_risk);
        let report = ReportBuilder::new()
            .with_instance_id(self.instance_id)
            .with_analysis(analysis)
            .with_meta("input", input.display().to_string())
            .build(&table);

        let file_name = input
            .file_name()
            .map(|n| format!("{}.report.json", n.to_string_lossy()))
            .unwrap_or_else(|| report.file_name());
        let path = self.export_path.join(file_name);
        if let Err(e) = report.write_to(&path) {
            tracing::warn!(path = %path.display(), error = %e, "Could not write report");
            return BatchEntry::failed(input, e);
        }

        BatchEntry {
            input: input.to_path_buf(),
            report: Some(path),
            predicted,
            tremor_risk,
            error: None,
        }
    }
}
