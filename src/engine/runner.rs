//! Batch runner: a bounded worker pool over a queue of titles.
//!
//! Titles are independent, so workers pull from a shared queue and emit
//! results as they finish; completion order is unspecified and the runner
//! reassembles input order from caller-assigned sequence numbers before
//! returning. Per-title work is pure CPU, so workers run on the blocking
//! pool.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{PipelineResult, PipelineStatus};

use super::pipeline::TitlePipeline;

pub struct BatchRunner {
    pipeline: Arc<TitlePipeline>,
    workers: usize,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<TitlePipeline>, workers: usize) -> Self {
        BatchRunner {
            pipeline,
            workers: workers.max(1),
        }
    }

    /// Process a batch, returning results in input order plus a summary.
    pub async fn run(&self, titles: Vec<String>) -> (Vec<PipelineResult>, BatchReport) {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let total = titles.len();
        info!(%run_id, titles = total, workers = self.workers, "Batch run starting");

        let queue: Arc<Mutex<VecDeque<(usize, String)>>> =
            Arc::new(Mutex::new(titles.into_iter().enumerate().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, PipelineResult)>();

        let mut handles = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            let queue = queue.clone();
            let tx = tx.clone();
            let pipeline = self.pipeline.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let mut processed = 0usize;
                loop {
                    let next = queue.lock().expect("title queue poisoned").pop_front();
                    let Some((seq, title)) = next else { break };
                    let result = pipeline.process(&title);
                    processed += 1;
                    if tx.send((seq, result)).is_err() {
                        break;
                    }
                }
                debug!(worker, processed, "Worker drained");
            }));
        }
        drop(tx);

        let mut sequenced: Vec<(usize, PipelineResult)> = Vec::with_capacity(total);
        while let Some(pair) = rx.recv().await {
            sequenced.push(pair);
        }
        for join in futures::future::join_all(handles).await {
            if let Err(e) = join {
                warn!(error = %e, "Worker task failed");
            }
        }

        sequenced.sort_by_key(|(seq, _)| *seq);
        let results: Vec<PipelineResult> = sequenced.into_iter().map(|(_, r)| r).collect();

        let report = BatchReport::from_results(&results, started.elapsed());
        info!(%run_id, %report, "Batch run complete");
        (results, report)
    }
}

// ---------------------------------------------------------------------------
// Batch report
// ---------------------------------------------------------------------------

/// Summary of a single batch run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub ok: usize,
    pub timeouts: usize,
    pub invalid: usize,
    pub dates_found: usize,
    pub report_types_found: usize,
    pub titles_with_regions: usize,
    pub elapsed_ms: u128,
}

impl BatchReport {
    pub fn from_results(results: &[PipelineResult], elapsed: Duration) -> Self {
        BatchReport {
            processed: results.len(),
            ok: results.iter().filter(|r| r.is_ok()).count(),
            timeouts: results
                .iter()
                .filter(|r| r.status == PipelineStatus::Timeout)
                .count(),
            invalid: results
                .iter()
                .filter(|r| r.status == PipelineStatus::InvalidInput)
                .count(),
            dates_found: results
                .iter()
                .filter(|r| r.extracted_date_range.is_some())
                .count(),
            report_types_found: results
                .iter()
                .filter(|r| r.extracted_report_type.is_some())
                .count(),
            titles_with_regions: results
                .iter()
                .filter(|r| !r.extracted_regions.is_empty())
                .count(),
            elapsed_ms: elapsed.as_millis(),
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} ok={} timeouts={} invalid={} dates={} types={} regions={} elapsed={}ms",
            self.processed,
            self.ok,
            self.timeouts,
            self.invalid,
            self.dates_found,
            self.report_types_found,
            self.titles_with_regions,
            self.elapsed_ms,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pipeline::DEFAULT_TITLE_BUDGET;
    use crate::patterns::{seed, PatternLibrary};

    fn runner(workers: usize) -> BatchRunner {
        let library = PatternLibrary::from_records(seed::builtin_patterns()).unwrap();
        let pipeline = TitlePipeline::new(Arc::new(library), DEFAULT_TITLE_BUDGET);
        BatchRunner::new(Arc::new(pipeline), workers)
    }

    #[tokio::test]
    async fn test_results_come_back_in_input_order() {
        let titles: Vec<String> = (0..40)
            .map(|i| format!("Topic {i} Widgets Market Report, 2030"))
            .collect();
        let (results, report) = runner(4).run(titles.clone()).await;

        assert_eq!(results.len(), 40);
        assert_eq!(report.processed, 40);
        assert_eq!(report.ok, 40);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.original_title, titles[i]);
        }
    }

    #[tokio::test]
    async fn test_report_counts() {
        let titles = vec![
            "Europe Widgets Market Report, 2030".to_string(),
            "Dateless Gadgets Market Analysis".to_string(),
            "\u{0007}".to_string(),
        ];
        let (results, report) = runner(2).run(titles).await;

        assert_eq!(report.processed, 3);
        assert_eq!(report.ok, 2);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.dates_found, 1);
        assert_eq!(report.report_types_found, 2);
        assert_eq!(report.titles_with_regions, 1);
        assert_eq!(results[2].status, PipelineStatus::InvalidInput);
    }

    #[tokio::test]
    async fn test_single_worker_floor() {
        let (results, _) = runner(0).run(vec!["Graphene Market".to_string()]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].topic, "Graphene");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (results, report) = runner(2).run(Vec::new()).await;
        assert!(results.is_empty());
        assert_eq!(report.processed, 0);
    }

    #[test]
    fn test_report_display() {
        let report = BatchReport::from_results(&[], Duration::from_millis(5));
        let display = format!("{report}");
        assert!(display.contains("processed=0"));
        assert!(display.contains("elapsed=5ms"));
    }
}
