//! Crawler (C6) and reconciliation (C7): walks configured roots, diffs
//! against the index, and drives batched indexer work on a worker pool.
//! Extraction is CPU/IO-bound and parallelized with `rayon` the way
//! `socket23-sidecar`'s directory walker parallelizes file reads; the writer
//! itself stays serialized behind [`crate::index::IndexService`].

pub mod reconcile;
pub mod walk;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::Config;
use crate::error::EngineResult;
use crate::extractor::ContentExtractor;
use crate::index::IndexService;

use reconcile::{DiffEntry, DiffOp};
use walk::Eligibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerStatus {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReconciliationSummary {
    pub added: u64,
    pub updated: u64,
    pub deleted: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressEvent {
    pub files_processed: u64,
    pub total_discovered: u64,
    pub elapsed_ms: u64,
}

const STATUS_IDLE: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_PAUSED: u8 = 2;

pub struct Crawler {
    index: Arc<IndexService>,
    extractor: Arc<dyn ContentExtractor>,
    directories: Vec<PathBuf>,
    eligibility: Arc<Eligibility>,
    pool: Arc<rayon::ThreadPool>,
    batch_size: usize,
    batch_timeout: Duration,
    progress_files: u64,
    progress_interval: Duration,
    status: AtomicU8,
    pause_requested: AtomicBool,
    progress_tx: Option<UnboundedSender<ProgressEvent>>,
}

impl Crawler {
    pub fn new(
        config: &Config,
        index: Arc<IndexService>,
        extractor: Arc<dyn ContentExtractor>,
        progress_tx: Option<UnboundedSender<ProgressEvent>>,
    ) -> EngineResult<Self> {
        let crawler_config = &config.lucene.crawler;
        let eligibility =
            Eligibility::compile(&crawler_config.include_patterns, &crawler_config.exclude_patterns)?;
        let thread_pool_size = crawler_config.thread_pool_size.unwrap_or(4).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_pool_size)
            .build()
            .map_err(|e| crate::error::EngineError::index_unavailable(format!("crawler pool: {e}")))?;

        Ok(Crawler {
            index,
            extractor,
            directories: crawler_config.directories.clone(),
            eligibility: Arc::new(eligibility),
            pool: Arc::new(pool),
            batch_size: crawler_config.batch_size.unwrap_or(100),
            batch_timeout: Duration::from_millis(crawler_config.batch_timeout_ms.unwrap_or(5000)),
            progress_files: crawler_config.progress_notification_files.unwrap_or(100),
            progress_interval: Duration::from_millis(
                crawler_config.progress_notification_interval_ms.unwrap_or(30_000),
            ),
            status: AtomicU8::new(STATUS_IDLE),
            pause_requested: AtomicBool::new(false),
            progress_tx,
        })
    }

    pub fn pause(&self) {
        self.pause_requested.store(true, Ordering::Release);
        self.status.store(STATUS_PAUSED, Ordering::Release);
    }

    pub fn resume(&self) {
        self.pause_requested.store(false, Ordering::Release);
    }

    pub fn status(&self) -> CrawlerStatus {
        match self.status.load(Ordering::Acquire) {
            STATUS_RUNNING => CrawlerStatus::Running,
            STATUS_PAUSED => CrawlerStatus::Paused,
            _ => CrawlerStatus::Idle,
        }
    }

    fn is_paused(&self) -> bool {
        self.pause_requested.load(Ordering::Acquire)
    }

    /// Walks every configured root, diffs against the current snapshot, and
    /// drives the resulting ADD/UPDATE/DELETE work through the indexer in
    /// batches (§4.6). Cooperative: stops picking up new batches once
    /// [`Crawler::pause`] is called, letting in-flight extraction finish.
    pub async fn run_reconciliation(&self) -> EngineResult<ReconciliationSummary> {
        self.status.store(STATUS_RUNNING, Ordering::Release);
        let started = Instant::now();

        let directories = self.directories.clone();
        let eligibility = self.eligibility.clone();
        let discovered = tokio::task::spawn_blocking(move || {
            let mut all = Vec::new();
            for root in &directories {
                all.extend(walk::walk_root(root, &eligibility));
            }
            all
        })
        .await
        .map_err(|e| crate::error::EngineError::index_unavailable(format!("walk join error: {e}")))?;

        let snapshot = self.index.snapshot().await;
        let diff = reconcile::compute_diff(&discovered, &snapshot);

        let mut summary = ReconciliationSummary::default();
        summary.skipped = diff.iter().filter(|e| e.op == DiffOp::Skip).count() as u64;
        let work: Vec<DiffEntry> = diff.into_iter().filter(|e| e.op != DiffOp::Skip).collect();

        let mut processed = 0u64;
        let mut last_progress = Instant::now();
        for chunk in work.chunks(self.batch_size) {
            if self.is_paused() {
                break;
            }
            self.process_batch(chunk, &mut summary).await?;
            self.index.commit().await?;
            processed += chunk.len() as u64;

            if processed % self.progress_files == 0 || last_progress.elapsed() >= self.progress_interval {
                last_progress = Instant::now();
                if let Some(tx) = &self.progress_tx {
                    let _ = tx.send(ProgressEvent {
                        files_processed: processed,
                        total_discovered: work.len() as u64,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
        }

        self.status.store(STATUS_IDLE, Ordering::Release);
        Ok(summary)
    }

    /// Extracts every entry in `chunk` on the rayon pool (parallel, blocking
    /// I/O) then applies the resulting writer operations sequentially — the
    /// writer is already serialized, so there is nothing to gain from
    /// parallelizing that half.
    async fn process_batch(&self, chunk: &[DiffEntry], summary: &mut ReconciliationSummary) -> EngineResult<()> {
        let extractor = self.extractor.clone();
        let to_extract: Vec<DiffEntry> =
            chunk.iter().filter(|e| e.op == DiffOp::Add || e.op == DiffOp::Update).cloned().collect();
        let pool = self.pool.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            pool.install(|| {
                to_extract
                    .into_par_iter()
                    .filter_map(|entry| {
                        let stat = entry.stat?;
                        let doc = extractor.extract(&entry.path).ok()?;
                        Some((entry, stat, doc))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await
        .map_err(|e| crate::error::EngineError::index_unavailable(format!("extraction join error: {e}")))?;

        for (entry, stat, doc) in extracted {
            self.index.index_document(&entry.path, stat, &doc).await?;
            match entry.op {
                DiffOp::Add => summary.added += 1,
                DiffOp::Update => summary.updated += 1,
                _ => {}
            }
        }

        for entry in chunk.iter().filter(|e| e.op == DiffOp::Delete) {
            let path = entry.path.to_string_lossy().into_owned();
            if self.index.delete_document(&path).await? {
                summary.deleted += 1;
            }
        }

        Ok(())
    }
}
