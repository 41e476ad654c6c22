//! Filesystem watch processor (C8): subscribes to `notify` events, coalesces
//! them per path with last-wins precedence, and drains the buffer after a
//! quiet interval (§4.7). Falls back to a full reconciliation under
//! backpressure instead of draining a huge coalesced buffer one path at a
//! time.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::Config;
use crate::crawler::walk::Eligibility;
use crate::crawler::Crawler;
use crate::error::{EngineError, EngineResult};
use crate::extractor::ExtractedDocument;
use crate::index::doc::FileStat;
use crate::index::IndexService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Add,
    Modify,
    Delete,
}

/// Folds a new raw event kind into the path's pending kind per §4.7's
/// precedence: any `Delete` after `Add`/`Modify` wins; repeated `Modify`
/// collapses; `Add` then `Modify` stays `Add`.
fn fold(existing: Option<PendingKind>, incoming: PendingKind) -> PendingKind {
    match (existing, incoming) {
        (_, PendingKind::Delete) => PendingKind::Delete,
        (Some(PendingKind::Add), PendingKind::Modify) => PendingKind::Add,
        (Some(PendingKind::Delete), PendingKind::Add) => PendingKind::Add,
        (_, kind) => kind,
    }
}

fn classify(kind: &EventKind) -> Option<PendingKind> {
    match kind {
        EventKind::Create(_) => Some(PendingKind::Add),
        EventKind::Modify(_) => Some(PendingKind::Modify),
        EventKind::Remove(_) => Some(PendingKind::Delete),
        _ => None,
    }
}

pub struct WatchProcessor {
    index: Arc<IndexService>,
    extractor: Arc<dyn crate::extractor::ContentExtractor>,
    eligibility: Arc<Eligibility>,
    roots: Vec<PathBuf>,
    debounce: Duration,
    hard_cap: usize,
    reconcile_on_backpressure: Arc<Crawler>,
}

impl WatchProcessor {
    pub fn new(
        config: &Config,
        index: Arc<IndexService>,
        extractor: Arc<dyn crate::extractor::ContentExtractor>,
        reconcile_on_backpressure: Arc<Crawler>,
    ) -> EngineResult<Self> {
        let crawler_config = &config.lucene.crawler;
        let eligibility =
            Eligibility::compile(&crawler_config.include_patterns, &crawler_config.exclude_patterns)?;
        Ok(WatchProcessor {
            index,
            extractor,
            eligibility: Arc::new(eligibility),
            roots: crawler_config.directories.clone(),
            debounce: Duration::from_millis(crawler_config.watch_debounce_ms.unwrap_or(200)),
            hard_cap: crawler_config.watch_buffer_hard_cap.unwrap_or(50_000),
            reconcile_on_backpressure,
        })
    }

    /// Runs forever, forwarding raw `notify` events into the debounce buffer
    /// and draining it on each quiet interval. Spawned as its own task per
    /// watched root (§5 "one thread per watched root").
    pub async fn run(self: Arc<Self>) -> EngineResult<()> {
        let (raw_tx, mut raw_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = raw_tx.send(event);
            }
        })
        .map_err(|e| EngineError::index_unavailable(format!("watcher init: {e}")))?;

        for root in &self.roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| EngineError::index_unavailable(format!("watch {}: {e}", root.display())))?;
        }

        let mut pending: HashMap<PathBuf, PendingKind> = HashMap::new();
        loop {
            let first = match raw_rx.recv().await {
                Some(event) => event,
                None => return Ok(()),
            };
            self.fold_event(&mut pending, first);

            loop {
                match tokio::time::timeout(self.debounce, raw_rx.recv()).await {
                    Ok(Some(event)) => self.fold_event(&mut pending, event),
                    Ok(None) => return Ok(()),
                    Err(_elapsed) => break,
                }
            }

            if pending.len() > self.hard_cap {
                tracing::warn!(
                    target: "engine::watch",
                    buffered = pending.len(),
                    "watch buffer exceeded hard cap, scheduling full reconciliation instead of draining"
                );
                pending.clear();
                let crawler = self.reconcile_on_backpressure.clone();
                tokio::spawn(async move {
                    if let Err(e) = crawler.run_reconciliation().await {
                        tracing::error!(target: "engine::watch", error = %e, "backpressure reconciliation failed");
                    }
                });
                continue;
            }

            self.drain(std::mem::take(&mut pending)).await?;
        }
    }

    fn fold_event(&self, pending: &mut HashMap<PathBuf, PendingKind>, event: Event) {
        let Some(kind) = classify(&event.kind) else { return };
        for path in event.paths {
            let root = self.roots.iter().find(|r| path.starts_with(r));
            let Some(root) = root else { continue };
            if kind != PendingKind::Delete && !self.eligibility.is_eligible(root, &path) {
                continue;
            }
            let entry = pending.entry(path).or_insert(kind);
            *entry = fold(Some(*entry), kind);
        }
    }

    /// Eligibility is re-checked here, not at raw event receipt (§4.7), so a
    /// path that became ineligible between the event and the drain (e.g. an
    /// exclude rule change) is dropped without special-casing.
    async fn drain(&self, pending: HashMap<PathBuf, PendingKind>) -> EngineResult<()> {
        if pending.is_empty() {
            return Ok(());
        }
        let mut any_applied = false;
        for (path, kind) in pending {
            let Some(root) = self.roots.iter().find(|r| path.starts_with(r)) else { continue };
            match kind {
                PendingKind::Delete => {
                    let path_str = path.to_string_lossy().into_owned();
                    if self.index.delete_document(&path_str).await? {
                        any_applied = true;
                    }
                }
                PendingKind::Add | PendingKind::Modify => {
                    if !self.eligibility.is_eligible(root, &path) {
                        continue;
                    }
                    let Ok(meta) = std::fs::metadata(&path) else { continue };
                    let stat =
                        FileStat { created: meta.created().unwrap_or(std::time::SystemTime::now()), modified: meta.modified().unwrap_or(std::time::SystemTime::now()) };
                    let extracted: ExtractedDocument = match self.extractor.extract(&path) {
                        Ok(doc) => doc,
                        Err(e) => {
                            tracing::warn!(target: "engine::watch", path = %path.display(), error = %e, "extraction failed, skipping");
                            continue;
                        }
                    };
                    self.index.index_document(&path, stat, &extracted).await?;
                    any_applied = true;
                }
            }
        }
        if any_applied {
            self.index.commit().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_after_add_collapses_to_delete() {
        assert_eq!(fold(Some(PendingKind::Add), PendingKind::Delete), PendingKind::Delete);
    }

    #[test]
    fn repeated_modify_collapses_to_one_modify() {
        assert_eq!(fold(Some(PendingKind::Modify), PendingKind::Modify), PendingKind::Modify);
    }

    #[test]
    fn add_then_modify_stays_add() {
        assert_eq!(fold(Some(PendingKind::Add), PendingKind::Modify), PendingKind::Add);
    }

    #[test]
    fn delete_then_add_becomes_add() {
        assert_eq!(fold(Some(PendingKind::Delete), PendingKind::Add), PendingKind::Add);
    }
}
