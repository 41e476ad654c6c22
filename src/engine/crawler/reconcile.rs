//! 4-way diff between the filesystem and the index (C7): classifies every
//! discovered path as `ADD` / `UPDATE` / `SKIP`, and every indexed path with
//! no surviving file as `DELETE` (§4.6 "Startup reconciliation").

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::index::doc::FileStat;
use crate::index::store::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Add,
    Update,
    Delete,
    Skip,
}

#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub path: PathBuf,
    pub op: DiffOp,
    pub stat: Option<FileStat>,
}

fn epoch_millis(t: SystemTime) -> i64 {
    t.duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// `discovered` is every eligible path found on disk across all configured
/// roots this pass. `snapshot` is the index's current view.
pub fn compute_diff(discovered: &[PathBuf], snapshot: &Snapshot) -> Vec<DiffEntry> {
    let mut entries = Vec::with_capacity(discovered.len());
    let mut seen = std::collections::HashSet::with_capacity(discovered.len());

    for path in discovered {
        let path_str = path.to_string_lossy().into_owned();
        seen.insert(path_str.clone());
        let Ok(meta) = std::fs::metadata(path) else { continue };
        let stat = FileStat {
            created: meta.created().unwrap_or_else(|_| SystemTime::now()),
            modified: meta.modified().unwrap_or_else(|_| SystemTime::now()),
        };
        match snapshot.doc_by_path(&path_str) {
            None => entries.push(DiffEntry { path: path.clone(), op: DiffOp::Add, stat: Some(stat) }),
            Some((_, doc)) => {
                let changed =
                    doc.file_size != meta.len() || doc.modified_date != epoch_millis(stat.modified);
                let op = if changed { DiffOp::Update } else { DiffOp::Skip };
                entries.push(DiffEntry { path: path.clone(), op, stat: Some(stat) });
            }
        }
    }

    for path_str in snapshot.path_to_doc.keys() {
        if !seen.contains(path_str) {
            entries.push(DiffEntry { path: PathBuf::from(path_str), op: DiffOp::Delete, stat: None });
        }
    }

    entries
}

/// Narrows a discovery list to paths that still belong under one of the
/// configured roots (a root can be removed from config between runs).
pub fn under_any_root(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_reconciliation_of_unchanged_index_yields_only_skips() {
        let snapshot = Snapshot::default();
        let diff = compute_diff(&[], &snapshot);
        assert!(diff.iter().all(|e| e.op != DiffOp::Add));
    }
}
