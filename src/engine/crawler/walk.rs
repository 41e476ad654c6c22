//! Directory walk and include/exclude eligibility (§4.6 "Include/exclude
//! matching"). Include patterns are file-name globs; exclude patterns are
//! path globs relative to the root they were configured under.

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{EngineError, EngineResult};

pub struct Eligibility {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Eligibility {
    pub fn compile(include_patterns: &[String], exclude_patterns: &[String]) -> EngineResult<Self> {
        let compile_all = |patterns: &[String]| -> EngineResult<Vec<Pattern>> {
            patterns
                .iter()
                .map(|p| Pattern::new(p).map_err(|e| EngineError::invalid_argument(format!("bad glob {p}: {e}"))))
                .collect()
        };
        Ok(Eligibility { include: compile_all(include_patterns)?, exclude: compile_all(exclude_patterns)? })
    }

    /// A path is eligible iff some include pattern matches its file name and
    /// no exclude pattern matches its path relative to `root`.
    pub fn is_eligible(&self, root: &Path, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { return false };
        if !self.include.iter().any(|p| p.matches(name)) {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_str = relative.to_string_lossy();
        !self.exclude.iter().any(|p| p.matches(&relative_str))
    }
}

/// Walks `root`, returning every regular file the eligibility rules accept.
/// Blocking (directory traversal + `stat` per entry); callers run it inside
/// `spawn_blocking`.
pub fn walk_root(root: &Path, eligibility: &Eligibility) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| eligibility.is_eligible(root, path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_node_modules_by_path() {
        let eligibility =
            Eligibility::compile(&["*".to_string()], &["**/node_modules/**".to_string()]).unwrap();
        let root = Path::new("/repo");
        assert!(!eligibility.is_eligible(root, Path::new("/repo/node_modules/pkg/index.js")));
        assert!(eligibility.is_eligible(root, Path::new("/repo/src/lib.rs")));
    }

    #[test]
    fn include_pattern_matches_file_name_not_full_path() {
        let eligibility = Eligibility::compile(&["*.pdf".to_string()], &[]).unwrap();
        let root = Path::new("/docs");
        assert!(eligibility.is_eligible(root, Path::new("/docs/reports/q1.pdf")));
        assert!(!eligibility.is_eligible(root, Path::new("/docs/reports/q1.docx")));
    }
}
