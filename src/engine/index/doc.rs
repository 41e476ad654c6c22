//! Document indexer (C3): maps an extracted document plus its path to the
//! stored field set of §3.1, including the metadata fallback chains and the
//! content hash used for change detection.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use super::store::StoredDocument;
use crate::extractor::ExtractedDocument;

fn epoch_millis(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

fn first_non_empty<'a>(metadata: &'a std::collections::HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| metadata.get(*k))
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn file_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        // a dotfile's leading dot is not an extension separator (e.g. ".gitignore").
        let rest = &name[1..];
        if !rest.contains('.') {
            return None;
        }
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Minimal hex encoding so we don't pull in a dedicated crate for a single
/// call site; mirrors what `sha2` consumers typically hand-roll when they
/// only need lowercase hex of a digest.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// File-level metadata the reconciler already has at hand (size, mtime,
/// ctime) without re-reading the file; kept separate from `ExtractedDocument`
/// since the extractor doesn't own filesystem stat calls.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub created: SystemTime,
    pub modified: SystemTime,
}

pub fn build_stored_document(path: &Path, stat: FileStat, extracted: &ExtractedDocument) -> StoredDocument {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
    let title = first_non_empty(&extracted.metadata, &["dc:title", "title", "Title"]).map(str::to_string);
    let author =
        first_non_empty(&extracted.metadata, &["dc:creator", "meta:author", "Author", "author"]).map(str::to_string);
    let creator = first_non_empty(&extracted.metadata, &["xmp:CreatorTool", "creator", "Application-Name"])
        .map(str::to_string);
    let subject = first_non_empty(&extracted.metadata, &["dc:subject", "subject", "Subject"]).map(str::to_string);
    let keywords = first_non_empty(&extracted.metadata, &["keywords", "Keywords"]).map(str::to_string);

    StoredDocument {
        file_path: path.to_string_lossy().into_owned(),
        file_name,
        file_extension: file_extension(path),
        file_type: extracted.file_type.clone(),
        file_size: extracted.file_size,
        created_date: epoch_millis(stat.created),
        modified_date: epoch_millis(stat.modified),
        indexed_date: epoch_millis(SystemTime::now()),
        language: extracted.detected_language.clone(),
        content: extracted.content.clone(),
        content_hash: content_hash(&extracted.content),
        title,
        author,
        creator,
        subject,
        keywords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension(Path::new("/a/Report.PDF")), Some("pdf".to_string()));
    }

    #[test]
    fn dotfile_has_no_extension() {
        assert_eq!(file_extension(Path::new("/a/.gitignore")), None);
    }

    #[test]
    fn metadata_fallback_chain_picks_first_non_empty() {
        let mut metadata = HashMap::new();
        metadata.insert("title".to_string(), "".to_string());
        metadata.insert("Title".to_string(), "Fallback Title".to_string());
        let extracted = ExtractedDocument { metadata, ..Default::default() };
        let doc = build_stored_document(
            Path::new("/a/b.txt"),
            FileStat { created: SystemTime::now(), modified: SystemTime::now() },
            &extracted,
        );
        assert_eq!(doc.title.as_deref(), Some("Fallback Title"));
    }

    #[test]
    fn content_hash_changes_iff_content_changes() {
        let a = content_hash("hello");
        let b = content_hash("hello");
        let c = content_hash("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
