//! Content extractor boundary (C10): `given a file path, return text +
//! metadata + language`, the one runtime-pluggable capability in the core
//! (Design Notes §9). Internally dispatch is tagged on file extension, never
//! reflective plugin loading.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub content: String,
    pub metadata: HashMap<String, String>,
    pub detected_language: Option<String>,
    pub file_type: String,
    pub file_size: u64,
}

pub trait ContentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> EngineResult<ExtractedDocument>;
}

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "rst", "log", "csv", "json", "yaml", "yml", "toml", "rs", "py", "js", "ts", "go",
    "java", "c", "h", "cpp",
];

const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("rst", "text/x-rst"),
    ("log", "text/plain"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("toml", "application/toml"),
    ("pdf", "application/pdf"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
];

fn mime_for_extension(ext: &str) -> String {
    MIME_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, m)| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// English/German stopword overlap: the cheapest signal that separates the
/// two languages this engine stems without pulling in a language-ID model.
const STOPWORDS_EN: &[&str] = &["the", "and", "is", "of", "to", "in", "that", "for", "with"];
const STOPWORDS_DE: &[&str] = &["der", "die", "das", "und", "ist", "von", "zu", "mit", "für", "ein", "eine"];

fn detect_language(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().take(2000).collect();
    if words.is_empty() {
        return None;
    }
    let en_hits = words.iter().filter(|w| STOPWORDS_EN.contains(w)).count();
    let de_hits = words.iter().filter(|w| STOPWORDS_DE.contains(w)).count();
    match en_hits.cmp(&de_hits) {
        std::cmp::Ordering::Greater if en_hits >= 2 => Some("en".to_string()),
        std::cmp::Ordering::Less if de_hits >= 2 => Some("de".to_string()),
        _ => None,
    }
}

/// Parses a leading `---\n...\n---` YAML front-matter block, returning the
/// remaining body and the parsed keys as metadata.
fn split_front_matter(text: &str) -> (HashMap<String, String>, &str) {
    let mut metadata = HashMap::new();
    let Some(rest) = text.strip_prefix("---\n") else {
        return (metadata, text);
    };
    let Some(end) = rest.find("\n---\n") else {
        return (metadata, text);
    };
    let block = &rest[..end];
    let body = &rest[end + 5..];
    if let Ok(serde_yaml::Value::Mapping(map)) = serde_yaml::from_str(block) {
        for (k, v) in map {
            if let (Some(k), Some(v)) = (k.as_str(), v.as_str()) {
                metadata.insert(k.to_string(), v.to_string());
            }
        }
    }
    (metadata, body)
}

/// Default, in-process extractor sufficient to exercise every other module:
/// reads UTF-8 text for a fixed set of text-ish extensions, reads front
/// matter, and guesses a language. Non-text extensions are still indexed
/// (metadata-searchable) with empty content, so a richer extractor can be
/// swapped in later without touching any other contract.
pub struct PlainTextExtractor;

impl ContentExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> EngineResult<ExtractedDocument> {
        let meta = std::fs::metadata(path).map_err(EngineError::from)?;
        let file_size = meta.len();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(ExtractedDocument {
                content: String::new(),
                metadata: HashMap::new(),
                detected_language: None,
                file_type: mime_for_extension(&ext),
                file_size,
            });
        }

        let raw = std::fs::read(path).map_err(EngineError::from)?;
        let text = String::from_utf8_lossy(&raw).into_owned();
        let (metadata, body) = split_front_matter(&text);
        let detected_language = detect_language(body);

        Ok(ExtractedDocument {
            content: body.to_string(),
            metadata,
            detected_language,
            file_type: mime_for_extension(&ext),
            file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_german_over_english() {
        let lang = detect_language("Der Vertrag ist von der Firma und das ist ein Muster");
        assert_eq!(lang.as_deref(), Some("de"));
    }

    #[test]
    fn detects_english_over_german() {
        let lang = detect_language("the budget report is for the team and that is the plan");
        assert_eq!(lang.as_deref(), Some("en"));
    }

    #[test]
    fn front_matter_is_split_from_body() {
        let text = "---\ntitle: Example\nauthor: Ada\n---\nbody text here";
        let (meta, body) = split_front_matter(text);
        assert_eq!(meta.get("title").map(String::as_str), Some("Example"));
        assert_eq!(body, "body text here");
    }
}
