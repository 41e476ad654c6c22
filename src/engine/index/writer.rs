//! The single exclusive writer over an index directory: owns the mutable
//! posting lists and doc store, enforces I1 (delete-before-add), persists
//! durable state, and builds the immutable [`Snapshot`] the NRT searcher
//! publishes after each commit.
//!
//! Durability is a single serialized snapshot file per commit (written to a
//! temp path then renamed into place) rather than Lucene-style segment
//! files — the external contract (schema.version, write.lock, atomic commit,
//! crash recovery) is preserved; the on-disk *format* is simplified, which is
//! recorded in DESIGN.md.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::doc::{build_stored_document, FileStat};
use super::lang_stats;
use super::lock::IndexLock;
use super::postings::{FieldPostings, PerFieldPostings};
use super::store::{ContentOccurrence, Snapshot, StoredDocument};
use crate::analysis::{self, StemOverrides};
use crate::error::{EngineError, EngineResult};
use crate::extractor::ExtractedDocument;
use crate::schema::{self, SCHEMA_VERSION};

const SCHEMA_FILE_NAME: &str = "schema.version";
const SNAPSHOT_FILE_NAME: &str = "index.snapshot.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    documents: Vec<Option<StoredDocument>>,
    free_ids: Vec<u32>,
    seq: u64,
}

pub struct IndexWriter {
    index_dir: PathBuf,
    _lock: IndexLock,
    documents: Vec<Option<StoredDocument>>,
    path_to_doc: AHashMap<String, u32>,
    postings: PerFieldPostings,
    doc_values_keyword: AHashMap<String, HashMap<u32, String>>,
    doc_values_numeric: AHashMap<String, HashMap<u32, i64>>,
    content_term_vectors: AHashMap<u32, Vec<ContentOccurrence>>,
    free_ids: Vec<u32>,
    seq: u64,
    stem_overrides: StemOverrides,
    pending_ops: u64,
}

pub enum SchemaOpenMode {
    FailFast,
    DropAndReindex,
}

impl IndexWriter {
    /// Opens (creating if absent) the index at `index_dir`, enforcing the
    /// schema-version gate of I5 / §4.4.
    pub fn open(index_dir: &Path, mode: SchemaOpenMode) -> EngineResult<Self> {
        std::fs::create_dir_all(index_dir)?;
        let lock = IndexLock::acquire(index_dir)?;

        let schema_path = index_dir.join(SCHEMA_FILE_NAME);
        let mut dropped = false;
        match std::fs::read_to_string(&schema_path) {
            Ok(contents) => {
                let persisted: u32 = contents.trim().parse().map_err(|_| {
                    EngineError::schema_mismatch(format!("unreadable schema.version: {contents:?}"))
                })?;
                if persisted != SCHEMA_VERSION {
                    match mode {
                        SchemaOpenMode::FailFast => {
                            return Err(EngineError::schema_mismatch(format!(
                                "schema.version {persisted} != code SCHEMA_VERSION {SCHEMA_VERSION}"
                            )));
                        }
                        SchemaOpenMode::DropAndReindex => {
                            dropped = true;
                        }
                    }
                }
            }
            Err(_) => write_atomically(&schema_path, SCHEMA_VERSION.to_string().as_bytes())?,
        }
        if dropped {
            write_atomically(&schema_path, SCHEMA_VERSION.to_string().as_bytes())?;
        }

        let snapshot_path = index_dir.join(SNAPSHOT_FILE_NAME);
        let persisted = if dropped {
            PersistedState::default()
        } else {
            match std::fs::read(&snapshot_path) {
                Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
                Err(_) => PersistedState::default(),
            }
        };

        let mut writer = IndexWriter {
            index_dir: index_dir.to_path_buf(),
            _lock: lock,
            documents: Vec::new(),
            path_to_doc: AHashMap::new(),
            postings: AHashMap::new(),
            doc_values_keyword: AHashMap::new(),
            doc_values_numeric: AHashMap::new(),
            content_term_vectors: AHashMap::new(),
            free_ids: persisted.free_ids,
            seq: persisted.seq,
            stem_overrides: StemOverrides::new(),
            pending_ops: 0,
        };
        for (idx, doc) in persisted.documents.into_iter().enumerate() {
            writer.documents.push(None);
            if let Some(doc) = doc {
                writer.reindex_at(idx as u32, doc);
            }
        }
        Ok(writer)
    }

    pub fn pending_ops(&self) -> u64 {
        self.pending_ops
    }

    /// ADD or UPDATE: always delete-before-add to preserve I1.
    pub fn index_document(&mut self, path: &Path, stat: FileStat, extracted: &ExtractedDocument) -> u32 {
        let stored = build_stored_document(path, stat, extracted);
        self.delete_by_path(&stored.file_path);
        let doc_id = self.free_ids.pop().unwrap_or(self.documents.len() as u32);
        self.reindex_at(doc_id, stored);
        self.pending_ops += 1;
        doc_id
    }

    pub fn delete_by_path(&mut self, path: &str) -> bool {
        let Some(doc_id) = self.path_to_doc.remove(path) else {
            return false;
        };
        if let Some(slot) = self.documents.get_mut(doc_id as usize) {
            *slot = None;
        }
        for postings in self.postings.values_mut() {
            postings.remove_doc(doc_id);
        }
        for values in self.doc_values_keyword.values_mut() {
            values.remove(&doc_id);
        }
        for values in self.doc_values_numeric.values_mut() {
            values.remove(&doc_id);
        }
        self.content_term_vectors.remove(&doc_id);
        self.free_ids.push(doc_id);
        self.pending_ops += 1;
        true
    }

    fn reindex_at(&mut self, doc_id: u32, stored: StoredDocument) {
        while self.documents.len() <= doc_id as usize {
            self.documents.push(None);
        }

        self.index_text_field(schema::FIELD_CONTENT, &stored.content, doc_id, true);
        self.index_text_field(schema::FIELD_CONTENT_REVERSED, &stored.content, doc_id, false);
        if let Some(lang) = &stored.language {
            if schema::SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
                let field = schema::stemmed_field_name(lang);
                self.index_text_field(&field, &stored.content, doc_id, false);
            }
        }
        for field in [
            schema::FIELD_TITLE,
            schema::FIELD_AUTHOR,
            schema::FIELD_CREATOR,
            schema::FIELD_SUBJECT,
            schema::FIELD_KEYWORDS,
        ] {
            if let Some(value) = stored.field_value(field) {
                self.index_text_field(field, &value, doc_id, false);
            }
        }

        for field in [schema::FIELD_FILE_PATH, schema::FIELD_FILE_NAME, schema::FIELD_CONTENT_HASH] {
            if let Some(value) = stored.field_value(field) {
                self.postings.entry(field.to_string()).or_default().add(&value, doc_id, 0);
            }
        }
        for field in [schema::FIELD_FILE_EXTENSION, schema::FIELD_FILE_TYPE, schema::FIELD_LANGUAGE] {
            if let Some(value) = stored.field_value(field) {
                self.postings.entry(field.to_string()).or_default().add(&value, doc_id, 0);
                self.doc_values_keyword.entry(field.to_string()).or_default().insert(doc_id, value);
            }
        }
        if let Some(author) = stored.field_value(schema::FIELD_AUTHOR) {
            self.doc_values_keyword.entry(schema::FIELD_AUTHOR.to_string()).or_default().insert(doc_id, author);
        }
        for field in [
            schema::FIELD_FILE_SIZE,
            schema::FIELD_CREATED_DATE,
            schema::FIELD_MODIFIED_DATE,
            schema::FIELD_INDEXED_DATE,
        ] {
            if let Some(value) = stored.numeric_field_value(field) {
                self.doc_values_numeric.entry(field.to_string()).or_default().insert(doc_id, value);
            }
        }

        self.path_to_doc.insert(stored.file_path.clone(), doc_id);
        self.documents[doc_id as usize] = Some(stored);
    }

    fn index_text_field(&mut self, field: &str, text: &str, doc_id: u32, track_offsets: bool) {
        let postings = self.postings.entry(field.to_string()).or_default();
        if track_offsets {
            let occurrences = tokenize_with_offsets(text);
            for (position, occ) in occurrences.iter().enumerate() {
                postings.add(&occ.term, doc_id, position as u32);
            }
            self.content_term_vectors.insert(doc_id, occurrences);
        } else {
            for (position, token) in analysis::analyze(field, text, &self.stem_overrides).into_iter().enumerate() {
                postings.add(&token, doc_id, position as u32);
            }
        }
    }

    /// Commits the batch: rebuilds the published snapshot, persists it to
    /// disk atomically, and resets the pending-op counter the NRT refresher
    /// uses to choose its interval.
    pub fn commit(&mut self) -> EngineResult<Snapshot> {
        self.seq += 1;
        let persisted = PersistedState {
            documents: self.documents.clone(),
            free_ids: self.free_ids.clone(),
            seq: self.seq,
        };
        let bytes = serde_json::to_vec(&persisted)?;
        write_atomically(&self.index_dir.join(SNAPSHOT_FILE_NAME), &bytes)?;
        self.pending_ops = 0;

        let language_distribution = lang_stats::compute(&self.documents);
        Ok(Snapshot {
            seq: self.seq,
            documents: std::sync::Arc::new(self.documents.clone()),
            path_to_doc: std::sync::Arc::new(self.path_to_doc.clone()),
            postings: std::sync::Arc::new(clone_postings(&self.postings)),
            doc_values_keyword: std::sync::Arc::new(self.doc_values_keyword.clone()),
            doc_values_numeric: std::sync::Arc::new(self.doc_values_numeric.clone()),
            content_term_vectors: std::sync::Arc::new(self.content_term_vectors.clone()),
            language_distribution: std::sync::Arc::new(language_distribution),
        })
    }
}

fn clone_postings(postings: &PerFieldPostings) -> PerFieldPostings {
    let mut out = PerFieldPostings::default();
    for (field, fp) in postings {
        out.insert(field.clone(), FieldPostings { terms: fp.terms.clone() });
    }
    out
}

/// Tokenizes `content` while keeping each token's character span, the
/// term-vector-with-offsets data the unified highlighter reads (§3.1,
/// §4.5). Shares the same normalizing prefix as [`analysis::analyze`].
fn tokenize_with_offsets(text: &str) -> Vec<ContentOccurrence> {
    let tokens = analysis::normalize_and_tokenize(text);
    // re-derive offsets against the *original* text by scanning once more;
    // normalize_and_tokenize already lowercases/NFKC-folds, so we locate
    // each token's position by sequential search to keep spans in sync with
    // the stored (unnormalized) content used for highlighting.
    let mut occurrences = Vec::with_capacity(tokens.len());
    let mut cursor = 0usize;
    let lower = text.to_lowercase();
    for (position, term) in tokens.into_iter().enumerate() {
        if let Some(found) = lower[cursor..].find(&term) {
            let start = cursor + found;
            let end = start + term.len();
            cursor = end;
            occurrences.push(ContentOccurrence { term, position: position as u32, start_char: start, end_char: end });
        } else {
            occurrences.push(ContentOccurrence { term, position: position as u32, start_char: cursor, end_char: cursor });
        }
    }
    occurrences
}

fn write_atomically(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
