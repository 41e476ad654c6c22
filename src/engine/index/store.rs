//! Stored fields, doc-values, and the immutable `Snapshot` the NRT searcher
//! hands to every query (§3.2, §5 "shared-immutable via atomic reference
//! counting"). A `Snapshot` is cheap to clone (every field is `Arc`-backed)
//! so a reader never blocks a writer building the next one.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::AHashMap;

use super::postings::PerFieldPostings;
use crate::schema;

/// The stored-field values of one indexed document (§3.1).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StoredDocument {
    pub file_path: String,
    pub file_name: String,
    pub file_extension: Option<String>,
    pub file_type: String,
    pub file_size: u64,
    pub created_date: i64,
    pub modified_date: i64,
    pub indexed_date: i64,
    pub language: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
}

impl StoredDocument {
    pub fn field_value(&self, field: &str) -> Option<String> {
        match field {
            schema::FIELD_FILE_PATH => Some(self.file_path.clone()),
            schema::FIELD_FILE_NAME => Some(self.file_name.clone()),
            schema::FIELD_FILE_EXTENSION => self.file_extension.clone(),
            schema::FIELD_FILE_TYPE => Some(self.file_type.clone()),
            schema::FIELD_LANGUAGE => self.language.clone(),
            schema::FIELD_CONTENT => Some(self.content.clone()),
            schema::FIELD_CONTENT_HASH => Some(self.content_hash.clone()),
            schema::FIELD_TITLE => self.title.clone(),
            schema::FIELD_AUTHOR => self.author.clone(),
            schema::FIELD_CREATOR => self.creator.clone(),
            schema::FIELD_SUBJECT => self.subject.clone(),
            schema::FIELD_KEYWORDS => self.keywords.clone(),
            _ => None,
        }
    }

    pub fn numeric_field_value(&self, field: &str) -> Option<i64> {
        match field {
            schema::FIELD_FILE_SIZE => Some(self.file_size as i64),
            schema::FIELD_CREATED_DATE => Some(self.created_date),
            schema::FIELD_MODIFIED_DATE => Some(self.modified_date),
            schema::FIELD_INDEXED_DATE => Some(self.indexed_date),
            _ => None,
        }
    }
}

/// One token occurrence in the `content` field, carrying the character span
/// needed by the unified highlighter (§4.5 "Highlighting").
#[derive(Debug, Clone)]
pub struct ContentOccurrence {
    pub term: String,
    pub position: u32,
    pub start_char: usize,
    pub end_char: usize,
}

/// A fully-built, read-only view of the index, published atomically by the
/// writer after each commit. Every query executes against exactly one
/// `Snapshot` for its whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub seq: u64,
    pub documents: Arc<Vec<Option<StoredDocument>>>,
    pub path_to_doc: Arc<AHashMap<String, u32>>,
    pub postings: Arc<PerFieldPostings>,
    pub doc_values_keyword: Arc<AHashMap<String, HashMap<u32, String>>>,
    pub doc_values_numeric: Arc<AHashMap<String, HashMap<u32, i64>>>,
    pub content_term_vectors: Arc<AHashMap<u32, Vec<ContentOccurrence>>>,
    pub language_distribution: Arc<HashMap<String, u64>>,
}

impl Snapshot {
    pub fn live_doc_count(&self) -> usize {
        self.documents.iter().filter(|d| d.is_some()).count()
    }

    pub fn doc(&self, doc_id: u32) -> Option<&StoredDocument> {
        self.documents.get(doc_id as usize).and_then(|d| d.as_ref())
    }

    pub fn doc_by_path(&self, path: &str) -> Option<(u32, &StoredDocument)> {
        let id = *self.path_to_doc.get(path)?;
        self.doc(id).map(|d| (id, d))
    }
}
