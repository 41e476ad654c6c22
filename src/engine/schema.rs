//! The fixed field set of §3.1. Unlike the teacher's dynamic, user-supplied
//! schema (`seekstorm::index::SchemaField`), this engine indexes exactly one
//! document shape, so the schema is a set of constants rather than data the
//! caller uploads.

use std::collections::BTreeSet;

/// Bumped whenever a field's type, analyzer, or presence changes (I5).
pub const SCHEMA_VERSION: u32 = 1;

pub const FIELD_FILE_PATH: &str = "file_path";
pub const FIELD_FILE_NAME: &str = "file_name";
pub const FIELD_FILE_EXTENSION: &str = "file_extension";
pub const FIELD_FILE_TYPE: &str = "file_type";
pub const FIELD_FILE_SIZE: &str = "file_size";
pub const FIELD_CREATED_DATE: &str = "created_date";
pub const FIELD_MODIFIED_DATE: &str = "modified_date";
pub const FIELD_INDEXED_DATE: &str = "indexed_date";
pub const FIELD_LANGUAGE: &str = "language";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_CONTENT_REVERSED: &str = "content_reversed";
pub const FIELD_CONTENT_HASH: &str = "content_hash";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_CREATOR: &str = "creator";
pub const FIELD_SUBJECT: &str = "subject";
pub const FIELD_KEYWORDS: &str = "keywords";

/// Languages with a Snowball stemmer wired up (spec.md §4.1: "at minimum").
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "de"];

pub fn stemmed_field_name(language: &str) -> String {
    format!("content_stemmed_{language}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Exact-match keyword, not tokenized.
    Keyword,
    /// Tokenized free text.
    Text,
    /// 64-bit integer (file_size) or epoch-millis (date fields).
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub stored: bool,
    /// doc-values: sortable/rangeable/facetable outside the inverted index.
    pub doc_values: bool,
    /// present in facet listings (getIndexStats, search facets).
    pub facetable: bool,
}

pub const KEYWORD_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: FIELD_FILE_PATH, kind: FieldKind::Keyword, stored: true, doc_values: false, facetable: false },
    FieldSpec { name: FIELD_FILE_NAME, kind: FieldKind::Keyword, stored: true, doc_values: false, facetable: false },
    FieldSpec { name: FIELD_FILE_EXTENSION, kind: FieldKind::Keyword, stored: true, doc_values: true, facetable: true },
    FieldSpec { name: FIELD_FILE_TYPE, kind: FieldKind::Keyword, stored: true, doc_values: true, facetable: true },
    FieldSpec { name: FIELD_LANGUAGE, kind: FieldKind::Keyword, stored: true, doc_values: true, facetable: true },
    FieldSpec { name: FIELD_CONTENT_HASH, kind: FieldKind::Keyword, stored: true, doc_values: false, facetable: false },
];

pub const NUMERIC_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: FIELD_FILE_SIZE, kind: FieldKind::Numeric, stored: true, doc_values: true, facetable: false },
    FieldSpec { name: FIELD_CREATED_DATE, kind: FieldKind::Numeric, stored: true, doc_values: true, facetable: false },
    FieldSpec { name: FIELD_MODIFIED_DATE, kind: FieldKind::Numeric, stored: true, doc_values: true, facetable: false },
    FieldSpec { name: FIELD_INDEXED_DATE, kind: FieldKind::Numeric, stored: true, doc_values: true, facetable: false },
];

pub const TEXT_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: FIELD_CONTENT, kind: FieldKind::Text, stored: true, doc_values: false, facetable: false },
    FieldSpec { name: FIELD_CONTENT_REVERSED, kind: FieldKind::Text, stored: false, doc_values: false, facetable: false },
    FieldSpec { name: FIELD_TITLE, kind: FieldKind::Text, stored: true, doc_values: false, facetable: false },
    FieldSpec { name: FIELD_AUTHOR, kind: FieldKind::Text, stored: true, doc_values: false, facetable: true },
    FieldSpec { name: FIELD_CREATOR, kind: FieldKind::Text, stored: true, doc_values: false, facetable: false },
    FieldSpec { name: FIELD_SUBJECT, kind: FieldKind::Text, stored: true, doc_values: false, facetable: false },
    FieldSpec { name: FIELD_KEYWORDS, kind: FieldKind::Text, stored: true, doc_values: false, facetable: false },
];

pub fn field_spec(name: &str) -> Option<FieldSpec> {
    KEYWORD_FIELDS
        .iter()
        .chain(NUMERIC_FIELDS)
        .chain(TEXT_FIELDS)
        .copied()
        .find(|f| f.name == name)
}

pub fn is_stemmed_field(name: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| stemmed_field_name(l) == name)
        .copied()
}

pub fn facetable_fields() -> BTreeSet<&'static str> {
    KEYWORD_FIELDS
        .iter()
        .chain(TEXT_FIELDS)
        .filter(|f| f.facetable)
        .map(|f| f.name)
        .collect()
}

pub fn sortable_fields() -> BTreeSet<&'static str> {
    NUMERIC_FIELDS.iter().map(|f| f.name).collect()
}
