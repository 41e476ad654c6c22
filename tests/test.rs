//! Integration tests exercising the engine end to end: index a handful of
//! documents, then query, filter, facet, suggest, profile, crawl and watch
//! against a real temp directory. Each test opens its own tempdir-backed
//! index so they can run in parallel (`cargo test`).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docsearch_engine::config::{Config, CrawlerConfig, IndexConfig, LuceneConfig};
use docsearch_engine::crawler::Crawler;
use docsearch_engine::extractor::{ContentExtractor, ExtractedDocument, PlainTextExtractor};
use docsearch_engine::index::{FileStat, IndexService};
use docsearch_engine::observability;
use docsearch_engine::search::executor::{self, RawFilter, SearchRequest, SortBy, SortOrder};
use docsearch_engine::search::profiling::{self, ProfileRequest};
use tempfile::tempdir;

fn test_config(index_dir: &Path, directories: Vec<PathBuf>) -> Config {
    Config {
        lucene: LuceneConfig {
            index: IndexConfig { path: index_dir.to_path_buf(), drop_and_reindex_on_mismatch: false },
            crawler: CrawlerConfig {
                directories,
                include_patterns: vec!["*".to_string()],
                exclude_patterns: vec!["**/.git/**".to_string()],
                thread_pool_size: Some(2),
                batch_size: Some(10),
                batch_timeout_ms: Some(5000),
                watch_enabled: Some(false),
                watch_debounce_ms: Some(50),
                bulk_index_threshold: Some(1000),
                slow_nrt_refresh_interval_ms: Some(5000),
                extract_metadata: Some(true),
                detect_language: Some(true),
                max_content_length: Some(20_000_000),
                crawl_on_startup: Some(false),
                reconciliation_enabled: Some(true),
                progress_notification_files: Some(100),
                progress_notification_interval_ms: Some(30_000),
                watch_buffer_hard_cap: Some(50_000),
            },
        },
    }
}

fn fixed_stat() -> FileStat {
    FileStat { created: std::time::SystemTime::now(), modified: std::time::SystemTime::now() }
}

async fn index_one(service: &Arc<IndexService>, path: &str, content: &str, language: Option<&str>) {
    let extracted = ExtractedDocument {
        content: content.to_string(),
        metadata: HashMap::new(),
        detected_language: language.map(str::to_string),
        file_type: "text/plain".to_string(),
        file_size: content.len() as u64,
    };
    service.index_document(Path::new(path), fixed_stat(), &extracted).await.unwrap();
}

#[tokio::test]
async fn test_01_index_and_search_returns_ranked_hits() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    index_one(&service, "/docs/a.txt", "the quarterly budget report is due", Some("en")).await;
    index_one(&service, "/docs/b.txt", "a recipe for sourdough bread", Some("en")).await;
    service.commit().await.unwrap();

    let snapshot = service.snapshot().await;
    let request = SearchRequest {
        query: "budget".to_string(),
        page: None,
        page_size: None,
        filters: vec![],
        facets: vec![],
        sort_by: SortBy::Score,
        sort_order: SortOrder::Desc,
        max_passages: 3,
        max_passage_char_length: 200,
        language: None,
        deadline_ms: None,
    };
    let response = executor::search(&snapshot, &request).await.unwrap();
    assert_eq!(response.total_hits, 1);
    assert_eq!(response.hits[0].file_path, "/docs/a.txt");
    assert!(!response.hits[0].passages.is_empty());
}

#[tokio::test]
async fn test_02_empty_query_matches_all_documents() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    index_one(&service, "/docs/a.txt", "alpha document", Some("en")).await;
    index_one(&service, "/docs/b.txt", "beta document", Some("en")).await;
    service.commit().await.unwrap();

    let snapshot = service.snapshot().await;
    let request = SearchRequest {
        query: "".to_string(),
        page: None,
        page_size: None,
        filters: vec![],
        facets: vec![],
        sort_by: SortBy::Score,
        sort_order: SortOrder::Desc,
        max_passages: 3,
        max_passage_char_length: 200,
        language: None,
        deadline_ms: None,
    };
    let response = executor::search(&snapshot, &request).await.unwrap();
    assert_eq!(response.total_hits, 2);
}

#[tokio::test]
async fn test_03_eq_filter_restricts_results_and_reports_active_filter_count() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    index_one(&service, "/docs/a.md", "project plan", Some("en")).await;
    index_one(&service, "/docs/b.txt", "project plan", Some("en")).await;
    service.commit().await.unwrap();

    let snapshot = service.snapshot().await;
    let request = SearchRequest {
        query: "project".to_string(),
        page: None,
        page_size: None,
        filters: vec![RawFilter {
            field: "file_extension".to_string(),
            op: Some("eq".to_string()),
            value: Some("md".to_string()),
            values: None,
            from: None,
            to: None,
        }],
        facets: vec![],
        sort_by: SortBy::Score,
        sort_order: SortOrder::Desc,
        max_passages: 3,
        max_passage_char_length: 200,
        language: None,
        deadline_ms: None,
    };
    let response = executor::search(&snapshot, &request).await.unwrap();
    assert_eq!(response.total_hits, 1);
    assert_eq!(response.hits[0].file_path, "/docs/a.md");
    assert_eq!(response.active_filters.len(), 1);
    assert_eq!(response.active_filters[0].match_count, 1);
}

#[tokio::test]
async fn test_04_facets_are_drill_sideways() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    index_one(&service, "/docs/a.md", "notes", Some("en")).await;
    index_one(&service, "/docs/b.txt", "notes", Some("en")).await;
    index_one(&service, "/docs/c.txt", "notes", Some("en")).await;
    service.commit().await.unwrap();

    let snapshot = service.snapshot().await;
    let request = SearchRequest {
        query: "notes".to_string(),
        page: None,
        page_size: None,
        filters: vec![RawFilter {
            field: "file_extension".to_string(),
            op: Some("eq".to_string()),
            value: Some("txt".to_string()),
            values: None,
            from: None,
            to: None,
        }],
        facets: vec!["file_extension".to_string()],
        sort_by: SortBy::Score,
        sort_order: SortOrder::Desc,
        max_passages: 3,
        max_passage_char_length: 200,
        language: None,
        deadline_ms: None,
    };
    let response = executor::search(&snapshot, &request).await.unwrap();
    // drill-sideways: the facet on file_extension ignores the file_extension
    // filter itself, so both extensions still show up with their full counts.
    let facet = &response.facets["file_extension"];
    let md_count = facet.iter().find(|f| f.value == "md").unwrap().count;
    let txt_count = facet.iter().find(|f| f.value == "txt").unwrap().count;
    assert_eq!(md_count, 1);
    assert_eq!(txt_count, 2);
    assert_eq!(response.total_hits, 2);
}

#[tokio::test]
async fn test_05_suggest_terms_rejects_numeric_field_and_matches_prefix() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    index_one(&service, "/docs/a.txt", "server setup saturation", Some("en")).await;
    service.commit().await.unwrap();
    let snapshot = service.snapshot().await;

    let suggestions = observability::suggest_terms(&snapshot, "content", "sa", 10).unwrap();
    let terms: Vec<&str> = suggestions.iter().map(|s| s.term.as_str()).collect();
    assert!(terms.contains(&"saturation"));
    assert!(!terms.contains(&"server"));

    let err = observability::suggest_terms(&snapshot, "file_size", "1", 10).unwrap_err();
    assert_eq!(err.kind, docsearch_engine::error::ErrorKind::InvalidField);
}

#[tokio::test]
async fn test_06_get_index_stats_reports_document_count_and_language_distribution() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    index_one(&service, "/docs/a.txt", "english content here", Some("en")).await;
    index_one(&service, "/docs/b.txt", "deutscher Inhalt hier", Some("de")).await;
    service.commit().await.unwrap();

    let snapshot = service.snapshot().await;
    let stats = observability::get_index_stats(&snapshot, service.index_path());
    assert_eq!(stats.document_count, 2);
    assert_eq!(stats.segment_count, 1);
    assert_eq!(stats.language_distribution.get("en").copied(), Some(1));
    assert_eq!(stats.language_distribution.get("de").copied(), Some(1));
}

#[tokio::test]
async fn test_07_delete_then_search_excludes_document() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    index_one(&service, "/docs/a.txt", "transient note", Some("en")).await;
    service.commit().await.unwrap();
    assert_eq!(service.snapshot().await.live_doc_count(), 1);

    let deleted = service.delete_document("/docs/a.txt").await.unwrap();
    assert!(deleted);
    service.commit().await.unwrap();
    assert_eq!(service.snapshot().await.live_doc_count(), 0);
}

#[tokio::test]
async fn test_08_profile_query_reports_rarity_and_filter_impact() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();

    for i in 0..9 {
        index_one(&service, &format!("/docs/common{i}.txt"), "widget", Some("en")).await;
    }
    index_one(&service, "/docs/rare.txt", "widget gizmo", Some("en")).await;
    service.commit().await.unwrap();
    let snapshot = service.snapshot().await;

    let request = ProfileRequest {
        query: "gizmo".to_string(),
        language: None,
        filters: vec![RawFilter {
            field: "file_extension".to_string(),
            op: Some("eq".to_string()),
            value: Some("txt".to_string()),
            values: None,
            from: None,
            to: None,
        }],
        filter_impact: true,
        explain_docs: vec![],
    };
    let response = profiling::profile(&snapshot, &request).unwrap();
    assert!(!response.term_stats.is_empty());
    assert!(response.filter_impact.is_some());
    let steps = response.filter_impact.unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].cumulative_match_count, 1);
}

#[tokio::test]
async fn test_09_crawler_reconciliation_adds_updates_and_deletes() {
    let source = tempdir().unwrap();
    let index_dir = tempdir().unwrap();
    let file_a = source.path().join("a.txt");
    let file_b = source.path().join("b.txt");
    fs::write(&file_a, "first version").unwrap();
    fs::write(&file_b, "stays forever").unwrap();

    let config = test_config(index_dir.path(), vec![source.path().to_path_buf()]);
    let service = IndexService::open(&config).await.unwrap();
    let extractor: Arc<dyn ContentExtractor> = Arc::new(PlainTextExtractor);
    let crawler = Crawler::new(&config, service.clone(), extractor, None).unwrap();

    let summary = crawler.run_reconciliation().await.unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(service.snapshot().await.live_doc_count(), 2);

    fs::write(&file_a, "second version, much longer than before").unwrap();
    fs::remove_file(&file_b).unwrap();
    let summary = crawler.run_reconciliation().await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.deleted, 1);
    assert_eq!(service.snapshot().await.live_doc_count(), 1);

    let summary = crawler.run_reconciliation().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.added + summary.updated + summary.deleted, 0);
}

#[tokio::test]
async fn test_10_page_size_clamped_end_to_end() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), vec![]);
    let service = IndexService::open(&config).await.unwrap();
    for i in 0..3 {
        index_one(&service, &format!("/docs/{i}.txt"), "shared term", Some("en")).await;
    }
    service.commit().await.unwrap();
    let snapshot = service.snapshot().await;

    let request = SearchRequest {
        query: "shared".to_string(),
        page: None,
        page_size: Some(0),
        filters: vec![],
        facets: vec![],
        sort_by: SortBy::Score,
        sort_order: SortOrder::Desc,
        max_passages: 1,
        max_passage_char_length: 80,
        language: None,
        deadline_ms: None,
    };
    let response = executor::search(&snapshot, &request).await.unwrap();
    assert_eq!(response.page_size, 1);
    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.total_hits, 3);
}
