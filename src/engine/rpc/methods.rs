//! Method dispatch (C13): one JSON-RPC `method` name per operation in §6's
//! table, each deserializing its own `params` shape and serializing its own
//! result rather than sharing one catch-all request/response type.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::crawler::{Crawler, CrawlerStatus};
use crate::error::{EngineError, EngineResult};
use crate::index::IndexService;
use crate::search::executor::{self, SearchRequest};
use crate::search::profiling::{self, ProfileRequest};

const QUERY_SYNTAX_DOC: &str = include_str!("../../../docs/query-syntax.md");
const PROFILING_GUIDE_DOC: &str = include_str!("../../../docs/profiling-guide.md");

pub struct Engine {
    pub index: Arc<IndexService>,
    pub crawler: Arc<Crawler>,
}

fn param<T: serde::de::DeserializeOwned>(params: &Value) -> EngineResult<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| EngineError::invalid_argument(format!("bad params: {e}")))
}

pub async fn dispatch(engine: &Engine, method: &str, params: Value) -> EngineResult<Value> {
    match method {
        "search" => {
            let request: SearchRequest = param(&params)?;
            let snapshot = engine.index.snapshot().await;
            let response = executor::search(&snapshot, &request).await?;
            Ok(serde_json::to_value(response)?)
        }
        "getDocumentDetails" => get_document_details(engine, &params).await,
        "suggestTerms" => suggest_terms(engine, &params).await,
        "getTopTerms" => get_top_terms(engine, &params).await,
        "getIndexStats" => get_index_stats(engine).await,
        "profileQuery" => profile_query(engine, &params).await,
        "pauseCrawler" => {
            engine.crawler.pause();
            Ok(json!({ "status": status_name(engine.crawler.status()) }))
        }
        "resumeCrawler" => {
            engine.crawler.resume();
            Ok(json!({ "status": status_name(engine.crawler.status()) }))
        }
        "getCrawlerStatus" => Ok(json!({ "status": status_name(engine.crawler.status()) })),
        "readResource" => read_resource(&params),
        other => Err(EngineError::invalid_argument(format!("unknown method: {other}"))),
    }
}

fn status_name(status: CrawlerStatus) -> &'static str {
    match status {
        CrawlerStatus::Idle => "idle",
        CrawlerStatus::Running => "running",
        CrawlerStatus::Paused => "paused",
    }
}

#[derive(serde::Deserialize)]
struct DocumentDetailsParams {
    file_path: String,
}

async fn get_document_details(engine: &Engine, params: &Value) -> EngineResult<Value> {
    let request: DocumentDetailsParams = param(params)?;
    let snapshot = engine.index.snapshot().await;
    let (_, doc) = snapshot
        .doc_by_path(&request.file_path)
        .ok_or_else(|| EngineError::not_found(format!("no document at {}", request.file_path)))?;
    Ok(serde_json::to_value(doc)?)
}

#[derive(serde::Deserialize)]
struct SuggestTermsParams {
    field: String,
    prefix: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

async fn suggest_terms(engine: &Engine, params: &Value) -> EngineResult<Value> {
    let request: SuggestTermsParams = param(params)?;
    let snapshot = engine.index.snapshot().await;
    let suggestions = crate::observability::suggest_terms(&snapshot, &request.field, &request.prefix, request.limit)?;
    let total_matched = suggestions.len();
    Ok(json!({ "terms": suggestions, "totalMatched": total_matched }))
}

#[derive(serde::Deserialize)]
struct TopTermsParams {
    field: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn get_top_terms(engine: &Engine, params: &Value) -> EngineResult<Value> {
    let request: TopTermsParams = param(params)?;
    let snapshot = engine.index.snapshot().await;
    let terms = crate::observability::get_top_terms(&snapshot, &request.field, request.limit)?;
    let unique_term_count = terms.len();
    Ok(json!({ "terms": terms, "uniqueTermCount": unique_term_count }))
}

async fn get_index_stats(engine: &Engine) -> EngineResult<Value> {
    let snapshot = engine.index.snapshot().await;
    let stats = crate::observability::get_index_stats(&snapshot, engine.index.index_path());
    Ok(serde_json::to_value(stats)?)
}

#[derive(serde::Deserialize, Default)]
struct ProfileQueryParams {
    query: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    filters: Vec<crate::search::executor::RawFilter>,
    #[serde(default)]
    filter_impact: bool,
    #[serde(default)]
    explain_docs: Vec<String>,
}

async fn profile_query(engine: &Engine, params: &Value) -> EngineResult<Value> {
    let request: ProfileQueryParams = param(params)?;
    let snapshot = engine.index.snapshot().await;
    let profile_request = ProfileRequest {
        query: request.query,
        language: request.language,
        filters: request.filters,
        filter_impact: request.filter_impact,
        explain_docs: request.explain_docs,
    };
    let response = profiling::profile(&snapshot, &profile_request)?;
    Ok(serde_json::to_value(response)?)
}

#[derive(serde::Deserialize)]
struct ReadResourceParams {
    uri: String,
}

fn read_resource(params: &Value) -> EngineResult<Value> {
    let request: ReadResourceParams = param(params)?;
    let text = match request.uri.as_str() {
        "lucene://docs/query-syntax" => QUERY_SYNTAX_DOC,
        "lucene://docs/profiling-guide" => PROFILING_GUIDE_DOC,
        other => return Err(EngineError::not_found(format!("no such resource: {other}"))),
    };
    Ok(json!({ "uri": request.uri, "mimeType": "text/markdown", "text": text }))
}
