#![doc(html_logo_url = "http://seekstorm.com/assets/logo.svg")]

//! # `docsearch_server`
//! Standalone document search server: crawls configured directories, keeps an
//! inverted index current via startup reconciliation and filesystem
//! watching, and answers queries over a line-delimited JSON-RPC protocol on
//! stdin/stdout.
//! ### Command line parameters
//! ```text
//! lucene.index.path=/var/lib/docsearch/index
//! lucene.crawler.directories=/home/alice/docs,/home/alice/notes
//! ./docsearch_server lucene.index.path=/tmp/index lucene.crawler.directories=/tmp/corpus
//! ```
//! Configuration is layered file -> environment -> process properties (see
//! `docsearch_engine::config`); stdout carries only JSON-RPC frames, so all
//! diagnostic output goes to a rotating log file instead of the console.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use docsearch_engine::config::Config;
use docsearch_engine::crawler::Crawler;
use docsearch_engine::extractor::PlainTextExtractor;
use docsearch_engine::index::IndexService;
use docsearch_engine::rpc::{self, Engine};
use docsearch_engine::watch::WatchProcessor;

const EXIT_OK: i32 = 0;
const EXIT_FATAL_STARTUP: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

fn config_path() -> PathBuf {
    env::var("DOCSEARCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("docsearch.yaml"))
}

fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = dirs_log_dir();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "docsearch_server.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("docsearch_engine=info".parse().unwrap()))
        .with_ansi(false)
        .init();
    guard
}

/// Per-user log directory: stdout is the JSON-RPC transport, so nothing may
/// ever write there, logging included.
fn dirs_log_dir() -> PathBuf {
    if let Ok(dir) = env::var("DOCSEARCH_LOG_DIR") {
        return PathBuf::from(dir);
    }
    match env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".docsearch").join("logs"),
        Err(_) => PathBuf::from("./logs"),
    }
}

#[tokio::main]
async fn main() {
    let _guard = init_logging();
    let args: Vec<String> = env::args().skip(1).collect();

    let mut config = match Config::load(&config_path()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(target: "docsearch_server", error = %e, "failed to parse configuration");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    config.apply_process_properties(&args);

    if config.lucene.crawler.directories.is_empty() {
        tracing::error!(target: "docsearch_server", "no crawler directories configured");
        std::process::exit(EXIT_CONFIG_ERROR);
    }

    let index = match IndexService::open(&config).await {
        Ok(index) => index,
        Err(e) => {
            tracing::error!(target: "docsearch_server", error = %e, "failed to open index, exiting");
            std::process::exit(EXIT_FATAL_STARTUP);
        }
    };

    let extractor: Arc<dyn docsearch_engine::extractor::ContentExtractor> = Arc::new(PlainTextExtractor);
    let (progress_tx, progress_rx) = tokio::sync::mpsc::unbounded_channel();

    let crawler = match Crawler::new(&config, index.clone(), extractor.clone(), Some(progress_tx)) {
        Ok(crawler) => Arc::new(crawler),
        Err(e) => {
            tracing::error!(target: "docsearch_server", error = %e, "failed to initialize crawler");
            std::process::exit(EXIT_FATAL_STARTUP);
        }
    };

    if config.lucene.crawler.crawl_on_startup.unwrap_or(true)
        && config.lucene.crawler.reconciliation_enabled.unwrap_or(true)
    {
        let startup_crawler = crawler.clone();
        tokio::spawn(async move {
            match startup_crawler.run_reconciliation().await {
                Ok(summary) => tracing::info!(
                    target: "docsearch_server",
                    added = summary.added,
                    updated = summary.updated,
                    deleted = summary.deleted,
                    skipped = summary.skipped,
                    "startup reconciliation complete"
                ),
                Err(e) => tracing::error!(target: "docsearch_server", error = %e, "startup reconciliation failed"),
            }
        });
    }

    if config.lucene.crawler.watch_enabled.unwrap_or(true) {
        match WatchProcessor::new(&config, index.clone(), extractor.clone(), crawler.clone()) {
            Ok(processor) => {
                let processor = Arc::new(processor);
                tokio::spawn(async move {
                    if let Err(e) = processor.run().await {
                        tracing::error!(target: "docsearch_server", error = %e, "watch processor exited");
                    }
                });
            }
            Err(e) => {
                tracing::error!(target: "docsearch_server", error = %e, "failed to start watch processor");
                std::process::exit(EXIT_FATAL_STARTUP);
            }
        }
    }

    let engine = Arc::new(Engine { index, crawler });
    tracing::info!(target: "docsearch_server", "docsearch_server v{} ready, reading JSON-RPC requests from stdin", env!("CARGO_PKG_VERSION"));
    rpc::run_stdio_loop(engine, progress_rx).await;
    std::process::exit(EXIT_OK);
}
