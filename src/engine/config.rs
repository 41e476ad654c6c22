//! Configuration loader (C11, §3.3): YAML file -> environment -> process
//! properties -> explicit runtime override, highest precedence last. Modeled
//! as one immutable `Config` handed by `Arc` into every constructor, never a
//! global — the teacher passes `IndexMetaObject`/paths the same way rather
//! than reading environment at each call site.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub drop_and_reindex_on_mismatch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub directories: Vec<PathBuf>,
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    pub thread_pool_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub batch_timeout_ms: Option<u64>,
    pub watch_enabled: Option<bool>,
    pub watch_debounce_ms: Option<u64>,
    pub bulk_index_threshold: Option<u64>,
    pub slow_nrt_refresh_interval_ms: Option<u64>,
    pub extract_metadata: Option<bool>,
    pub detect_language: Option<bool>,
    pub max_content_length: Option<usize>,
    pub crawl_on_startup: Option<bool>,
    pub reconciliation_enabled: Option<bool>,
    pub progress_notification_files: Option<u64>,
    pub progress_notification_interval_ms: Option<u64>,
    pub watch_buffer_hard_cap: Option<usize>,
}

fn default_include_patterns() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_exclude_patterns() -> Vec<String> {
    vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuceneConfig {
    pub index: IndexConfig,
    pub crawler: CrawlerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub lucene: LuceneConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lucene: LuceneConfig {
                index: IndexConfig { path: PathBuf::from("./index"), drop_and_reindex_on_mismatch: false },
                crawler: CrawlerConfig {
                    directories: Vec::new(),
                    include_patterns: default_include_patterns(),
                    exclude_patterns: default_exclude_patterns(),
                    thread_pool_size: Some(4),
                    batch_size: Some(100),
                    batch_timeout_ms: Some(5000),
                    watch_enabled: Some(true),
                    watch_debounce_ms: Some(200),
                    bulk_index_threshold: Some(1000),
                    slow_nrt_refresh_interval_ms: Some(5000),
                    extract_metadata: Some(true),
                    detect_language: Some(true),
                    max_content_length: Some(20_000_000),
                    crawl_on_startup: Some(true),
                    reconciliation_enabled: Some(true),
                    progress_notification_files: Some(100),
                    progress_notification_interval_ms: Some(30_000),
                    watch_buffer_hard_cap: Some(50_000),
                },
            },
        }
    }
}

/// Mirror of [`Config`] with every field optional, the shape `serde_yaml`
/// deserializes a (possibly partial) on-disk file into before it's merged
/// over the defaults.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    lucene: Option<RawLucene>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLucene {
    index: Option<RawIndex>,
    crawler: Option<RawCrawler>,
}

#[derive(Debug, Default, Deserialize)]
struct RawIndex {
    path: Option<PathBuf>,
    #[serde(rename = "drop-and-reindex-on-mismatch")]
    drop_and_reindex_on_mismatch: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCrawler {
    directories: Option<Vec<PathBuf>>,
    #[serde(rename = "include-patterns")]
    include_patterns: Option<Vec<String>>,
    #[serde(rename = "exclude-patterns")]
    exclude_patterns: Option<Vec<String>>,
    #[serde(rename = "thread-pool-size")]
    thread_pool_size: Option<usize>,
    #[serde(rename = "batch-size")]
    batch_size: Option<usize>,
    #[serde(rename = "batch-timeout-ms")]
    batch_timeout_ms: Option<u64>,
    #[serde(rename = "watch-enabled")]
    watch_enabled: Option<bool>,
    #[serde(rename = "watch-debounce-ms")]
    watch_debounce_ms: Option<u64>,
    #[serde(rename = "bulk-index-threshold")]
    bulk_index_threshold: Option<u64>,
    #[serde(rename = "slow-nrt-refresh-interval-ms")]
    slow_nrt_refresh_interval_ms: Option<u64>,
    #[serde(rename = "extract-metadata")]
    extract_metadata: Option<bool>,
    #[serde(rename = "detect-language")]
    detect_language: Option<bool>,
    #[serde(rename = "max-content-length")]
    max_content_length: Option<usize>,
    #[serde(rename = "crawl-on-startup")]
    crawl_on_startup: Option<bool>,
    #[serde(rename = "reconciliation-enabled")]
    reconciliation_enabled: Option<bool>,
}

fn env_override(key: &str) -> Option<String> {
    // LUCENE__CRAWLER__BATCH_SIZE style, double-underscore nesting per SPEC_FULL §3.3.
    std::env::var(key).ok()
}

impl Config {
    /// Loads `path` (if it exists) over the defaults, then layers
    /// environment variables. Process properties (`-D` style) and the
    /// runtime `setDirectories` override are applied by the caller, since
    /// they depend on `std::env::args()` / a live API call respectively and
    /// this loader only owns the file+env layer.
    pub fn load(path: &std::path::Path) -> EngineResult<Config> {
        let mut config = Config::default();
        if let Ok(contents) = std::fs::read_to_string(path) {
            let raw: RawConfig = serde_yaml::from_str(&contents)?;
            apply_raw(&mut config, raw);
        }
        apply_env(&mut config);
        Ok(config)
    }

    /// Applies process properties parsed the way the teacher's server does
    /// (`key=value` args), e.g. `lucene.index.path=/tmp/idx`.
    pub fn apply_process_properties(&mut self, args: &[String]) {
        let mut props = HashMap::new();
        for arg in args {
            if let Some((k, v)) = arg.split_once('=') {
                props.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
        if let Some(v) = props.get("lucene.index.path") {
            self.lucene.index.path = PathBuf::from(v);
        }
        if let Some(v) = props.get("lucene.crawler.directories") {
            self.lucene.crawler.directories = v.split(',').map(PathBuf::from).collect();
        }
    }

    /// The explicit runtime API call overriding directories until restart
    /// (highest precedence per §3.3).
    pub fn set_directories(&mut self, directories: Vec<PathBuf>) {
        self.lucene.crawler.directories = directories;
    }
}

fn apply_raw(config: &mut Config, raw: RawConfig) {
    let Some(lucene) = raw.lucene else { return };
    if let Some(index) = lucene.index {
        if let Some(path) = index.path {
            config.lucene.index.path = path;
        }
        if let Some(drop) = index.drop_and_reindex_on_mismatch {
            config.lucene.index.drop_and_reindex_on_mismatch = drop;
        }
    }
    if let Some(crawler) = lucene.crawler {
        macro_rules! layer {
            ($field:ident) => {
                if let Some(v) = crawler.$field {
                    config.lucene.crawler.$field = v;
                }
            };
        }
        if let Some(v) = crawler.directories {
            config.lucene.crawler.directories = v;
        }
        if let Some(v) = crawler.include_patterns {
            config.lucene.crawler.include_patterns = v;
        }
        if let Some(v) = crawler.exclude_patterns {
            config.lucene.crawler.exclude_patterns = v;
        }
        layer!(thread_pool_size);
        layer!(batch_size);
        layer!(batch_timeout_ms);
        layer!(watch_enabled);
        layer!(watch_debounce_ms);
        layer!(bulk_index_threshold);
        layer!(slow_nrt_refresh_interval_ms);
        layer!(extract_metadata);
        layer!(detect_language);
        layer!(max_content_length);
        layer!(crawl_on_startup);
        layer!(reconciliation_enabled);
    }
}

fn apply_env(config: &mut Config) {
    if let Some(v) = env_override("LUCENE__INDEX__PATH") {
        config.lucene.index.path = PathBuf::from(v);
    }
    if let Some(v) = env_override("LUCENE__CRAWLER__DIRECTORIES") {
        config.lucene.crawler.directories = v.split(',').map(PathBuf::from).collect();
    }
    if let Some(v) = env_override("LUCENE__CRAWLER__BATCH_SIZE") {
        if let Ok(n) = v.parse() {
            config.lucene.crawler.batch_size = Some(n);
        }
    }
    if let Some(v) = env_override("LUCENE__CRAWLER__WATCH_DEBOUNCE_MS") {
        if let Ok(n) = v.parse() {
            config.lucene.crawler.watch_debounce_ms = Some(n);
        }
    }
    if let Some(v) = env_override("LUCENE__CRAWLER__WATCH_ENABLED") {
        config.lucene.crawler.watch_enabled = Some(v == "true" || v == "1");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let config = Config::default();
        assert_eq!(config.lucene.crawler.batch_size, Some(100));
        assert_eq!(config.lucene.crawler.watch_debounce_ms, Some(200));
        assert_eq!(config.lucene.crawler.thread_pool_size, Some(4));
    }

    #[test]
    fn process_property_overrides_index_path() {
        let mut config = Config::default();
        config.apply_process_properties(&["lucene.index.path=/tmp/custom-index".to_string()]);
        assert_eq!(config.lucene.index.path, PathBuf::from("/tmp/custom-index"));
    }
}
