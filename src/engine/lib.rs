//! A local, single-machine document search engine: crawl a set of
//! directories, analyze and index their content, and answer structured
//! queries over JSON-RPC. Not a general-purpose search library — the schema,
//! analyzers, and wire protocol are all fixed to this one use case.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod index;
pub mod observability;
pub mod rpc;
pub mod schema;
pub mod search;
pub mod watch;

pub use error::{EngineError, EngineResult};
