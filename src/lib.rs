pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::{DsrError, Result};
pub use service::{CodeExtractor, MatchEngine, MatchOptions, ReferenceStore, ReportBuilder};
