use std::path::PathBuf;
use thiserror::Error;

/// 批处理级错误; 行级/条目级异常不走这里, 而是计入统计并归入匹配分类
#[derive(Debug, Error)]
pub enum DsrError {
    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("reference file not found: {path}")]
    ReferenceNotFound { path: PathBuf },

    #[error("reference store is empty: no valid rate records after ingestion")]
    EmptyReferenceStore,

    #[error("similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl DsrError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DsrError::Io { path: path.into(), source }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        DsrError::Json { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, DsrError>;
