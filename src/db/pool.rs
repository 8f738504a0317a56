use crate::error::{DsrError, Result as DsrResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 创建 SQLite 连接池 (文件不存在时创建), 用于写入
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    connect(database_url, true).await
}

/// 打开已有的参考库; 文件不存在时报 ReferenceNotFound, 不会新建空库
pub async fn open_pool(database_url: &str) -> DsrResult<SqlitePool> {
    if let Some(path) = database_path(database_url) {
        if !path.is_file() {
            return Err(DsrError::ReferenceNotFound { path });
        }
    }
    Ok(connect(database_url, false).await?)
}

async fn connect(database_url: &str, create_if_missing: bool) -> Result<SqlitePool, sqlx::Error> {
    let mut connect_options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(create_if_missing)
        .journal_mode(SqliteJournalMode::Wal);

    // 设置慢查询日志阈值为 5秒
    connect_options = connect_options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(5),
    );

    SqlitePoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await
}

/// "sqlite://rates.db?mode=rwc" -> "rates.db"; 内存库返回 None
fn database_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}
