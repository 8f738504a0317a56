use crate::error::Result as DsrResult;
use crate::models::RateRecord;
use crate::service::store::ReferenceStore;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;

/// 每条 INSERT 的记录数 (10 列, 远低于 SQLite 绑定参数上限)
pub const INSERT_CHUNK_SIZE: usize = 500;

#[derive(Debug, FromRow)]
struct RateRow {
    code: String,
    category: String,
    chapter: String,
    section: String,
    description: String,
    unit: String,
    rate: f64,
    volume: String,
    page: i64,
    keywords: String,
}

impl From<RateRow> for RateRecord {
    fn from(row: RateRow) -> Self {
        let keywords: BTreeSet<String> = serde_json::from_str(&row.keywords).unwrap_or_else(|e| {
            tracing::warn!("Unreadable keywords for {} ({}): {}", row.code, row.category, e);
            BTreeSet::new()
        });
        Self {
            code: row.code,
            category: row.category,
            chapter: row.chapter,
            section: row.section,
            description: row.description,
            unit: row.unit,
            rate: row.rate,
            volume: row.volume,
            page: u32::try_from(row.page).unwrap_or(0),
            keywords,
        }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT code, category, chapter, section, description, unit, rate, volume, page, keywords FROM dsr_codes";

/// 建表与索引 (幂等)
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dsr_codes (
            code        TEXT NOT NULL,
            category    TEXT NOT NULL,
            chapter     TEXT NOT NULL,
            section     TEXT NOT NULL,
            description TEXT NOT NULL,
            unit        TEXT NOT NULL,
            rate        REAL NOT NULL CHECK (rate >= 0),
            volume      TEXT NOT NULL,
            page        INTEGER NOT NULL DEFAULT 0,
            keywords    TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (code, category)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_code ON dsr_codes (code)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_category_chapter ON dsr_codes (category, chapter)")
        .execute(pool)
        .await?;
    Ok(())
}

/// 清空参考库, 返回删除行数
pub async fn clear_records(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM dsr_codes").execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn count_records(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT count(*) FROM dsr_codes")
        .fetch_one(pool)
        .await
}

/// 全部记录, 按写入顺序
pub async fn list_records(pool: &SqlitePool) -> Result<Vec<RateRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RateRow>(&format!("{SELECT_COLUMNS} ORDER BY rowid"))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(RateRecord::from).collect())
}

/// 主键点查
pub async fn get_record(pool: &SqlitePool, code: &str, category: &str) -> Result<Option<RateRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, RateRow>(&format!("{SELECT_COLUMNS} WHERE code = ?1 AND category = ?2"))
        .bind(code)
        .bind(category)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(RateRecord::from))
}

/// 按 (category, chapter) 范围扫描
pub async fn list_by_chapter(pool: &SqlitePool, category: &str, chapter: &str) -> Result<Vec<RateRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RateRow>(&format!(
        "{SELECT_COLUMNS} WHERE category = ?1 AND chapter = ?2 ORDER BY rowid"
    ))
    .bind(category)
    .bind(chapter)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(RateRecord::from).collect())
}

/// 批量写入参考记录 (INSERT OR REPLACE); 关键词以 JSON 数组落库
pub async fn insert_batch(conn: &mut SqliteConnection, records: &[RateRecord]) -> Result<(), sqlx::Error> {
    if records.is_empty() {
        return Ok(());
    }

    let keywords = records
        .iter()
        .map(|record| serde_json::to_string(&record.keywords))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    tracing::debug!("Building batch insert for {} records", records.len());
    let start_time = std::time::Instant::now();

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT OR REPLACE INTO dsr_codes (
            code, category, chapter, section, description,
            unit, rate, volume, page, keywords
        ) ",
    );

    query_builder.push_values(records.iter().zip(keywords), |mut b, (record, keywords)| {
        b.push_bind(record.code.clone())
            .push_bind(record.category.clone())
            .push_bind(record.chapter.clone())
            .push_bind(record.section.clone())
            .push_bind(record.description.clone())
            .push_bind(record.unit.clone())
            .push_bind(record.rate)
            .push_bind(record.volume.clone())
            .push_bind(i64::from(record.page))
            .push_bind(keywords);
    });

    // 添加超时控制: 30秒
    let execute_result = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        query_builder.build().execute(conn),
    )
    .await;

    match execute_result {
        Ok(Ok(result)) => {
            tracing::debug!(
                "Inserted {} rows in {:?}",
                result.rows_affected(),
                start_time.elapsed()
            );
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("Batch insert failed after {:?}: {:?}", start_time.elapsed(), e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("Batch insert timed out (>30s)");
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// 用合并后的参考库整体替换表内容, 返回写入条数
///
/// 清空与所有分块写入在同一事务中; 任一分块失败时回滚, 表内保持原有记录。
pub async fn save_store(pool: &SqlitePool, store: &ReferenceStore) -> DsrResult<usize> {
    create_schema(pool).await?;

    let mut tx = pool.begin().await?;
    let removed = clear_records(&mut *tx).await?;
    if removed > 0 {
        tracing::info!("Replacing {} existing reference rows", removed);
    }

    let records = store.records();
    for (idx, chunk) in records.chunks(INSERT_CHUNK_SIZE).enumerate() {
        if let Err(e) = insert_batch(&mut *tx, chunk).await {
            tracing::error!("Saving chunk {} failed, rolling back: {}", idx + 1, e);
            tx.rollback().await?;
            return Err(e.into());
        }
        tracing::debug!("Saved chunk {} ({} records)", idx + 1, chunk.len());
    }
    tx.commit().await?;

    tracing::info!("Saved {} reference records to database", records.len());
    Ok(records.len())
}

/// 读出全部记录并重建内存索引; 空表得到空库, 由调用方决定是否报错
pub async fn load_store(pool: &SqlitePool) -> DsrResult<ReferenceStore> {
    create_schema(pool).await?;
    let records = list_records(pool).await?;
    tracing::info!("Loaded {} reference records from database", records.len());
    Ok(ReferenceStore::from_records(records))
}
