use async_trait::async_trait;
use jiff::Timestamp;
use shrink_core::error::StorageError;
use shrink_core::repository::{ConflictKey, InsertOutcome, Repository, Result, UrlRecord};
use shrink_core::ShortCode;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{MySqlPool, Row};
use std::time::Duration;

/// Schema for the `short_urls` table.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

const URL_INDEX: &str = "uk_short_urls_original_url_hash";
const CODE_INDEX: &str = "uk_short_urls_short_code";

/// MySQL implementation of the repository contract.
///
/// Both keys are protected by unique indexes, so concurrent writers are
/// arbitrated by the database: the losing `INSERT` fails with a duplicate
/// key error, reported as [`InsertOutcome::Conflict`]. The URL index is
/// built over a SHA-256 of the URL so arbitrarily long URLs stay indexable;
/// lookups compare the full URL as well.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_created_at(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid created_at timestamp '{}': {e}", seconds))
    })
}

fn row_to_record(row: MySqlRow) -> Result<UrlRecord> {
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(UrlRecord {
        original_url,
        short_code: ShortCode::new_unchecked(short_code),
        created_at: parse_created_at(created_at)?,
    })
}

/// Identifies the violated key from a duplicate-entry error.
///
/// MySQL reports `Duplicate entry '...' for key 'short_urls.<index>'`.
fn conflict_key(err: &sqlx::Error) -> Option<ConflictKey> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }

    let message = db_err.message();
    let key = if message.contains(URL_INDEX) {
        ConflictKey::OriginalUrl
    } else if message.contains(CODE_INDEX) {
        ConflictKey::ShortCode
    } else {
        ConflictKey::Unknown
    };
    Some(key)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, short_code, created_at
            FROM short_urls
            WHERE original_url_hash = UNHEX(SHA2(?, 256))
              AND original_url = ?
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(row_to_record).transpose()
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, short_code, created_at
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(row_to_record).transpose()
    }

    async fn try_insert(&self, record: UrlRecord) -> Result<InsertOutcome> {
        let created_at = record.created_at.as_second();

        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (original_url, short_code, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.original_url)
        .bind(record.short_code.as_str())
        .bind(created_at)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) => match conflict_key(&err) {
                Some(key) => Ok(InsertOutcome::Conflict(key)),
                None => Err(map_sqlx_error(err)),
            },
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
