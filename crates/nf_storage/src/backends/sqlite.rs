use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use nf_core::{Article, ArticleStorage, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news_articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        content TEXT,
        url TEXT UNIQUE,
        source TEXT,
        published_at TEXT,
        collected_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f', 'now') || '000Z')
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_collected_at ON news_articles(collected_at)",
    "CREATE INDEX IF NOT EXISTS idx_published_at ON news_articles(published_at)",
    "CREATE INDEX IF NOT EXISTS idx_source ON news_articles(source)",
];

const SELECT_COLUMNS: &str =
    "SELECT title, description, content, url, source, published_at, collected_at FROM news_articles";

const NEWEST_FIRST: &str = "ORDER BY collected_at DESC, published_at DESC, url ASC";

/// Fixed-width UTC text so that string order in SQLite matches time order.
pub(crate) fn to_db_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS` form SQLite's own
/// `CURRENT_TIMESTAMP` produces.
pub(crate) fn from_db_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Storage(format!("Failed to parse timestamp {:?}: {}", raw, e)))
}

fn storage_err(context: &str) -> impl Fn(sqlx::Error) -> Error + '_ {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SQLiteStorage {
    /// Opens (creating if needed) the database at `db_path` and applies the schema.
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage_err("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }
        info!(path = %db_path.display(), "Database ready");

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn fetch_articles(&self, sql: &str, since: Option<DateTime<Utc>>) -> Result<Vec<Article>> {
        let mut query = sqlx::query(sql);
        if let Some(since) = since {
            query = query.bind(to_db_timestamp(since));
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("Failed to query articles"))?;
        rows.iter().map(row_to_article).collect()
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let get_text = |column: &str| -> Result<Option<String>> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| Error::Storage(format!("Failed to read column {}: {}", column, e)))
    };

    let published_at = get_text("published_at")?
        .filter(|raw| !raw.is_empty())
        .map(|raw| from_db_timestamp(&raw))
        .transpose()?;
    let collected_at = get_text("collected_at")?
        .map(|raw| from_db_timestamp(&raw))
        .transpose()?;

    Ok(Article {
        title: get_text("title")?.unwrap_or_default(),
        description: get_text("description")?.unwrap_or_default(),
        content: get_text("content")?.unwrap_or_default(),
        url: get_text("url")?.unwrap_or_default(),
        source: get_text("source")?.unwrap_or_else(|| "Unknown".to_string()),
        published_at,
        collected_at,
    })
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn insert_or_ignore(&self, articles: &[Article], collected_at: DateTime<Utc>) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let collected = to_db_timestamp(collected_at);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_err("Failed to begin transaction"))?;

        let mut inserted = 0;
        for article in articles {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO news_articles
                (title, description, content, url, source, published_at, collected_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.title)
            .bind(&article.description)
            .bind(&article.content)
            .bind(&article.url)
            .bind(&article.source)
            .bind(article.published_at.map(to_db_timestamp))
            .bind(&collected)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to store article"))?;

            if result.rows_affected() > 0 {
                inserted += 1;
            } else {
                debug!(url = %article.url, "Skipping duplicate article");
            }
        }

        tx.commit()
            .await
            .map_err(storage_err("Failed to commit articles"))?;
        Ok(inserted)
    }

    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>> {
        let sql = format!("{} WHERE collected_at >= ? {}", SELECT_COLUMNS, NEWEST_FIRST);
        self.fetch_articles(&sql, Some(since)).await
    }

    async fn query_all(&self) -> Result<Vec<Article>> {
        let sql = format!("{} {}", SELECT_COLUMNS, NEWEST_FIRST);
        self.fetch_articles(&sql, None).await
    }

    async fn last_collected_at(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(collected_at) AS last FROM news_articles")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err("Failed to read last collection time"))?;
        let last: Option<String> = row
            .try_get("last")
            .map_err(storage_err("Failed to read last collection time"))?;
        last.map(|raw| from_db_timestamp(&raw)).transpose()
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM news_articles")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err("Failed to count articles"))?;
        let n: i64 = row.try_get("n").map_err(storage_err("Failed to count articles"))?;
        Ok(n.max(0) as u64)
    }
}
