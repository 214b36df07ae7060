use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::types::Article;
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert every article whose URL is not stored yet, stamping each new row
    /// with `collected_at`. Returns how many rows were actually inserted.
    async fn insert_or_ignore(&self, articles: &[Article], collected_at: DateTime<Utc>) -> Result<usize>;

    /// Rows with `collected_at >= since`, newest first.
    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>>;

    /// Every row, newest first.
    async fn query_all(&self) -> Result<Vec<Article>>;

    /// `max(collected_at)`, or `None` on an empty store.
    async fn last_collected_at(&self) -> Result<Option<DateTime<Utc>>>;

    async fn count(&self) -> Result<u64>;
}
