use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nf_core::{Article, ArticleStorage, Result};
use std::cmp::Ordering;
use tokio::sync::RwLock;

/// Same ordering as the SQLite backend: collected desc, published desc, url asc.
fn newest_first(a: &Article, b: &Article) -> Ordering {
    b.collected_at
        .cmp(&a.collected_at)
        .then_with(|| b.published_at.cmp(&a.published_at))
        .then_with(|| a.url.cmp(&b.url))
}

/// Process-local store with the same insert-or-ignore semantics as SQLite.
#[derive(Default)]
pub struct MemoryStorage {
    articles: RwLock<Vec<Article>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn insert_or_ignore(&self, articles: &[Article], collected_at: DateTime<Utc>) -> Result<usize> {
        let mut store = self.articles.write().await;
        let mut inserted = 0;
        for article in articles {
            if store.iter().any(|existing| existing.url == article.url) {
                continue;
            }
            let mut row = article.clone();
            row.collected_at = Some(collected_at);
            store.push(row);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>> {
        let store = self.articles.read().await;
        let mut rows: Vec<Article> = store
            .iter()
            .filter(|a| a.collected_at.map_or(false, |at| at >= since))
            .cloned()
            .collect();
        rows.sort_by(newest_first);
        Ok(rows)
    }

    async fn query_all(&self) -> Result<Vec<Article>> {
        let mut rows = self.articles.read().await.clone();
        rows.sort_by(newest_first);
        Ok(rows)
    }

    async fn last_collected_at(&self) -> Result<Option<DateTime<Utc>>> {
        let store = self.articles.read().await;
        Ok(store.iter().filter_map(|a| a.collected_at).max())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.articles.read().await.len() as u64)
    }
}
