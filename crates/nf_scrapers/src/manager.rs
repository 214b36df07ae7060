use chrono::{DateTime, Duration as ChronoDuration, SubsecRound, Utc};
use nf_core::{Article, ArticleStorage, CollectionWindow, Result, SourceDescriptor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::fetcher::{HttpFetcher, PageFetcher, DEFAULT_TIMEOUT};
use crate::scrapers::SourceScraper;
use crate::state::RunState;

/// Explicit context for a collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// How far back a first run (empty store) reaches.
    pub lookback: ChronoDuration,
    /// Pause after every article fetch.
    pub article_delay: Duration,
    /// Pause between two sources.
    pub source_delay: Duration,
    /// Per-request timeout for [`HttpFetcher`].
    pub request_timeout: Duration,
    /// Where the last run's summary is written, if anywhere.
    pub state_file: Option<PathBuf>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            lookback: ChronoDuration::hours(24),
            article_delay: Duration::from_millis(500),
            source_delay: Duration::from_secs(2),
            request_timeout: DEFAULT_TIMEOUT,
            state_file: None,
        }
    }
}

/// What happened to one source during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: String,
    pub candidates: usize,
    pub extracted: usize,
    pub inserted: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub window: CollectionWindow,
    pub first_run: bool,
    pub new_articles: usize,
    pub sources: Vec<SourceOutcome>,
    /// Every stored row collected inside `window`.
    pub articles: Vec<Article>,
}

impl CollectionReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}

/// Runs sources one after another and writes their articles to the store.
pub struct ScraperManager {
    storage: Arc<dyn ArticleStorage>,
    fetcher: Arc<dyn PageFetcher>,
    sources: Vec<SourceDescriptor>,
    config: CollectorConfig,
}

impl ScraperManager {
    pub fn new(
        storage: Arc<dyn ArticleStorage>,
        fetcher: Arc<dyn PageFetcher>,
        sources: Vec<SourceDescriptor>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            storage,
            fetcher,
            sources,
            config,
        }
    }

    /// Manager backed by a real HTTP client.
    pub fn with_http(
        storage: Arc<dyn ArticleStorage>,
        sources: Vec<SourceDescriptor>,
        config: CollectorConfig,
    ) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(config.request_timeout)?);
        Ok(Self::new(storage, fetcher, sources, config))
    }

    /// The window a run starting at `now` would cover, and whether it is a first run.
    pub async fn collection_window(&self, now: DateTime<Utc>) -> Result<(CollectionWindow, bool)> {
        let last = self.storage.last_collected_at().await?;
        Ok((CollectionWindow::compute(last, now, self.config.lookback)?, last.is_none()))
    }

    /// Collect from every source in order. Rows inserted by this run are
    /// stamped with `now`, which is also the end of the window.
    pub async fn run_collection(&self, now: DateTime<Utc>) -> Result<CollectionReport> {
        // Stored timestamps keep microseconds.
        let now = now.trunc_subsecs(6);
        let (window, first_run) = self.collection_window(now).await?;
        if first_run {
            info!(from = %window.from, to = %window.to, "🆕 First collection, using default lookback");
        } else {
            info!(from = %window.from, to = %window.to, "⏩ Incremental collection");
        }

        let mut outcomes = Vec::with_capacity(self.sources.len());
        for (i, descriptor) in self.sources.iter().enumerate() {
            if i > 0 {
                pause(self.config.source_delay).await;
            }
            let outcome = match self.collect_source(descriptor, window.to).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(source = %descriptor.name, error = %e, "Source failed; skipping");
                    SourceOutcome {
                        source: descriptor.name.clone(),
                        error: Some(e.to_string()),
                        ..Default::default()
                    }
                }
            };
            outcomes.push(outcome);
        }

        let new_articles = outcomes.iter().map(|o| o.inserted).sum();
        let articles = self
            .storage
            .query_since(window.from)
            .await?
            .into_iter()
            .filter(|a| a.collected_at.map_or(false, |at| window.contains(at)))
            .collect::<Vec<_>>();

        let report = CollectionReport {
            window,
            first_run,
            new_articles,
            sources: outcomes,
            articles,
        };
        info!(
            new_articles = report.new_articles,
            available = report.articles.len(),
            failed_sources = report.failed_sources().count(),
            "✅ Collection finished"
        );

        self.record_state(&report);
        Ok(report)
    }

    async fn collect_source(&self, descriptor: &SourceDescriptor, collected_at: DateTime<Utc>) -> Result<SourceOutcome> {
        info!(source = %descriptor.name, url = %descriptor.url, "🦗 Scraping source");
        let scraper = SourceScraper::new(descriptor, self.fetcher.as_ref());
        let urls = scraper.get_article_urls().await?;

        let mut batch = Vec::new();
        for url in &urls {
            if let Some(article) = scraper.scrape_article(url).await {
                batch.push(article);
            }
            pause(self.config.article_delay).await;
        }

        let inserted = self.storage.insert_or_ignore(&batch, collected_at).await?;
        info!(
            source = %descriptor.name,
            candidates = urls.len(),
            extracted = batch.len(),
            inserted,
            "💾 Stored articles"
        );

        Ok(SourceOutcome {
            source: descriptor.name.clone(),
            candidates: urls.len(),
            extracted: batch.len(),
            inserted,
            error: None,
        })
    }

    fn record_state(&self, report: &CollectionReport) {
        let Some(path) = &self.config.state_file else {
            return;
        };
        let state = RunState {
            last_collection_start: report.window.from,
            last_collection_end: report.window.to,
            first_run: report.first_run,
            new_articles: report.new_articles,
            sources_failed: report.failed_sources().map(|s| s.source.clone()).collect(),
        };
        if let Err(e) = state.save(path) {
            warn!(path = %path.display(), error = %e, "Failed to save run state");
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use nf_core::{Error, Selectors};
    use nf_storage::{MemoryStorage, SQLiteStorage};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Serves canned pages and records every request.
    #[derive(Default)]
    struct StaticFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Network(format!("404 for {}", url)))
        }
    }

    fn descriptor(name: &str, base: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            base_url: base.to_string(),
            url: format!("{}/news", base),
            selectors: Selectors {
                article_links: "a.story".to_string(),
                title: "h1".to_string(),
                content: vec!["div.body".to_string()],
            },
            max_articles: 5,
        }
    }

    fn quiet_config() -> CollectorConfig {
        CollectorConfig {
            article_delay: Duration::ZERO,
            source_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn listing(paths: &[&str]) -> String {
        paths
            .iter()
            .map(|p| format!(r#"<a class="story" href="{}">link</a>"#, p))
            .collect()
    }

    fn article_page(title: &str) -> String {
        format!("<h1>{}</h1><div class=\"body\">Body of {}</div>", title, title)
    }

    fn alpha_fetcher() -> StaticFetcher {
        StaticFetcher::default()
            .page("https://alpha.test/news", &listing(&["/a/1", "/a/2", "/a/missing"]))
            .page("https://alpha.test/a/1", &article_page("Alpha one"))
            .page("https://alpha.test/a/2", &article_page("Alpha two"))
    }

    #[tokio::test]
    async fn test_first_run_window_and_inserted_rows() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = ScraperManager::new(
            storage.clone(),
            Arc::new(alpha_fetcher()),
            vec![descriptor("Alpha", "https://alpha.test")],
            quiet_config(),
        );
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        let report = manager.run_collection(now).await.unwrap();

        assert!(report.first_run);
        assert_eq!(report.window.from, now - ChronoDuration::hours(24));
        assert_eq!(report.window.to, now);
        assert_eq!(report.new_articles, 2);
        assert_eq!(report.sources[0].candidates, 3);
        assert_eq!(report.sources[0].extracted, 2);
        assert_eq!(report.articles.len(), 2);
        for article in &report.articles {
            assert!(report.window.contains(article.collected_at.unwrap()));
        }
        assert_eq!(storage.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_second_run_starts_where_first_ended() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(SQLiteStorage::new_with_path(&temp_dir.path().join("news.db")).await.unwrap());
        let manager = ScraperManager::new(
            storage.clone(),
            Arc::new(alpha_fetcher()),
            vec![descriptor("Alpha", "https://alpha.test")],
            quiet_config(),
        );
        let first_now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let second_now = first_now + ChronoDuration::hours(3);

        let first = manager.run_collection(first_now).await.unwrap();
        let second = manager.run_collection(second_now).await.unwrap();

        assert!(!second.first_run);
        assert_eq!(second.window.from, first.window.to);
        assert!(second.window.from >= first.window.from);
        assert_eq!(second.new_articles, 0);
        assert_eq!(storage.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_stop_the_run() {
        let fetcher = alpha_fetcher()
            .page("https://beta.test/news", &listing(&["/b/1"]))
            .page("https://beta.test/b/1", &article_page("Beta one"));
        let storage = Arc::new(MemoryStorage::new());
        let manager = ScraperManager::new(
            storage.clone(),
            Arc::new(fetcher),
            vec![
                descriptor("Down", "https://down.test"),
                descriptor("Alpha", "https://alpha.test"),
                descriptor("Beta", "https://beta.test"),
            ],
            quiet_config(),
        );

        let report = manager.run_collection(Utc::now()).await.unwrap();

        assert_eq!(report.sources.len(), 3);
        assert!(report.sources[0].error.is_some());
        assert_eq!(report.sources[0].inserted, 0);
        assert_eq!(report.sources[1].inserted, 2);
        assert_eq!(report.sources[2].inserted, 1);
        assert_eq!(report.new_articles, 3);
        assert_eq!(report.failed_sources().count(), 1);
    }

    #[tokio::test]
    async fn test_sources_are_processed_in_order() {
        let fetcher = Arc::new(
            alpha_fetcher()
                .page("https://beta.test/news", &listing(&["/b/1"]))
                .page("https://beta.test/b/1", &article_page("Beta one")),
        );
        let manager = ScraperManager::new(
            Arc::new(MemoryStorage::new()),
            fetcher.clone(),
            vec![descriptor("Alpha", "https://alpha.test"), descriptor("Beta", "https://beta.test")],
            quiet_config(),
        );

        manager.run_collection(Utc::now()).await.unwrap();

        let requests = fetcher.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                "https://alpha.test/news",
                "https://alpha.test/a/1",
                "https://alpha.test/a/2",
                "https://alpha.test/a/missing",
                "https://beta.test/news",
                "https://beta.test/b/1",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_state_is_recorded() {
        let temp_dir = tempdir().unwrap();
        let state_file = temp_dir.path().join("scraper_state.json");
        let config = CollectorConfig {
            state_file: Some(state_file.clone()),
            ..quiet_config()
        };
        let manager = ScraperManager::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(alpha_fetcher()),
            vec![descriptor("Alpha", "https://alpha.test"), descriptor("Down", "https://down.test")],
            config,
        );
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        manager.run_collection(now).await.unwrap();

        let state = RunState::load(&state_file).unwrap().unwrap();
        assert_eq!(state.last_collection_end, now);
        assert_eq!(state.new_articles, 2);
        assert!(state.first_run);
        assert_eq!(state.sources_failed, vec!["Down".to_string()]);
    }
}
