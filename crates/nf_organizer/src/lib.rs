//! Mirrors stored articles into a `source/year/month/day` tree of text files.
//!
//! The tree is derived data: it can be rebuilt from the store at any time and
//! nothing in it is read back by the collector. Files are never overwritten;
//! a name clash gets a numeric suffix instead.

use chrono::{DateTime, Duration, Utc};
use nf_core::{Article, ArticleStorage, Error, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub mod format;
pub mod naming;
pub mod stats;

pub use format::format_article;
pub use naming::{sanitize_filename, sanitize_source};
pub use stats::{MonthStats, OrganizationStats, SourceStats, YearStats};

/// Articles written per source name.
pub type OrganizeSummary = BTreeMap<String, usize>;

pub struct DataOrganizer {
    root: PathBuf,
}

impl DataOrganizer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/<source>/<YYYY>/<MM>/<DD>` for an article dated `date`.
    pub fn day_dir(&self, source: &str, date: DateTime<Utc>) -> PathBuf {
        self.root
            .join(sanitize_source(source))
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(date.format("%d").to_string())
    }

    /// Write one file per article. Articles without any timestamp are filed
    /// under `now`. A failed write is logged and left out of the summary.
    pub fn organize(&self, articles: &[Article], now: DateTime<Utc>) -> OrganizeSummary {
        let mut summary = OrganizeSummary::new();
        if articles.is_empty() {
            warn!("No articles to organize");
            return summary;
        }

        for article in articles {
            match self.write_article(article, now) {
                Ok(path) => {
                    debug!(path = %path.display(), "Saved article");
                    *summary.entry(article.source.clone()).or_default() += 1;
                }
                Err(e) => error!(url = %article.url, title = %article.title, error = %e, "Failed to save article"),
            }
        }

        let written: usize = summary.values().sum();
        info!(written, root = %self.root.display(), "📂 Organization completed");
        for (source, count) in &summary {
            info!("  {}: {} articles organized", source, count);
        }
        summary
    }

    /// Write an article and return the path it landed on.
    pub fn write_article(&self, article: &Article, now: DateTime<Utc>) -> Result<PathBuf> {
        let date = article.effective_date().unwrap_or(now);
        let dir = self.day_dir(&article.source, date);
        fs::create_dir_all(&dir)?;

        let base = format!("{}_{}", sanitize_filename(&article.title), date.format("%H%M%S"));
        let body = format_article(article);

        let mut counter = 0usize;
        loop {
            let name = if counter == 0 {
                format!("{}.txt", base)
            } else {
                format!("{}_{}.txt", base, counter)
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(body.as_bytes())?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn statistics(&self) -> Result<OrganizationStats> {
        stats::collect_statistics(&self.root)
    }

    /// Organize every stored article.
    pub async fn organize_all(&self, storage: &dyn ArticleStorage, now: DateTime<Utc>) -> Result<OrganizeSummary> {
        info!("Starting full data organization...");
        let articles = storage.query_all().await?;
        Ok(self.organize(&articles, now))
    }

    /// Organize articles collected within the last `days` days.
    pub async fn organize_recent(
        &self,
        storage: &dyn ArticleStorage,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<OrganizeSummary> {
        let since = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| Error::Config(format!("{} days is out of range", days)))?;
        info!(days, %since, "Organizing recent data");
        let articles = storage.query_since(since).await?;
        Ok(self.organize(&articles, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nf_storage::MemoryStorage;
    use tempfile::tempdir;

    fn article(url: &str, title: &str, source: &str, published: DateTime<Utc>) -> Article {
        Article {
            url: url.to_string(),
            title: title.to_string(),
            description: "Summary".to_string(),
            content: "Body".to_string(),
            source: source.to_string(),
            published_at: Some(published),
            collected_at: None,
        }
    }

    #[test]
    fn test_colliding_titles_get_suffixes() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path());
        let when = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap();
        let articles = vec![
            article("https://a.test/1", "Same story", "A Source", when),
            article("https://a.test/2", "Same story", "A Source", when),
            article("https://a.test/3", "Same story?", "A Source", when),
        ];

        let summary = organizer.organize(&articles, Utc::now());
        assert_eq!(summary["A Source"], 3);

        let day = dir.path().join("A_Source/2024/05/01");
        assert!(day.join("Same_story_093015.txt").is_file());
        assert!(day.join("Same_story_093015_1.txt").is_file());
        assert!(day.join("Same_story_093015_2.txt").is_file());

        let first = fs::read_to_string(day.join("Same_story_093015.txt")).unwrap();
        assert!(first.contains("URL: https://a.test/1"));
    }

    #[test]
    fn test_existing_files_are_never_overwritten() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path());
        let when = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let day = organizer.day_dir("Src", when);
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("Title_000000.txt"), "keep me").unwrap();

        let path = organizer
            .write_article(&article("https://s.test/x", "Title", "Src", when), when)
            .unwrap();

        assert_eq!(path, day.join("Title_000000_1.txt"));
        assert_eq!(fs::read_to_string(day.join("Title_000000.txt")).unwrap(), "keep me");
    }

    #[test]
    fn test_date_falls_back_to_collected_then_now() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path());
        let collected = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 7, 8, 9, 10).unwrap();

        let mut by_collected = article("https://s.test/1", "One", "Src", collected);
        by_collected.published_at = None;
        by_collected.collected_at = Some(collected);
        let mut undated = article("https://s.test/2", "Two", "Src", collected);
        undated.published_at = None;

        assert_eq!(
            organizer.write_article(&by_collected, now).unwrap(),
            dir.path().join("Src/2023/01/02/One_030405.txt")
        );
        assert_eq!(
            organizer.write_article(&undated, now).unwrap(),
            dir.path().join("Src/2025/06/07/Two_080910.txt")
        );
    }

    #[test]
    fn test_rerun_adds_numbered_copies() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path());
        let when = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let articles = vec![article("https://a.test/1", "Story", "Src", when)];

        organizer.organize(&articles, when);
        organizer.organize(&articles, when);

        let stats = organizer.statistics().unwrap();
        assert_eq!(stats.total_articles, 2);
    }

    #[test]
    fn test_organize_nothing() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path().join("news_data"));
        assert!(organizer.organize(&[], Utc::now()).is_empty());
        assert!(!organizer.root().exists());
    }

    #[test]
    fn test_long_multibyte_title_is_written() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path());
        let when = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let articles = vec![article("https://s.test/cjk", &"经".repeat(120), "Src", when)];

        let summary = organizer.organize(&articles, when);

        assert_eq!(summary["Src"], 1);
        assert_eq!(organizer.statistics().unwrap().total_articles, 1);
    }

    #[tokio::test]
    async fn test_organize_recent_rejects_out_of_range_days() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path());
        let storage = MemoryStorage::new();

        let result = organizer.organize_recent(&storage, u32::MAX, Utc::now()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_organize_recent_uses_collection_time() {
        let dir = tempdir().unwrap();
        let organizer = DataOrganizer::new(dir.path());
        let storage = MemoryStorage::new();
        let now = Utc.with_ymd_and_hms(2024, 8, 31, 12, 0, 0).unwrap();
        let published = Utc.with_ymd_and_hms(2024, 8, 1, 6, 0, 0).unwrap();

        storage
            .insert_or_ignore(&[article("https://s.test/old", "Old", "Src", published)], now - Duration::days(40))
            .await
            .unwrap();
        storage
            .insert_or_ignore(&[article("https://s.test/new", "New", "Src", published)], now - Duration::days(2))
            .await
            .unwrap();

        let recent = organizer.organize_recent(&storage, 30, now).await.unwrap();
        assert_eq!(recent["Src"], 1);
        assert!(dir.path().join("Src/2024/08/01/New_060000.txt").is_file());

        let all = organizer.organize_all(&storage, now).await.unwrap();
        assert_eq!(all["Src"], 2);
        assert_eq!(organizer.statistics().unwrap().total_articles, 3);
    }
}
