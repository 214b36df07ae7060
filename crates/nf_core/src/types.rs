use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use crate::{Error, Result};

/// A scraped news article.
///
/// `published_at` is best effort: most sources do not expose a reliable
/// publish time to a scraper, so extraction fills it with the wall-clock time.
/// `collected_at` stays `None` until a store has accepted the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    /// Truncated summary derived from `content`.
    pub description: String,
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

impl Article {
    /// The date an article is filed under: published time, else collection time.
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        self.published_at.or(self.collected_at)
    }
}

/// CSS selectors used to pull articles out of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default = "default_link_selector")]
    pub article_links: String,
    #[serde(default = "default_title_selector")]
    pub title: String,
    /// Tried in order; the first selector with at least one match wins.
    #[serde(default, deserialize_with = "one_or_many")]
    pub content: Vec<String>,
}

fn default_link_selector() -> String {
    "a".to_string()
}

fn default_title_selector() -> String {
    "h1".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Static description of a news origin and how to extract its articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub base_url: String,
    /// Listing page the article links are discovered on.
    pub url: String,
    pub selectors: Selectors,
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
}

fn default_max_articles() -> usize {
    15
}

impl SourceDescriptor {
    /// Rejects descriptors that could never yield an article.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("source name must not be empty".to_string()));
        }
        for raw in [&self.base_url, &self.url] {
            Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{} ({}): {}", raw, self.name, e)))?;
        }
        if self.max_articles == 0 {
            return Err(Error::Config(format!("{}: max_articles must be at least 1", self.name)));
        }
        Ok(())
    }
}

/// The `[from, to]` range one collection run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl CollectionWindow {
    /// Starts at the last collected row, or `lookback` before `now` on an empty store.
    pub fn compute(last_collected: Option<DateTime<Utc>>, now: DateTime<Utc>, lookback: Duration) -> Result<Self> {
        let from = match last_collected {
            Some(last) => last,
            None => now
                .checked_sub_signed(lookback)
                .ok_or_else(|| Error::Config(format!("lookback of {} hours is out of range", lookback.num_hours())))?,
        };
        Ok(Self { from, to: now })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant <= self.to
    }
}
