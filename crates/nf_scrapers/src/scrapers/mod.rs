//! Selector-driven article extraction.
//!
//! Every source is scraped by the same [`SourceScraper`]; what differs between
//! outlets lives entirely in their [`SourceDescriptor`] selectors.

use chrono::{DateTime, Utc};
use nf_core::{Article, Error, Result, SourceDescriptor};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::fetcher::{fetch_document, PageFetcher};

pub mod jsonld;

pub const TITLE_PLACEHOLDER: &str = "No title";
pub const DESCRIPTION_CHARS: usize = 300;
pub const FALLBACK_PARAGRAPHS: usize = 15;

/// Scrapes one source through a shared fetcher.
pub struct SourceScraper<'a> {
    descriptor: &'a SourceDescriptor,
    fetcher: &'a dyn PageFetcher,
}

impl<'a> SourceScraper<'a> {
    pub fn new(descriptor: &'a SourceDescriptor, fetcher: &'a dyn PageFetcher) -> Self {
        Self { descriptor, fetcher }
    }

    /// Fetch the listing page and return candidate article URLs.
    pub async fn get_article_urls(&self) -> Result<Vec<String>> {
        let document = fetch_document(self.fetcher, &self.descriptor.url).await?;
        let urls = extract_links(&document, self.descriptor)?;
        info!(source = %self.descriptor.name, count = urls.len(), "Indexed article URLs");
        Ok(urls)
    }

    /// Fetch and extract one article. Failures are logged and yield `None`.
    pub async fn scrape_article(&self, url: &str) -> Option<Article> {
        match fetch_document(self.fetcher, url).await {
            Ok(document) => {
                let article = parse_article(&document, url, self.descriptor, Utc::now());
                debug!(%url, title = %article.title, bytes = article.content.len(), "Parsed article");
                Some(article)
            }
            Err(e) => {
                warn!(source = %self.descriptor.name, %url, error = %e, "Article fetch failed");
                None
            }
        }
    }
}

/// Same-site check used to discard off-site links.
pub fn is_same_site(descriptor: &SourceDescriptor, url: &str) -> bool {
    url.contains(descriptor.base_url.trim_end_matches('/'))
}

/// Candidate article links on a listing page: resolved against the base URL,
/// restricted to the same site, deduplicated in document order and capped.
pub fn extract_links(document: &Html, descriptor: &SourceDescriptor) -> Result<Vec<String>> {
    let selector = utils::parse_selector(&descriptor.selectors.article_links)?;
    let base = utils::parse_url(&descriptor.base_url)?;

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for element in document.select(&selector) {
        if urls.len() >= descriptor.max_articles {
            break;
        }
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            debug!(%href, "Unresolvable link");
            continue;
        };
        resolved.set_fragment(None);
        let resolved = resolved.to_string();
        if !is_same_site(descriptor, &resolved) {
            continue;
        }
        if seen.insert(resolved.clone()) {
            urls.push(resolved);
        }
    }
    Ok(urls)
}

/// Pull title, content and description out of an article page.
///
/// Never fails: a missing title becomes [`TITLE_PLACEHOLDER`], and when no
/// content selector matches the first paragraphs of the page are used.
pub fn parse_article(document: &Html, url: &str, descriptor: &SourceDescriptor, now: DateTime<Utc>) -> Article {
    let title = extract_title(document, &descriptor.selectors.title);
    let content = extract_content(document, &descriptor.selectors.content);
    let description = describe(&content);
    let published_at = jsonld::extract_published_at(document).unwrap_or(now);

    Article {
        url: url.to_string(),
        title,
        description,
        content,
        source: descriptor.name.clone(),
        published_at: Some(published_at),
        collected_at: None,
    }
}

fn extract_title(document: &Html, selector: &str) -> String {
    match utils::extract_text(document, selector) {
        Ok(title) if !title.is_empty() => title,
        Ok(_) => TITLE_PLACEHOLDER.to_string(),
        Err(e) => {
            debug!(error = %e, "Falling back to title placeholder");
            TITLE_PLACEHOLDER.to_string()
        }
    }
}

fn extract_content(document: &Html, selectors: &[String]) -> String {
    for raw in selectors {
        let selector = match utils::parse_selector(raw) {
            Ok(selector) => selector,
            Err(e) => {
                warn!(error = %e, "Skipping content selector");
                continue;
            }
        };
        let texts: Vec<String> = document.select(&selector).map(element_text).collect();
        if !texts.is_empty() {
            let content = join_non_empty(texts);
            if !content.is_empty() {
                return content;
            }
            break;
        }
    }

    let Ok(paragraphs) = utils::parse_selector("p") else {
        return String::new();
    };
    join_non_empty(
        document
            .select(&paragraphs)
            .take(FALLBACK_PARAGRAPHS)
            .map(element_text)
            .collect(),
    )
}

fn element_text(element: ElementRef<'_>) -> String {
    utils::normalize_whitespace(&element.text().collect::<String>())
}

fn join_non_empty(texts: Vec<String>) -> String {
    texts
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First 300 characters of the content, with `...` when truncated.
pub fn describe(content: &str) -> String {
    match content.char_indices().nth(DESCRIPTION_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use super::*;

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn parse_selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector).map_err(|e| Error::Selector(format!("{:?}: {}", selector, e)))
    }

    /// Text of the first element matching `selector`.
    pub fn extract_text(document: &Html, selector: &str) -> Result<String> {
        let parsed = parse_selector(selector)?;
        document
            .select(&parsed)
            .next()
            .map(element_text)
            .ok_or_else(|| Error::Parse(format!("No element found for selector: {}", selector)))
    }

    pub fn normalize_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
