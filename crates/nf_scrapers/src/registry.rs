use nf_core::{Error, Result, Selectors, SourceDescriptor};
use std::path::Path;
use tracing::info;

fn source(
    name: &str,
    base_url: &str,
    url: &str,
    article_links: &str,
    content: &[&str],
    max_articles: usize,
) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        base_url: base_url.to_string(),
        url: url.to_string(),
        selectors: Selectors {
            article_links: article_links.to_string(),
            title: "h1".to_string(),
            content: content.iter().map(|s| s.to_string()).collect(),
        },
        max_articles,
    }
}

/// Built-in sources, scraped in this order.
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        source(
            "BBC News",
            "https://www.bbc.com",
            "https://www.bbc.com/news",
            r#"a[href*="/news/"]"#,
            &[r#"div[data-component="text-block"]"#, "article"],
            15,
        ),
        source(
            "Reuters",
            "https://www.reuters.com",
            "https://www.reuters.com/world/",
            r#"a[href*="/world/"]"#,
            &[r#"div[data-testid="ArticleBody"]"#, r#"div[class*="ArticleBody"]"#],
            15,
        ),
        source(
            "CNN",
            "https://www.cnn.com",
            "https://www.cnn.com/world",
            r#"a[href*="/20"]"#,
            &[".article__content", "article"],
            10,
        ),
        source(
            "Al Jazeera",
            "https://www.aljazeera.com",
            "https://www.aljazeera.com/news/",
            r#"a[href*="/news/"]"#,
            &[".wysiwyg", ".article-content"],
            10,
        ),
        source(
            "The Guardian",
            "https://www.theguardian.com",
            "https://www.theguardian.com/world",
            r#"a[href*="/world/"]"#,
            &[".article-body-commercial-selector", "article"],
            10,
        ),
        source(
            "Financial Times",
            "https://www.ft.com",
            "https://www.ft.com/world",
            r#"a[href*="/content/"]"#,
            &[".article__content", ".content-body"],
            8,
        ),
        source(
            "AP News",
            "https://apnews.com",
            "https://apnews.com/hub/world-news",
            r#"a[href*="/article/"]"#,
            &[".RichTextStoryBody", ".Article"],
            12,
        ),
        source(
            "Bloomberg",
            "https://www.bloomberg.com",
            "https://www.bloomberg.com/world",
            r#"a[href*="/news/articles/"]"#,
            &[".body-copy", ".article-body"],
            8,
        ),
    ]
}

/// Read a JSON array of descriptors, replacing the built-in table.
pub fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let raw = std::fs::read_to_string(path)?;
    let sources: Vec<SourceDescriptor> = serde_json::from_str(&raw)?;
    if sources.is_empty() {
        return Err(Error::Config(format!("{} defines no sources", path.display())));
    }
    for descriptor in &sources {
        descriptor.validate()?;
    }
    info!(path = %path.display(), count = sources.len(), "Loaded news sources");
    Ok(sources)
}
