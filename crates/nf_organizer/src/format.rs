use chrono::{DateTime, SecondsFormat, Utc};
use nf_core::Article;

const BANNER_WIDTH: usize = 80;

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

/// Render the plain-text file written for one article.
pub fn format_article(article: &Article) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let section = |title: &str| format!("{banner}\n{title}\n{banner}\n");

    let mut out = String::new();
    out.push_str(&section("NEWS ARTICLE"));
    out.push('\n');
    out.push_str(&format!("Title: {}\n", article.title));
    out.push_str(&format!("Source: {}\n", article.source));
    out.push_str(&format!("URL: {}\n", article.url));
    out.push_str(&format!("Published: {}\n", timestamp(article.published_at)));
    out.push_str(&format!("Collected: {}\n", timestamp(article.collected_at)));
    out.push('\n');
    out.push_str(&section("DESCRIPTION"));
    out.push('\n');
    out.push_str(or_placeholder(&article.description, "No description"));
    out.push_str("\n\n");
    out.push_str(&section("FULL CONTENT"));
    out.push('\n');
    out.push_str(or_placeholder(&article.content, "No content"));
    out.push_str("\n\n");
    out.push_str(&banner);
    out.push_str("\nEND OF ARTICLE\n");
    out.push_str(&banner);
    out
}
