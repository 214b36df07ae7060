use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::Value;

/// Best-effort publish time: JSON-LD `datePublished`, then the
/// `article:published_time` meta tag. `None` when neither parses.
pub fn extract_published_at(document: &Html) -> Option<DateTime<Utc>> {
    from_json_ld(document).or_else(|| from_meta(document))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn from_json_ld(document: &Html) -> Option<DateTime<Utc>> {
    let script_selector = Selector::parse("script[type='application/ld+json']").ok()?;
    document.select(&script_selector).find_map(|script| {
        let json = serde_json::from_str::<Value>(script.text().collect::<String>().trim()).ok()?;
        date_published(&json)
    })
}

// Publishers emit a bare object, an array of objects, or an `@graph` wrapper.
fn date_published(json: &Value) -> Option<DateTime<Utc>> {
    match json {
        Value::Array(items) => items.iter().find_map(date_published),
        Value::Object(obj) => obj
            .get("datePublished")
            .and_then(Value::as_str)
            .and_then(parse_date)
            .or_else(|| obj.get("@graph").and_then(date_published)),
        _ => None,
    }
}

fn from_meta(document: &Html) -> Option<DateTime<Utc>> {
    let meta_selector = Selector::parse("meta[property='article:published_time']").ok()?;
    document
        .select(&meta_selector)
        .filter_map(|el| el.value().attr("content"))
        .find_map(parse_date)
}
