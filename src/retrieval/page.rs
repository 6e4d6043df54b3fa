//! Visible text of an item's web page.
//!
//! Used for sources whose links are ordinary pages (TikTok video pages, news
//! articles). Paragraph text is collected from the most specific container
//! that yields any, so boilerplate outside `<article>`/`<main>` is skipped
//! whenever the page has those.

use super::{ContentRetriever, parse_link};
use crate::error::RetrievalError;
use crate::models::TrendItem;
use crate::utils::normalize_whitespace;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

/// Tried in order; the first selector that yields text wins.
const PARAGRAPH_SELECTORS: [&str; 3] = ["article p", "main p", "p"];

pub struct PageScraper {
    pub http: Client,
}

/// Extract readable text from an HTML document.
///
/// Falls back to the `<title>` and `og:description` meta tag for pages that
/// render their body client-side.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for raw in PARAGRAPH_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let paragraphs: Vec<String> = document
            .select(&selector)
            .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| !t.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n");
        }
    }

    let mut fallback = Vec::new();
    if let Ok(sel) = Selector::parse("title") {
        if let Some(title) = document.select(&sel).next() {
            fallback.push(normalize_whitespace(&title.text().collect::<String>()));
        }
    }
    if let Ok(sel) = Selector::parse(r#"meta[property="og:description"], meta[name="description"]"#) {
        if let Some(content) = document.select(&sel).find_map(|el| el.value().attr("content")) {
            fallback.push(normalize_whitespace(content));
        }
    }
    fallback.retain(|t| !t.is_empty());
    fallback.join("\n")
}

impl ContentRetriever for PageScraper {
    fn name(&self) -> &'static str {
        "page"
    }

    #[instrument(level = "debug", skip_all, fields(link = %item.link))]
    async fn retrieve(&self, item: &TrendItem) -> Result<String, RetrievalError> {
        let url = parse_link(&item.link)?;

        let response = self
            .http
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RetrievalError::from_status(status, &body));
        }
        if !content_type.is_empty() && !content_type.contains("html") && !content_type.starts_with("text/") {
            return Err(RetrievalError::Unavailable {
                message: format!("unsupported content type {content_type}"),
            });
        }

        let text = if content_type.starts_with("text/plain") {
            normalize_whitespace(&body)
        } else {
            // html5ever parsing is CPU-bound; keep it off the async workers.
            tokio::task::spawn_blocking(move || extract_text(&body))
                .await
                .map_err(|e| RetrievalError::Malformed {
                    message: format!("page parsing task failed: {e}"),
                })?
        };
        if text.is_empty() {
            return Err(RetrievalError::Unavailable {
                message: "page has no readable text".to_string(),
            });
        }
        debug!(chars = text.chars().count(), "Extracted page text");
        Ok(text)
    }
}
