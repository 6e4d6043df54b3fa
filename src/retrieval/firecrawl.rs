//! Web search through Firecrawl, returning the top result as markdown.
//!
//! Google, Twitter and Pinterest items are search terms rather than content
//! pages, so their "content" is whatever the web currently says about the
//! term: Firecrawl searches for the item's query and scrapes the first hit.

use super::{ContentRetriever, parse_link};
use crate::error::RetrievalError;
use crate::models::TrendItem;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

pub struct FirecrawlSearch {
    pub http: Client,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn top_markdown(body: &str) -> Result<String, RetrievalError> {
    let parsed: SearchResponse = serde_json::from_str(body).map_err(|e| RetrievalError::Malformed {
        message: format!("firecrawl response: {e}"),
    })?;
    if parsed.success == Some(false) {
        return Err(RetrievalError::Unavailable {
            message: parsed.error.unwrap_or_else(|| "search was not successful".to_string()),
        });
    }

    let hit = parsed.data.into_iter().next().ok_or_else(|| RetrievalError::Unavailable {
        message: "search returned no results".to_string(),
    })?;
    debug!(url = ?hit.url, "Top search result");

    hit.markdown
        .filter(|m| !m.trim().is_empty())
        .or(hit.description.filter(|d| !d.trim().is_empty()))
        .map(|m| m.trim().to_string())
        .ok_or_else(|| RetrievalError::Unavailable {
            message: "top search result has no content".to_string(),
        })
}

impl ContentRetriever for FirecrawlSearch {
    fn name(&self) -> &'static str {
        "firecrawl_search"
    }

    #[instrument(level = "debug", skip_all, fields(query = %item.search_query()))]
    async fn retrieve(&self, item: &TrendItem) -> Result<String, RetrievalError> {
        parse_link(&item.link)?;

        let body = json!({
            "query": item.search_query(),
            "limit": 1,
            "scrapeOptions": { "formats": ["markdown"] },
        });
        let response = self
            .http
            .post(format!("{}/v1/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(RetrievalError::from_status(status, &text));
        }
        top_markdown(&text)
    }
}
