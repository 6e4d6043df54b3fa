//! Content retrieval: transcripts and page text for individual trend items.
//!
//! Every retriever implements [`ContentRetriever`], returning the item's text
//! or a classified [`RetrievalError`]. [`retrieve_with_retry`] wraps any
//! retriever with the run's [`RetryPolicy`] and always produces a
//! [`RetrievalResult`]; it never returns an error, so one bad item cannot
//! take down the batch.
//!
//! # Implementations
//!
//! | Retriever | Module | Content |
//! |-----------|--------|---------|
//! | Caption tracks | [`transcript`] | YouTube captions joined into one string |
//! | Gemini | [`gemini`] | Transcript produced by the Gemini API from the video URL |
//! | Firecrawl search | [`firecrawl`] | Markdown of the top web result for the item's query |
//! | Page | [`page`] | Visible paragraph text of the item's link |

pub mod firecrawl;
pub mod gemini;
pub mod page;
pub mod transcript;

use crate::config::{Credential, RetrieverKind, RunConfig};
use crate::error::{ConfigError, RetrievalError};
use crate::models::{RetrievalResult, TrendItem};
use crate::retry::{RetryPolicy, retry};
use reqwest::Client;
use tracing::{info, instrument, warn};
use url::Url;

use firecrawl::FirecrawlSearch;
use gemini::GeminiTranscriber;
use page::PageScraper;
use transcript::TranscriptRetriever;

/// Obtains the text associated with a single trend item.
pub trait ContentRetriever {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch the item's content. Called once per attempt.
    async fn retrieve(&self, item: &TrendItem) -> Result<String, RetrievalError>;
}

/// Retrieve content for `item`, retrying per `policy`, and record the outcome.
#[instrument(level = "info", skip_all, fields(retriever = retriever.name(), title = %item.title))]
pub async fn retrieve_with_retry<R: ContentRetriever>(
    retriever: &R,
    policy: &RetryPolicy,
    item: TrendItem,
) -> RetrievalResult {
    info!(link = %item.link, "Retrieving content");
    let outcome = retry(policy, retriever.name(), || retriever.retrieve(&item)).await;

    match outcome {
        Ok(content) => {
            info!(chars = content.chars().count(), "Retrieved content");
            RetrievalResult::success(item, content)
        }
        Err(e) => {
            warn!(error = %e, "Retrieval failed");
            RetrievalResult::failed(item, e.to_string())
        }
    }
}

/// Parse an item link, accepting only http(s) URLs.
pub fn parse_link(link: &str) -> Result<Url, RetrievalError> {
    match Url::parse(link.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(RetrievalError::InvalidUrl {
            url: link.to_string(),
        }),
    }
}

/// The retriever selected for this run.
pub enum Retriever {
    Transcript(TranscriptRetriever),
    Gemini(GeminiTranscriber),
    Search(FirecrawlSearch),
    Page(PageScraper),
}

impl Retriever {
    pub fn from_config(config: &RunConfig, http: &Client) -> Result<Self, ConfigError> {
        let endpoints = &config.endpoints;
        let retriever = match config.retriever {
            RetrieverKind::Transcript => Retriever::Transcript(TranscriptRetriever {
                http: http.clone(),
                base_url: endpoints.youtube.clone(),
                languages: config.languages.clone(),
            }),
            RetrieverKind::Gemini => Retriever::Gemini(GeminiTranscriber {
                http: http.clone(),
                base_url: endpoints.gemini.clone(),
                api_key: config.credentials.require(Credential::Gemini)?.to_string(),
                model: config.gemini_model.clone(),
            }),
            RetrieverKind::Search => Retriever::Search(FirecrawlSearch {
                http: http.clone(),
                base_url: endpoints.firecrawl.clone(),
                api_key: config.credentials.require(Credential::Firecrawl)?.to_string(),
            }),
            RetrieverKind::Page => Retriever::Page(PageScraper { http: http.clone() }),
        };
        Ok(retriever)
    }
}

impl ContentRetriever for Retriever {
    fn name(&self) -> &'static str {
        match self {
            Retriever::Transcript(r) => r.name(),
            Retriever::Gemini(r) => r.name(),
            Retriever::Search(r) => r.name(),
            Retriever::Page(r) => r.name(),
        }
    }

    async fn retrieve(&self, item: &TrendItem) -> Result<String, RetrievalError> {
        match self {
            Retriever::Transcript(r) => r.retrieve(item).await,
            Retriever::Gemini(r) => r.retrieve(item).await,
            Retriever::Search(r) => r.retrieve(item).await,
            Retriever::Page(r) => r.retrieve(item).await,
        }
    }
}
