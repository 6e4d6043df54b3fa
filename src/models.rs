//! Data models for trend items and their processed representations.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`TrendItem`]: One candidate topic or video discovered from a trends source
//! - [`RetrievalResult`]: The transcript or page text obtained for an item, or why it failed
//! - [`AnalysisResult`]: LLM-produced context, bullet summary and category
//! - [`ReportItem`]: The three above zipped together for one input item
//!
//! Every value here lives for a single pipeline run; nothing is shared between
//! runs except the JSON file the run writes.

use serde::{Deserialize, Serialize};

/// A single trending topic or video.
///
/// The `link` identifies the item. Keyword-cluster sources (Google Trends,
/// Pinterest) also carry the keywords the cluster was built from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrendItem {
    /// Display title. May be empty.
    pub title: String,
    /// Locator for the item; must parse as a URL for retrieval to proceed.
    pub link: String,
    /// Keywords making up the trend, most relevant first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl TrendItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Query string used by search-based retrievers.
    ///
    /// Keyword clusters become `kw1 OR kw2 ...`; plain items search by title.
    pub fn search_query(&self) -> String {
        if self.keywords.is_empty() {
            self.title.clone()
        } else {
            self.keywords.join(" OR ")
        }
    }
}

/// Outcome of retrieving content for one item.
///
/// Serialized flat into the enclosing [`RetrievalResult`] as
/// `{"status": "Success", "content": ...}` or `{"status": "Failed", "error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status")]
pub enum RetrievalOutcome {
    Success { content: String },
    Failed { error: String },
}

/// Transcript or page text retrieved for a [`TrendItem`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetrievalResult {
    pub item: TrendItem,
    #[serde(flatten)]
    pub outcome: RetrievalOutcome,
}

impl RetrievalResult {
    pub fn success(item: TrendItem, content: String) -> Self {
        Self {
            item,
            outcome: RetrievalOutcome::Success { content },
        }
    }

    pub fn failed(item: TrendItem, error: impl Into<String>) -> Self {
        Self {
            item,
            outcome: RetrievalOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RetrievalOutcome::Success { .. })
    }

    /// Retrieved text, if retrieval succeeded and produced something.
    ///
    /// # Returns
    ///
    /// `None` for failed retrievals and for whitespace-only content, so
    /// callers fall back to a title-only prompt.
    pub fn content(&self) -> Option<&str> {
        match &self.outcome {
            RetrievalOutcome::Success { content } if !content.trim().is_empty() => Some(content),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RetrievalOutcome::Failed { error } => Some(error),
            RetrievalOutcome::Success { .. } => None,
        }
    }
}

/// Structured LLM analysis of one trend item.
///
/// Field names match the `format_trend_analysis` tool schema sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisResult {
    /// One sentence summarizing the core event.
    pub context: String,
    /// Up to [`AnalysisResult::MAX_SUMMARY_POINTS`] bullet points.
    pub summary: Vec<String>,
    /// A single category label such as "Technology" or "Sports".
    pub category: String,
}

impl AnalysisResult {
    pub const MAX_SUMMARY_POINTS: usize = 5;
    pub const ERROR_CONTEXT: &'static str = "Error during analysis.";
    pub const ERROR_SUMMARY: &'static str = "Could not generate summary points.";
    pub const ERROR_CATEGORY: &'static str = "Error";

    /// The well-formed stand-in used whenever analysis fails.
    pub fn sentinel() -> Self {
        Self {
            context: Self::ERROR_CONTEXT.to_string(),
            summary: vec![Self::ERROR_SUMMARY.to_string()],
            category: Self::ERROR_CATEGORY.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.context == Self::ERROR_CONTEXT && self.category == Self::ERROR_CATEGORY
    }
}

/// One row of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportItem {
    pub source: TrendItem,
    pub retrieval: RetrievalResult,
    pub analysis: AnalysisResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_from_keywords() {
        let item = TrendItem::new("storm", "https://www.google.com/search?q=storm")
            .with_keywords(vec!["storm".into(), "weather warning".into()]);
        assert_eq!(item.search_query(), "storm OR weather warning");
    }

    #[test]
    fn test_search_query_falls_back_to_title() {
        let item = TrendItem::new("Cup final highlights", "https://youtu.be/abc");
        assert_eq!(item.search_query(), "Cup final highlights");
    }

    #[test]
    fn test_keywords_omitted_when_empty() {
        let item = TrendItem::new("A", "https://youtu.be/abc");
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("keywords"));
    }

    #[test]
    fn test_retrieval_success_serializes_flat() {
        let result = RetrievalResult::success(TrendItem::new("A", "https://youtu.be/abc"), "hello".into());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "Success");
        assert_eq!(value["content"], "hello");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_retrieval_failed_serializes_flat() {
        let result = RetrievalResult::failed(TrendItem::new("B", "not-a-url"), "bad url");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "Failed");
        assert_eq!(value["error"], "bad url");
        assert!(value.get("content").is_none());
    }

    #[test]
    fn test_retrieval_result_deserialization() {
        let json = r#"{
            "item": {"title": "A", "link": "https://youtu.be/abc"},
            "status": "Failed",
            "error": "transcripts are disabled"
        }"#;
        let result: RetrievalResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("transcripts are disabled"));
        assert_eq!(result.content(), None);
    }

    #[test]
    fn test_blank_content_is_not_content() {
        let result = RetrievalResult::success(TrendItem::new("A", "https://youtu.be/abc"), "  ".into());
        assert!(result.is_success());
        assert_eq!(result.content(), None);
    }

    #[test]
    fn test_sentinel_shape() {
        let sentinel = AnalysisResult::sentinel();
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.context, "Error during analysis.");
        assert_eq!(sentinel.category, "Error");
        assert_eq!(sentinel.summary, vec!["Could not generate summary points.".to_string()]);
    }

    #[test]
    fn test_regular_analysis_is_not_sentinel() {
        let analysis = AnalysisResult {
            context: "A storm hit the coast.".into(),
            summary: vec!["Power outages".into()],
            category: "Weather".into(),
        };
        assert!(!analysis.is_sentinel());
    }
}
