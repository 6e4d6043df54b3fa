//! Structured LLM analysis of retrieved trend content.
//!
//! Each item is sent to the model once (plus retries) with a forced tool call,
//! so the reply is always a JSON argument object matching [`TOOL`]'s schema.
//! Items whose retrieval failed are still analyzed, from the title alone.
//!
//! Analysis never fails outward: after the retry policy is exhausted the item
//! gets [`AnalysisResult::sentinel`].

pub mod openai;

use crate::error::LlmError;
use crate::models::{AnalysisResult, RetrievalResult};
use crate::retry::{RetryPolicy, retry};
use crate::utils::{looks_truncated, truncate_chars, truncate_for_log};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

/// Function-calling tool the model is forced to call.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the tool arguments.
    pub parameters: Value,
}

/// The one tool the analyzer uses.
pub static TOOL: once_cell::sync::Lazy<ToolSpec> = once_cell::sync::Lazy::new(|| ToolSpec {
    name: "format_trend_analysis",
    description: "Record the trend analysis as a structured object.",
    parameters: json!({
        "type": "object",
        "properties": {
            "context": {
                "type": "string",
                "description": "One short sentence stating the core event, understandable at a glance."
            },
            "summary": {
                "type": "array",
                "items": { "type": "string" },
                "maxItems": AnalysisResult::MAX_SUMMARY_POINTS,
                "description": "Up to five brief bullet points covering the topic."
            },
            "category": {
                "type": "string",
                "description": "A single category label, e.g. Technology, Sports, Politics, Entertainment."
            }
        },
        "required": ["context", "summary", "category"]
    }),
});

/// A chat model that can be forced to answer through a tool call.
pub trait StructuredLlm {
    /// Send `prompt` and return the raw JSON arguments of the forced `tool` call.
    async fn call_tool(&self, prompt: &str, tool: &ToolSpec) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Built from retrieved content.
    Content,
    /// Retrieval failed or was empty; the model works from the title.
    TitleOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    pub kind: PromptKind,
    pub text: String,
}

/// Build the prompt for one retrieval, truncating content to `max_content_chars`.
pub fn build_prompt(retrieval: &RetrievalResult, max_content_chars: usize) -> AnalysisPrompt {
    let item = &retrieval.item;
    let title = if item.title.trim().is_empty() {
        item.search_query()
    } else {
        item.title.clone()
    };

    match retrieval.content() {
        Some(content) => {
            let content = truncate_chars(content, max_content_chars);
            AnalysisPrompt {
                kind: PromptKind::Content,
                text: format!(
                    "Analyze the trending topic \"{title}\" using the content below.\n\
                     Give a one-sentence context that anyone can understand immediately, \
                     up to five bullet points with the key details, and one category.\n\n\
                     Content:\n{content}"
                ),
            }
        }
        None => AnalysisPrompt {
            kind: PromptKind::TitleOnly,
            text: format!(
                "No content could be retrieved for the trending topic \"{title}\" ({link}).\n\
                 Work from the title alone and general knowledge: infer what the topic is most \
                 likely about, give a one-sentence context, up to five bullet points on its likely \
                 key aspects (fewer is fine when little can be inferred), and one category.",
                link = item.link
            ),
        },
    }
}

#[derive(Debug, Deserialize)]
struct ToolArguments {
    context: String,
    #[serde(default)]
    summary: SummaryField,
    category: String,
}

/// Models occasionally return the summary as a single string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryField {
    List(Vec<String>),
    Text(String),
}

impl Default for SummaryField {
    fn default() -> Self {
        SummaryField::List(Vec::new())
    }
}

/// Parse tool-call arguments into a clean [`AnalysisResult`].
///
/// Bullets are trimmed, blank and duplicate bullets dropped, and the list
/// capped at [`AnalysisResult::MAX_SUMMARY_POINTS`].
pub fn parse_analysis(arguments: &str) -> Result<AnalysisResult, LlmError> {
    let args: ToolArguments = serde_json::from_str(arguments).map_err(|e| LlmError::ResponseParse {
        message: format!("{e}: {}", truncate_for_log(arguments, 200)),
        truncated: looks_truncated(&e),
    })?;

    let bullets = match args.summary {
        SummaryField::List(list) => list,
        SummaryField::Text(text) => text.lines().map(str::to_string).collect(),
    };
    let summary: Vec<String> = bullets
        .iter()
        .map(|b| b.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
        .filter(|b| !b.is_empty())
        .unique()
        .take(AnalysisResult::MAX_SUMMARY_POINTS)
        .collect();

    Ok(AnalysisResult {
        context: args.context.trim().to_string(),
        summary,
        category: args.category.trim().to_string(),
    })
}

/// Runs analysis for single items against an LLM backend.
pub struct Analyzer<L> {
    pub llm: L,
    pub max_content_chars: usize,
    pub retry: RetryPolicy,
}

impl<L: StructuredLlm> Analyzer<L> {
    pub fn new(llm: L, max_content_chars: usize, retry: RetryPolicy) -> Self {
        Self {
            llm,
            max_content_chars,
            retry,
        }
    }

    /// Analyze one retrieval. Never fails; errors become the sentinel.
    #[instrument(level = "info", skip_all, fields(title = %retrieval.item.title))]
    pub async fn analyze(&self, retrieval: &RetrievalResult) -> AnalysisResult {
        let prompt = build_prompt(retrieval, self.max_content_chars);
        info!(kind = ?prompt.kind, prompt_chars = prompt.text.chars().count(), "Analyzing");

        let outcome = retry(&self.retry, "analysis", || async {
            let arguments = self.llm.call_tool(&prompt.text, &TOOL).await?;
            parse_analysis(&arguments)
        })
        .await;

        match outcome {
            Ok(analysis) => {
                info!(category = %analysis.category, points = analysis.summary.len(), "Analysis complete");
                analysis
            }
            Err(e) => {
                warn!(error = %e, "Analysis failed; using sentinel");
                AnalysisResult::sentinel()
            }
        }
    }
}
