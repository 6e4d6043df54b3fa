//! Transcripts produced by Gemini from a public YouTube URL.
//!
//! Gemini accepts a YouTube watch URL as `file_data` and can transcribe the
//! audio directly, which covers videos without published captions. Free-tier
//! quotas are tight, so 429s and `RESOURCE_EXHAUSTED` are surfaced as rate
//! limits and retried with exponential backoff.

use super::ContentRetriever;
use super::transcript::extract_video_id;
use crate::error::RetrievalError;
use crate::models::TrendItem;
use crate::utils::{normalize_whitespace, truncate_for_log};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

const TRANSCRIBE_PROMPT: &str = "Provide a full and accurate transcript of the audio in this video.";

pub struct GeminiTranscriber {
    pub http: Client,
    pub base_url: String,
    pub api_key: String,
    /// e.g. `gemini-1.5-flash`
    pub model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn transcript_text(body: &str) -> Result<String, RetrievalError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| RetrievalError::Malformed {
        message: format!("gemini response: {e}"),
    })?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(RetrievalError::Unavailable {
            message: format!("gemini blocked the request: {reason}"),
        });
    }

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let text = normalize_whitespace(&text);
    if text.is_empty() {
        return Err(RetrievalError::Unavailable {
            message: "gemini returned no transcript".to_string(),
        });
    }
    Ok(text)
}

impl ContentRetriever for GeminiTranscriber {
    fn name(&self) -> &'static str {
        "gemini"
    }

    #[instrument(level = "debug", skip_all, fields(link = %item.link, model = %self.model))]
    async fn retrieve(&self, item: &TrendItem) -> Result<String, RetrievalError> {
        let video_id = extract_video_id(&item.link)?;
        let video_url = format!("https://www.youtube.com/watch?v={video_id}");

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": TRANSCRIBE_PROMPT },
                    { "file_data": { "file_uri": video_url } }
                ]
            }]
        });

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if text.contains("RESOURCE_EXHAUSTED") {
                return Err(RetrievalError::RateLimited {
                    message: truncate_for_log(&text, 200),
                });
            }
            return Err(RetrievalError::from_status(status, &text));
        }

        let transcript = transcript_text(&text)?;
        debug!(%video_id, chars = transcript.chars().count(), "Gemini transcript received");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transcriber(base_url: String) -> GeminiTranscriber {
        GeminiTranscriber {
            http: Client::new(),
            base_url,
            api_key: "g-key".into(),
            model: "gemini-1.5-flash".into(),
        }
    }

    #[test]
    fn test_transcript_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello  there."},{"text":"\nGeneral news."}]}}]}"#;
        assert_eq!(transcript_text(body).unwrap(), "Hello there. General news.");
    }

    #[test]
    fn test_transcript_text_blocked() {
        let body = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = transcript_text(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_transcript_text_empty_is_unavailable() {
        let err = transcript_text(r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, RetrievalError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_retrieve_sends_video_uri() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [
                    {"text": TRANSCRIBE_PROMPT},
                    {"file_data": {"file_uri": "https://www.youtube.com/watch?v=abc"}}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "spoken words"}]}}]
            })))
            .mount(&server)
            .await;

        let text = transcriber(server.uri())
            .retrieve(&TrendItem::new("A", "https://youtu.be/abc"))
            .await
            .unwrap();
        assert_eq!(text, "spoken words");
    }

    #[tokio::test]
    async fn test_resource_exhausted_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#))
            .mount(&server)
            .await;

        let err = transcriber(server.uri())
            .retrieve(&TrendItem::new("A", "https://youtu.be/abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_bad_link_never_calls_api() {
        let server = MockServer::start().await;
        let err = transcriber(server.uri())
            .retrieve(&TrendItem::new("B", "not-a-url"))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::NoVideoId { .. }));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
