//! YouTube transcripts from published caption tracks.
//!
//! The watch page embeds a `captionTracks` JSON array in its player response.
//! Each track has a `baseUrl` serving timed-text XML:
//!
//! ```text
//! <transcript>
//!   <text start="0.24" dur="3.1">welcome back to the channel</text>
//!   ...
//! </transcript>
//! ```
//!
//! Segments are unescaped (YouTube double-escapes entities such as `&amp;#39;`),
//! joined with spaces and whitespace-normalized into a single string.

use super::ContentRetriever;
use crate::error::RetrievalError;
use crate::models::TrendItem;
use crate::utils::normalize_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(?:https?://)?(?:www\.|m\.)?youtube\.com/watch\?(?:[^#]*&)?v=([^&#]+)",
        r"^(?:https?://)?youtu\.be/([^?&#/]+)",
        r"^(?:https?://)?(?:www\.)?youtube\.com/embed/([^?&#/]+)",
        r"^(?:https?://)?(?:www\.)?youtube\.com/shorts/([^?&#/]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("video id pattern is valid"))
    .collect()
});

/// Extract the video id from a watch, `youtu.be`, embed or shorts URL.
///
/// The host must start the URL (after an optional scheme), so lookalike
/// hosts and YouTube links embedded in another site's query are rejected.
pub fn extract_video_id(url: &str) -> Result<String, RetrievalError> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| RetrievalError::NoVideoId {
            url: url.to_string(),
        })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated captions.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// One timed caption line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionSegment {
    #[serde(rename = "@start", default)]
    pub start: f64,
    #[serde(rename = "@dur", default)]
    pub duration: f64,
    #[serde(rename = "$text", default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(rename = "text", default)]
    segments: Vec<CaptionSegment>,
}

/// Pull the `captionTracks` array out of a watch page.
pub fn caption_tracks(html: &str) -> Result<Vec<CaptionTrack>, RetrievalError> {
    const MARKER: &str = "\"captionTracks\":";

    let Some(start) = html.find(MARKER) else {
        if html.contains("class=\"g-recaptcha\"") {
            return Err(RetrievalError::RateLimited {
                message: "YouTube is asking for a captcha".to_string(),
            });
        }
        return Err(RetrievalError::Unavailable {
            message: "transcripts are disabled for this video".to_string(),
        });
    };

    let rest = &html[start + MARKER.len()..];
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Vec<CaptionTrack>>();
    match values.next() {
        Some(Ok(tracks)) if !tracks.is_empty() => Ok(tracks),
        Some(Ok(_)) => Err(RetrievalError::Unavailable {
            message: "video has no caption tracks".to_string(),
        }),
        Some(Err(e)) => Err(RetrievalError::Malformed {
            message: format!("captionTracks: {e}"),
        }),
        None => Err(RetrievalError::Malformed {
            message: "captionTracks is empty".to_string(),
        }),
    }
}

/// Pick the first requested language, preferring manual captions.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Result<&'a CaptionTrack, RetrievalError> {
    for lang in languages {
        let mut matching = tracks.iter().filter(|t| t.language_code == *lang);
        let manual = matching.clone().find(|t| !t.is_generated());
        if let Some(track) = manual.or_else(|| matching.next()) {
            return Ok(track);
        }
    }
    let available: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
    Err(RetrievalError::Unavailable {
        message: format!(
            "no transcript in {:?}; available languages: {}",
            languages,
            available.join(", ")
        ),
    })
}

/// Parse timed-text XML into caption segments with unescaped text.
pub fn parse_timed_text(xml: &str) -> Result<Vec<CaptionSegment>, RetrievalError> {
    let parsed: TimedText = quick_xml::de::from_str(xml).map_err(|e| RetrievalError::Malformed {
        message: format!("timed text: {e}"),
    })?;
    Ok(parsed
        .segments
        .into_iter()
        .map(|mut seg| {
            if let Ok(unescaped) = quick_xml::escape::unescape(&seg.text) {
                seg.text = unescaped.into_owned();
            }
            seg
        })
        .collect())
}

/// Join caption segments into one line of text.
pub fn join_segments(segments: &[CaptionSegment]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_whitespace(&joined)
}

pub struct TranscriptRetriever {
    pub http: Client,
    /// Normally `https://www.youtube.com`.
    pub base_url: String,
    /// Preferred caption languages, most preferred first.
    pub languages: Vec<String>,
}

impl TranscriptRetriever {
    async fn get_text(&self, url: &str) -> Result<String, RetrievalError> {
        let response = self
            .http
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RetrievalError::from_status(status, &body));
        }
        Ok(body)
    }
}

impl ContentRetriever for TranscriptRetriever {
    fn name(&self) -> &'static str {
        "youtube_captions"
    }

    #[instrument(level = "debug", skip_all, fields(link = %item.link))]
    async fn retrieve(&self, item: &TrendItem) -> Result<String, RetrievalError> {
        let video_id = extract_video_id(&item.link)?;
        let watch_url = format!("{}/watch?v={}", self.base_url, video_id);

        let html = self.get_text(&watch_url).await?;
        let tracks = caption_tracks(&html)?;
        let track = select_track(&tracks, &self.languages)?;
        debug!(%video_id, lang = %track.language_code, generated = track.is_generated(), "Selected caption track");

        let xml = self.get_text(&track.base_url).await?;
        let segments = parse_timed_text(&xml)?;
        let text = join_segments(&segments);
        if text.is_empty() {
            return Err(RetrievalError::Unavailable {
                message: "caption track is empty".to_string(),
            });
        }
        debug!(%video_id, segments = segments.len(), "Parsed transcript");
        Ok(text)
    }
}
