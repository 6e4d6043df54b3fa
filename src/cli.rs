//! Command-line interface definitions for Trend Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! API keys can be provided via flags, environment variables, or a `.env` file.

use crate::config::{Credentials, RetrieverKind, SourceKind};
use crate::report::ReportLayout;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Trend Digest application.
///
/// # Examples
///
/// ```sh
/// # Google Trends for New Zealand, scraped with Firecrawl search
/// trend_digest --source google --geo NZ
///
/// # YouTube trends, transcribed by Gemini instead of caption tracks
/// trend_digest --source youtube --retriever gemini -o report.json
///
/// # Keep failed analyses and also write a Markdown digest
/// trend_digest --source google --drop-failed-analyses false -m digest.md
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Trends provider to pull items from
    #[arg(short, long, value_enum)]
    pub source: SourceKind,

    /// How to retrieve content for each item (defaults depend on the source)
    #[arg(short, long, value_enum)]
    pub retriever: Option<RetrieverKind>,

    /// Path of the JSON report
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write a Markdown digest to this path
    #[arg(short, long)]
    pub markdown: Option<PathBuf>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Top-level shape of the JSON report
    #[arg(long, value_enum)]
    pub layout: Option<ReportLayout>,

    /// Process at most this many trend items
    #[arg(long)]
    pub limit: Option<usize>,

    /// Maximum concurrent content retrievals
    #[arg(long)]
    pub retrieval_concurrency: Option<usize>,

    /// Maximum concurrent LLM analyses
    #[arg(long)]
    pub analysis_concurrency: Option<usize>,

    /// Attempts per item before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Base delay in seconds for rate-limit backoff
    #[arg(long)]
    pub base_delay_secs: Option<u64>,

    /// Characters of retrieved content sent to the LLM
    #[arg(long)]
    pub max_content_chars: Option<usize>,

    /// Chat model used for analysis
    #[arg(long)]
    pub model: Option<String>,

    /// Hide items whose analysis failed from the Markdown digest (true/false)
    #[arg(long)]
    pub drop_failed_analyses: Option<bool>,

    /// Keep retrieved transcripts and page text in the JSON report
    #[arg(long)]
    pub include_content: bool,

    /// Google Trends country code
    #[arg(long)]
    pub geo: Option<String>,

    /// Google Trends time window, e.g. past_24_hours
    #[arg(long)]
    pub time: Option<String>,

    /// YouTube country code
    #[arg(long)]
    pub gl: Option<String>,

    /// YouTube language code
    #[arg(long)]
    pub hl: Option<String>,

    /// YouTube category: now, music, gaming or films
    #[arg(long)]
    pub bp: Option<String>,

    /// TikTok or Pinterest region code
    #[arg(long)]
    pub region: Option<String>,

    /// Twitter/X trends country, e.g. new-zealand
    #[arg(long)]
    pub country: Option<String>,

    /// Pinterest trend type, e.g. growth
    #[arg(long)]
    pub trend_type: Option<String>,

    /// SearchApi.io key
    #[arg(long, env = "SearchAPI_KEY", hide_env_values = true)]
    pub searchapi_key: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Firecrawl API key
    #[arg(long, env = "FIRECRAWL_API_KEY", hide_env_values = true)]
    pub firecrawl_api_key: Option<String>,

    /// Apify API token
    #[arg(long, env = "APIFY_KEY", hide_env_values = true)]
    pub apify_key: Option<String>,

    /// Pinterest bearer token
    #[arg(long, env = "PINTEREST_TOKEN", hide_env_values = true)]
    pub pinterest_token: Option<String>,
}

impl Cli {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            search_api: self.searchapi_key.clone(),
            openai: self.openai_api_key.clone(),
            gemini: self.gemini_api_key.clone(),
            firecrawl: self.firecrawl_api_key.clone(),
            apify: self.apify_key.clone(),
            pinterest: self.pinterest_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "trend_digest",
            "--source",
            "youtube",
            "--output",
            "./out/report.json",
            "--layout",
            "final-report",
        ]);

        assert_eq!(cli.source, SourceKind::Youtube);
        assert_eq!(cli.output, Some(PathBuf::from("./out/report.json")));
        assert_eq!(cli.layout, Some(ReportLayout::FinalReport));
        assert!(!cli.include_content);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["trend_digest", "-s", "google", "-r", "page", "-m", "/tmp/digest.md"]);

        assert_eq!(cli.source, SourceKind::Google);
        assert_eq!(cli.retriever, Some(RetrieverKind::Page));
        assert_eq!(cli.markdown, Some(PathBuf::from("/tmp/digest.md")));
    }

    #[test]
    fn test_cli_filter_flag_takes_bool() {
        let cli = Cli::parse_from(["trend_digest", "-s", "google", "--drop-failed-analyses", "false"]);
        assert_eq!(cli.drop_failed_analyses, Some(false));
    }

    #[test]
    fn test_cli_key_flags_become_credentials() {
        let cli = Cli::parse_from(["trend_digest", "-s", "tiktok", "--apify-key", "apify-token"]);
        assert_eq!(cli.credentials().get(Credential::Apify), Some("apify-token"));
    }

    #[test]
    fn test_cli_requires_source() {
        assert!(Cli::try_parse_from(["trend_digest"]).is_err());
    }
}
