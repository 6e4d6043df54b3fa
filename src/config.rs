//! Run configuration assembled once per invocation.
//!
//! Values come from three layers, highest precedence first:
//! 1. command-line flags (credentials may also come from the environment or `.env`),
//! 2. an optional YAML config file (`--config`),
//! 3. defaults that depend on the selected source and retriever.
//!
//! The resulting [`RunConfig`] is passed by reference to every component, so
//! nothing in the pipeline reads the process environment on its own.

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::report::{DisplayPolicy, ReportLayout};
use crate::retry::{Backoff, RetryPolicy};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Which trends provider to pull items from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Google,
    Youtube,
    Tiktok,
    Twitter,
    Pinterest,
}

impl SourceKind {
    /// Human-readable name used in the Markdown digest.
    pub fn heading(self) -> &'static str {
        match self {
            SourceKind::Google => "Google Trends",
            SourceKind::Youtube => "YouTube Trends",
            SourceKind::Tiktok => "TikTok Trends",
            SourceKind::Twitter => "Twitter/X Trends",
            SourceKind::Pinterest => "Pinterest Trends",
        }
    }

    pub fn default_retriever(self) -> RetrieverKind {
        match self {
            SourceKind::Youtube => RetrieverKind::Transcript,
            SourceKind::Tiktok => RetrieverKind::Page,
            SourceKind::Google | SourceKind::Twitter | SourceKind::Pinterest => RetrieverKind::Search,
        }
    }

    pub fn default_limit(self) -> Option<usize> {
        match self {
            SourceKind::Youtube => Some(10),
            _ => None,
        }
    }

    pub fn default_layout(self) -> ReportLayout {
        match self {
            SourceKind::Google => ReportLayout::List,
            _ => ReportLayout::FinalReport,
        }
    }

    /// Google Trends output has historically hidden failed analyses.
    pub fn default_drop_failed_analyses(self) -> bool {
        matches!(self, SourceKind::Google)
    }

    pub fn default_output(self) -> PathBuf {
        match self {
            SourceKind::Google => PathBuf::from("trend_analysis_report.json"),
            SourceKind::Youtube => PathBuf::from("final_analysis_report.json"),
            SourceKind::Tiktok => PathBuf::from("tiktok_analysis_report.json"),
            SourceKind::Twitter => PathBuf::from("twitter_analysis_report.json"),
            SourceKind::Pinterest => PathBuf::from("pinterest_analysis_report.json"),
        }
    }

    pub fn credential(self) -> Credential {
        match self {
            SourceKind::Google | SourceKind::Youtube => Credential::SearchApi,
            SourceKind::Tiktok | SourceKind::Twitter => Credential::Apify,
            SourceKind::Pinterest => Credential::Pinterest,
        }
    }
}

/// How content is obtained for each item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrieverKind {
    /// YouTube caption tracks.
    Transcript,
    /// Video transcription through Gemini.
    Gemini,
    /// Firecrawl web search, first hit's markdown.
    Search,
    /// Plain HTTP fetch of the item link.
    Page,
}

impl RetrieverKind {
    pub fn default_concurrency(self) -> usize {
        match self {
            RetrieverKind::Search => 15,
            RetrieverKind::Transcript | RetrieverKind::Gemini | RetrieverKind::Page => 10,
        }
    }

    pub fn default_retry(self, max_attempts: u32, base_delay: Duration, fixed_delay: Duration) -> RetryPolicy {
        match self {
            // Gemini failures other than quota exhaustion are not retried.
            RetrieverKind::Gemini => RetryPolicy::rate_limit_only(max_attempts, base_delay),
            _ => RetryPolicy::new(max_attempts, base_delay, fixed_delay),
        }
    }

    pub fn credential(self) -> Option<Credential> {
        match self {
            RetrieverKind::Gemini => Some(Credential::Gemini),
            RetrieverKind::Search => Some(Credential::Firecrawl),
            RetrieverKind::Transcript | RetrieverKind::Page => None,
        }
    }
}

/// API keys the pipeline may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    SearchApi,
    OpenAi,
    Gemini,
    Firecrawl,
    Apify,
    Pinterest,
}

impl Credential {
    pub fn env_var(self) -> &'static str {
        match self {
            Credential::SearchApi => "SearchAPI_KEY",
            Credential::OpenAi => "OPENAI_API_KEY",
            Credential::Gemini => "GEMINI_API_KEY",
            Credential::Firecrawl => "FIRECRAWL_API_KEY",
            Credential::Apify => "APIFY_KEY",
            Credential::Pinterest => "PINTEREST_TOKEN",
        }
    }
}

/// Loaded API keys. `Debug` never prints the values.
#[derive(Clone, Default)]
pub struct Credentials {
    pub search_api: Option<String>,
    pub openai: Option<String>,
    pub gemini: Option<String>,
    pub firecrawl: Option<String>,
    pub apify: Option<String>,
    pub pinterest: Option<String>,
}

impl Credentials {
    pub fn get(&self, credential: Credential) -> Option<&str> {
        let value = match credential {
            Credential::SearchApi => &self.search_api,
            Credential::OpenAi => &self.openai,
            Credential::Gemini => &self.gemini,
            Credential::Firecrawl => &self.firecrawl,
            Credential::Apify => &self.apify,
            Credential::Pinterest => &self.pinterest,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn require(&self, credential: Credential) -> Result<&str, ConfigError> {
        self.get(credential).ok_or_else(|| ConfigError::MissingCredentials {
            names: credential.env_var().to_string(),
        })
    }

    /// Check every credential in `needed`, reporting all missing ones together.
    pub fn require_all(&self, needed: &[Credential]) -> Result<(), ConfigError> {
        let missing: Vec<&str> = needed
            .iter()
            .filter(|c| self.get(**c).is_none())
            .map(|c| c.env_var())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredentials {
                names: missing.join(", "),
            })
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |c: Credential| if self.get(c).is_some() { "set" } else { "unset" };
        f.debug_struct("Credentials")
            .field("search_api", &state(Credential::SearchApi))
            .field("openai", &state(Credential::OpenAi))
            .field("gemini", &state(Credential::Gemini))
            .field("firecrawl", &state(Credential::Firecrawl))
            .field("apify", &state(Credential::Apify))
            .field("pinterest", &state(Credential::Pinterest))
            .finish()
    }
}

/// Tunables accepted from the YAML config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub retriever: Option<RetrieverKind>,
    pub limit: Option<usize>,
    pub retrieval_concurrency: Option<usize>,
    pub analysis_concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub base_delay_secs: Option<u64>,
    pub fixed_delay_secs: Option<u64>,
    pub max_content_chars: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub model: Option<String>,
    pub gemini_model: Option<String>,
    pub languages: Option<Vec<String>>,
    pub layout: Option<ReportLayout>,
    pub drop_failed_analyses: Option<bool>,
    pub include_content: Option<bool>,
    pub geo: Option<String>,
    pub time: Option<String>,
    pub gl: Option<String>,
    pub hl: Option<String>,
    pub bp: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub trend_type: Option<String>,
    pub endpoints: EndpointOverrides,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = Self::parse(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(parsed)
    }

    fn parse(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Optional base URL overrides, mostly useful for proxies and local testing.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointOverrides {
    pub searchapi: Option<String>,
    pub apify: Option<String>,
    pub pinterest: Option<String>,
    pub firecrawl: Option<String>,
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub youtube: Option<String>,
}

/// Base URLs of every external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub searchapi: String,
    pub apify: String,
    pub pinterest: String,
    pub firecrawl: String,
    pub gemini: String,
    pub openai: String,
    pub youtube: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            searchapi: "https://www.searchapi.io/api/v1/search".to_string(),
            apify: "https://api.apify.com".to_string(),
            pinterest: "https://api.pinterest.com".to_string(),
            firecrawl: "https://api.firecrawl.dev".to_string(),
            gemini: "https://generativelanguage.googleapis.com".to_string(),
            openai: "https://api.openai.com/v1".to_string(),
            youtube: "https://www.youtube.com".to_string(),
        }
    }
}

impl Endpoints {
    fn with_overrides(o: EndpointOverrides) -> Self {
        let d = Self::default();
        let pick = |v: Option<String>, default: String| v.map(|s| s.trim_end_matches('/').to_string()).unwrap_or(default);
        Self {
            searchapi: pick(o.searchapi, d.searchapi),
            apify: pick(o.apify, d.apify),
            pinterest: pick(o.pinterest, d.pinterest),
            firecrawl: pick(o.firecrawl, d.firecrawl),
            gemini: pick(o.gemini, d.gemini),
            openai: pick(o.openai, d.openai),
            youtube: pick(o.youtube, d.youtube),
        }
    }
}

/// Per-source request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceParams {
    /// Google Trends country.
    pub geo: String,
    /// Google Trends window, e.g. `past_24_hours`.
    pub time: String,
    /// YouTube country.
    pub gl: String,
    /// YouTube language.
    pub hl: String,
    /// YouTube category (`now`, `music`, `gaming`, `films`).
    pub bp: Option<String>,
    /// TikTok or Pinterest region; each source has its own default.
    pub region: Option<String>,
    /// Twitter/X trends country slug.
    pub country: String,
    /// Pinterest trend type (`growth`, `monthly`, `yearly`, ...).
    pub trend_type: String,
}

/// Where and how the report is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub path: PathBuf,
    pub markdown: Option<PathBuf>,
    pub layout: ReportLayout,
    pub include_content: bool,
    pub display: DisplayPolicy,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceKind,
    pub retriever: RetrieverKind,
    pub limit: Option<usize>,
    pub retrieval_concurrency: usize,
    pub analysis_concurrency: usize,
    pub retrieval_retry: RetryPolicy,
    pub analysis_retry: RetryPolicy,
    pub max_content_chars: usize,
    pub request_timeout: Duration,
    pub model: String,
    pub gemini_model: String,
    pub languages: Vec<String>,
    pub params: SourceParams,
    pub endpoints: Endpoints,
    pub output: OutputSettings,
    pub credentials: Credentials,
}

impl RunConfig {
    pub const DEFAULT_MAX_CONTENT_CHARS: usize = 15_000;
    pub const DEFAULT_ANALYSIS_CONCURRENCY: usize = 10;
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_GEMINI_MODEL: &'static str = "gemini-1.5-flash";

    /// Merge CLI flags over file values over per-source defaults.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let source = cli.source;
        let retriever = cli
            .retriever
            .or(file.retriever)
            .unwrap_or_else(|| source.default_retriever());

        let retrieval_concurrency = positive(
            "retrieval_concurrency",
            cli.retrieval_concurrency
                .or(file.retrieval_concurrency)
                .unwrap_or_else(|| retriever.default_concurrency()),
        )?;
        let analysis_concurrency = positive(
            "analysis_concurrency",
            cli.analysis_concurrency
                .or(file.analysis_concurrency)
                .unwrap_or(Self::DEFAULT_ANALYSIS_CONCURRENCY),
        )?;
        let max_content_chars = positive(
            "max_content_chars",
            cli.max_content_chars
                .or(file.max_content_chars)
                .unwrap_or(Self::DEFAULT_MAX_CONTENT_CHARS),
        )?;

        let max_attempts = cli
            .max_attempts
            .or(file.max_attempts)
            .unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        let base_delay = Duration::from_secs(cli.base_delay_secs.or(file.base_delay_secs).unwrap_or(5));
        let fixed_delay = Duration::from_secs(file.fixed_delay_secs.unwrap_or(2));

        let analysis_retry = RetryPolicy {
            rate_limited: Backoff::Exponential {
                base: Duration::from_secs(1),
                max: Duration::from_secs(30),
            },
            ..RetryPolicy::new(max_attempts, Duration::from_secs(1), Duration::from_secs(1))
        }
        .with_jitter(Duration::from_millis(250));

        let params = SourceParams {
            geo: cli.geo.clone().or(file.geo).unwrap_or_else(|| "NZ".to_string()),
            time: cli.time.clone().or(file.time).unwrap_or_else(|| "past_7_days".to_string()),
            gl: cli.gl.clone().or(file.gl).unwrap_or_else(|| "NZ".to_string()),
            hl: cli.hl.clone().or(file.hl).unwrap_or_else(|| "en".to_string()),
            bp: cli.bp.clone().or(file.bp),
            region: cli.region.clone().or(file.region),
            country: cli
                .country
                .clone()
                .or(file.country)
                .unwrap_or_else(|| "new-zealand".to_string()),
            trend_type: cli
                .trend_type
                .clone()
                .or(file.trend_type)
                .unwrap_or_else(|| "growth".to_string()),
        };

        let output = OutputSettings {
            path: cli.output.clone().unwrap_or_else(|| source.default_output()),
            markdown: cli.markdown.clone(),
            layout: cli
                .layout
                .or(file.layout)
                .unwrap_or_else(|| source.default_layout()),
            include_content: cli.include_content || file.include_content.unwrap_or(false),
            display: DisplayPolicy {
                drop_failed_analyses: cli
                    .drop_failed_analyses
                    .or(file.drop_failed_analyses)
                    .unwrap_or_else(|| source.default_drop_failed_analyses()),
            },
        };

        let config = Self {
            source,
            retriever,
            limit: cli.limit.or(file.limit).or_else(|| source.default_limit()),
            retrieval_concurrency,
            analysis_concurrency,
            retrieval_retry: retriever.default_retry(max_attempts, base_delay, fixed_delay),
            analysis_retry,
            max_content_chars,
            request_timeout: Duration::from_secs(file.request_timeout_secs.unwrap_or(600)),
            model: cli
                .model
                .clone()
                .or(file.model)
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            gemini_model: file
                .gemini_model
                .unwrap_or_else(|| Self::DEFAULT_GEMINI_MODEL.to_string()),
            languages: file.languages.unwrap_or_else(|| vec!["en".to_string()]),
            params,
            endpoints: Endpoints::with_overrides(file.endpoints),
            output,
            credentials: cli.credentials(),
        };
        debug!(?config, "Resolved run configuration");
        Ok(config)
    }

    /// Credentials the selected source, retriever and analyzer need.
    pub fn required_credentials(&self) -> Vec<Credential> {
        let mut needed = vec![self.source.credential()];
        needed.extend(self.retriever.credential());
        needed.push(Credential::OpenAi);
        needed
    }

    /// Fail before any network call if a required key is absent.
    pub fn check_credentials(&self) -> Result<(), ConfigError> {
        self.credentials.require_all(&self.required_credentials())
    }
}

fn positive(field: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidValue {
            field,
            reason: "must be at least 1".to_string(),
        })
    } else {
        Ok(value)
    }
}
