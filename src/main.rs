//! # Trend Digest
//!
//! Pulls the current trending topics or videos from a trends provider,
//! retrieves a transcript or page content for each one, has an LLM produce a
//! short structured analysis, and writes the combined report as JSON (plus an
//! optional Markdown digest).
//!
//! ## Features
//!
//! - Trend sources: Google Trends and YouTube trending (SearchApi.io), TikTok
//!   and Twitter/X (Apify actors), Pinterest (v5 trends API)
//! - Content retrieval from YouTube caption tracks, Gemini transcription,
//!   Firecrawl web search, or plain page scraping
//! - Bounded concurrency for both retrieval and analysis, with per-item
//!   retry on rate limits and transient failures
//! - Structured analysis through a forced OpenAI tool call, degrading to a
//!   fixed error record instead of failing the run
//!
//! ## Usage
//!
//! ```sh
//! trend_digest --source youtube -o final_analysis_report.json
//! trend_digest --source google --geo NZ -m digest.md
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: One request to the trends provider; failure aborts the run
//! 2. **Retrieval**: Transcript or page text per item (10-15 at a time)
//! 3. **Analysis**: LLM analysis per item (10 at a time)
//! 4. **Output**: Items, retrievals and analyses zipped in order and written out

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod pool;
mod report;
mod retrieval;
mod retry;
mod sources;
mod utils;

use analysis::Analyzer;
use analysis::openai::OpenAiClient;
use cli::Cli;
use config::{Credential, FileConfig, RunConfig};
use pipeline::StageSettings;
use retrieval::Retriever;
use sources::Source;
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("trend_digest starting up");

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => error!(error = %e, "Failed to read .env; continuing with process environment"),
    }

    let args = Cli::parse();
    debug!(source = ?args.source, retriever = ?args.retriever, config = ?args.config, "Parsed CLI arguments");

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path).inspect_err(|e| error!(error = %e, "Invalid config file"))?,
        None => FileConfig::default(),
    };
    let config = RunConfig::resolve(&args, file_config).inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    // Early checks: credentials and output location, before any network call
    if let Err(e) = config.check_credentials() {
        error!(error = %e, "Missing credentials");
        return Err(e.into());
    }
    if let Err(e) = ensure_writable_parent(&config.output.path).await {
        error!(
            path = %config.output.path.display(),
            error = %e,
            "Output location is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    info!(
        source = ?config.source,
        retriever = ?config.retriever,
        limit = ?config.limit,
        retrieval_concurrency = config.retrieval_concurrency,
        analysis_concurrency = config.analysis_concurrency,
        model = %config.model,
        "Configured run"
    );

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(concat!("trend_digest/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let source = Source::from_config(&config, &http)?;
    let retriever = Retriever::from_config(&config, &http)?;
    let llm = OpenAiClient::new(
        http.clone(),
        config.endpoints.openai.clone(),
        config.credentials.require(Credential::OpenAi)?,
        config.model.clone(),
    );
    let analyzer = Analyzer::new(llm, config.max_content_chars, config.analysis_retry.clone());

    let summary = match pipeline::run_and_write(
        &source,
        &retriever,
        &analyzer,
        &StageSettings::from(&config),
        &config.output,
        config.source.heading(),
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run failed; no report written");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        items = summary.items,
        retrieval_failed = summary.retrieval_failed,
        sentinel_analyses = summary.sentinel_analyses,
        path = %config.output.path.display(),
        "Execution complete"
    );

    Ok(())
}
