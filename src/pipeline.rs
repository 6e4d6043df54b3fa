//! The end-to-end run: fetch, retrieve, analyze, assemble.
//!
//! ```text
//! source.fetch() -> items
//!   -> run_bounded(retrieve_with_retry, retrieval_concurrency) -> retrievals
//!   -> run_bounded(analyze, analysis_concurrency)              -> analyses
//!   -> assemble(items, retrievals, analyses)                    -> report
//! ```
//!
//! Each stage finishes completely before the next starts. A failing trend
//! source aborts the run before either pool is started; per-item failures
//! are recorded in the report instead.

use crate::analysis::{Analyzer, StructuredLlm};
use crate::config::{OutputSettings, RunConfig};
use crate::error::{PipelineError, SourceError};
use crate::models::ReportItem;
use crate::outputs;
use crate::pool::run_bounded;
use crate::report::assemble;
use crate::retrieval::{ContentRetriever, retrieve_with_retry};
use crate::retry::RetryPolicy;
use crate::sources::TrendSource;
use std::time::Instant;
use tracing::{info, instrument};

/// Stage settings taken from the run configuration.
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub limit: Option<usize>,
    pub retrieval_concurrency: usize,
    pub analysis_concurrency: usize,
    pub retrieval_retry: RetryPolicy,
}

impl From<&RunConfig> for StageSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            limit: config.limit,
            retrieval_concurrency: config.retrieval_concurrency,
            analysis_concurrency: config.analysis_concurrency,
            retrieval_retry: config.retrieval_retry.clone(),
        }
    }
}

/// Counts logged at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub items: usize,
    pub retrieved: usize,
    pub retrieval_failed: usize,
    pub sentinel_analyses: usize,
}

impl RunSummary {
    pub fn of(report: &[ReportItem]) -> Self {
        let retrieved = report.iter().filter(|r| r.retrieval.is_success()).count();
        Self {
            items: report.len(),
            retrieved,
            retrieval_failed: report.len() - retrieved,
            sentinel_analyses: report.iter().filter(|r| r.analysis.is_sentinel()).count(),
        }
    }
}

/// Run every stage and return the assembled report.
#[instrument(level = "info", skip_all, fields(source = source.name(), retriever = retriever.name()))]
pub async fn run<S, R, L>(
    source: &S,
    retriever: &R,
    analyzer: &Analyzer<L>,
    settings: &StageSettings,
) -> Result<Vec<ReportItem>, PipelineError>
where
    S: TrendSource,
    R: ContentRetriever,
    L: StructuredLlm,
{
    let t0 = Instant::now();

    let mut items = source.fetch().await?;
    if let Some(limit) = settings.limit {
        items.truncate(limit);
    }
    if items.is_empty() {
        return Err(SourceError::Empty {
            provider: source.name(),
        }
        .into());
    }
    info!(count = items.len(), "Fetched trend items");

    let retrievals = run_bounded(items.clone(), settings.retrieval_concurrency, |item| {
        retrieve_with_retry(retriever, &settings.retrieval_retry, item)
    })
    .await;
    let ok = retrievals.iter().filter(|r| r.is_success()).count();
    info!(
        total = retrievals.len(),
        successful = ok,
        failed = retrievals.len() - ok,
        "Completed content retrieval"
    );

    let analyses = run_bounded(&retrievals, settings.analysis_concurrency, |retrieval| {
        analyzer.analyze(retrieval)
    })
    .await;

    let report = assemble(items, retrievals, analyses)?;
    let summary = RunSummary::of(&report);
    let elapsed = t0.elapsed();
    info!(
        items = summary.items,
        retrieved = summary.retrieved,
        retrieval_failed = summary.retrieval_failed,
        sentinel_analyses = summary.sentinel_analyses,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Pipeline complete"
    );
    Ok(report)
}

/// Run the pipeline and write its outputs. Nothing is written if any stage fails.
pub async fn run_and_write<S, R, L>(
    source: &S,
    retriever: &R,
    analyzer: &Analyzer<L>,
    settings: &StageSettings,
    output: &OutputSettings,
    heading: &str,
) -> Result<RunSummary, PipelineError>
where
    S: TrendSource,
    R: ContentRetriever,
    L: StructuredLlm,
{
    let report = run(source, retriever, analyzer, settings).await?;
    outputs::write_all(&report, output, heading).await?;
    Ok(RunSummary::of(&report))
}
