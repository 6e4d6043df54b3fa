//! Markdown digest of a report, for reading rather than processing.
//!
//! Items are grouped under their category (alphabetical), keeping report
//! order within a category. The display policy decides which items appear.

use crate::error::PipelineError;
use crate::models::ReportItem;
use crate::report::{DisplayPolicy, visible};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Render the digest. `heading` names the source, e.g. `YouTube Trends`.
pub fn report_to_markdown(
    report: &[ReportItem],
    policy: DisplayPolicy,
    heading: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let shown = visible(report, policy);
    let mut md = format!(
        "# {heading}\n\n_Generated {}. Showing {} of {} items._\n",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        shown.len(),
        report.len()
    );

    let mut by_category: BTreeMap<&str, Vec<&ReportItem>> = BTreeMap::new();
    for item in shown {
        by_category
            .entry(item.analysis.category.as_str())
            .or_default()
            .push(item);
    }

    for (category, items) in by_category {
        md.push_str(&format!("\n## {category}\n"));
        for item in items {
            let title = if item.source.title.trim().is_empty() {
                item.source.search_query()
            } else {
                item.source.title.clone()
            };
            md.push_str(&format!("\n### [{}]({})\n\n", title, item.source.link));
            md.push_str(&format!("{}\n\n", item.analysis.context));
            for point in &item.analysis.summary {
                md.push_str(&format!("- {point}\n"));
            }
            if let Some(error) = item.retrieval.error() {
                md.push_str(&format!("\n> Analyzed from the title only: {error}\n"));
            }
        }
    }
    md
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_digest(
    report: &[ReportItem],
    policy: DisplayPolicy,
    heading: &str,
    path: &Path,
) -> Result<(), PipelineError> {
    let md = report_to_markdown(report, policy, heading, Utc::now());
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await.map_err(|source| PipelineError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, md).await.map_err(|source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote Markdown digest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, RetrievalResult, TrendItem};
    use chrono::TimeZone;

    fn row(title: &str, category: &str) -> ReportItem {
        let item = TrendItem::new(title, format!("https://example.com/{title}"));
        ReportItem {
            source: item.clone(),
            retrieval: RetrievalResult::success(item, "text".into()),
            analysis: AnalysisResult {
                context: format!("{title} context."),
                summary: vec!["first".into(), "second".into()],
                category: category.into(),
            },
        }
    }

    fn failed_row(title: &str) -> ReportItem {
        let item = TrendItem::new(title, "not-a-url");
        ReportItem {
            source: item.clone(),
            retrieval: RetrievalResult::failed(item, "bad url"),
            analysis: AnalysisResult::sentinel(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_grouped_by_category() {
        let report = vec![row("b", "Sports"), row("a", "Music"), row("c", "Sports")];
        let md = report_to_markdown(&report, DisplayPolicy::default(), "Trends", at());
        let music = md.find("## Music").unwrap();
        let sports = md.find("## Sports").unwrap();
        assert!(music < sports);
        assert!(md.find("### [b]").unwrap() < md.find("### [c]").unwrap());
        assert!(md.contains("- first\n- second\n"));
        assert!(md.contains("Showing 3 of 3 items"));
    }

    #[test]
    fn test_filter_drops_sentinels() {
        let report = vec![row("a", "Music"), failed_row("b")];
        let md = report_to_markdown(&report, DisplayPolicy { drop_failed_analyses: true }, "Trends", at());
        assert!(!md.contains("Error during analysis."));
        assert!(md.contains("Showing 1 of 2 items"));

        let md = report_to_markdown(&report, DisplayPolicy::default(), "Trends", at());
        assert!(md.contains("## Error"));
        assert!(md.contains("> Analyzed from the title only: bad url"));
    }
}
