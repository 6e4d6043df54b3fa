//! JSON report artifact.
//!
//! Two layouts are supported:
//!
//! ```text
//! list          [ {source, retrieval, analysis}, ... ]
//! final-report  { "generated_at": "...", "final_report": [ {source, retrieval, analysis}, ... ] }
//! ```
//!
//! Output is UTF-8 with 4-space indentation. Retrieved content (transcripts,
//! page text) is large and is left out unless explicitly requested; the
//! retrieval status and error always remain.

use crate::error::PipelineError;
use crate::models::ReportItem;
use crate::report::ReportLayout;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize `report` in `layout`.
///
/// # Arguments
///
/// * `report` - Assembled report items, in source order
/// * `layout` - Bare list, or object keyed by `final_report`
/// * `include_content` - Keep retrieved text in each `retrieval` object
/// * `generated_at` - Timestamp for the final-report layout
///
/// # Returns
///
/// Pretty-printed JSON with 4-space indentation and a trailing newline.
///
/// # Errors
///
/// Returns `PipelineError::Serialize` if an item cannot be converted.
pub fn render(
    report: &[ReportItem],
    layout: ReportLayout,
    include_content: bool,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, PipelineError> {
    let mut rows = Vec::with_capacity(report.len());
    for item in report {
        let mut row = serde_json::to_value(item)?;
        if !include_content {
            if let Some(retrieval) = row.get_mut("retrieval").and_then(Value::as_object_mut) {
                retrieval.remove("content");
            }
        }
        rows.push(row);
    }

    let document = match layout {
        ReportLayout::List => Value::Array(rows),
        ReportLayout::FinalReport => json!({
            "generated_at": generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "final_report": rows,
        }),
    };

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write the report to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns `PipelineError::Write` naming the directory or file that failed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), ?layout))]
pub async fn write_report(
    report: &[ReportItem],
    path: &Path,
    layout: ReportLayout,
    include_content: bool,
) -> Result<(), PipelineError> {
    let bytes = render(report, layout, include_content, Utc::now())?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await.map_err(|source| PipelineError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    info!(items = report.len(), bytes = bytes.len(), "Writing JSON");
    if let Err(source) = fs::write(path, bytes).await {
        error!(error = %source, "Failed to write JSON report");
        return Err(PipelineError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    info!("Wrote JSON report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, RetrievalResult, TrendItem};
    use chrono::TimeZone;

    fn sample() -> Vec<ReportItem> {
        let a = TrendItem::new("A", "https://youtu.be/abc");
        let b = TrendItem::new("B", "not-a-url");
        vec![
            ReportItem {
                source: a.clone(),
                retrieval: RetrievalResult::success(a, "long transcript".into()),
                analysis: AnalysisResult {
                    context: "Something happened.".into(),
                    summary: vec!["One".into()],
                    category: "News".into(),
                },
            },
            ReportItem {
                source: b.clone(),
                retrieval: RetrievalResult::failed(b, "invalid or unsupported YouTube URL format: not-a-url"),
                analysis: AnalysisResult::sentinel(),
            },
        ]
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_list_layout_strips_content() {
        let bytes = render(&sample(), ReportLayout::List, false, at()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["retrieval"]["status"], "Success");
        assert!(rows[0]["retrieval"].get("content").is_none());
        assert_eq!(rows[1]["retrieval"]["status"], "Failed");
        assert_eq!(rows[1]["analysis"]["context"], "Error during analysis.");
    }

    #[test]
    fn test_final_report_layout_keeps_content_when_asked() {
        let bytes = render(&sample(), ReportLayout::FinalReport, true, at()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["generated_at"], "2025-05-06T08:30:00Z");
        assert_eq!(value["final_report"][0]["retrieval"]["content"], "long transcript");
    }

    #[test]
    fn test_four_space_indent() {
        let bytes = render(&sample(), ReportLayout::FinalReport, false, at()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\n    \"final_report\": ["));
        assert!(text.contains("\n        {"));
        assert!(text.contains("\n    \"generated_at\": \""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_empty_report_is_empty_list() {
        let bytes = render(&[], ReportLayout::List, false, at()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "[]\n");
    }

    #[tokio::test]
    async fn test_write_report_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reports/final_analysis_report.json");
        write_report(&sample(), &path, ReportLayout::FinalReport, false)
            .await
            .unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["final_report"].as_array().unwrap().len(), 2);
    }
}
