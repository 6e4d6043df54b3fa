//! Report assembly and the display filter.

use crate::error::PipelineError;
use crate::models::{AnalysisResult, ReportItem, RetrievalResult, TrendItem};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Top-level shape of the JSON artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportLayout {
    /// A bare JSON array of report items.
    List,
    /// `{"final_report": [...]}` with a generation timestamp.
    FinalReport,
}

/// Which items a human-facing view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayPolicy {
    /// Hide items whose analysis is the sentinel.
    pub drop_failed_analyses: bool,
}

/// Zip items with their retrievals and analyses, in input order.
///
/// All three sequences must have the same length; a mismatch means a pool
/// lost or duplicated an item and the run is aborted.
pub fn assemble(
    items: Vec<TrendItem>,
    retrievals: Vec<RetrievalResult>,
    analyses: Vec<AnalysisResult>,
) -> Result<Vec<ReportItem>, PipelineError> {
    if items.len() != retrievals.len() || items.len() != analyses.len() {
        return Err(PipelineError::Misaligned {
            items: items.len(),
            retrievals: retrievals.len(),
            analyses: analyses.len(),
        });
    }

    Ok(items
        .into_iter()
        .zip(retrievals)
        .zip(analyses)
        .map(|((source, retrieval), analysis)| ReportItem {
            source,
            retrieval,
            analysis,
        })
        .collect())
}

/// Items a view should show under `policy`. The report itself is never filtered.
pub fn visible(report: &[ReportItem], policy: DisplayPolicy) -> Vec<&ReportItem> {
    report
        .iter()
        .filter(|r| !(policy.drop_failed_analyses && r.analysis.is_sentinel()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(category: &str) -> AnalysisResult {
        AnalysisResult {
            context: format!("{category} news."),
            summary: vec!["point".into()],
            category: category.into(),
        }
    }

    fn inputs() -> (Vec<TrendItem>, Vec<RetrievalResult>, Vec<AnalysisResult>) {
        let items = vec![
            TrendItem::new("A", "https://youtu.be/abc"),
            TrendItem::new("B", "not-a-url"),
            TrendItem::new("C", "https://youtu.be/xyz"),
        ];
        let retrievals = vec![
            RetrievalResult::success(items[0].clone(), "text".into()),
            RetrievalResult::failed(items[1].clone(), "bad url"),
            RetrievalResult::success(items[2].clone(), "more".into()),
        ];
        let analyses = vec![analysis("Sports"), AnalysisResult::sentinel(), analysis("Music")];
        (items, retrievals, analyses)
    }

    #[test]
    fn test_assemble_preserves_order_and_length() {
        let (items, retrievals, analyses) = inputs();
        let report = assemble(items.clone(), retrievals, analyses).unwrap();
        assert_eq!(report.len(), items.len());
        for (row, item) in report.iter().zip(&items) {
            assert_eq!(&row.source, item);
            assert_eq!(&row.retrieval.item, item);
        }
        assert!(report[1].analysis.is_sentinel());
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let (items, retrievals, analyses) = inputs();
        let first = assemble(items.clone(), retrievals.clone(), analyses.clone()).unwrap();
        let second = assemble(items, retrievals, analyses).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_assemble_rejects_mismatch() {
        let (items, mut retrievals, analyses) = inputs();
        retrievals.pop();
        let err = assemble(items, retrievals, analyses).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Misaligned {
                items: 3,
                retrievals: 2,
                analyses: 3
            }
        ));
    }

    #[test]
    fn test_empty_inputs_assemble_to_empty_report() {
        assert!(assemble(vec![], vec![], vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_visible_honors_policy() {
        let (items, retrievals, analyses) = inputs();
        let report = assemble(items, retrievals, analyses).unwrap();

        let all = visible(&report, DisplayPolicy::default());
        assert_eq!(all.len(), 3);

        let shown = visible(&report, DisplayPolicy { drop_failed_analyses: true });
        let titles: Vec<&str> = shown.iter().map(|r| r.source.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }
}
