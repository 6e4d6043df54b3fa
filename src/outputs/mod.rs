//! Output generation for a finished report.
//!
//! # Submodules
//!
//! - [`json`]: The JSON artifact, always written
//! - [`markdown`]: An optional human-readable digest
//!
//! Both are written only after the whole report has been assembled, so a
//! failed run never leaves a partial file behind.

pub mod json;
pub mod markdown;

use crate::config::OutputSettings;
use crate::error::PipelineError;
use crate::models::ReportItem;

/// Write every configured output for `report`.
pub async fn write_all(report: &[ReportItem], settings: &OutputSettings, heading: &str) -> Result<(), PipelineError> {
    json::write_report(report, &settings.path, settings.layout, settings.include_content).await?;
    if let Some(path) = &settings.markdown {
        markdown::write_digest(report, settings.display, heading, path).await?;
    }
    Ok(())
}
