//! Runs the report stages in order.

use log::info;

use crate::analysis::{self, Analysis};
use crate::chart;
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::fonts;
use crate::loader;
use crate::repair;
use crate::report;

/// Repairs any raw exports, loads the inputs, analyzes them, renders the charts and writes the
/// report.
///
/// Returns the analysis so callers can inspect the computed views.
pub fn run(config: &ReportConfig) -> Result<Analysis, ReportError> {
    let repaired = match &config.repair {
        Some(repair) => repair::repair_exports(repair)?,
        None => Vec::new(),
    };

    let tables = loader::load_tables(&config.inputs)?;
    let analysis = analysis::analyze(&tables, config.join_mode)?;

    let fonts = fonts::resolve_font_source().map_err(ReportError::FontUnavailable)?;
    info!(
        "Using '{}' fonts from {}",
        fonts.family_name(),
        fonts.directory().display()
    );

    if let Some(repair) = &config.repair {
        repair::write_record_reports(&repaired, repair, &fonts)?;
    }
    chart::render_charts(&analysis, &config.charts, &fonts)?;

    let document = report::compose(&analysis, &config.charts);
    report::write_report(&document, &fonts, &config.report)?;
    Ok(analysis)
}
