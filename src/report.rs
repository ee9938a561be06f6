//! Assembles the two-page sales report.
//!
//! [`compose`] turns the analysis into a [`ReportDocument`]; [`write_report`] renders it to PDF.
//! The summary page is a fixed-layout template whose block positions are derived from the page's
//! content area, and the second page holds the best-sellers table.

use std::fs;
use std::path::Path;

use genpdf::PaperSize;
use log::{debug, info};

use crate::analysis::{Analysis, TOP_SELLER_COUNT};
use crate::builder::{PageNumberFooter, PageSetup};
use crate::config::ChartPaths;
use crate::elements;
use crate::error::ReportError;
use crate::fonts::FontSource;
use crate::layout::{self, Slot};
use crate::model::{
    Block, FixedPage, HorizontalAlignment, Page, ReportDocument, TablePage, TextBlock,
};

/// Title shown on the summary page and stored in the PDF metadata.
pub const REPORT_TITLE: &str = "Sales Report - Consolidated Analysis";

/// Header row of the best-sellers table.
pub const TOP_SELLERS_HEADER: [&str; 2] = ["Vehicle Name", "Units Sold"];

const PAGE_MARGIN_MM: f64 = 15.0;
const FOOTER_HEIGHT_MM: f64 = 10.0;
const BODY_FONT_SIZE: u8 = 11;

const TITLE_FONT_SIZE: u8 = 18;
const HEADING_FONT_SIZE: u8 = 13;
const SUMMARY_FONT_SIZE: u8 = 10;
const TITLE_HEIGHT_MM: f64 = 12.0;
const HEADING_HEIGHT_MM: f64 = 9.0;
const LINE_HEIGHT_MM: f64 = 8.0;
const BODY_INDENT_MM: f64 = 5.0;

fn heading(text: &str) -> Block {
    Block::text(
        Slot::line(HEADING_HEIGHT_MM),
        TextBlock::new(text, HEADING_FONT_SIZE).bold(),
    )
}

fn body_line(text: String, font_size: u8) -> Block {
    Block::text(
        Slot::line(LINE_HEIGHT_MM).indented(BODY_INDENT_MM),
        TextBlock::new(text, font_size),
    )
}

fn chart(path: &Path) -> Block {
    Block::image(Slot::fill(1.0), path)
}

/// Builds the report content from the analysis results.
pub fn compose(analysis: &Analysis, charts: &ChartPaths) -> ReportDocument {
    let leader = &analysis.volume_leader;
    let max = &analysis.max_revenue;
    let min = &analysis.min_revenue;

    let mut summary = FixedPage::new()
        .with_block(Block::text(
            Slot::line(TITLE_HEIGHT_MM),
            TextBlock::new(REPORT_TITLE, TITLE_FONT_SIZE)
                .bold()
                .with_alignment(HorizontalAlignment::Center),
        ))
        .with_block(body_line(
            format!(
                "Top brand by sales volume: {} ({} units)",
                leader.brand,
                format_units(leader.units)
            ),
            BODY_FONT_SIZE,
        ))
        .with_block(body_line(
            format!(
                "Highest-revenue vehicle: {} (R$ {})",
                max.vehicle_name,
                format_amount(max.revenue)
            ),
            BODY_FONT_SIZE,
        ))
        .with_block(body_line(
            format!(
                "Lowest-revenue vehicle: {} (R$ {})",
                min.vehicle_name,
                format_amount(min.revenue)
            ),
            BODY_FONT_SIZE,
        ))
        .with_block(heading("Charts"));

    for path in charts.all() {
        summary = summary.with_block(chart(path));
    }

    summary = summary
        .with_block(heading("Summary"))
        .with_block(body_line(
            format!(
                "The brand with the highest sales volume is {}, with {} units sold.",
                leader.brand,
                format_units(leader.units)
            ),
            SUMMARY_FONT_SIZE,
        ))
        .with_block(body_line(
            format!(
                "The highest-revenue vehicle was {}, with revenue of R$ {}.",
                max.vehicle_name,
                format_amount(max.revenue)
            ),
            SUMMARY_FONT_SIZE,
        ));

    if analysis.dropped_rows > 0 {
        summary = summary.with_block(body_line(
            format!(
                "Note: {} vehicle row(s) had no matching brand and were excluded.",
                analysis.dropped_rows
            ),
            SUMMARY_FONT_SIZE,
        ));
    }

    let mut top_sellers = TablePage::new(
        format!("Top {} Best-Selling Vehicles", TOP_SELLER_COUNT),
        TOP_SELLERS_HEADER,
    );
    for record in &analysis.top_sellers {
        top_sellers = top_sellers.with_row([
            record.vehicle_name.clone(),
            record.units_sold.to_string(),
        ]);
    }

    ReportDocument::new(REPORT_TITLE)
        .with_page(Page::Fixed(summary))
        .with_page(Page::Table(top_sellers))
}

/// Letter paper with 15 mm margins and a page number in the footer.
pub fn page_setup(title: &str) -> PageSetup {
    PageSetup::new(title, PaperSize::Letter)
        .with_margin_mm(PAGE_MARGIN_MM)
        .with_font_size(BODY_FONT_SIZE)
        .with_footer(PageNumberFooter::new(FOOTER_HEIGHT_MM))
}

/// Renders the document to PDF bytes.
///
/// Fixed pages are placed before fonts are loaded, so a template that cannot fit fails with
/// [`ReportError::Layout`].
pub fn render_report(document: &ReportDocument, fonts: &FontSource) -> Result<Vec<u8>, ReportError> {
    let setup = page_setup(document.title());
    check_layout(document, &setup)?;

    let family = fonts.load_family().map_err(ReportError::FontUnavailable)?;
    let mut pdf = setup.build(family);
    pdf.push(elements::page_elements(document.pages()).map_err(ReportError::Render)?);

    let mut bytes = Vec::new();
    pdf.render(&mut bytes).map_err(ReportError::Render)?;
    debug!(
        "Rendered {} logical pages into {} bytes using '{}' fonts",
        document.pages().len(),
        bytes.len(),
        fonts.family_name()
    );
    Ok(bytes)
}

/// Places the blocks of every fixed page inside the content area of `setup`.
pub fn check_layout(document: &ReportDocument, setup: &PageSetup) -> Result<(), ReportError> {
    let (width, height) = setup.content_size_mm();
    for page in document.pages() {
        if let Page::Fixed(fixed) = page {
            let slots: Vec<Slot> = fixed.blocks().iter().map(Block::slot).collect();
            layout::arrange(width, height, elements::BLOCK_SPACING_MM, &slots)?;
        }
    }
    Ok(())
}

/// Fails with [`ReportError::ChartMissing`] for the first referenced image absent from disk.
pub fn ensure_charts_present(document: &ReportDocument) -> Result<(), ReportError> {
    match document.image_paths().find(|image| !image.is_file()) {
        Some(missing) => Err(ReportError::ChartMissing {
            path: missing.to_path_buf(),
        }),
        None => Ok(()),
    }
}

/// Renders the document and writes it to `path`.
///
/// Every referenced chart must already exist on disk.
pub fn write_report(
    document: &ReportDocument,
    fonts: &FontSource,
    path: impl AsRef<Path>,
) -> Result<(), ReportError> {
    ensure_charts_present(document)?;

    let path = path.as_ref();
    let bytes = render_report(document, fonts)?;
    fs::write(path, &bytes).map_err(|err| ReportError::output_io(path, err))?;
    info!("Wrote report to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Formats a unit count with thousands separators.
pub fn format_units(units: u64) -> String {
    group_thousands(&units.to_string())
}

/// Formats a currency amount with thousands separators and two decimals.
pub fn format_amount(value: f64) -> String {
    let cents = (value * 100.0).round() as i128;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        group_thousands(&(cents / 100).to_string()),
        cents % 100
    )
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::config::{JoinMode, ReportConfig};
    use crate::loader::Tables;
    use crate::model::BlockContent;
    use crate::records::{BrandRecord, VehicleRecord};

    fn analysis(vehicles: Vec<VehicleRecord>) -> Analysis {
        let tables = Tables {
            vehicles,
            brands: vec![BrandRecord::new(1, "X"), BrandRecord::new(2, "Y")],
        };
        analyze(&tables, JoinMode::Inner).unwrap()
    }

    fn texts(page: &FixedPage) -> Vec<&str> {
        page.blocks()
            .iter()
            .filter_map(|block| match block.content() {
                BlockContent::Text(text) => Some(text.text()),
                BlockContent::Image(_) => None,
            })
            .collect()
    }

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(150_000.0), "150,000.00");
        assert_eq!(format_amount(1_234_567.891), "1,234,567.89");
        assert_eq!(format_amount(12.5), "12.50");
        assert_eq!(format_amount(-1_000.0), "-1,000.00");
        assert_eq!(format_units(1_000_000), "1,000,000");
        assert_eq!(format_units(999), "999");
    }

    #[test]
    fn summary_page_states_the_key_facts() {
        let analysis = analysis(vec![
            VehicleRecord::new("A", 1, 10, 15_000.0),
            VehicleRecord::new("B", 1, 5, 25_000.0),
        ]);
        let config = ReportConfig::default();
        let document = compose(&analysis, &config.charts);

        let Page::Fixed(summary) = &document.pages()[0] else {
            panic!("first page should be the summary");
        };
        let lines = texts(summary);
        assert_eq!(lines[0], REPORT_TITLE);
        assert_eq!(lines[1], "Top brand by sales volume: X (15 units)");
        assert_eq!(lines[2], "Highest-revenue vehicle: A (R$ 150,000.00)");
        assert_eq!(lines[3], "Lowest-revenue vehicle: B (R$ 125,000.00)");
        assert!(lines.iter().all(|line| !line.starts_with("Note:")));

        let images: Vec<&Path> = summary.image_paths().collect();
        assert_eq!(images, config.charts.all().to_vec());
    }

    #[test]
    fn table_page_lists_top_sellers_in_order() {
        let analysis = analysis(
            (1..=7)
                .map(|i| VehicleRecord::new(format!("V{i}"), 1, i * 10, 1_000.0))
                .collect(),
        );
        let document = compose(&analysis, &ReportConfig::default().charts);

        let Page::Table(table) = &document.pages()[1] else {
            panic!("second page should be the table");
        };
        assert_eq!(table.header(), TOP_SELLERS_HEADER.map(String::from));
        let names: Vec<&str> = table.rows().iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, vec!["V7", "V6", "V5", "V4", "V3"]);
        assert_eq!(table.rows()[0][1], "70");
    }

    #[test]
    fn dropped_rows_are_noted() {
        let analysis = analysis(vec![
            VehicleRecord::new("A", 1, 10, 15_000.0),
            VehicleRecord::new("Orphan", 9, 5, 25_000.0),
        ]);
        let document = compose(&analysis, &ReportConfig::default().charts);
        let Page::Fixed(summary) = &document.pages()[0] else {
            panic!("first page should be the summary");
        };
        assert!(texts(summary)
            .iter()
            .any(|line| line.starts_with("Note: 1 vehicle row(s)")));
    }

    #[test]
    fn summary_template_fits_a_letter_page() {
        let analysis = analysis(vec![
            VehicleRecord::new("A", 1, 10, 15_000.0),
            VehicleRecord::new("Orphan", 9, 5, 25_000.0),
        ]);
        let document = compose(&analysis, &ReportConfig::default().charts);
        let setup = page_setup(REPORT_TITLE);
        check_layout(&document, &setup).unwrap();

        let Page::Fixed(summary) = &document.pages()[0] else {
            panic!("first page should be the summary");
        };
        let slots: Vec<Slot> = summary.blocks().iter().map(Block::slot).collect();
        let (width, height) = setup.content_size_mm();
        let placements =
            layout::arrange(width, height, elements::BLOCK_SPACING_MM, &slots).unwrap();
        for (index, placement) in placements.iter().enumerate() {
            for other in &placements[index + 1..] {
                assert!(!placement.overlaps(other));
            }
        }
        assert!(placements.iter().all(|p| p.height > 0.0));
    }

    #[test]
    fn overfull_template_is_a_layout_error() {
        let mut page = FixedPage::new();
        for line in 0..40 {
            page = page.with_block(body_line(format!("line {line}"), BODY_FONT_SIZE));
        }
        let document = ReportDocument::new(REPORT_TITLE).with_page(Page::Fixed(page));

        assert!(matches!(
            check_layout(&document, &page_setup(REPORT_TITLE)),
            Err(ReportError::Layout(_))
        ));
    }

    #[test]
    fn missing_chart_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig::in_dir(dir.path());
        let analysis = analysis(vec![VehicleRecord::new("A", 1, 10, 15_000.0)]);
        let document = compose(&analysis, &config.charts);

        fs::write(&config.charts.price_bands, b"png").unwrap();
        match ensure_charts_present(&document) {
            Err(ReportError::ChartMissing { path }) => {
                assert_eq!(path, config.charts.lowest_ticket)
            }
            other => panic!("expected missing chart error, got {other:?}"),
        }
    }
}
