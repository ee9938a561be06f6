//! Bar charts for the report, drawn with `plotters` on an in-memory bitmap.
//!
//! Each chart is rendered into an RGB buffer and encoded as PNG through [`image`], so the file has
//! no alpha channel and the PDF writer can embed it directly. Chart text uses the regular face of
//! the report's font family. Rendering is deterministic: the same chart and font always yield the
//! same bytes.

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use genpdf::error::{Error, ErrorKind};
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use log::{debug, info};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::analysis::Analysis;
use crate::config::ChartPaths;
use crate::error::{BoxedCause, ReportError};
use crate::fonts::FontSource;

/// Width of every chart in pixels.
pub const CHART_WIDTH: u32 = 800;
/// Height of every chart in pixels.
pub const CHART_HEIGHT: u32 = 500;

pub const SKY_BLUE: [u8; 3] = [135, 206, 235];
pub const SALMON: [u8; 3] = [250, 128, 114];
pub const LIGHT_GREEN: [u8; 3] = [144, 238, 144];

/// Name the report font is registered under with `plotters`.
const CHART_FONT_FAMILY: &str = "sales-report-sans";
const TITLE_SIZE: u32 = 26;
const LABEL_SIZE: u32 = 14;
const AXIS_DESC_SIZE: u32 = 16;
/// Space kept above the tallest bar.
const AXIS_HEADROOM: f64 = 1.1;
const BAR_MARGIN: u32 = 12;

static CHART_FONT: OnceLock<()> = OnceLock::new();

/// One category of a bar chart.
#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// A titled bar chart with labelled axes.
#[derive(Clone, Debug, PartialEq)]
pub struct BarChart {
    title: String,
    x_label: String,
    y_label: String,
    color: [u8; 3],
    bars: Vec<Bar>,
}

impl BarChart {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        color: [u8; 3],
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            color,
            bars: Vec::new(),
        }
    }

    /// Appends bars in the order they should appear and returns the updated chart.
    pub fn with_bars<I, L>(mut self, bars: I) -> Self
    where
        I: IntoIterator<Item = (L, f64)>,
        L: Into<String>,
    {
        self.bars.extend(bars.into_iter().map(|(label, value)| Bar {
            label: label.into(),
            value,
        }));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Top of the y axis: the tallest bar plus headroom, or 1 when there is nothing to show.
    pub fn axis_max(&self) -> f64 {
        let max = self
            .bars
            .iter()
            .map(|bar| bar.value)
            .fold(0.0, f64::max);
        if max > 0.0 {
            max * AXIS_HEADROOM
        } else {
            1.0
        }
    }

    /// Label printed under a category; segment edges stay blank.
    fn category_label(&self, segment: &SegmentValue<u32>) -> String {
        match segment {
            SegmentValue::CenterOf(index) => self
                .bars
                .get(*index as usize)
                .map(|bar| bar.label.clone())
                .unwrap_or_default(),
            SegmentValue::Exact(_) | SegmentValue::Last => String::new(),
        }
    }

    fn draw(&self, buffer: &mut [u8]) -> Result<(), BoxedCause> {
        let root = BitMapBackend::with_buffer(buffer, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let categories = self.bars.len().max(1) as u32;
        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, (CHART_FONT_FAMILY, TITLE_SIZE))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..categories).into_segmented(), 0f64..self.axis_max())?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(categories as usize)
            .x_label_formatter(&|segment| self.category_label(segment))
            .y_label_formatter(&|value| format_tick(*value))
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .label_style((CHART_FONT_FAMILY, LABEL_SIZE))
            .axis_desc_style((CHART_FONT_FAMILY, AXIS_DESC_SIZE))
            .draw()?;

        let [red, green, blue] = self.color;
        chart.draw_series(
            Histogram::vertical(&chart)
                .style(RGBColor(red, green, blue).filled())
                .margin(BAR_MARGIN)
                .data(
                    self.bars
                        .iter()
                        .enumerate()
                        .map(|(index, bar)| (index as u32, bar.value.max(0.0))),
                ),
        )?;

        root.present()?;
        Ok(())
    }

    /// Draws the chart into an RGB image.
    ///
    /// The report font must have been registered by [`render_charts`] or [`register_chart_font`].
    pub fn render(&self) -> Result<RgbImage, ReportError> {
        let mut buffer = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
        self.draw(&mut buffer).map_err(|source| self.encode_error(source))?;
        RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, buffer)
            .ok_or_else(|| self.encode_error("pixel buffer does not match the chart size".into()))
    }

    /// Draws the chart and encodes it as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, ReportError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(self.render()?)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .map_err(|err| self.encode_error(Box::new(err)))?;
        Ok(bytes)
    }

    /// Draws the chart and writes it to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let bytes = self.encode_png()?;
        fs::write(path, &bytes).map_err(|err| ReportError::output_io(path, err))?;
        debug!("Chart '{}' encoded to {} bytes", self.title, bytes.len());
        Ok(())
    }

    fn encode_error(&self, source: BoxedCause) -> ReportError {
        ReportError::ChartEncode {
            title: self.title.clone(),
            source,
        }
    }
}

/// Units sold per price band.
pub fn price_band_chart(analysis: &Analysis) -> BarChart {
    BarChart::new(
        "Sales by Price Band",
        "Price band (R$)",
        "Units sold",
        SKY_BLUE,
    )
    .with_bars(
        analysis
            .price_bands
            .iter()
            .map(|band| (band.band.to_string(), band.units as f64)),
    )
}

/// Brands with the lowest average ticket.
pub fn lowest_ticket_chart(analysis: &Analysis) -> BarChart {
    BarChart::new(
        "Lowest Average Ticket by Brand",
        "Brand",
        "Average ticket (R$)",
        SALMON,
    )
    .with_bars(
        analysis
            .lowest_ticket
            .iter()
            .map(|ticket| (ticket.brand.clone(), ticket.mean_price)),
    )
}

/// Total revenue per brand.
pub fn revenue_per_brand_chart(analysis: &Analysis) -> BarChart {
    BarChart::new(
        "Total Revenue by Brand",
        "Brand",
        "Total revenue (R$)",
        LIGHT_GREEN,
    )
    .with_bars(
        analysis
            .revenue_per_brand
            .iter()
            .map(|brand| (brand.brand.clone(), brand.revenue)),
    )
}

/// Makes the regular face of `fonts` available to chart text.
///
/// `plotters` keeps registered fonts for the life of the process, so only the first call loads
/// anything.
pub fn register_chart_font(fonts: &FontSource) -> Result<(), ReportError> {
    if CHART_FONT.get().is_some() {
        return Ok(());
    }

    let bytes = fonts
        .regular_face_bytes()
        .map_err(ReportError::FontUnavailable)?;
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(CHART_FONT_FAMILY, FontStyle::Normal, bytes).map_err(|_| {
        ReportError::FontUnavailable(Error::new(
            format!(
                "{} cannot be used for chart text",
                fonts.regular_path().display()
            ),
            ErrorKind::InvalidFont,
        ))
    })?;
    let _ = CHART_FONT.set(());
    debug!("Registered chart font from {}", fonts.regular_path().display());
    Ok(())
}

/// Renders the three report charts to the configured paths.
pub fn render_charts(
    analysis: &Analysis,
    paths: &ChartPaths,
    fonts: &FontSource,
) -> Result<(), ReportError> {
    register_chart_font(fonts)?;

    let charts = [
        (price_band_chart(analysis), &paths.price_bands),
        (lowest_ticket_chart(analysis), &paths.lowest_ticket),
        (revenue_per_brand_chart(analysis), &paths.revenue_per_brand),
    ];
    for (chart, path) in &charts {
        chart.save(path)?;
        info!("Wrote chart '{}' to {}", chart.title(), path.display());
    }
    Ok(())
}

/// Compact tick label such as `250k` or `1.5M`.
pub fn format_tick(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "k")
    } else {
        (value, "")
    };

    let text = format!("{:.1}", scaled);
    let text = text.strip_suffix(".0").unwrap_or(&text);
    format!("{}{}", text, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts;

    fn sample() -> BarChart {
        BarChart::new("Revenue", "Brand", "R$", LIGHT_GREEN).with_bars([
            ("Fiat", 10.0),
            ("VW", 40.0),
            ("Renault", 20.0),
        ])
    }

    #[test]
    fn tick_labels_are_compact() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(2_500.0), "2.5k");
        assert_eq!(format_tick(200_000.0), "200k");
        assert_eq!(format_tick(1_500_000.0), "1.5M");
        assert_eq!(format_tick(0.5), "0.5");
    }

    #[test]
    fn axis_leaves_headroom_above_tallest_bar() {
        assert!((sample().axis_max() - 44.0).abs() < 1e-9);
        assert_eq!(BarChart::new("t", "x", "y", SALMON).axis_max(), 1.0);
        let negative = BarChart::new("t", "x", "y", SALMON).with_bars([("a", -3.0)]);
        assert_eq!(negative.axis_max(), 1.0);
    }

    #[test]
    fn categories_are_labelled_at_their_centre() {
        let chart = sample();
        assert_eq!(chart.category_label(&SegmentValue::CenterOf(1)), "VW");
        assert_eq!(chart.category_label(&SegmentValue::CenterOf(7)), "");
        assert_eq!(chart.category_label(&SegmentValue::Exact(0)), "");
        assert_eq!(chart.category_label(&SegmentValue::Last), "");
    }

    #[test]
    fn rendering_is_deterministic() {
        let Ok(source) = fonts::resolve_font_source() else {
            eprintln!("Skipping rendering_is_deterministic: no font family available");
            return;
        };
        register_chart_font(&source).unwrap();

        let first = sample().encode_png().unwrap();
        let second = sample().encode_png().unwrap();
        assert!(first.starts_with(b"\x89PNG"));
        assert_eq!(first, second);

        let image = sample().render().unwrap();
        assert_eq!(image.dimensions(), (CHART_WIDTH, CHART_HEIGHT));
    }
}
