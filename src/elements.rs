//! `genpdf` elements for the report content model.
//!
//! This module adds an element that places children at computed positions on a page, an image
//! element that scales itself to fit its box, and the conversion from [`crate::model`] pages into
//! renderable elements.

use std::path::Path;

use image::GenericImageView;
use log::warn;

use genpdf::elements::{
    Break, FrameCellDecorator, Image, LinearLayout, PageBreak, Paragraph, TableLayout,
};
use genpdf::error::{Context as _, Error, ErrorKind};
use genpdf::style::{Style, StyledString};
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

use crate::layout::{self, Slot};
use crate::model::{
    BlockContent, FixedPage, HorizontalAlignment, Page, RecordsPage, TablePage, TextBlock,
};

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
/// Vertical gap between neighbouring fixed-layout blocks.
pub(crate) const BLOCK_SPACING_MM: f64 = 2.0;
const PAGE_TITLE_FONT_SIZE: u8 = 14;
const RECORDS_TITLE_FONT_SIZE: u8 = 20;
const TABLE_CELL_PADDING_MM: f64 = 1.5;
/// Keeps fitted images clear of rounding errors at the area edge.
const FIT_TOLERANCE: f64 = 0.99;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / dpi;
    let height_mm = MM_PER_INCH * (px_height as f64) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// Uniform scale factor that fits `natural` into `available`, preserving the aspect ratio.
pub fn fit_scale(natural: (f64, f64), available: (f64, f64)) -> f64 {
    let (natural_width, natural_height) = natural;
    let (available_width, available_height) = available;
    if natural_width <= f64::EPSILON || natural_height <= f64::EPSILON {
        return 1.0;
    }
    (available_width / natural_width)
        .min(available_height / natural_height)
        .max(0.0)
}

/// An image that scales itself to the largest size fitting its render area.
pub struct FittedImage {
    image: Image,
    natural_size: Size,
}

impl FittedImage {
    /// Creates a fitted image from an existing [`DynamicImage`][image::DynamicImage].
    pub fn from_dynamic_image(image: image::DynamicImage) -> Result<Self, Error> {
        let natural_size = estimated_image_size(&image, DEFAULT_IMAGE_DPI);
        let mut image = Image::from_dynamic_image(image)?;
        image.set_alignment(Alignment::Center);
        Ok(Self {
            image,
            natural_size,
        })
    }

    /// Creates a fitted image from the file located at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_dynamic_image(decode_image_from_path(path)?)
    }
}

impl Element for FittedImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let available = area.size();
        let scale = fit_scale(
            (
                mm_to_f64(self.natural_size.width),
                mm_to_f64(self.natural_size.height),
            ),
            (mm_to_f64(available.width), mm_to_f64(available.height)),
        ) * FIT_TOLERANCE;
        self.image.set_scale(Scale::new(scale, scale));
        self.image.render(context, area, style)
    }
}

/// Renders child elements at positions computed from their slots and the available area.
///
/// The element always consumes the whole area it is given, so it is meant to fill a page.
pub struct FixedLayout {
    children: Vec<(Slot, Box<dyn Element>)>,
    spacing: Mm,
}

impl FixedLayout {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            spacing: mm_from_f64(BLOCK_SPACING_MM),
        }
    }

    /// Appends a child element positioned by `slot`.
    pub fn push<E: Element + 'static>(&mut self, slot: Slot, element: E) {
        let element: Box<dyn Element> = Box::new(element);
        self.children.push((slot, element));
    }
}

impl Default for FixedLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for FixedLayout {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let size = area.size();
        let slots: Vec<Slot> = self.children.iter().map(|(slot, _)| *slot).collect();
        let placements = layout::arrange(
            mm_to_f64(size.width),
            mm_to_f64(size.height),
            mm_to_f64(self.spacing),
            &slots,
        )
        .map_err(|err| Error::new(err.to_string(), ErrorKind::PageSizeExceeded))?;

        for ((_, element), placement) in self.children.iter_mut().zip(&placements) {
            let mut block_area = area.clone();
            block_area.add_offset(Position::new(
                mm_from_f64(placement.x),
                mm_from_f64(placement.y),
            ));
            block_area.set_width(mm_from_f64(placement.width));
            block_area.set_height(mm_from_f64(placement.height));

            let result = element.render(context, block_area, style)?;
            if result.has_more {
                warn!(
                    "Block at {:.1} mm does not fit its {:.1} mm slot and was truncated",
                    placement.y, placement.height
                );
            }
        }

        let mut result = RenderResult::default();
        result.size = size;
        Ok(result)
    }
}

fn text_element(block: &TextBlock) -> Paragraph {
    let mut style = Style::new().with_font_size(block.font_size());
    if block.is_bold() {
        style = style.bold();
    }
    let mut paragraph = Paragraph::new(StyledString::new(block.text().to_string(), style));
    paragraph.set_alignment(block.alignment().into());
    paragraph
}

fn fixed_page_element(page: &FixedPage) -> Result<FixedLayout, Error> {
    let mut layout = FixedLayout::new();
    for block in page.blocks() {
        match block.content() {
            BlockContent::Text(text) => layout.push(block.slot(), text_element(text)),
            BlockContent::Image(path) => layout.push(block.slot(), FittedImage::from_path(path)?),
        }
    }
    Ok(layout)
}

fn push_table_page(layout: &mut LinearLayout, page: &TablePage) -> Result<(), Error> {
    let title = TextBlock::new(page.title(), PAGE_TITLE_FONT_SIZE).bold();
    layout.push(text_element(&title));
    layout.push(Break::new(1));

    let mut table = TableLayout::new(vec![1; page.header().len().max(1)]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for cell in page.header() {
        header.push_element(
            Paragraph::new(cell.as_str())
                .styled(Style::new().bold())
                .padded(mm_from_f64(TABLE_CELL_PADDING_MM)),
        );
    }
    header.push()?;

    for row in page.rows() {
        let mut table_row = table.row();
        for cell in row {
            table_row.push_element(
                Paragraph::new(cell.as_str()).padded(mm_from_f64(TABLE_CELL_PADDING_MM)),
            );
        }
        table_row.push()?;
    }

    layout.push(table);
    Ok(())
}

fn push_records_page(layout: &mut LinearLayout, page: &RecordsPage) {
    let title = TextBlock::new(page.title(), RECORDS_TITLE_FONT_SIZE)
        .bold()
        .with_alignment(HorizontalAlignment::Center);
    layout.push(text_element(&title));
    layout.push(Break::new(1));

    for (index, fields) in page.records().iter().enumerate() {
        layout.push(Paragraph::new(format!("Record {}:", index + 1)).styled(Style::new().bold()));
        for (name, value) in fields {
            layout.push(Paragraph::new(format!("{}: {}", name, value)));
        }
        layout.push(Break::new(1));
    }
}

/// Converts the pages of a report into one vertical `genpdf` layout.
///
/// A fixed page claims its whole page area, so the layout moves to a new page after it on its own;
/// page breaks are only inserted after flowing pages. Image files are decoded here, so a missing or
/// corrupt chart fails before any output is written.
pub fn page_elements(pages: &[Page]) -> Result<LinearLayout, Error> {
    let mut layout = LinearLayout::vertical();
    let mut previous: Option<&Page> = None;
    for page in pages {
        if matches!(previous, Some(Page::Table(_) | Page::Records(_))) {
            layout.push(PageBreak::new());
        }
        match page {
            Page::Fixed(fixed) => layout.push(fixed_page_element(fixed)?),
            Page::Table(table) => push_table_page(&mut layout, table)?,
            Page::Records(records) => push_records_page(&mut layout, records),
        }
        previous = Some(page);
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_scale_preserves_aspect_ratio() {
        assert_eq!(fit_scale((80.0, 50.0), (160.0, 50.0)), 1.0);
        assert_eq!(fit_scale((80.0, 50.0), (40.0, 100.0)), 0.5);
        assert_eq!(fit_scale((80.0, 50.0), (240.0, 200.0)), 3.0);
    }

    #[test]
    fn fit_scale_handles_degenerate_sizes() {
        assert_eq!(fit_scale((0.0, 50.0), (10.0, 10.0)), 1.0);
        assert_eq!(fit_scale((10.0, 10.0), (-5.0, 10.0)), 0.0);
    }

    #[test]
    fn mm_conversion_round_trips() {
        assert!((mm_to_f64(mm_from_f64(12.5)) - 12.5).abs() < 1e-9);
    }
}
