//! Page setup shared by every page of the report: paper size, margins and a page-number footer.

use genpdf::elements::Paragraph;
use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::Style;
use genpdf::{render, Alignment, Document, Element, Margins, Mm, PageDecorator, Position, Size};

use crate::elements::mm_to_f64;

const FOOTER_FONT_SIZE: u8 = 9;

/// Footer line printing the 1-based page number, e.g. `Page 2`.
#[derive(Clone, Debug)]
pub struct PageNumberFooter {
    height: Mm,
    font_size: u8,
}

impl PageNumberFooter {
    /// Creates a right-aligned footer reserving `height` at the bottom of each page.
    pub fn new(height: impl Into<Mm>) -> Self {
        Self {
            height: height.into(),
            font_size: FOOTER_FONT_SIZE,
        }
    }

    pub fn label(page: usize) -> String {
        format!("Page {}", page)
    }

    fn element(&self, page: usize) -> impl Element {
        let mut paragraph = Paragraph::new(Self::label(page));
        paragraph.set_alignment(Alignment::Right);
        paragraph.styled(Style::new().with_font_size(self.font_size))
    }
}

/// Paper, margins, base font size and footer used to create the report document.
#[derive(Clone, Debug)]
pub struct PageSetup {
    title: String,
    paper_size: Size,
    margin_mm: f64,
    font_size: u8,
    footer: Option<PageNumberFooter>,
}

impl PageSetup {
    /// Creates a setup without margins or footer.
    pub fn new(title: impl Into<String>, paper_size: impl Into<Size>) -> Self {
        Self {
            title: title.into(),
            paper_size: paper_size.into(),
            margin_mm: 0.0,
            font_size: Style::new().font_size(),
            footer: None,
        }
    }

    /// Sets the same margin on all four sides of the page.
    pub fn with_margin_mm(mut self, margin_mm: f64) -> Self {
        self.margin_mm = margin_mm;
        self
    }

    pub fn with_font_size(mut self, font_size: u8) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_footer(mut self, footer: PageNumberFooter) -> Self {
        self.footer = Some(footer);
        self
    }

    /// Width and height in millimetres left for page content once margins and footer are taken.
    pub fn content_size_mm(&self) -> (f64, f64) {
        let footer = self.footer.as_ref().map_or(0.0, |footer| mm_to_f64(footer.height));
        let width = mm_to_f64(self.paper_size.width) - 2.0 * self.margin_mm;
        let height = mm_to_f64(self.paper_size.height) - 2.0 * self.margin_mm - footer;
        (width, height)
    }

    /// Creates a `genpdf` document with this setup and the given fonts.
    pub fn build(self, font_family: FontFamily<FontData>) -> Document {
        let mut document = Document::new(font_family);
        document.set_title(self.title);
        document.set_paper_size(self.paper_size);
        document.set_font_size(self.font_size);
        document.set_page_decorator(NumberedPages {
            page: 0,
            margins: Margins::all(self.margin_mm),
            footer: self.footer,
        });
        document
    }
}

struct NumberedPages {
    page: usize,
    margins: Margins,
    footer: Option<PageNumberFooter>,
}

impl PageDecorator for NumberedPages {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'a>,
        style: Style,
    ) -> Result<render::Area<'a>, Error> {
        self.page += 1;
        area.add_margins(self.margins);

        let Some(footer) = &self.footer else {
            return Ok(area);
        };

        let available = area.size().height;
        if footer.height > available {
            return Err(Error::new(
                format!("Footer of page {} is taller than the page body", self.page),
                ErrorKind::PageSizeExceeded,
            ));
        }

        let mut footer_area = area.clone();
        footer_area.add_offset(Position::new(0, available - footer.height));
        if footer
            .element(self.page)
            .render(context, footer_area, style)?
            .has_more
        {
            return Err(Error::new(
                format!("Footer of page {} does not fit its reserved height", self.page),
                ErrorKind::PageSizeExceeded,
            ));
        }

        area.set_height(available - footer.height);
        Ok(area)
    }
}
