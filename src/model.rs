//! Data structures describing the logical content of the sales report.
//!
//! The types here form a renderer-independent model: the report assembler produces a
//! [`ReportDocument`] from the analysis results, and [`crate::elements`] turns it into `genpdf`
//! elements. Keeping the two apart lets the page content be checked without fonts or a PDF
//! backend.

use std::path::{Path, PathBuf};

use crate::layout::Slot;

/// Horizontal alignment of a text block.
///
/// The variants map directly to [`genpdf::Alignment`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
}

impl From<HorizontalAlignment> for genpdf::Alignment {
    fn from(alignment: HorizontalAlignment) -> Self {
        match alignment {
            HorizontalAlignment::Left => genpdf::Alignment::Left,
            HorizontalAlignment::Center => genpdf::Alignment::Center,
        }
    }
}

/// A single styled line of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    text: String,
    font_size: u8,
    bold: bool,
    alignment: HorizontalAlignment,
}

impl TextBlock {
    /// Creates a left-aligned regular text block.
    pub fn new(text: impl Into<String>, font_size: u8) -> Self {
        Self {
            text: text.into(),
            font_size,
            bold: false,
            alignment: HorizontalAlignment::Left,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> u8 {
        self.font_size
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Marks the text as bold and returns the updated block.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Sets the alignment and returns the updated block.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// What a fixed-layout block displays.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockContent {
    /// A line of text.
    Text(TextBlock),
    /// An image file scaled to fit the block, centered horizontally.
    Image(PathBuf),
}

/// One entry of a fixed-layout page template.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    slot: Slot,
    content: BlockContent,
}

impl Block {
    pub fn new(slot: Slot, content: BlockContent) -> Self {
        Self { slot, content }
    }

    /// Convenience helper for a text block.
    pub fn text(slot: Slot, text: TextBlock) -> Self {
        Self::new(slot, BlockContent::Text(text))
    }

    /// Convenience helper for an image block.
    pub fn image(slot: Slot, path: impl Into<PathBuf>) -> Self {
        Self::new(slot, BlockContent::Image(path.into()))
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn content(&self) -> &BlockContent {
        &self.content
    }
}

/// A page whose blocks are positioned by [`crate::layout::arrange`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixedPage {
    blocks: Vec<Block>,
}

impl FixedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block and returns the updated page.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Paths of every image referenced by the page, in block order.
    pub fn image_paths(&self) -> impl Iterator<Item = &Path> {
        self.blocks.iter().filter_map(|block| match &block.content {
            BlockContent::Image(path) => Some(path.as_path()),
            BlockContent::Text(_) => None,
        })
    }
}

/// A page holding a heading and a bordered table.
#[derive(Clone, Debug, PartialEq)]
pub struct TablePage {
    title: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TablePage {
    pub fn new<I, S>(title: impl Into<String>, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Appends a row and returns the updated page.
    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }
}

/// One record of a [`RecordsPage`]: field names with their values, in column order.
pub type FieldList = Vec<(String, String)>;

/// A heading followed by every record of a table, one `field: value` line per field.
///
/// Unlike the other page kinds, a records page flows onto as many physical pages as it needs.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordsPage {
    title: String,
    records: Vec<FieldList>,
}

impl RecordsPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            records: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn records(&self) -> &[FieldList] {
        &self.records
    }

    /// Appends a record and returns the updated page.
    pub fn with_record(mut self, fields: FieldList) -> Self {
        self.records.push(fields);
        self
    }
}

/// A single page of the report.
#[derive(Clone, Debug, PartialEq)]
pub enum Page {
    Fixed(FixedPage),
    Table(TablePage),
    Records(RecordsPage),
}

/// The complete report, one entry per page.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportDocument {
    title: String,
    pages: Vec<Page>,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    /// Document title stored in the PDF metadata.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Appends a page and returns the updated document.
    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Paths of every image referenced by the document.
    pub fn image_paths(&self) -> impl Iterator<Item = &Path> {
        self.pages.iter().flat_map(|page| match page {
            Page::Fixed(fixed) => fixed.image_paths().collect::<Vec<_>>(),
            Page::Table(_) | Page::Records(_) => Vec::new(),
        })
    }
}
