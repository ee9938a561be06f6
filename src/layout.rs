//! Placement of fixed-layout page blocks.
//!
//! A page template is an ordered list of [`Slot`]s stacked top to bottom. Line slots take a fixed
//! height; fill slots share whatever height remains in proportion to their weight. Every block
//! spans the content width minus its indent, so placements never overlap. All values are in
//! millimetres relative to the top-left corner of the content area.

use crate::error::ReportError;

/// Vertical sizing rule of one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlotHeight {
    /// Fixed height in millimetres.
    Line(f64),
    /// Share of the remaining height.
    Fill(f64),
}

/// A block position request within the page template.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    height: SlotHeight,
    indent: f64,
}

impl Slot {
    /// A block with a fixed height.
    pub fn line(height_mm: f64) -> Self {
        Self {
            height: SlotHeight::Line(height_mm),
            indent: 0.0,
        }
    }

    /// A block sharing the remaining height with the other fill blocks.
    pub fn fill(weight: f64) -> Self {
        Self {
            height: SlotHeight::Fill(weight),
            indent: 0.0,
        }
    }

    /// Indents the block from the left edge and returns the updated slot.
    pub fn indented(mut self, indent_mm: f64) -> Self {
        self.indent = indent_mm;
        self
    }
}

/// Computed rectangle of one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Whether the two rectangles share any interior area.
    pub fn overlaps(&self, other: &Placement) -> bool {
        const EPSILON: f64 = 1e-9;
        self.x + EPSILON < other.right()
            && other.x + EPSILON < self.right()
            && self.y + EPSILON < other.bottom()
            && other.y + EPSILON < self.bottom()
    }
}

/// Stacks `slots` in a `width` × `height` area with `spacing` between neighbours.
pub fn arrange(
    width: f64,
    height: f64,
    spacing: f64,
    slots: &[Slot],
) -> Result<Vec<Placement>, ReportError> {
    let gaps = spacing * slots.len().saturating_sub(1) as f64;
    let mut fixed = 0.0;
    let mut weights = 0.0;
    for slot in slots {
        match slot.height {
            SlotHeight::Line(line) => fixed += line,
            SlotHeight::Fill(weight) => weights += weight.max(0.0),
        }
        if slot.indent >= width {
            return Err(ReportError::Layout(format!(
                "indent of {:.1} mm leaves no room in a {:.1} mm wide area",
                slot.indent, width
            )));
        }
    }

    let remaining = height - fixed - gaps;
    if remaining < 0.0 {
        return Err(ReportError::Layout(format!(
            "{} blocks need {:.1} mm but only {:.1} mm are available",
            slots.len(),
            fixed + gaps,
            height
        )));
    }

    let mut placements = Vec::with_capacity(slots.len());
    let mut cursor = 0.0;
    for slot in slots {
        let block_height = match slot.height {
            SlotHeight::Line(line) => line,
            SlotHeight::Fill(weight) if weights > 0.0 => remaining * weight.max(0.0) / weights,
            SlotHeight::Fill(_) => 0.0,
        };
        placements.push(Placement {
            x: slot.indent,
            y: cursor,
            width: width - slot.indent,
            height: block_height,
        });
        cursor += block_height + spacing;
    }
    Ok(placements)
}
