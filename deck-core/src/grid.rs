//! Grid coordinate model.
//!
//! Slides are laid out on a fixed logical grid of [`COLUMNS`] x [`ROWS`] cells
//! mapped onto a fixed [`CANVAS_WIDTH`] x [`CANVAS_HEIGHT`] canvas. Element
//! positions are expressed as pairs of 1-based grid *line* indices, written
//! `"start/end"` on the wire.
//!
//! Converting free-form pixel geometry back into the grid snaps to the nearest
//! line, so a pixel round-trip is only exact up to one grid unit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeckError, DeckResult};

/// Number of grid columns.
pub const COLUMNS: u16 = 32;

/// Number of grid rows.
pub const ROWS: u16 = 18;

/// Physical canvas width.
pub const CANVAS_WIDTH: f32 = 1920.0;

/// Physical canvas height.
pub const CANVAS_HEIGHT: f32 = 1080.0;

/// Width of one grid column.
pub const UNIT_WIDTH: f32 = CANVAS_WIDTH / COLUMNS as f32;

/// Height of one grid row.
pub const UNIT_HEIGHT: f32 = CANVAS_HEIGHT / ROWS as f32;

/// Grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Vertical axis (grid rows).
    Row,
    /// Horizontal axis (grid columns).
    Column,
}

impl Axis {
    /// Number of grid lines along this axis (cells + 1).
    #[must_use]
    pub const fn line_count(self) -> u16 {
        match self {
            Self::Row => ROWS + 1,
            Self::Column => COLUMNS + 1,
        }
    }

    /// Physical size of one grid unit along this axis.
    #[must_use]
    pub const fn unit(self) -> f32 {
        match self {
            Self::Row => UNIT_HEIGHT,
            Self::Column => UNIT_WIDTH,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Column => f.write_str("column"),
        }
    }
}

/// A `(start, end)` pair of 1-based grid line indices along one axis.
///
/// Invariant: `1 <= start < end <= axis.line_count()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSpan {
    start: u16,
    end: u16,
}

impl GridSpan {
    /// Build a span, clamping both lines into `[1, line_count]`.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::InvalidSpan`] if the clamped span has zero or
    /// negative length.
    pub fn new(start: i64, end: i64, axis: Axis) -> DeckResult<Self> {
        let max = i64::from(axis.line_count());
        let start = start.clamp(1, max);
        let end = end.clamp(1, max);
        if end <= start {
            return Err(DeckError::InvalidSpan { axis, start, end });
        }
        // Both values are within [1, 33] after clamping.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let span = Self {
            start: start as u16,
            end: end as u16,
        };
        Ok(span)
    }

    /// Parse the `"start/end"` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::MalformedSpan`] if the text is not two integers
    /// separated by `/`, or [`DeckError::InvalidSpan`] if the span is empty
    /// after clamping.
    pub fn parse(text: &str, axis: Axis) -> DeckResult<Self> {
        let malformed = || DeckError::MalformedSpan(text.to_string());
        let (start, end) = text.split_once('/').ok_or_else(malformed)?;
        let start: i64 = start.trim().parse().map_err(|_| malformed())?;
        let end: i64 = end.trim().parse().map_err(|_| malformed())?;
        Self::new(start, end, axis)
    }

    /// First grid line.
    #[must_use]
    pub const fn start(self) -> u16 {
        self.start
    }

    /// Last grid line (exclusive by convention).
    #[must_use]
    pub const fn end(self) -> u16 {
        self.end
    }

    /// Number of grid cells covered.
    #[must_use]
    pub const fn length(self) -> u16 {
        self.end - self.start
    }
}

impl fmt::Display for GridSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// Convert a span into `(offset, length)` along an axis with the given unit.
#[must_use]
pub fn span_to_pixels(span: GridSpan, unit: f32) -> (f32, f32) {
    (
        f32::from(span.start - 1) * unit,
        f32::from(span.length()) * unit,
    )
}

/// Snap pixel geometry to the nearest grid lines.
///
/// # Errors
///
/// Returns [`DeckError::InvalidOperation`] for non-finite input, or
/// [`DeckError::InvalidSpan`] when the snapped span is empty.
pub fn pixels_to_span(offset: f32, length: f32, unit: f32, axis: Axis) -> DeckResult<GridSpan> {
    if !offset.is_finite() || !length.is_finite() || !unit.is_finite() || unit <= 0.0 {
        return Err(DeckError::InvalidOperation(format!(
            "non-finite {axis} geometry: offset={offset}, length={length}, unit={unit}"
        )));
    }
    // Saturating float-to-int casts; out-of-range values are clamped by GridSpan::new.
    #[allow(clippy::cast_possible_truncation)]
    let start = (offset / unit).round() as i64 + 1;
    #[allow(clippy::cast_possible_truncation)]
    let end = ((offset + length) / unit).round() as i64 + 1;
    GridSpan::new(start, end, axis)
}

/// Absolute pixel rectangle on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// Row and column spans of an element or slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PositionDocument", into = "PositionDocument")]
pub struct Position {
    /// Vertical span.
    pub grid_row: GridSpan,
    /// Horizontal span.
    pub grid_column: GridSpan,
}

impl Position {
    /// Create a position from two spans.
    #[must_use]
    pub const fn new(grid_row: GridSpan, grid_column: GridSpan) -> Self {
        Self {
            grid_row,
            grid_column,
        }
    }

    /// Parse a position from its `"start/end"` row and column strings.
    ///
    /// # Errors
    ///
    /// Returns an error if either span is malformed or empty.
    pub fn parse(grid_row: &str, grid_column: &str) -> DeckResult<Self> {
        Ok(Self {
            grid_row: GridSpan::parse(grid_row, Axis::Row)?,
            grid_column: GridSpan::parse(grid_column, Axis::Column)?,
        })
    }

    /// Position covering the whole canvas.
    #[must_use]
    pub const fn full_canvas() -> Self {
        Self {
            grid_row: GridSpan {
                start: 1,
                end: ROWS + 1,
            },
            grid_column: GridSpan {
                start: 1,
                end: COLUMNS + 1,
            },
        }
    }

    /// Absolute pixel rectangle of this position.
    #[must_use]
    pub fn to_rect(&self) -> PixelRect {
        let (x, width) = span_to_pixels(self.grid_column, UNIT_WIDTH);
        let (y, height) = span_to_pixels(self.grid_row, UNIT_HEIGHT);
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }

    /// Snap a pixel rectangle to the grid.
    ///
    /// # Errors
    ///
    /// Returns an error if the rectangle snaps to an empty span on either axis.
    pub fn from_rect(rect: &PixelRect) -> DeckResult<Self> {
        Ok(Self {
            grid_row: pixels_to_span(rect.y, rect.height, UNIT_HEIGHT, Axis::Row)?,
            grid_column: pixels_to_span(rect.x, rect.width, UNIT_WIDTH, Axis::Column)?,
        })
    }

    /// Whether both spans have the same length as `other`'s.
    #[must_use]
    pub fn same_extent(&self, other: &Self) -> bool {
        self.grid_row.length() == other.grid_row.length()
            && self.grid_column.length() == other.grid_column.length()
    }
}

/// Wire form of a [`Position`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDocument {
    /// Row span, `"start/end"`.
    pub grid_row: String,
    /// Column span, `"start/end"`.
    pub grid_column: String,
}

impl TryFrom<PositionDocument> for Position {
    type Error = DeckError;

    fn try_from(doc: PositionDocument) -> Result<Self, Self::Error> {
        Self::parse(&doc.grid_row, &doc.grid_column)
    }
}

impl From<Position> for PositionDocument {
    fn from(position: Position) -> Self {
        Self {
            grid_row: position.grid_row.to_string(),
            grid_column: position.grid_column.to_string(),
        }
    }
}
