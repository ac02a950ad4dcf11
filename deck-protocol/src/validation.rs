//! Input validation for untrusted command parameters.
//!
//! Everything arriving across the frame boundary is validated here before
//! the element registry is touched.

use deck_core::{DeckError, ElementId, PixelRect, Position, MAX_ELEMENT_ID_LEN};
use thiserror::Error;

/// Maximum length for SVG or HTML markup fields.
pub const MAX_MARKUP_LEN: usize = 524_288; // 512KB
/// Maximum length for text box content.
pub const MAX_TEXT_CONTENT_LEN: usize = 262_144; // 256KB
/// Maximum length for image URLs (data URIs included).
pub const MAX_URL_LEN: usize = 524_288;
/// Maximum serialized size of a chart configuration.
pub const MAX_CHART_CONFIG_LEN: usize = 262_144;
/// Maximum elements per slide.
pub const MAX_ELEMENTS_PER_SLIDE: usize = 500;
/// Maximum inbound message size.
pub const MAX_MESSAGE_SIZE: usize = 1_048_576; // 1MB

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required parameter was absent.
    #[error("missing required parameter: {0}")]
    MissingField(&'static str),
    /// `slideIndex` is outside the presentation.
    #[error("slideIndex {index} out of range (presentation has {count} slides)")]
    SlideIndexOutOfRange {
        /// Requested index.
        index: i64,
        /// Number of slides.
        count: usize,
    },
    /// Element ID exceeds maximum length.
    #[error("elementId too long (max {MAX_ELEMENT_ID_LEN} chars)")]
    ElementIdTooLong,
    /// Element ID contains invalid characters.
    #[error("elementId contains invalid characters")]
    ElementIdInvalidChars,
    /// Grid coordinates are malformed or empty after clamping.
    #[error("invalid {field}: {reason}")]
    InvalidGrid {
        /// Offending parameter.
        field: &'static str,
        /// Parser message.
        reason: String,
    },
    /// A markup field is too large.
    #[error("{field} too large ({len} bytes, max {max})")]
    TooLarge {
        /// Offending parameter.
        field: &'static str,
        /// Actual size.
        len: usize,
        /// Allowed size.
        max: usize,
    },
    /// A string parameter is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Chart configuration must be a JSON object.
    #[error("chartConfig must be a JSON object")]
    ChartConfigNotObject,
    /// Neither representation of a chart or diagram was given.
    #[error("one of {0} is required")]
    MissingSource(&'static str),
    /// Layout id is not a registered template.
    #[error("unknown layout template: {0}")]
    UnknownLayout(String),
    /// Slot name is not part of the slide's template.
    #[error("unknown slot {slot} in template {template}")]
    UnknownSlot {
        /// Requested slot.
        slot: String,
        /// Template of the slide.
        template: String,
    },
    /// Move would change the element's span lengths.
    #[error("moveElement must keep span lengths; use resizeElement to change size")]
    MoveChangesExtent,
    /// Too many elements on the slide.
    #[error("too many elements (max {MAX_ELEMENTS_PER_SLIDE})")]
    TooManyElements,
    /// Inbound message exceeds maximum size.
    #[error("message too large (max {MAX_MESSAGE_SIZE} bytes)")]
    MessageTooLarge,
}

impl ValidationError {
    /// Parameter the failure is about, used as a metrics label.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field)
            | Self::InvalidGrid { field, .. }
            | Self::TooLarge { field, .. }
            | Self::Empty(field) => field,
            Self::SlideIndexOutOfRange { .. } => "slideIndex",
            Self::ElementIdTooLong | Self::ElementIdInvalidChars => "elementId",
            Self::ChartConfigNotObject => "chartConfig",
            Self::MissingSource(_) => "source",
            Self::UnknownLayout(_) => "layout",
            Self::UnknownSlot { .. } => "slotName",
            Self::MoveChangesExtent => "position",
            Self::TooManyElements => "elementCount",
            Self::MessageTooLarge => "message",
        }
    }
}

/// Require an optional parameter.
///
/// # Errors
///
/// Returns [`ValidationError::MissingField`] if `value` is `None`.
pub fn require<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

/// Validate a slide index against the presentation's slide count.
///
/// # Errors
///
/// Returns [`ValidationError::MissingField`] if absent, or
/// [`ValidationError::SlideIndexOutOfRange`] if outside `0..count`.
pub fn validate_slide_index(index: Option<i64>, count: usize) -> Result<usize, ValidationError> {
    let index = require(index, "slideIndex")?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < count)
        .ok_or(ValidationError::SlideIndexOutOfRange { index, count })
}

/// Validate an element ID.
///
/// Valid element IDs:
/// - 1-64 characters
/// - ASCII letter first, then letters, digits, hyphen or underscore
///
/// # Errors
///
/// Returns [`ValidationError::MissingField`] if absent,
/// [`ValidationError::ElementIdTooLong`] if too long, or
/// [`ValidationError::ElementIdInvalidChars`] otherwise.
pub fn validate_element_id(id: Option<&str>) -> Result<ElementId, ValidationError> {
    let id = require(id, "elementId")?;
    if id.len() > MAX_ELEMENT_ID_LEN {
        return Err(ValidationError::ElementIdTooLong);
    }
    ElementId::parse(id).map_err(|_| ValidationError::ElementIdInvalidChars)
}

/// Validate an optional caller-supplied id for a new element.
///
/// # Errors
///
/// Same as [`validate_element_id`] when an id is present.
pub fn validate_new_element_id(id: Option<&str>) -> Result<Option<ElementId>, ValidationError> {
    id.map(|id| validate_element_id(Some(id))).transpose()
}

fn grid_error(field: &'static str, e: &DeckError) -> ValidationError {
    ValidationError::InvalidGrid {
        field,
        reason: e.to_string(),
    }
}

/// Validate optional `gridRow`/`gridColumn` strings.
///
/// Both or neither must be present.
///
/// # Errors
///
/// Returns [`ValidationError::MissingField`] if only one is given, or
/// [`ValidationError::InvalidGrid`] if either does not parse.
pub fn validate_position(
    grid_row: Option<&str>,
    grid_column: Option<&str>,
) -> Result<Option<Position>, ValidationError> {
    match (grid_row, grid_column) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(ValidationError::MissingField("gridColumn")),
        (None, Some(_)) => Err(ValidationError::MissingField("gridRow")),
        (Some(row), Some(column)) => {
            let grid_row = deck_core::GridSpan::parse(row, deck_core::Axis::Row)
                .map_err(|e| grid_error("gridRow", &e))?;
            let grid_column = deck_core::GridSpan::parse(column, deck_core::Axis::Column)
                .map_err(|e| grid_error("gridColumn", &e))?;
            Ok(Some(Position::new(grid_row, grid_column)))
        }
    }
}

/// Validate geometry given either as grid strings or as a pixel rect.
///
/// Grid strings take precedence when both are supplied.
///
/// # Errors
///
/// Returns [`ValidationError::MissingField`] if neither form is present, or
/// [`ValidationError::InvalidGrid`] if the geometry is invalid.
pub fn validate_geometry(
    grid_row: Option<&str>,
    grid_column: Option<&str>,
    rect: Option<&PixelRect>,
) -> Result<Position, ValidationError> {
    if let Some(position) = validate_position(grid_row, grid_column)? {
        return Ok(position);
    }
    validate_rect(require(rect, "gridRow")?)
}

/// Snap a pixel rectangle to the grid.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidGrid`] if the rectangle is not finite or
/// snaps to an empty span.
pub fn validate_rect(rect: &PixelRect) -> Result<Position, ValidationError> {
    Position::from_rect(rect).map_err(|e| grid_error("rect", &e))
}

/// Validate the size of a markup field (SVG or HTML).
///
/// # Errors
///
/// Returns [`ValidationError::TooLarge`] if larger than [`MAX_MARKUP_LEN`].
pub fn validate_markup(field: &'static str, markup: &str) -> Result<(), ValidationError> {
    check_len(field, markup.len(), MAX_MARKUP_LEN)
}

/// Validate text box content size.
///
/// # Errors
///
/// Returns [`ValidationError::TooLarge`] if larger than [`MAX_TEXT_CONTENT_LEN`].
pub fn validate_text_content(text: &str) -> Result<(), ValidationError> {
    check_len("content", text.len(), MAX_TEXT_CONTENT_LEN)
}

/// Validate an image URL.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] or [`ValidationError::TooLarge`].
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::Empty("url"));
    }
    check_len("url", url.len(), MAX_URL_LEN)
}

/// Validate a chart configuration object.
///
/// # Errors
///
/// Returns [`ValidationError::ChartConfigNotObject`] or
/// [`ValidationError::TooLarge`].
pub fn validate_chart_config(config: &serde_json::Value) -> Result<(), ValidationError> {
    if !config.is_object() {
        return Err(ValidationError::ChartConfigNotObject);
    }
    check_len("chartConfig", config.to_string().len(), MAX_CHART_CONFIG_LEN)
}

/// Validate the size of an inbound message.
///
/// # Errors
///
/// Returns [`ValidationError::MessageTooLarge`] if larger than [`MAX_MESSAGE_SIZE`].
pub fn validate_message_size(size: usize) -> Result<(), ValidationError> {
    if size > MAX_MESSAGE_SIZE {
        return Err(ValidationError::MessageTooLarge);
    }
    Ok(())
}

/// Validate the element count a slide would reach.
///
/// # Errors
///
/// Returns [`ValidationError::TooManyElements`] if over [`MAX_ELEMENTS_PER_SLIDE`].
pub fn validate_element_count(count: usize) -> Result<(), ValidationError> {
    if count > MAX_ELEMENTS_PER_SLIDE {
        return Err(ValidationError::TooManyElements);
    }
    Ok(())
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), ValidationError> {
    if len > max {
        return Err(ValidationError::TooLarge { field, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_index() {
        assert_eq!(validate_slide_index(Some(0), 3).expect("valid"), 0);
        assert_eq!(validate_slide_index(Some(2), 3).expect("valid"), 2);
        assert!(matches!(
            validate_slide_index(None, 3),
            Err(ValidationError::MissingField("slideIndex"))
        ));
        assert!(matches!(
            validate_slide_index(Some(3), 3),
            Err(ValidationError::SlideIndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(validate_slide_index(Some(-1), 3).is_err());
    }

    #[test]
    fn test_valid_element_ids() {
        assert!(validate_element_id(Some("chart-1")).is_ok());
        assert!(validate_element_id(Some("hero_image")).is_ok());
    }

    #[test]
    fn test_invalid_element_ids() {
        assert!(matches!(
            validate_element_id(None),
            Err(ValidationError::MissingField("elementId"))
        ));
        assert!(matches!(
            validate_element_id(Some("")),
            Err(ValidationError::ElementIdInvalidChars)
        ));
        assert!(matches!(
            validate_element_id(Some("a b")),
            Err(ValidationError::ElementIdInvalidChars)
        ));
        assert!(matches!(
            validate_element_id(Some(&"a".repeat(65))),
            Err(ValidationError::ElementIdTooLong)
        ));
        assert!(validate_new_element_id(None).expect("absent is fine").is_none());
    }

    #[test]
    fn test_position() {
        let position = validate_position(Some("2/5"), Some("3/10"))
            .expect("valid")
            .expect("present");
        assert_eq!(position.grid_row.to_string(), "2/5");
        assert!(validate_position(None, None).expect("valid").is_none());
        assert!(matches!(
            validate_position(Some("2/5"), None),
            Err(ValidationError::MissingField("gridColumn"))
        ));
        let err = validate_position(Some("5/5"), Some("1/2")).expect_err("empty");
        assert_eq!(err.field(), "gridRow");
        let err = validate_position(Some("1/2"), Some("abc")).expect_err("malformed");
        assert_eq!(err.field(), "gridColumn");
    }

    #[test]
    fn test_position_clamps() {
        let position = validate_position(Some("0/40"), Some("-3/2"))
            .expect("valid")
            .expect("present");
        assert_eq!(position.grid_row.to_string(), "1/19");
        assert_eq!(position.grid_column.to_string(), "1/2");
    }

    #[test]
    fn test_geometry_from_rect() {
        let rect = PixelRect {
            x: 118.0,
            y: 62.0,
            width: 241.0,
            height: 119.0,
        };
        let position = validate_geometry(None, None, Some(&rect)).expect("valid");
        assert_eq!(position.grid_column.to_string(), "3/7");
        assert_eq!(position.grid_row.to_string(), "2/4");
        assert!(matches!(
            validate_geometry(None, None, None),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_markup_and_content_sizes() {
        assert!(validate_markup("svgContent", "<svg/>").is_ok());
        let err = validate_markup("svgContent", &"x".repeat(MAX_MARKUP_LEN + 1))
            .expect_err("too large");
        assert_eq!(err.field(), "svgContent");
        assert!(validate_text_content(&"x".repeat(MAX_TEXT_CONTENT_LEN + 1)).is_err());
        assert!(validate_url("  ").is_err());
        assert!(validate_url("https://example.com/a.png").is_ok());
    }

    #[test]
    fn test_chart_config() {
        assert!(validate_chart_config(&serde_json::json!({"type": "bar"})).is_ok());
        assert!(matches!(
            validate_chart_config(&serde_json::json!([1, 2])),
            Err(ValidationError::ChartConfigNotObject)
        ));
    }

    #[test]
    fn test_message_size_and_count() {
        assert!(validate_message_size(MAX_MESSAGE_SIZE).is_ok());
        assert!(validate_message_size(MAX_MESSAGE_SIZE + 1).is_err());
        assert!(validate_element_count(MAX_ELEMENTS_PER_SLIDE).is_ok());
        assert!(validate_element_count(MAX_ELEMENTS_PER_SLIDE + 1).is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::MissingField("slideIndex").to_string(),
            "missing required parameter: slideIndex"
        );
        assert!(ValidationError::ElementIdTooLong.to_string().contains("64"));
    }
}
