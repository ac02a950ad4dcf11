//! Error types for deck operations.

use thiserror::Error;

use crate::grid::Axis;

/// Result type for deck operations.
pub type DeckResult<T> = Result<T, DeckError>;

/// Errors that can occur in deck operations.
#[derive(Debug, Error)]
pub enum DeckError {
    /// Element not found on the open slide.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An element with this id already exists.
    #[error("Element id already in use: {0}")]
    DuplicateElementId(String),

    /// The id counter cannot advance any further.
    #[error("No element ids left for {0}")]
    IdsExhausted(&'static str),

    /// Element id is not usable.
    #[error("Invalid element id: {0}")]
    InvalidElementId(String),

    /// A grid span collapsed to zero or negative length after clamping.
    #[error("Invalid {axis} span {start}/{end}: end must be greater than start")]
    InvalidSpan {
        /// Axis of the rejected span.
        axis: Axis,
        /// Start line after clamping.
        start: i64,
        /// End line after clamping.
        end: i64,
    },

    /// A grid coordinate string could not be parsed.
    #[error("Malformed grid coordinate {0:?}: expected \"start/end\"")]
    MalformedSpan(String),

    /// A payload patch targeted an element of a different type.
    #[error("Element {id} is a {found}, not a {expected}")]
    TypeMismatch {
        /// Target element id.
        id: String,
        /// Type the patch applies to.
        expected: &'static str,
        /// Actual element type.
        found: &'static str,
    },

    /// Element exists but cannot be selected.
    #[error("Element {id} cannot be selected: {reason}")]
    NotSelectable {
        /// Target element id.
        id: String,
        /// Why, e.g. `locked`.
        reason: &'static str,
    },

    /// Invalid element operation.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// Snapshot serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
