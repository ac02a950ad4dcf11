//! Unsolicited events sent from the embedded view to the host.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementContent, ElementId, ElementType};
use crate::grid::{PixelRect, Position};

/// Snapshot of an element's properties carried by selection events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementProperties {
    /// Grid position.
    pub position: Position,
    /// Pixel rectangle on the canvas.
    pub rect: PixelRect,
    /// Paint order.
    pub z_index: i32,
    /// Lock state.
    pub locked: bool,
    /// Visibility.
    pub visible: bool,
    /// Type-specific payload.
    pub content: ElementContent,
}

impl From<&Element> for ElementProperties {
    fn from(element: &Element) -> Self {
        Self {
            position: element.position,
            rect: element.position.to_rect(),
            z_index: element.z_index,
            locked: element.locked,
            visible: element.visible,
            content: element.content.clone(),
        }
    }
}

/// Event emitted across the frame boundary. Serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// An element became (or remains) selected.
    #[serde(rename_all = "camelCase")]
    ElementSelected {
        /// Selected element.
        element_id: ElementId,
        /// Its type.
        element_type: ElementType,
        /// Current properties.
        properties: ElementProperties,
    },

    /// The selection was cleared.
    #[serde(rename_all = "camelCase")]
    ElementDeselected {
        /// Previously selected element.
        element_id: ElementId,
    },

    /// A snapshot was written.
    #[serde(rename_all = "camelCase")]
    AutosaveCompleted {
        /// Slide that was saved.
        slide_index: usize,
        /// Elements in the snapshot.
        element_count: usize,
        /// Registry revision captured.
        revision: u64,
    },

    /// A snapshot write failed.
    #[serde(rename_all = "camelCase")]
    AutosaveFailed {
        /// Slide that failed to save.
        slide_index: usize,
        /// Error description.
        error: String,
    },
}

impl Event {
    /// Selection event for an element.
    #[must_use]
    pub fn selected(element: &Element) -> Self {
        Self::ElementSelected {
            element_id: element.id.clone(),
            element_type: element.element_type(),
            properties: ElementProperties::from(element),
        }
    }

    /// Wire name of the event type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ElementSelected { .. } => "elementSelected",
            Self::ElementDeselected { .. } => "elementDeselected",
            Self::AutosaveCompleted { .. } => "autosaveCompleted",
            Self::AutosaveFailed { .. } => "autosaveFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_event_shape() {
        let element = Element::new(
            ElementId::from_raw("chart-3"),
            ElementContent::chart_config(serde_json::json!({"type": "bar"})),
            Position::parse("4/16", "3/31").expect("pos"),
        );
        let event = Event::selected(&element);
        assert_eq!(event.kind(), "elementSelected");

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "elementSelected");
        assert_eq!(json["elementId"], "chart-3");
        assert_eq!(json["elementType"], "chart");
        assert_eq!(json["properties"]["zIndex"], 100);
        assert_eq!(json["properties"]["rect"]["x"], 120.0);
        assert_eq!(json["properties"]["rect"]["y"], 180.0);
        assert_eq!(json["properties"]["rect"]["width"], 1680.0);
        assert_eq!(json["properties"]["content"]["type"], "chart");
        assert!(json.get("action").is_none());
    }

    #[test]
    fn test_autosave_events_shape() {
        let json = serde_json::to_value(Event::AutosaveFailed {
            slide_index: 2,
            error: "disk full".to_string(),
        })
        .expect("serialize");
        assert_eq!(json["type"], "autosaveFailed");
        assert_eq!(json["slideIndex"], 2);
        assert_eq!(json["error"], "disk full");
    }
}
