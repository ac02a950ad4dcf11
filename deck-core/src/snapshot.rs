//! Persisted per-slide representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::element::{Element, ElementId, ElementType};
use crate::error::{DeckError, DeckResult};
use crate::registry::ElementRegistry;

/// Slide-level background overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideBackground {
    /// CSS color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SlideBackground {
    /// Whether neither override is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.color.is_none() && self.image.is_none()
    }
}

/// One stored element, kept as raw JSON when it no longer parses.
///
/// A bad entry only loses itself on restore; the rest of the slide loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotEntry {
    /// A well-formed element.
    Element(Element),
    /// An entry that does not describe an element.
    Malformed(Value),
}

impl SnapshotEntry {
    /// The element, if the entry parsed.
    #[must_use]
    pub const fn element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Malformed(_) => None,
        }
    }
}

impl From<Element> for SnapshotEntry {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Serialized slide: metadata plus elements grouped by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSnapshot {
    /// Layout template id.
    pub layout: String,
    /// Slot content keyed by slot name.
    #[serde(default = "empty_object")]
    pub content: Value,
    /// Background overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<SlideBackground>,
    /// Text boxes in insertion order.
    #[serde(default)]
    pub text_boxes: Vec<SnapshotEntry>,
    /// Images in insertion order.
    #[serde(default)]
    pub images: Vec<SnapshotEntry>,
    /// Charts in insertion order.
    #[serde(default)]
    pub charts: Vec<SnapshotEntry>,
    /// Infographics in insertion order.
    #[serde(default)]
    pub infographics: Vec<SnapshotEntry>,
    /// Diagrams in insertion order.
    #[serde(default)]
    pub diagrams: Vec<SnapshotEntry>,
}

impl SlideSnapshot {
    /// Empty snapshot for a layout.
    #[must_use]
    pub fn empty(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            content: empty_object(),
            background: None,
            text_boxes: Vec::new(),
            images: Vec::new(),
            charts: Vec::new(),
            infographics: Vec::new(),
            diagrams: Vec::new(),
        }
    }

    /// Capture the registry's current state.
    #[must_use]
    pub fn capture(registry: &ElementRegistry) -> Self {
        let mut snapshot = Self::empty(registry.layout());
        snapshot.content = registry.content().clone();
        snapshot.background = registry.background().cloned();
        for element in registry.list() {
            snapshot
                .group_mut(element.element_type())
                .push(SnapshotEntry::Element(element.clone()));
        }
        snapshot
    }

    fn group_mut(&mut self, element_type: ElementType) -> &mut Vec<SnapshotEntry> {
        match element_type {
            ElementType::TextBox => &mut self.text_boxes,
            ElementType::Image => &mut self.images,
            ElementType::Chart => &mut self.charts,
            ElementType::Infographic => &mut self.infographics,
            ElementType::Diagram => &mut self.diagrams,
        }
    }

    /// Groups in load order: text boxes, images, charts, infographics, diagrams.
    #[must_use]
    pub fn groups(&self) -> [(ElementType, &[SnapshotEntry]); 5] {
        [
            (ElementType::TextBox, self.text_boxes.as_slice()),
            (ElementType::Image, self.images.as_slice()),
            (ElementType::Chart, self.charts.as_slice()),
            (ElementType::Infographic, self.infographics.as_slice()),
            (ElementType::Diagram, self.diagrams.as_slice()),
        ]
    }

    /// Total number of elements across groups.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.groups().iter().map(|(_, group)| group.len()).sum()
    }

    /// Whether a well-formed entry has this id.
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.groups()
            .iter()
            .flat_map(|(_, group)| group.iter())
            .filter_map(SnapshotEntry::element)
            .any(|element| &element.id == id)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> DeckResult<String> {
        serde_json::to_string(self).map_err(DeckError::Serialization)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a snapshot.
    pub fn from_json(json: &str) -> DeckResult<Self> {
        serde_json::from_str(json).map_err(DeckError::Serialization)
    }
}
