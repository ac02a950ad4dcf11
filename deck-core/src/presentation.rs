//! Presentation outline: theme, overrides and per-slide layouts.

use serde::{Deserialize, Serialize};

use crate::style::ThemeOverrides;

/// Layout given to slides created without one.
pub const DEFAULT_LAYOUT: &str = "C1-text";

/// Per-slide entry of the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideOutline {
    /// Layout template id.
    pub layout: String,
}

/// A presentation being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    /// Presentation identifier.
    pub id: String,
    /// Theme id.
    pub theme_id: String,
    /// Presentation-level style overrides.
    #[serde(default)]
    pub overrides: ThemeOverrides,
    /// One entry per slide. Defines the valid slide index range.
    pub slides: Vec<SlideOutline>,
}

impl Presentation {
    /// Create a presentation of `slide_count` slides. The first slide uses
    /// the title layout; the rest use [`DEFAULT_LAYOUT`].
    #[must_use]
    pub fn new(id: impl Into<String>, theme_id: impl Into<String>, slide_count: usize) -> Self {
        let slides = (0..slide_count)
            .map(|i| SlideOutline {
                layout: if i == 0 { "H1-generated" } else { DEFAULT_LAYOUT }.to_string(),
            })
            .collect();
        Self {
            id: id.into(),
            theme_id: theme_id.into(),
            overrides: ThemeOverrides::default(),
            slides,
        }
    }

    /// Number of slides.
    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Whether `index` addresses a slide.
    #[must_use]
    pub fn contains_slide(&self, index: usize) -> bool {
        index < self.slides.len()
    }

    /// Layout of a slide.
    #[must_use]
    pub fn layout_of(&self, index: usize) -> Option<&str> {
        self.slides.get(index).map(|slide| slide.layout.as_str())
    }

    /// Record a slide's layout. Returns `false` if the index is out of range.
    pub fn set_layout(&mut self, index: usize, layout: impl Into<String>) -> bool {
        match self.slides.get_mut(index) {
            Some(slide) => {
                slide.layout = layout.into();
                true
            }
            None => false,
        }
    }
}
