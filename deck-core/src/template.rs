//! Layout templates and their slots.
//!
//! Templates are immutable, loaded once, and shared read-only through a
//! [`TemplateRegistry`]. Rendering a template into markup is delegated to a
//! [`TemplateRenderer`] implementation supplied by the host.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DeckResult;
use crate::grid::Position;
use crate::style::{Profile, ResolvedSlot, StyleProperties};

/// A named, positioned region of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDefinition {
    /// Slot name, e.g. `title` or `body`.
    pub name: String,
    /// Default grid position.
    pub position: Position,
    /// Template-specific style for this slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleProperties>,
    /// Placeholder content shown before the author fills the slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_content: Option<String>,
}

/// An immutable named arrangement of slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template identifier, e.g. `C1-text`.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Slots in paint order.
    pub slots: Vec<SlotDefinition>,
}

impl Template {
    /// Look up a slot by name.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&SlotDefinition> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// Style profile derived from the template id.
    #[must_use]
    pub fn profile(&self) -> Profile {
        Profile::for_template(&self.id)
    }
}

/// Read-only template lookup keyed by template id.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Build a registry from a set of templates. Later duplicates win.
    #[must_use]
    pub fn new(templates: impl IntoIterator<Item = Template>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|template| (template.id.clone(), template))
                .collect(),
        }
    }

    /// Parse a JSON array of templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a slot position is invalid.
    pub fn from_json(json: &str) -> DeckResult<Self> {
        let templates: Vec<Template> = serde_json::from_str(json)?;
        Ok(Self::new(templates))
    }

    /// The templates bundled with the editor.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_templates())
    }

    /// Get a template by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Whether a template id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// All registered template ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Turns resolved slots plus slide content into markup.
///
/// Implementations are pure: the same slots and content always produce the
/// same markup.
pub trait TemplateRenderer: Send + Sync {
    /// Template this renderer handles.
    fn template_id(&self) -> &str;

    /// Render the slide.
    fn render(&self, slots: &[ResolvedSlot], content: &serde_json::Value) -> String;
}

fn slot(name: &str, row: &str, column: &str) -> SlotDefinition {
    let position = Position::parse(row, column).unwrap_or_else(|e| {
        tracing::warn!(slot = name, error = %e, "built-in slot position invalid, using full canvas");
        Position::full_canvas()
    });
    SlotDefinition {
        name: name.to_string(),
        position,
        style: None,
        default_content: None,
    }
}

impl SlotDefinition {
    fn styled(mut self, properties: &[(&str, &str)]) -> Self {
        self.style = Some(
            properties
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        self
    }

    fn placeholder(mut self, content: &str) -> Self {
        self.default_content = Some(content.to_string());
        self
    }
}

fn template(id: &str, name: &str, slots: Vec<SlotDefinition>) -> Template {
    Template {
        id: id.to_string(),
        name: name.to_string(),
        slots,
    }
}

fn builtin_templates() -> Vec<Template> {
    vec![
        template(
            "H1-generated",
            "Title Slide",
            vec![
                slot("background", "1/19", "1/33"),
                slot("title", "7/11", "3/31").placeholder("Presentation Title"),
                slot("subtitle", "11/13", "3/31").placeholder("Subtitle"),
                slot("footer", "17/19", "3/31"),
            ],
        ),
        template(
            "H2-section",
            "Section Divider",
            vec![
                slot("section_number", "5/8", "3/8").styled(&[("font-size", "96px")]),
                slot("title", "8/12", "3/31").placeholder("Section Title"),
                slot("subtitle", "12/14", "3/31"),
            ],
        ),
        template(
            "H3-closing",
            "Closing Slide",
            vec![
                slot("title", "6/10", "3/31").placeholder("Thank You"),
                slot("subtitle", "10/12", "3/31"),
                slot("contact", "13/16", "3/31").styled(&[("font-size", "24px")]),
            ],
        ),
        template(
            "C1-text",
            "Title and Body",
            vec![
                slot("title", "2/4", "3/31").placeholder("Slide Title"),
                slot("body", "5/17", "3/31"),
                slot("footer", "18/19", "3/31"),
            ],
        ),
        template(
            "C2-two-column",
            "Two Columns",
            vec![
                slot("title", "2/4", "3/31").placeholder("Slide Title"),
                slot("left_body", "5/17", "3/16"),
                slot("right_body", "5/17", "18/31"),
                slot("footer", "18/19", "3/31"),
            ],
        ),
        template(
            "C3-chart",
            "Chart",
            vec![
                slot("title", "2/4", "3/31").placeholder("Chart Title"),
                slot("chart", "4/16", "3/31"),
                slot("caption", "16/17", "3/31")
                    .styled(&[("font-size", "18px"), ("font-style", "italic")]),
                slot("footer", "18/19", "3/31"),
            ],
        ),
        template(
            "V1-image-text",
            "Image and Text",
            vec![
                slot("title", "2/4", "3/31").placeholder("Slide Title"),
                slot("image", "4/17", "3/17"),
                slot("body", "4/17", "18/31"),
                slot("footer", "18/19", "3/31"),
            ],
        ),
        template(
            "V2-full-image",
            "Full Bleed Image",
            vec![
                slot("image", "1/19", "1/33"),
                slot("title", "14/17", "3/31")
                    .styled(&[("color", "#FFFFFF"), ("text-shadow", "0 2px 8px rgba(0,0,0,0.6)")]),
            ],
        ),
        template(
            "I1-infographic",
            "Infographic",
            vec![
                slot("title", "2/4", "3/31").placeholder("Slide Title"),
                slot("infographic", "4/17", "3/31"),
                slot("footer", "18/19", "3/31"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_have_valid_positions() {
        let registry = TemplateRegistry::builtin();
        assert!(!registry.is_empty());
        for id in registry.ids() {
            let template = registry.get(id).expect("listed id exists");
            for slot in &template.slots {
                // Only background and full-bleed image slots cover the whole canvas.
                if slot.position == Position::full_canvas() {
                    assert!(
                        slot.name == "background" || slot.name == "image",
                        "{id}/{} fell back to full canvas",
                        slot.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_slot_lookup() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get("C3-chart").expect("C3-chart");
        let chart = template.slot("chart").expect("chart slot");
        assert_eq!(chart.position, Position::parse("4/16", "3/31").expect("parse"));
        assert!(template.slot("missing").is_none());
    }

    #[test]
    fn test_profile_from_template() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(
            registry.get("H1-generated").expect("H1").profile(),
            Profile::Hero
        );
        assert_eq!(
            registry.get("C1-text").expect("C1").profile(),
            Profile::Standard
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"[{
            "id": "X1-custom",
            "name": "Custom",
            "slots": [
                {"name": "title", "position": {"gridRow": "1/3", "gridColumn": "1/33"},
                 "style": {"color": "red"}, "defaultContent": "Hi"}
            ]
        }]"#;
        let registry = TemplateRegistry::from_json(json).expect("parse");
        assert_eq!(registry.len(), 1);
        let slot = registry
            .get("X1-custom")
            .and_then(|t| t.slot("title"))
            .expect("slot");
        assert_eq!(slot.default_content.as_deref(), Some("Hi"));
        assert_eq!(
            slot.style.as_ref().and_then(|s| s.get("color")).map(String::as_str),
            Some("red")
        );
    }

    #[test]
    fn test_from_json_rejects_bad_position() {
        let json = r#"[{"id": "X", "name": "X", "slots": [
            {"name": "t", "position": {"gridRow": "5/5", "gridColumn": "1/2"}}
        ]}]"#;
        assert!(TemplateRegistry::from_json(json).is_err());
    }
}
