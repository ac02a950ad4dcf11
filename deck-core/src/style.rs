//! Style cascade resolution.
//!
//! The final style of a slot is built from five layers, lowest precedence
//! first:
//!
//! ```text
//! 1. profile defaults      (standard / hero baseline typography)
//! 2. theme                 (theme id, falls back to the default theme)
//! 3. template slot style   (TemplateRegistry)
//! 4. presentation overrides
//! 5. inline overrides      (per call, always wins)
//! ```
//!
//! Later layers overwrite identical property names; disjoint properties
//! accumulate. Grid position is structural and comes from the template slot
//! only. Resolution is a pure function of its inputs.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::grid::Position;
use crate::template::TemplateRegistry;
use crate::theme::ThemeRegistry;

/// Flat mapping of style property name to value.
pub type StyleProperties = BTreeMap<String, String>;

/// Base typography profile, chosen by template id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Content slides.
    Standard,
    /// Title, section and closing slides.
    Hero,
}

impl Profile {
    /// Hero-series templates are ids of the form `H<digit>...`.
    #[must_use]
    pub fn for_template(template_id: &str) -> Self {
        let mut chars = template_id.chars();
        match (chars.next(), chars.next()) {
            (Some('H'), Some(d)) if d.is_ascii_digit() => Self::Hero,
            _ => Self::Standard,
        }
    }
}

/// The cascade layer that supplied a resolved property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CascadeLayer {
    /// Profile baseline.
    ProfileDefault,
    /// Theme typography.
    Theme,
    /// Template slot style.
    Template,
    /// Presentation-level overrides.
    Presentation,
    /// Inline overrides.
    Inline,
}

/// Presentation-level retinting applied on top of the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeOverrides {
    /// Applied to every slot.
    #[serde(default)]
    pub global: StyleProperties,
    /// Applied to a single slot, after `global`.
    #[serde(default)]
    pub slots: BTreeMap<String, StyleProperties>,
}

impl ThemeOverrides {
    /// Whether there are no overrides at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.slots.values().all(BTreeMap::is_empty)
    }
}

/// Inputs to one cascade resolution.
#[derive(Debug, Clone, Copy)]
pub struct StyleRequest<'a> {
    /// Template id of the slide.
    pub template_id: &'a str,
    /// Slot being resolved.
    pub slot: &'a str,
    /// Presentation theme id.
    pub theme_id: &'a str,
    /// Presentation-level overrides.
    pub overrides: &'a ThemeOverrides,
    /// Caller-supplied inline overrides.
    pub inline: &'a StyleProperties,
}

/// Output of a cascade resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStyle {
    /// Profile used for layers 1 and 2.
    pub profile: Profile,
    /// Final property values.
    pub properties: StyleProperties,
    /// Layer that supplied each property.
    pub sources: BTreeMap<String, CascadeLayer>,
}

impl ResolvedStyle {
    fn empty(profile: Profile) -> Self {
        Self {
            profile,
            properties: StyleProperties::new(),
            sources: BTreeMap::new(),
        }
    }

    fn apply(&mut self, layer: CascadeLayer, properties: &StyleProperties) {
        for (name, value) in properties {
            self.properties.insert(name.clone(), value.clone());
            self.sources.insert(name.clone(), layer);
        }
    }
}

/// A template slot with its structural position and resolved style.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSlot {
    /// Slot name.
    pub name: String,
    /// Grid position from the template.
    pub position: Position,
    /// Resolved style.
    pub style: ResolvedStyle,
    /// Template placeholder content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_content: Option<String>,
}

/// Baseline typography shared by every theme.
#[must_use]
pub fn profile_defaults(profile: Profile, slot: &str) -> StyleProperties {
    let entries: &[(&str, &str)] = match (profile, slot) {
        (Profile::Standard, "title") => &[
            ("font-size", "44px"),
            ("font-weight", "700"),
            ("line-height", "1.2"),
            ("text-align", "left"),
        ],
        (Profile::Hero, "title") => &[
            ("font-size", "72px"),
            ("font-weight", "800"),
            ("line-height", "1.1"),
            ("text-align", "center"),
        ],
        (Profile::Standard, "subtitle") => &[
            ("font-size", "28px"),
            ("font-weight", "500"),
            ("line-height", "1.3"),
        ],
        (Profile::Hero, "subtitle") => &[
            ("font-size", "36px"),
            ("font-weight", "400"),
            ("line-height", "1.3"),
            ("text-align", "center"),
        ],
        (Profile::Standard, "footer") | (Profile::Hero, "footer") => &[
            ("font-size", "16px"),
            ("font-weight", "400"),
            ("opacity", "0.8"),
        ],
        (_, "caption") => &[("font-size", "18px"), ("font-weight", "400")],
        _ => &[
            ("font-size", "24px"),
            ("font-weight", "400"),
            ("line-height", "1.5"),
        ],
    };
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Resolves slot styles against injected template and theme registries.
#[derive(Debug, Clone)]
pub struct StyleResolver {
    templates: Arc<TemplateRegistry>,
    themes: Arc<ThemeRegistry>,
}

impl StyleResolver {
    /// Create a resolver over the given registries.
    #[must_use]
    pub fn new(templates: Arc<TemplateRegistry>, themes: Arc<ThemeRegistry>) -> Self {
        Self { templates, themes }
    }

    /// Template registry in use.
    #[must_use]
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Theme registry in use.
    #[must_use]
    pub fn themes(&self) -> &ThemeRegistry {
        &self.themes
    }

    /// Resolve the style of one slot through all five layers.
    #[must_use]
    pub fn resolve(&self, request: &StyleRequest<'_>) -> ResolvedStyle {
        let profile = Profile::for_template(request.template_id);
        let mut resolved = ResolvedStyle::empty(profile);

        resolved.apply(
            CascadeLayer::ProfileDefault,
            &profile_defaults(profile, request.slot),
        );

        if let Some(style) = self
            .themes
            .resolve(request.theme_id)
            .and_then(|theme| theme.slot_style(profile, request.slot))
        {
            resolved.apply(CascadeLayer::Theme, style);
        }

        if let Some(style) = self
            .templates
            .get(request.template_id)
            .and_then(|template| template.slot(request.slot))
            .and_then(|slot| slot.style.as_ref())
        {
            resolved.apply(CascadeLayer::Template, style);
        }

        resolved.apply(CascadeLayer::Presentation, &request.overrides.global);
        if let Some(style) = request.overrides.slots.get(request.slot) {
            resolved.apply(CascadeLayer::Presentation, style);
        }

        resolved.apply(CascadeLayer::Inline, request.inline);
        resolved
    }

    /// Grid position of a template slot. Not subject to theme layers.
    #[must_use]
    pub fn resolve_position(&self, template_id: &str, slot: &str) -> Option<Position> {
        self.templates
            .get(template_id)
            .and_then(|template| template.slot(slot))
            .map(|slot| slot.position)
    }

    /// Resolve every slot of a template, in slot order.
    ///
    /// `inline` maps slot names to their inline overrides. Returns an empty
    /// list for an unknown template.
    #[must_use]
    pub fn resolve_template(
        &self,
        template_id: &str,
        theme_id: &str,
        overrides: &ThemeOverrides,
        inline: &BTreeMap<String, StyleProperties>,
    ) -> Vec<ResolvedSlot> {
        let Some(template) = self.templates.get(template_id) else {
            tracing::debug!(template = template_id, "resolve_template: unknown template");
            return Vec::new();
        };
        let no_inline = StyleProperties::new();
        template
            .slots
            .iter()
            .map(|slot| {
                let style = self.resolve(&StyleRequest {
                    template_id,
                    slot: &slot.name,
                    theme_id,
                    overrides,
                    inline: inline.get(&slot.name).unwrap_or(&no_inline),
                });
                ResolvedSlot {
                    name: slot.name.clone(),
                    position: slot.position,
                    style,
                    default_content: slot.default_content.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{SlotDefinition, Template};
    use crate::theme::Theme;

    fn props(entries: &[(&str, &str)]) -> StyleProperties {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    /// Synthetic registries so the tests do not depend on bundled data.
    fn resolver() -> StyleResolver {
        let templates = TemplateRegistry::new(vec![
            Template {
                id: "T1-test".to_string(),
                name: "Test".to_string(),
                slots: vec![SlotDefinition {
                    name: "title".to_string(),
                    position: Position::parse("2/4", "3/31").expect("pos"),
                    style: Some(props(&[("font-size", "50px"), ("letter-spacing", "1px")])),
                    default_content: Some("Title".to_string()),
                }],
            },
            Template {
                id: "H9-test".to_string(),
                name: "Hero".to_string(),
                slots: vec![SlotDefinition {
                    name: "title".to_string(),
                    position: Position::parse("7/11", "3/31").expect("pos"),
                    style: None,
                    default_content: None,
                }],
            },
        ]);
        let mut standard = BTreeMap::new();
        standard.insert(
            "title".to_string(),
            props(&[("color", "navy"), ("font-size", "40px")]),
        );
        let themes = ThemeRegistry::new(
            vec![
                Theme {
                    id: "base".to_string(),
                    name: "Base".to_string(),
                    standard,
                    hero: BTreeMap::new(),
                },
                Theme {
                    id: "alt".to_string(),
                    name: "Alt".to_string(),
                    standard: BTreeMap::new(),
                    hero: BTreeMap::new(),
                },
            ],
            "base",
        );
        StyleResolver::new(Arc::new(templates), Arc::new(themes))
    }

    fn request<'a>(
        slot: &'a str,
        theme_id: &'a str,
        overrides: &'a ThemeOverrides,
        inline: &'a StyleProperties,
    ) -> StyleRequest<'a> {
        StyleRequest {
            template_id: "T1-test",
            slot,
            theme_id,
            overrides,
            inline,
        }
    }

    #[test]
    fn test_profile_for_template() {
        assert_eq!(Profile::for_template("H1-generated"), Profile::Hero);
        assert_eq!(Profile::for_template("H3"), Profile::Hero);
        assert_eq!(Profile::for_template("Hero-like"), Profile::Standard);
        assert_eq!(Profile::for_template("C1-text"), Profile::Standard);
        assert_eq!(Profile::for_template(""), Profile::Standard);
    }

    #[test]
    fn test_layers_apply_in_order() {
        let resolver = resolver();
        let overrides = ThemeOverrides {
            global: props(&[("color", "crimson")]),
            slots: BTreeMap::new(),
        };
        let inline = props(&[("font-weight", "900")]);
        let style = resolver.resolve(&request("title", "base", &overrides, &inline));

        // Template (layer 3) beats theme (layer 2) and profile (layer 1).
        assert_eq!(style.properties["font-size"], "50px");
        assert_eq!(style.sources["font-size"], CascadeLayer::Template);
        // Presentation (layer 4) beats theme.
        assert_eq!(style.properties["color"], "crimson");
        assert_eq!(style.sources["color"], CascadeLayer::Presentation);
        // Inline (layer 5) beats profile.
        assert_eq!(style.properties["font-weight"], "900");
        assert_eq!(style.sources["font-weight"], CascadeLayer::Inline);
        // Disjoint properties accumulate.
        assert_eq!(style.properties["letter-spacing"], "1px");
        assert_eq!(style.properties["line-height"], "1.2");
        assert_eq!(style.sources["line-height"], CascadeLayer::ProfileDefault);
    }

    #[test]
    fn test_slot_override_applies_after_global() {
        let resolver = resolver();
        let mut slots = BTreeMap::new();
        slots.insert("title".to_string(), props(&[("color", "gold")]));
        let overrides = ThemeOverrides {
            global: props(&[("color", "crimson")]),
            slots,
        };
        let inline = StyleProperties::new();
        let style = resolver.resolve(&request("title", "base", &overrides, &inline));
        assert_eq!(style.properties["color"], "gold");
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let resolver = resolver();
        let overrides = ThemeOverrides::default();
        let inline = StyleProperties::new();
        let style = resolver.resolve(&request("title", "nope", &overrides, &inline));
        assert_eq!(style.properties["color"], "navy");
        assert_eq!(style.sources["color"], CascadeLayer::Theme);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = resolver();
        let overrides = ThemeOverrides::default();
        let inline = props(&[("color", "teal")]);
        let first = resolver.resolve(&request("title", "base", &overrides, &inline));
        let second = resolver.resolve(&request("title", "base", &overrides, &inline));
        assert_eq!(first, second);
    }

    #[test]
    fn test_inline_change_touches_only_overridden_properties() {
        let resolver = resolver();
        let overrides = ThemeOverrides::default();
        let none = StyleProperties::new();
        let inline = props(&[("color", "teal")]);

        let baseline = resolver.resolve(&request("title", "base", &overrides, &none));
        let styled = resolver.resolve(&request("title", "base", &overrides, &inline));

        assert_eq!(styled.properties["color"], "teal");
        for (name, value) in &baseline.properties {
            if name != "color" {
                assert_eq!(styled.properties.get(name), Some(value), "{name} changed");
            }
        }
        assert_eq!(styled.properties.len(), baseline.properties.len());
    }

    #[test]
    fn test_hero_profile_defaults() {
        let resolver = resolver();
        let overrides = ThemeOverrides::default();
        let inline = StyleProperties::new();
        let style = resolver.resolve(&StyleRequest {
            template_id: "H9-test",
            slot: "title",
            theme_id: "alt",
            overrides: &overrides,
            inline: &inline,
        });
        assert_eq!(style.profile, Profile::Hero);
        assert_eq!(style.properties["font-size"], "72px");
        assert_eq!(style.properties["text-align"], "center");
    }

    #[test]
    fn test_position_comes_from_template_only() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_position("T1-test", "title"),
            Some(Position::parse("2/4", "3/31").expect("pos"))
        );
        assert_eq!(resolver.resolve_position("T1-test", "body"), None);
        assert_eq!(resolver.resolve_position("missing", "title"), None);
    }

    #[test]
    fn test_resolve_template() {
        let resolver = resolver();
        let mut inline = BTreeMap::new();
        inline.insert("title".to_string(), props(&[("color", "lime")]));
        let slots =
            resolver.resolve_template("T1-test", "base", &ThemeOverrides::default(), &inline);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].name, "title");
        assert_eq!(slots[0].style.properties["color"], "lime");
        assert_eq!(slots[0].default_content.as_deref(), Some("Title"));

        assert!(resolver
            .resolve_template("missing", "base", &ThemeOverrides::default(), &inline)
            .is_empty());
    }

    #[test]
    fn test_unknown_template_still_gets_profile_and_theme() {
        let resolver = resolver();
        let overrides = ThemeOverrides::default();
        let inline = StyleProperties::new();
        let style = resolver.resolve(&StyleRequest {
            template_id: "Z0-missing",
            slot: "title",
            theme_id: "base",
            overrides: &overrides,
            inline: &inline,
        });
        assert_eq!(style.properties["font-size"], "40px");
        assert_eq!(style.sources["font-size"], CascadeLayer::Theme);
    }
}
