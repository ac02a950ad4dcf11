//! Themes: per-profile, per-slot typography and color palettes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::DeckResult;
use crate::style::{Profile, StyleProperties};

/// Theme used when a presentation asks for one that is not registered.
pub const DEFAULT_THEME_ID: &str = "corporate-blue";

/// A named typography/color palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Theme identifier.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Slot styles for standard templates.
    #[serde(default)]
    pub standard: BTreeMap<String, StyleProperties>,
    /// Slot styles for hero templates.
    #[serde(default)]
    pub hero: BTreeMap<String, StyleProperties>,
}

impl Theme {
    /// Style for a slot under the given profile.
    #[must_use]
    pub fn slot_style(&self, profile: Profile, slot: &str) -> Option<&StyleProperties> {
        match profile {
            Profile::Standard => self.standard.get(slot),
            Profile::Hero => self.hero.get(slot),
        }
    }
}

/// Read-only theme lookup with a fallback theme.
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: HashMap<String, Theme>,
    default_theme: String,
}

impl ThemeRegistry {
    /// Build a registry; `default_theme` is used for unknown theme ids.
    #[must_use]
    pub fn new(themes: impl IntoIterator<Item = Theme>, default_theme: impl Into<String>) -> Self {
        Self {
            themes: themes
                .into_iter()
                .map(|theme| (theme.id.clone(), theme))
                .collect(),
            default_theme: default_theme.into(),
        }
    }

    /// Parse a JSON array of themes.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str, default_theme: impl Into<String>) -> DeckResult<Self> {
        let themes: Vec<Theme> = serde_json::from_str(json)?;
        Ok(Self::new(themes, default_theme))
    }

    /// The themes bundled with the editor.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_themes(), DEFAULT_THEME_ID)
    }

    /// Replace the fallback theme id.
    #[must_use]
    pub fn with_default(mut self, default_theme: impl Into<String>) -> Self {
        self.default_theme = default_theme.into();
        self
    }

    /// Fallback theme id.
    #[must_use]
    pub fn default_theme_id(&self) -> &str {
        &self.default_theme
    }

    /// Get a theme by exact id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Theme> {
        self.themes.get(id)
    }

    /// Get a theme, falling back to the default theme when `id` is unknown.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<&Theme> {
        self.themes.get(id).or_else(|| {
            tracing::debug!(theme = id, fallback = %self.default_theme, "unknown theme, using fallback");
            self.themes.get(&self.default_theme)
        })
    }

    /// Whether a theme id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.themes.contains_key(id)
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn props(entries: &[(&str, &str)]) -> StyleProperties {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn palette(
    id: &str,
    name: &str,
    heading: &str,
    text: &str,
    muted: &str,
    hero_text: &str,
    font: &str,
) -> Theme {
    let mut standard = BTreeMap::new();
    standard.insert(
        "title".to_string(),
        props(&[("color", heading), ("font-family", font)]),
    );
    standard.insert("subtitle".to_string(), props(&[("color", muted)]));
    standard.insert("body".to_string(), props(&[("color", text)]));
    standard.insert("footer".to_string(), props(&[("color", muted)]));
    standard.insert("caption".to_string(), props(&[("color", muted)]));

    let mut hero = BTreeMap::new();
    hero.insert(
        "title".to_string(),
        props(&[("color", hero_text), ("font-family", font)]),
    );
    hero.insert("subtitle".to_string(), props(&[("color", hero_text)]));
    hero.insert("footer".to_string(), props(&[("color", hero_text)]));

    Theme {
        id: id.to_string(),
        name: name.to_string(),
        standard,
        hero,
    }
}

fn builtin_themes() -> Vec<Theme> {
    vec![
        palette(
            DEFAULT_THEME_ID,
            "Corporate Blue",
            "#1E3A8A",
            "#1F2937",
            "#6B7280",
            "#FFFFFF",
            "Inter, sans-serif",
        ),
        palette(
            "midnight",
            "Midnight",
            "#F8FAFC",
            "#E2E8F0",
            "#94A3B8",
            "#F8FAFC",
            "Poppins, sans-serif",
        ),
        palette(
            "warm-earth",
            "Warm Earth",
            "#7C2D12",
            "#292524",
            "#78716C",
            "#FFF7ED",
            "Merriweather, serif",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_default() {
        let registry = ThemeRegistry::builtin();
        let theme = registry.resolve("no-such-theme").expect("fallback");
        assert_eq!(theme.id, DEFAULT_THEME_ID);
        assert_eq!(registry.resolve("midnight").expect("midnight").id, "midnight");
    }

    #[test]
    fn test_resolve_without_default_is_none() {
        let registry = ThemeRegistry::new(Vec::new(), "missing");
        assert!(registry.resolve("anything").is_none());
    }

    #[test]
    fn test_slot_style_by_profile() {
        let registry = ThemeRegistry::builtin();
        let theme = registry.get(DEFAULT_THEME_ID).expect("default");
        let standard = theme.slot_style(Profile::Standard, "title").expect("std");
        let hero = theme.slot_style(Profile::Hero, "title").expect("hero");
        assert_eq!(standard.get("color").map(String::as_str), Some("#1E3A8A"));
        assert_eq!(hero.get("color").map(String::as_str), Some("#FFFFFF"));
        assert!(theme.slot_style(Profile::Hero, "body").is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r##"[{"id": "mono", "name": "Mono",
            "standard": {"title": {"color": "#000"}}}]"##;
        let registry = ThemeRegistry::from_json(json, "mono").expect("parse");
        let theme = registry.resolve("other").expect("fallback");
        assert_eq!(theme.id, "mono");
        assert!(theme.hero.is_empty());
    }
}
