//! Slide elements - the positioned, typed units of slide content.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeckError, DeckResult};
use crate::grid::Position;
use crate::style::StyleProperties;

/// Default z-index for the first element on a slide.
pub const DEFAULT_Z_INDEX: i32 = 100;

/// Longest accepted element id.
pub const MAX_ELEMENT_ID_LEN: usize = 64;

/// Unique identifier for an element, e.g. `chart-3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Wrap an existing id string without validation.
    #[must_use]
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a caller-supplied id.
    ///
    /// Ids are 1 to [`MAX_ELEMENT_ID_LEN`] ASCII letters, digits, `-` or `_`,
    /// starting with a letter.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::InvalidElementId`] if the id is malformed.
    pub fn parse(id: &str) -> DeckResult<Self> {
        let well_formed = id.len() <= MAX_ELEMENT_ID_LEN
            && id.starts_with(|c: char| c.is_ascii_alphabetic())
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if well_formed {
            Ok(Self(id.to_string()))
        } else {
            Err(DeckError::InvalidElementId(id.to_string()))
        }
    }

    /// Build the id for the `n`th element of a type.
    #[must_use]
    pub fn sequential(element_type: ElementType, n: u64) -> Self {
        Self(format!("{}-{n}", element_type.as_str()))
    }

    /// Id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing numeric counter, if the id has the `<prefix>-<n>` shape.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.0
            .rsplit_once('-')
            .and_then(|(_, suffix)| suffix.parse().ok())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The five element classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Rich or plain text box.
    TextBox,
    /// Raster or vector image.
    Image,
    /// Chart backed by a chart-library config or pre-rendered markup.
    Chart,
    /// SVG infographic.
    Infographic,
    /// Diagram from SVG or a textual description.
    Diagram,
}

impl ElementType {
    /// Wire name, also used as the id prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextBox => "textbox",
            Self::Image => "image",
            Self::Chart => "chart",
            Self::Infographic => "infographic",
            Self::Diagram => "diagram",
        }
    }

    /// Conventional position for a newly inserted element of this type.
    #[must_use]
    pub fn default_position(self) -> Position {
        let (row, column) = match self {
            Self::TextBox => ("5/7", "3/31"),
            Self::Image => ("4/16", "17/31"),
            Self::Chart => ("4/16", "3/31"),
            Self::Infographic => ("4/17", "3/31"),
            Self::Diagram => ("4/17", "5/29"),
        };
        Position::parse(row, column).unwrap_or_else(|_| Position::full_canvas())
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How text box content is to be interpreted. Set at insertion, never sniffed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Plain text, escaped by renderers.
    #[default]
    Plain,
    /// Trusted HTML fragment.
    Html,
}

/// CSS `object-fit` mode for images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectFit {
    /// Fill the box, cropping overflow.
    #[default]
    Cover,
    /// Fit inside the box, letterboxing.
    Contain,
    /// Stretch to the box.
    Fill,
    /// Natural size.
    None,
    /// `none` or `contain`, whichever is smaller.
    ScaleDown,
}

/// Which chart representation is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartSource {
    /// The chart-library configuration object.
    #[default]
    Config,
    /// The pre-rendered markup.
    Html,
}

/// Which diagram representation is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramSource {
    /// SVG markup.
    #[default]
    Svg,
    /// Textual (mermaid) diagram description.
    Mermaid,
}

/// Layout direction for textual diagrams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagramDirection {
    /// Top to bottom.
    #[default]
    TB,
    /// Bottom to top.
    BT,
    /// Left to right.
    LR,
    /// Right to left.
    RL,
}

fn default_diagram_theme() -> String {
    "default".to_string()
}

/// Type-specific element payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementContent {
    /// Text box.
    #[serde(rename_all = "camelCase")]
    TextBox {
        /// Text or HTML content.
        #[serde(default)]
        content: String,
        /// Interpretation of `content`.
        #[serde(default)]
        content_kind: ContentKind,
        /// Per-element style overrides.
        #[serde(default, skip_serializing_if = "StyleProperties::is_empty")]
        style: StyleProperties,
    },

    /// Image.
    #[serde(rename_all = "camelCase")]
    Image {
        /// Source URL or data URI.
        url: String,
        /// Alternative text.
        #[serde(default)]
        alt: String,
        /// Fit mode.
        #[serde(default)]
        object_fit: ObjectFit,
    },

    /// Chart.
    #[serde(rename_all = "camelCase")]
    Chart {
        /// Chart-library configuration.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chart_config: Option<serde_json::Value>,
        /// Pre-rendered chart markup.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chart_html: Option<String>,
        /// Authoritative representation.
        #[serde(default)]
        source: ChartSource,
    },

    /// Infographic.
    #[serde(rename_all = "camelCase")]
    Infographic {
        /// SVG markup.
        #[serde(default)]
        svg_content: String,
    },

    /// Diagram.
    #[serde(rename_all = "camelCase")]
    Diagram {
        /// Rendered SVG markup.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        svg_content: Option<String>,
        /// Mermaid source.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mermaid_code: Option<String>,
        /// Mermaid layout direction.
        #[serde(default)]
        direction: DiagramDirection,
        /// Mermaid theme name.
        #[serde(default = "default_diagram_theme")]
        theme: String,
        /// Authoritative representation.
        #[serde(default)]
        source: DiagramSource,
    },
}

impl ElementContent {
    /// Element class of this payload.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::TextBox { .. } => ElementType::TextBox,
            Self::Image { .. } => ElementType::Image,
            Self::Chart { .. } => ElementType::Chart,
            Self::Infographic { .. } => ElementType::Infographic,
            Self::Diagram { .. } => ElementType::Diagram,
        }
    }

    /// Empty text box.
    #[must_use]
    pub fn text(content: impl Into<String>, content_kind: ContentKind) -> Self {
        Self::TextBox {
            content: content.into(),
            content_kind,
            style: StyleProperties::new(),
        }
    }

    /// Image with default alt text and fit.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image {
            url: url.into(),
            alt: String::new(),
            object_fit: ObjectFit::default(),
        }
    }

    /// Chart driven by a configuration object.
    #[must_use]
    pub fn chart_config(config: serde_json::Value) -> Self {
        Self::Chart {
            chart_config: Some(config),
            chart_html: None,
            source: ChartSource::Config,
        }
    }

    /// Infographic from SVG markup.
    #[must_use]
    pub fn infographic(svg_content: impl Into<String>) -> Self {
        Self::Infographic {
            svg_content: svg_content.into(),
        }
    }

    /// Diagram from SVG markup.
    #[must_use]
    pub fn diagram_svg(svg_content: impl Into<String>) -> Self {
        Self::Diagram {
            svg_content: Some(svg_content.into()),
            mermaid_code: None,
            direction: DiagramDirection::default(),
            theme: default_diagram_theme(),
            source: DiagramSource::Svg,
        }
    }
}

/// A partial update to an element's payload or common properties.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementPatch {
    /// Replace a text box's content.
    TextContent {
        /// New content.
        content: String,
        /// New interpretation, if changing.
        content_kind: Option<ContentKind>,
    },
    /// Replace an image source.
    ImageSource {
        /// New URL.
        url: String,
        /// New alt text, if changing.
        alt: Option<String>,
        /// New fit mode, if changing.
        object_fit: Option<ObjectFit>,
    },
    /// Replace a chart's configuration and make it authoritative.
    ChartConfig(serde_json::Value),
    /// Replace a chart's markup and make it authoritative.
    ChartHtml(String),
    /// Replace an infographic's SVG.
    InfographicSvg(String),
    /// Replace a diagram's SVG and make it authoritative.
    DiagramSvg(String),
    /// Replace a diagram's mermaid source and make it authoritative.
    DiagramMermaid {
        /// Mermaid source.
        code: String,
        /// Layout direction, if changing.
        direction: Option<DiagramDirection>,
        /// Theme, if changing.
        theme: Option<String>,
    },
    /// Update common properties.
    Properties {
        /// New lock state.
        locked: Option<bool>,
        /// New visibility.
        visible: Option<bool>,
        /// New z-index.
        z_index: Option<i32>,
    },
}

impl ElementPatch {
    /// Element class the patch applies to, or `None` for common properties.
    #[must_use]
    pub const fn target_type(&self) -> Option<ElementType> {
        match self {
            Self::TextContent { .. } => Some(ElementType::TextBox),
            Self::ImageSource { .. } => Some(ElementType::Image),
            Self::ChartConfig(_) | Self::ChartHtml(_) => Some(ElementType::Chart),
            Self::InfographicSvg(_) => Some(ElementType::Infographic),
            Self::DiagramSvg(_) | Self::DiagramMermaid { .. } => Some(ElementType::Diagram),
            Self::Properties { .. } => None,
        }
    }
}

/// A slide element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Grid position.
    pub position: Position,
    /// Paint order; higher paints on top.
    #[serde(default = "Element::default_z_index")]
    pub z_index: i32,
    /// Whether interaction is suppressed.
    #[serde(default)]
    pub locked: bool,
    /// Whether the element is shown.
    #[serde(default = "Element::default_visible")]
    pub visible: bool,
    /// Type-specific payload.
    #[serde(flatten)]
    pub content: ElementContent,
}

impl Element {
    /// Create a visible, unlocked element.
    #[must_use]
    pub fn new(id: ElementId, content: ElementContent, position: Position) -> Self {
        Self {
            id,
            position,
            z_index: DEFAULT_Z_INDEX,
            locked: false,
            visible: true,
            content,
        }
    }

    const fn default_z_index() -> i32 {
        DEFAULT_Z_INDEX
    }

    const fn default_visible() -> bool {
        true
    }

    /// Element class.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.content.element_type()
    }

    /// Set the z-index.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Whether the element can currently be selected.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.visible && !self.locked
    }

    /// Merge a patch into this element.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::TypeMismatch`] if the patch targets another
    /// element type. The element is unchanged in that case.
    pub fn apply(&mut self, patch: ElementPatch) -> DeckResult<()> {
        let found = self.element_type();
        match (&mut self.content, patch) {
            (
                ElementContent::TextBox {
                    content,
                    content_kind,
                    ..
                },
                ElementPatch::TextContent {
                    content: new_content,
                    content_kind: new_kind,
                },
            ) => {
                *content = new_content;
                if let Some(kind) = new_kind {
                    *content_kind = kind;
                }
            }
            (
                ElementContent::Image {
                    url,
                    alt,
                    object_fit,
                },
                ElementPatch::ImageSource {
                    url: new_url,
                    alt: new_alt,
                    object_fit: new_fit,
                },
            ) => {
                *url = new_url;
                if let Some(new_alt) = new_alt {
                    *alt = new_alt;
                }
                if let Some(new_fit) = new_fit {
                    *object_fit = new_fit;
                }
            }
            (
                ElementContent::Chart {
                    chart_config,
                    source,
                    ..
                },
                ElementPatch::ChartConfig(config),
            ) => {
                *chart_config = Some(config);
                *source = ChartSource::Config;
            }
            (
                ElementContent::Chart {
                    chart_html, source, ..
                },
                ElementPatch::ChartHtml(html),
            ) => {
                *chart_html = Some(html);
                *source = ChartSource::Html;
            }
            (ElementContent::Infographic { svg_content }, ElementPatch::InfographicSvg(svg)) => {
                *svg_content = svg;
            }
            (
                ElementContent::Diagram {
                    svg_content,
                    source,
                    ..
                },
                ElementPatch::DiagramSvg(svg),
            ) => {
                *svg_content = Some(svg);
                *source = DiagramSource::Svg;
            }
            (
                ElementContent::Diagram {
                    mermaid_code,
                    direction,
                    theme,
                    source,
                    ..
                },
                ElementPatch::DiagramMermaid {
                    code,
                    direction: new_direction,
                    theme: new_theme,
                },
            ) => {
                *mermaid_code = Some(code);
                if let Some(new_direction) = new_direction {
                    *direction = new_direction;
                }
                if let Some(new_theme) = new_theme {
                    *theme = new_theme;
                }
                *source = DiagramSource::Mermaid;
            }
            (
                _,
                ElementPatch::Properties {
                    locked,
                    visible,
                    z_index,
                },
            ) => {
                if let Some(locked) = locked {
                    self.locked = locked;
                }
                if let Some(visible) = visible {
                    self.visible = visible;
                }
                if let Some(z_index) = z_index {
                    self.z_index = z_index;
                }
            }
            (_, patch) => {
                return Err(DeckError::TypeMismatch {
                    id: self.id.to_string(),
                    expected: patch.target_type().map_or("element", ElementType::as_str),
                    found: found.as_str(),
                });
            }
        }
        Ok(())
    }
}
