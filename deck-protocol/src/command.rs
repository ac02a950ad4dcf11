//! Inbound command messages.
//!
//! A raw `{action, params}` message is decoded through [`ACTION_TABLE`] into
//! a typed [`Command`]. Every parameter is optional at the serde level so
//! that missing fields surface as [`ValidationError::MissingField`] instead of
//! a generic decode error.

use deck_core::{
    ContentKind, DeckError, DiagramDirection, ObjectFit, PixelRect, StyleProperties,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::PersistenceError;
use crate::validation::ValidationError;

/// Undecoded command message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommand {
    /// Action name, e.g. `insertChart`.
    pub action: String,
    /// Action parameters.
    #[serde(default)]
    pub params: Value,
}

impl RawCommand {
    /// Build a raw command.
    #[must_use]
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }
}

/// Fields shared by every insert command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Target slide.
    pub slide_index: Option<i64>,
    /// Row span, `"start/end"`.
    pub grid_row: Option<String>,
    /// Column span, `"start/end"`.
    pub grid_column: Option<String>,
    /// Caller-chosen element id.
    pub id: Option<String>,
    /// Paint order.
    pub z_index: Option<i32>,
    /// Initial lock state.
    pub locked: Option<bool>,
    /// Initial visibility.
    pub visible: Option<bool>,
}

/// Parameters for `insertImage`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertImageParams {
    /// Common placement.
    #[serde(flatten)]
    pub placement: Placement,
    /// Image URL.
    pub url: Option<String>,
    /// Alternative text.
    pub alt: Option<String>,
    /// Fit mode.
    pub object_fit: Option<ObjectFit>,
}

/// Parameters for `insertChart`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertChartParams {
    /// Common placement.
    #[serde(flatten)]
    pub placement: Placement,
    /// Chart-library configuration.
    pub chart_config: Option<Value>,
    /// Pre-rendered markup.
    pub chart_html: Option<String>,
}

/// Parameters for `insertInfographic`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertInfographicParams {
    /// Common placement.
    #[serde(flatten)]
    pub placement: Placement,
    /// SVG markup.
    pub svg_content: Option<String>,
}

/// Parameters for `insertDiagram`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertDiagramParams {
    /// Common placement.
    #[serde(flatten)]
    pub placement: Placement,
    /// SVG markup.
    pub svg_content: Option<String>,
    /// Mermaid source.
    pub mermaid_code: Option<String>,
    /// Mermaid layout direction.
    pub direction: Option<DiagramDirection>,
    /// Mermaid theme.
    pub theme: Option<String>,
}

/// Parameters for `insertTextBox`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTextBoxParams {
    /// Common placement.
    #[serde(flatten)]
    pub placement: Placement,
    /// Text or HTML.
    pub content: Option<String>,
    /// Interpretation of `content`.
    pub content_kind: Option<ContentKind>,
    /// Per-element style.
    pub style: Option<StyleProperties>,
}

/// Parameters for `updateImageSource`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageSourceParams {
    /// Target element.
    pub element_id: Option<String>,
    /// New URL.
    pub url: Option<String>,
    /// New alt text.
    pub alt: Option<String>,
    /// New fit mode.
    pub object_fit: Option<ObjectFit>,
}

/// Parameters for `updateChartConfig`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChartConfigParams {
    /// Target element.
    pub element_id: Option<String>,
    /// New configuration.
    pub chart_config: Option<Value>,
}

/// Parameters for `setChartHtml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChartHtmlParams {
    /// Target element.
    pub element_id: Option<String>,
    /// New markup.
    pub chart_html: Option<String>,
}

/// Parameters for `updateInfographicContent` and `updateDiagramSvg`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgContentParams {
    /// Target element.
    pub element_id: Option<String>,
    /// New SVG.
    pub svg_content: Option<String>,
}

/// Parameters for `updateDiagramMermaid`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiagramMermaidParams {
    /// Target element.
    pub element_id: Option<String>,
    /// Mermaid source.
    pub mermaid_code: Option<String>,
    /// Layout direction.
    pub direction: Option<DiagramDirection>,
    /// Mermaid theme.
    pub theme: Option<String>,
}

/// Parameters for `updateTextBoxContent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextBoxContentParams {
    /// Target element.
    pub element_id: Option<String>,
    /// New content.
    pub content: Option<String>,
    /// New interpretation.
    pub content_kind: Option<ContentKind>,
}

/// Parameters for `moveElement` and `resizeElement`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryParams {
    /// Target element.
    pub element_id: Option<String>,
    /// Row span.
    pub grid_row: Option<String>,
    /// Column span.
    pub grid_column: Option<String>,
    /// Pixel rectangle, snapped to the grid.
    pub rect: Option<PixelRect>,
}

/// Parameters for `updateElementProperties`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateElementPropertiesParams {
    /// Target element.
    pub element_id: Option<String>,
    /// New lock state.
    pub locked: Option<bool>,
    /// New visibility.
    pub visible: Option<bool>,
    /// New paint order.
    pub z_index: Option<i32>,
}

/// Parameters naming a single element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementParams {
    /// Target element.
    pub element_id: Option<String>,
}

/// Parameters naming a slide.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideParams {
    /// Target slide.
    pub slide_index: Option<i64>,
}

/// Parameters for `setSlideLayout`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSlideLayoutParams {
    /// Target slide.
    pub slide_index: Option<i64>,
    /// Template id.
    pub layout: Option<String>,
}

/// Parameters for `setSlideBackground`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSlideBackgroundParams {
    /// Target slide.
    pub slide_index: Option<i64>,
    /// CSS color.
    pub color: Option<String>,
    /// Image URL.
    pub image: Option<String>,
}

/// Parameters for `resolveSlotStyles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSlotStylesParams {
    /// Target slide.
    pub slide_index: Option<i64>,
    /// Restrict to one slot.
    pub slot_name: Option<String>,
    /// Inline overrides for `slot_name`, or for every slot when absent.
    pub inline: Option<StyleProperties>,
}

/// A decoded command.
#[derive(Debug, Clone)]
pub enum Command {
    /// Insert an image.
    InsertImage(InsertImageParams),
    /// Insert a chart.
    InsertChart(InsertChartParams),
    /// Insert an infographic.
    InsertInfographic(InsertInfographicParams),
    /// Insert a diagram.
    InsertDiagram(InsertDiagramParams),
    /// Insert a text box.
    InsertTextBox(InsertTextBoxParams),
    /// Replace an image source.
    UpdateImageSource(UpdateImageSourceParams),
    /// Replace a chart configuration.
    UpdateChartConfig(UpdateChartConfigParams),
    /// Replace chart markup.
    SetChartHtml(SetChartHtmlParams),
    /// Replace infographic SVG.
    UpdateInfographicContent(SvgContentParams),
    /// Replace diagram SVG.
    UpdateDiagramSvg(SvgContentParams),
    /// Replace diagram mermaid source.
    UpdateDiagramMermaid(UpdateDiagramMermaidParams),
    /// Replace text box content.
    UpdateTextBoxContent(UpdateTextBoxContentParams),
    /// Move an element, keeping its size.
    MoveElement(GeometryParams),
    /// Resize an element.
    ResizeElement(GeometryParams),
    /// Change lock, visibility or z-index.
    UpdateElementProperties(UpdateElementPropertiesParams),
    /// Delete an element.
    DeleteElement(ElementParams),
    /// Select an element.
    SelectElement(ElementParams),
    /// Clear the selection.
    DeselectElement,
    /// Switch to a slide.
    OpenSlide(SlideParams),
    /// Change a slide's template.
    SetSlideLayout(SetSlideLayoutParams),
    /// Change a slide's background.
    SetSlideBackground(SetSlideBackgroundParams),
    /// Resolve slot styles for a slide.
    ResolveSlotStyles(ResolveSlotStylesParams),
    /// Flush the open slide immediately.
    SaveSlide,
}

type Decoder = fn(Value) -> Result<Command, serde_json::Error>;

/// Action name to decoder mapping. Unlisted actions are rejected.
pub const ACTION_TABLE: &[(&str, Decoder)] = &[
    ("insertImage", |p| serde_json::from_value(p).map(Command::InsertImage)),
    ("insertChart", |p| serde_json::from_value(p).map(Command::InsertChart)),
    ("insertInfographic", |p| {
        serde_json::from_value(p).map(Command::InsertInfographic)
    }),
    ("insertDiagram", |p| serde_json::from_value(p).map(Command::InsertDiagram)),
    ("insertTextBox", |p| serde_json::from_value(p).map(Command::InsertTextBox)),
    ("updateImageSource", |p| {
        serde_json::from_value(p).map(Command::UpdateImageSource)
    }),
    ("updateChartConfig", |p| {
        serde_json::from_value(p).map(Command::UpdateChartConfig)
    }),
    ("setChartHtml", |p| serde_json::from_value(p).map(Command::SetChartHtml)),
    ("updateInfographicContent", |p| {
        serde_json::from_value(p).map(Command::UpdateInfographicContent)
    }),
    ("updateDiagramSvg", |p| {
        serde_json::from_value(p).map(Command::UpdateDiagramSvg)
    }),
    ("updateDiagramMermaid", |p| {
        serde_json::from_value(p).map(Command::UpdateDiagramMermaid)
    }),
    ("updateTextBoxContent", |p| {
        serde_json::from_value(p).map(Command::UpdateTextBoxContent)
    }),
    ("moveElement", |p| serde_json::from_value(p).map(Command::MoveElement)),
    ("resizeElement", |p| serde_json::from_value(p).map(Command::ResizeElement)),
    ("updateElementProperties", |p| {
        serde_json::from_value(p).map(Command::UpdateElementProperties)
    }),
    ("deleteElement", |p| serde_json::from_value(p).map(Command::DeleteElement)),
    ("selectElement", |p| serde_json::from_value(p).map(Command::SelectElement)),
    ("deselectElement", |_| Ok(Command::DeselectElement)),
    ("openSlide", |p| serde_json::from_value(p).map(Command::OpenSlide)),
    ("setSlideLayout", |p| serde_json::from_value(p).map(Command::SetSlideLayout)),
    ("setSlideBackground", |p| {
        serde_json::from_value(p).map(Command::SetSlideBackground)
    }),
    ("resolveSlotStyles", |p| {
        serde_json::from_value(p).map(Command::ResolveSlotStyles)
    }),
    ("saveSlide", |_| Ok(Command::SaveSlide)),
];

impl Command {
    /// Decode a raw message through [`ACTION_TABLE`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownAction`] for unlisted actions, or
    /// [`CommandError::InvalidParams`] if the parameters have the wrong shape.
    pub fn decode(raw: RawCommand) -> Result<Self, CommandError> {
        let Some((_, decode)) = ACTION_TABLE.iter().find(|(name, _)| *name == raw.action) else {
            return Err(CommandError::UnknownAction(raw.action));
        };
        let params = match raw.params {
            Value::Null => Value::Object(serde_json::Map::new()),
            params => params,
        };
        decode(params).map_err(|source| CommandError::InvalidParams {
            action: raw.action,
            source,
        })
    }

    /// Wire name of the action.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::InsertImage(_) => "insertImage",
            Self::InsertChart(_) => "insertChart",
            Self::InsertInfographic(_) => "insertInfographic",
            Self::InsertDiagram(_) => "insertDiagram",
            Self::InsertTextBox(_) => "insertTextBox",
            Self::UpdateImageSource(_) => "updateImageSource",
            Self::UpdateChartConfig(_) => "updateChartConfig",
            Self::SetChartHtml(_) => "setChartHtml",
            Self::UpdateInfographicContent(_) => "updateInfographicContent",
            Self::UpdateDiagramSvg(_) => "updateDiagramSvg",
            Self::UpdateDiagramMermaid(_) => "updateDiagramMermaid",
            Self::UpdateTextBoxContent(_) => "updateTextBoxContent",
            Self::MoveElement(_) => "moveElement",
            Self::ResizeElement(_) => "resizeElement",
            Self::UpdateElementProperties(_) => "updateElementProperties",
            Self::DeleteElement(_) => "deleteElement",
            Self::SelectElement(_) => "selectElement",
            Self::DeselectElement => "deselectElement",
            Self::OpenSlide(_) => "openSlide",
            Self::SetSlideLayout(_) => "setSlideLayout",
            Self::SetSlideBackground(_) => "setSlideBackground",
            Self::ResolveSlotStyles(_) => "resolveSlotStyles",
            Self::SaveSlide => "saveSlide",
        }
    }
}

/// Why a command was not carried out.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The action is not in [`ACTION_TABLE`].
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    /// The parameters could not be decoded.
    #[error("Invalid parameters for {action}: {source}")]
    InvalidParams {
        /// Action being decoded.
        action: String,
        /// Decode error.
        #[source]
        source: serde_json::Error,
    },
    /// The parameters failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The target element does not exist.
    #[error("Element not found: {0}")]
    NotFound(String),
    /// A registry operation failed.
    #[error(transparent)]
    Core(DeckError),
    /// A snapshot could not be written or read.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<DeckError> for CommandError {
    fn from(error: DeckError) -> Self {
        match error {
            DeckError::ElementNotFound(id) => Self::NotFound(id),
            other => Self::Core(other),
        }
    }
}

impl CommandError {
    /// Short outcome label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => "unknown_action",
            Self::InvalidParams { .. } | Self::Validation(_) => "invalid",
            Self::NotFound(_) => "not_found",
            Self::Core(_) => "rejected",
            Self::Persistence(_) => "persistence_error",
        }
    }
}
