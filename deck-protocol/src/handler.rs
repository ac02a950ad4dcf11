//! Command dispatch for one embedded slide view.

use std::collections::BTreeMap;
use std::sync::Arc;

use deck_core::registry::{self, SharedRegistry};
use deck_core::{
    ChartSource, ContentKind, DeckError, DeleteOutcome, DiagramDirection, DiagramSource,
    Element, ElementContent, ElementId, ElementPatch, ElementRegistry, Event, IdSource,
    NewElement, PixelRect, Presentation, RestorationLoader, SelectionCoordinator,
    SlideBackground, SlideSnapshot, StyleProperties, StyleResolver, DEFAULT_LAYOUT,
};
use metrics::counter;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use crate::autosave::{AutosaveConfig, AutosaveCoordinator};
use crate::command::{
    Command, CommandError, ElementParams, GeometryParams, InsertChartParams,
    InsertDiagramParams, InsertImageParams, InsertInfographicParams, InsertTextBoxParams,
    Placement, RawCommand, ResolveSlotStylesParams, SetSlideBackgroundParams,
    SetSlideLayoutParams, SlideParams, UpdateElementPropertiesParams,
};
use crate::storage::{PersistenceError, SnapshotStore};
use crate::validation::{
    require, validate_chart_config, validate_element_count, validate_element_id,
    validate_geometry, validate_markup, validate_message_size, validate_new_element_id,
    validate_position, validate_rect, validate_slide_index, validate_text_content, validate_url,
    ValidationError,
};
use crate::Response;

const COMMANDS_TOTAL: &str = "deck_commands_total";
const VALIDATION_FAILURES_TOTAL: &str = "deck_validation_failures_total";

type CommandResult = Result<Map<String, Value>, CommandError>;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Translates commands into registry operations for one presentation view.
///
/// Commands are handled one at a time; the caller awaits each
/// [`handle`](Self::handle) before passing the next message.
pub struct ProtocolHandler {
    presentation: Presentation,
    resolver: StyleResolver,
    registry: SharedRegistry,
    selection: SelectionCoordinator,
    autosave: AutosaveCoordinator,
    store: Arc<dyn SnapshotStore>,
    events: mpsc::UnboundedSender<Event>,
}

impl ProtocolHandler {
    /// Open a presentation and load its first slide.
    ///
    /// Returns the handler and the receiving end of its event channel.
    pub async fn open(
        presentation: Presentation,
        resolver: StyleResolver,
        store: Arc<dyn SnapshotStore>,
        config: AutosaveConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let layout = presentation.layout_of(0).unwrap_or(DEFAULT_LAYOUT).to_string();
        let registry = ElementRegistry::new(0, layout, IdSource::new()).into_shared();
        let autosave = AutosaveCoordinator::new(
            config,
            presentation.id.clone(),
            Arc::clone(&registry),
            Arc::clone(&store),
            events.clone(),
        );
        let mut handler = Self {
            presentation,
            resolver,
            registry,
            selection: SelectionCoordinator::new(),
            autosave,
            store,
            events,
        };
        if handler.presentation.slide_count() > 0 {
            match handler.fetch_slide(0).await {
                Ok(snapshot) => handler.restore_slide(0, snapshot),
                Err(e) => tracing::warn!(
                    presentation = %handler.presentation.id,
                    error = %e,
                    "could not load first slide, starting empty"
                ),
            }
        }
        tracing::info!(
            presentation = %handler.presentation.id,
            slides = handler.presentation.slide_count(),
            theme = %handler.presentation.theme_id,
            "presentation opened"
        );
        (handler, receiver)
    }

    /// Presentation being edited.
    #[must_use]
    pub const fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Registry of the open slide.
    #[must_use]
    pub const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Autosave coordinator.
    #[must_use]
    pub const fn autosave(&self) -> &AutosaveCoordinator {
        &self.autosave
    }

    /// Currently selected element.
    #[must_use]
    pub fn selected(&self) -> Option<&ElementId> {
        self.selection.selected()
    }

    /// Decode and handle a JSON text message.
    pub async fn handle_json(&mut self, text: &str) -> Response {
        if let Err(e) = validate_message_size(text.len()) {
            return self.respond("unknown", Err(e.into()));
        }
        match serde_json::from_str::<RawCommand>(text) {
            Ok(raw) => self.handle(raw).await,
            Err(e) => {
                counter!(COMMANDS_TOTAL, "action" => "unknown", "outcome" => "invalid")
                    .increment(1);
                Response::failure("unknown", format!("Invalid message: {e}"))
            }
        }
    }

    /// Handle one command and produce its response.
    pub async fn handle(&mut self, raw: RawCommand) -> Response {
        let action = raw.action.clone();
        tracing::debug!(action = %action, "command received");
        let result = match Command::decode(raw) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => Err(e),
        };
        self.respond(&action, result)
    }

    /// Flush pending changes before the view goes away.
    pub async fn close(&mut self) {
        let revision = registry::lock(&self.registry).revision();
        if self.autosave.is_dirty(revision) {
            if let Err(e) = self.autosave.flush_now().await {
                tracing::warn!(presentation = %self.presentation.id, error = %e, "final flush failed");
            }
        } else {
            self.autosave.cancel();
        }
    }

    fn respond(&self, action: &str, result: CommandResult) -> Response {
        match result {
            Ok(fields) => {
                counter!(COMMANDS_TOTAL, "action" => action.to_string(), "outcome" => "ok")
                    .increment(1);
                Response::success(action, fields)
            }
            Err(e) => {
                let label = match e {
                    CommandError::UnknownAction(_) => "unknown".to_string(),
                    _ => action.to_string(),
                };
                counter!(COMMANDS_TOTAL, "action" => label, "outcome" => e.kind()).increment(1);
                if let CommandError::Validation(ref v) = e {
                    counter!(VALIDATION_FAILURES_TOTAL, "field" => v.field()).increment(1);
                }
                tracing::debug!(action, error = %e, "command rejected");
                Response::failure(action, e.to_string())
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> CommandResult {
        match command {
            Command::InsertImage(params) => self.insert_image(params).await,
            Command::InsertChart(params) => self.insert_chart(params).await,
            Command::InsertInfographic(params) => self.insert_infographic(params).await,
            Command::InsertDiagram(params) => self.insert_diagram(params).await,
            Command::InsertTextBox(params) => self.insert_text_box(params).await,
            Command::UpdateImageSource(params) => {
                let id = validate_element_id(params.element_id.as_deref())?;
                let url = require(params.url, "url")?;
                validate_url(&url)?;
                self.update(
                    id,
                    ElementPatch::ImageSource {
                        url,
                        alt: params.alt,
                        object_fit: params.object_fit,
                    },
                )
            }
            Command::UpdateChartConfig(params) => {
                let id = validate_element_id(params.element_id.as_deref())?;
                let config = require(params.chart_config, "chartConfig")?;
                validate_chart_config(&config)?;
                self.update(id, ElementPatch::ChartConfig(config))
            }
            Command::SetChartHtml(params) => {
                let id = validate_element_id(params.element_id.as_deref())?;
                let html = require(params.chart_html, "chartHtml")?;
                validate_markup("chartHtml", &html)?;
                self.update(id, ElementPatch::ChartHtml(html))
            }
            Command::UpdateInfographicContent(params) => {
                let id = validate_element_id(params.element_id.as_deref())?;
                let svg = require(params.svg_content, "svgContent")?;
                validate_markup("svgContent", &svg)?;
                self.update(id, ElementPatch::InfographicSvg(svg))
            }
            Command::UpdateDiagramSvg(params) => {
                let id = validate_element_id(params.element_id.as_deref())?;
                let svg = require(params.svg_content, "svgContent")?;
                validate_markup("svgContent", &svg)?;
                self.update(id, ElementPatch::DiagramSvg(svg))
            }
            Command::UpdateDiagramMermaid(params) => {
                let id = validate_element_id(params.element_id.as_deref())?;
                let code = require(params.mermaid_code, "mermaidCode")?;
                validate_markup("mermaidCode", &code)?;
                self.update(
                    id,
                    ElementPatch::DiagramMermaid {
                        code,
                        direction: params.direction,
                        theme: params.theme,
                    },
                )
            }
            Command::UpdateTextBoxContent(params) => {
                let id = validate_element_id(params.element_id.as_deref())?;
                let content = require(params.content, "content")?;
                validate_text_content(&content)?;
                self.update(
                    id,
                    ElementPatch::TextContent {
                        content,
                        content_kind: params.content_kind,
                    },
                )
            }
            Command::MoveElement(params) => self.reposition(&params, false),
            Command::ResizeElement(params) => self.reposition(&params, true),
            Command::UpdateElementProperties(params) => self.update_properties(params),
            Command::DeleteElement(params) => self.delete(&params),
            Command::SelectElement(params) => self.select(&params),
            Command::DeselectElement => {
                if let Some(event) = self.selection.deselect() {
                    self.emit(event);
                }
                Ok(Map::new())
            }
            Command::OpenSlide(params) => self.open_slide(params).await,
            Command::SetSlideLayout(params) => self.set_slide_layout(params).await,
            Command::SetSlideBackground(params) => self.set_slide_background(params).await,
            Command::ResolveSlotStyles(params) => self.resolve_slot_styles(params),
            Command::SaveSlide => {
                let outcome = self.autosave.flush_now().await?;
                Ok(object(json!({
                    "slideIndex": outcome.slide_index,
                    "elementCount": outcome.element_count,
                    "revision": outcome.revision,
                })))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inserts
    // -----------------------------------------------------------------------

    async fn insert_image(&mut self, params: InsertImageParams) -> CommandResult {
        let url = require(params.url, "url")?;
        validate_url(&url)?;
        let content = ElementContent::Image {
            url,
            alt: params.alt.unwrap_or_default(),
            object_fit: params.object_fit.unwrap_or_default(),
        };
        self.insert(params.placement, content).await
    }

    async fn insert_chart(&mut self, params: InsertChartParams) -> CommandResult {
        if let Some(config) = &params.chart_config {
            validate_chart_config(config)?;
        }
        if let Some(html) = &params.chart_html {
            validate_markup("chartHtml", html)?;
        }
        let source = match (&params.chart_config, &params.chart_html) {
            (Some(_), _) => ChartSource::Config,
            (None, Some(_)) => ChartSource::Html,
            (None, None) => {
                return Err(ValidationError::MissingSource("chartConfig or chartHtml").into())
            }
        };
        let content = ElementContent::Chart {
            chart_config: params.chart_config,
            chart_html: params.chart_html,
            source,
        };
        self.insert(params.placement, content).await
    }

    async fn insert_infographic(&mut self, params: InsertInfographicParams) -> CommandResult {
        let svg = require(params.svg_content, "svgContent")?;
        validate_markup("svgContent", &svg)?;
        self.insert(params.placement, ElementContent::infographic(svg)).await
    }

    async fn insert_diagram(&mut self, params: InsertDiagramParams) -> CommandResult {
        if let Some(svg) = &params.svg_content {
            validate_markup("svgContent", svg)?;
        }
        if let Some(code) = &params.mermaid_code {
            validate_markup("mermaidCode", code)?;
        }
        let source = match (&params.svg_content, &params.mermaid_code) {
            (Some(_), _) => DiagramSource::Svg,
            (None, Some(_)) => DiagramSource::Mermaid,
            (None, None) => {
                return Err(ValidationError::MissingSource("svgContent or mermaidCode").into())
            }
        };
        let content = ElementContent::Diagram {
            svg_content: params.svg_content,
            mermaid_code: params.mermaid_code,
            direction: params.direction.unwrap_or(DiagramDirection::TB),
            theme: params.theme.unwrap_or_else(|| "default".to_string()),
            source,
        };
        self.insert(params.placement, content).await
    }

    async fn insert_text_box(&mut self, params: InsertTextBoxParams) -> CommandResult {
        let content = params.content.unwrap_or_default();
        validate_text_content(&content)?;
        let content = ElementContent::TextBox {
            content,
            content_kind: params.content_kind.unwrap_or(ContentKind::Plain),
            style: params.style.unwrap_or_default(),
        };
        self.insert(params.placement, content).await
    }

    async fn insert(&mut self, placement: Placement, content: ElementContent) -> CommandResult {
        let slide_index =
            validate_slide_index(placement.slide_index, self.presentation.slide_count())?;
        let position = validate_position(
            placement.grid_row.as_deref(),
            placement.grid_column.as_deref(),
        )?;
        let id = validate_new_element_id(placement.id.as_deref())?;

        // Limits are checked against the target slide before any switch.
        let pending = self.pending_slide(slide_index).await?;
        {
            let registry = registry::lock(&self.registry);
            if let Some(id) = &id {
                let on_target = pending.as_ref().is_some_and(|s| s.contains(id));
                if on_target || registry.id_source().contains(id) {
                    return Err(DeckError::DuplicateElementId(id.to_string()).into());
                }
            }
            let count = pending
                .as_ref()
                .map_or_else(|| registry.len(), SlideSnapshot::element_count);
            validate_element_count(count + 1)?;
        }
        if let Some(snapshot) = pending {
            self.switch_slide(slide_index, snapshot).await?;
        }

        let element = registry::lock(&self.registry).insert(
            content,
            NewElement {
                id,
                position,
                z_index: placement.z_index,
                locked: placement.locked,
                visible: placement.visible,
            },
        )?;
        self.autosave.schedule();
        Ok(object(json!({
            "elementId": element.id,
            "position": element.position,
        })))
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    fn update(&mut self, id: ElementId, patch: ElementPatch) -> CommandResult {
        let element = registry::lock(&self.registry).update(&id, patch)?;
        self.after_change(&element);
        Ok(object(json!({ "elementId": id })))
    }

    fn update_properties(&mut self, params: UpdateElementPropertiesParams) -> CommandResult {
        let id = validate_element_id(params.element_id.as_deref())?;
        let element = registry::lock(&self.registry).set_properties(
            &id,
            params.locked,
            params.visible,
            params.z_index,
        )?;
        self.after_change(&element);
        Ok(object(json!({
            "elementId": id,
            "locked": element.locked,
            "visible": element.visible,
            "zIndex": element.z_index,
        })))
    }

    fn reposition(&mut self, params: &GeometryParams, resize: bool) -> CommandResult {
        let id = validate_element_id(params.element_id.as_deref())?;
        let element = {
            let mut registry = registry::lock(&self.registry);
            let current = registry
                .get(&id)
                .ok_or_else(|| CommandError::NotFound(id.to_string()))?
                .position;
            if resize {
                let target = validate_geometry(
                    params.grid_row.as_deref(),
                    params.grid_column.as_deref(),
                    params.rect.as_ref(),
                )?;
                registry.resize_element(&id, target)?
            } else {
                let target = match validate_position(
                    params.grid_row.as_deref(),
                    params.grid_column.as_deref(),
                )? {
                    Some(position) => position,
                    None => {
                        // Only the origin of a dragged rect counts; the size is kept.
                        let rect = require(params.rect.as_ref(), "gridRow")?;
                        let size = current.to_rect();
                        validate_rect(&PixelRect {
                            width: size.width,
                            height: size.height,
                            ..*rect
                        })?
                    }
                };
                if !current.same_extent(&target) {
                    return Err(ValidationError::MoveChangesExtent.into());
                }
                registry.move_element(&id, target)?
            }
        };
        self.after_change(&element);
        Ok(object(json!({
            "elementId": id,
            "position": element.position,
        })))
    }

    fn after_change(&mut self, element: &Element) {
        if let Some(event) = self.selection.on_updated(element) {
            self.emit(event);
        }
        self.autosave.schedule();
    }

    fn delete(&mut self, params: &ElementParams) -> CommandResult {
        let id = validate_element_id(params.element_id.as_deref())?;
        let outcome = registry::lock(&self.registry).delete(&id);
        let removed = outcome.is_removed();
        if let DeleteOutcome::Removed(_) = outcome {
            if let Some(event) = self.selection.on_deleted(&id) {
                self.emit(event);
            }
            self.autosave.schedule();
        }
        Ok(object(json!({ "elementId": id, "removed": removed })))
    }

    fn select(&mut self, params: &ElementParams) -> CommandResult {
        let id = validate_element_id(params.element_id.as_deref())?;
        let event = {
            let registry = registry::lock(&self.registry);
            self.selection.select(&registry, &id)?
        };
        self.emit(event);
        Ok(object(json!({ "elementId": id })))
    }

    // -----------------------------------------------------------------------
    // Slides
    // -----------------------------------------------------------------------

    async fn open_slide(&mut self, params: SlideParams) -> CommandResult {
        let slide_index =
            validate_slide_index(params.slide_index, self.presentation.slide_count())?;
        self.ensure_slide(slide_index).await?;
        let element_count = registry::lock(&self.registry).len();
        Ok(object(json!({
            "slideIndex": slide_index,
            "elementCount": element_count,
        })))
    }

    async fn set_slide_layout(&mut self, params: SetSlideLayoutParams) -> CommandResult {
        let slide_index =
            validate_slide_index(params.slide_index, self.presentation.slide_count())?;
        let layout = require(params.layout, "layout")?;
        if !self.resolver.templates().contains(&layout) {
            return Err(ValidationError::UnknownLayout(layout).into());
        }
        self.ensure_slide(slide_index).await?;
        registry::lock(&self.registry).set_layout(layout.clone());
        self.presentation.set_layout(slide_index, layout.clone());
        self.autosave.schedule();
        Ok(object(json!({ "slideIndex": slide_index, "layout": layout })))
    }

    async fn set_slide_background(&mut self, params: SetSlideBackgroundParams) -> CommandResult {
        let slide_index =
            validate_slide_index(params.slide_index, self.presentation.slide_count())?;
        if let Some(color) = &params.color {
            validate_markup("color", color)?;
        }
        if let Some(image) = &params.image {
            validate_url(image)?;
        }
        let background = SlideBackground {
            color: params.color,
            image: params.image,
        };
        self.ensure_slide(slide_index).await?;
        registry::lock(&self.registry)
            .set_background((!background.is_empty()).then_some(background));
        self.autosave.schedule();
        Ok(object(json!({ "slideIndex": slide_index })))
    }

    fn resolve_slot_styles(&self, params: ResolveSlotStylesParams) -> CommandResult {
        let slide_index =
            validate_slide_index(params.slide_index, self.presentation.slide_count())?;
        let layout = {
            let registry = registry::lock(&self.registry);
            if registry.slide_index() == slide_index {
                registry.layout().to_string()
            } else {
                self.presentation
                    .layout_of(slide_index)
                    .unwrap_or(DEFAULT_LAYOUT)
                    .to_string()
            }
        };

        let slot_names: Vec<String> = self
            .resolver
            .templates()
            .get(&layout)
            .map(|template| template.slots.iter().map(|slot| slot.name.clone()).collect())
            .unwrap_or_default();
        if let Some(slot) = &params.slot_name {
            if !slot_names.contains(slot) {
                return Err(ValidationError::UnknownSlot {
                    slot: slot.clone(),
                    template: layout,
                }
                .into());
            }
        }

        let inline: BTreeMap<String, StyleProperties> = match (&params.slot_name, params.inline) {
            (Some(slot), Some(style)) => BTreeMap::from([(slot.clone(), style)]),
            (None, Some(style)) => slot_names
                .iter()
                .map(|name| (name.clone(), style.clone()))
                .collect(),
            (_, None) => BTreeMap::new(),
        };

        let mut slots = self.resolver.resolve_template(
            &layout,
            &self.presentation.theme_id,
            &self.presentation.overrides,
            &inline,
        );
        if let Some(slot) = &params.slot_name {
            slots.retain(|resolved| &resolved.name == slot);
        }
        let slots = serde_json::to_value(slots).map_err(DeckError::from)?;
        Ok(object(json!({
            "slideIndex": slide_index,
            "layout": layout,
            "slots": slots,
        })))
    }

    /// Make `target` the open slide, flushing the current one first.
    async fn ensure_slide(&mut self, target: usize) -> Result<(), CommandError> {
        if let Some(snapshot) = self.pending_slide(target).await? {
            self.switch_slide(target, snapshot).await?;
        }
        Ok(())
    }

    /// Snapshot of `target` if it is not the open slide.
    async fn pending_slide(&self, target: usize) -> Result<Option<SlideSnapshot>, CommandError> {
        if registry::lock(&self.registry).slide_index() == target {
            return Ok(None);
        }
        Ok(Some(self.fetch_slide(target).await?))
    }

    async fn switch_slide(
        &mut self,
        target: usize,
        snapshot: SlideSnapshot,
    ) -> Result<(), CommandError> {
        let (current, revision) = {
            let registry = registry::lock(&self.registry);
            (registry.slide_index(), registry.revision())
        };
        if self.autosave.is_dirty(revision) {
            // A failed flush keeps the current slide open.
            self.autosave.flush_now().await?;
        } else {
            self.autosave.cancel();
        }
        if let Some(event) = self.selection.deselect() {
            self.emit(event);
        }
        self.restore_slide(target, snapshot);
        tracing::debug!(from = current, to = target, "slide switched");
        Ok(())
    }

    async fn fetch_slide(&self, slide_index: usize) -> Result<SlideSnapshot, PersistenceError> {
        let snapshot = self.store.load(&self.presentation.id, slide_index).await?;
        Ok(snapshot.unwrap_or_else(|| {
            SlideSnapshot::empty(
                self.presentation
                    .layout_of(slide_index)
                    .unwrap_or(DEFAULT_LAYOUT),
            )
        }))
    }

    fn restore_slide(&mut self, slide_index: usize, snapshot: SlideSnapshot) {
        let (report, layout, revision) = {
            let mut registry = registry::lock(&self.registry);
            let report = RestorationLoader::load(&mut registry, slide_index, snapshot);
            (report, registry.layout().to_string(), registry.revision())
        };
        self.presentation.set_layout(slide_index, layout);
        self.autosave.mark_clean(revision);
        if !report.is_clean() {
            tracing::warn!(
                slide = slide_index,
                skipped = report.skipped.len(),
                "slide restored with skipped entries"
            );
        }
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

impl std::fmt::Debug for ProtocolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolHandler")
            .field("presentation", &self.presentation.id)
            .field("selection", &self.selection)
            .field("autosave", &self.autosave)
            .finish_non_exhaustive()
    }
}
