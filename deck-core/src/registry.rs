//! Element registry for the currently open slide.
//!
//! The registry is the only writer of element state. It is shared with the
//! autosave flush task as a [`SharedRegistry`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::element::{
    Element, ElementContent, ElementId, ElementPatch, ElementType, DEFAULT_Z_INDEX,
};
use crate::error::{DeckError, DeckResult};
use crate::grid::Position;
use crate::snapshot::SlideBackground;

/// Registry shared between the protocol handler and the flush task.
pub type SharedRegistry = Arc<Mutex<ElementRegistry>>;

/// Lock a shared registry, recovering from poisoning.
pub fn lock(registry: &SharedRegistry) -> MutexGuard<'_, ElementRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Suffixes above this never advance the counter.
const MAX_TRACKED_SEQUENCE: u64 = 0xFFFF_FFFF;

#[derive(Debug)]
struct IdLedger {
    next: u64,
    used: HashSet<ElementId>,
}

impl IdLedger {
    fn advance_past(&mut self, id: &ElementId) {
        if let Some(n) = id.sequence().filter(|&n| n < MAX_TRACKED_SEQUENCE) {
            self.next = self.next.max(n + 1);
        }
    }
}

/// Element id allocator shared by every slide of a presentation.
///
/// Every id issued, claimed or restored stays reserved for the session, so
/// ids are never handed out twice even after the element is deleted.
/// Cloning yields a handle to the same ledger.
#[derive(Debug, Clone)]
pub struct IdSource {
    ledger: Arc<Mutex<IdLedger>>,
}

impl IdSource {
    /// Create an allocator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(Mutex::new(IdLedger {
                next: 1,
                used: HashSet::new(),
            })),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, IdLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the next unused id for an element type.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::IdsExhausted`] if the counter would overflow.
    pub fn next_id(&self, element_type: ElementType) -> DeckResult<ElementId> {
        let mut ledger = self.ledger();
        loop {
            let n = ledger.next;
            ledger.next = n
                .checked_add(1)
                .ok_or(DeckError::IdsExhausted(element_type.as_str()))?;
            let id = ElementId::sequential(element_type, n);
            if ledger.used.insert(id.clone()) {
                return Ok(id);
            }
        }
    }

    /// Reserve a caller-supplied id.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::DuplicateElementId`] if the id was issued or
    /// reserved earlier in the session, including ids of deleted elements.
    pub fn claim(&self, id: &ElementId) -> DeckResult<()> {
        let mut ledger = self.ledger();
        if !ledger.used.insert(id.clone()) {
            return Err(DeckError::DuplicateElementId(id.to_string()));
        }
        ledger.advance_past(id);
        Ok(())
    }

    /// Record an id loaded from a snapshot.
    pub fn observe(&self, id: &ElementId) {
        let mut ledger = self.ledger();
        ledger.used.insert(id.clone());
        ledger.advance_past(id);
    }

    /// Whether the id was issued or reserved in this session.
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.ledger().used.contains(id)
    }

    /// Value the next allocation will try first.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.ledger().next
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Optional fields for [`ElementRegistry::insert`].
#[derive(Debug, Clone, Default)]
pub struct NewElement {
    /// Caller-chosen id; allocated when `None`.
    pub id: Option<ElementId>,
    /// Position; the type's default when `None`.
    pub position: Option<Position>,
    /// Z-index; one above the current maximum when `None`.
    pub z_index: Option<i32>,
    /// Initial lock state.
    pub locked: Option<bool>,
    /// Initial visibility.
    pub visible: Option<bool>,
}

/// Result of [`ElementRegistry::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The element existed and was removed.
    Removed(Element),
    /// No element had that id.
    NotFound,
}

impl DeleteOutcome {
    /// Whether an element was removed.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }
}

/// Authoritative in-memory elements and metadata of one slide.
#[derive(Debug)]
pub struct ElementRegistry {
    slide_index: usize,
    layout: String,
    content: Value,
    background: Option<SlideBackground>,
    /// Elements in insertion order.
    elements: Vec<Element>,
    ids: IdSource,
    revision: u64,
}

impl ElementRegistry {
    /// Create an empty registry for a slide.
    #[must_use]
    pub fn new(slide_index: usize, layout: impl Into<String>, ids: IdSource) -> Self {
        Self {
            slide_index,
            layout: layout.into(),
            content: Value::Object(serde_json::Map::new()),
            background: None,
            elements: Vec::new(),
            ids,
            revision: 0,
        }
    }

    /// Wrap in a [`SharedRegistry`].
    #[must_use]
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    /// Index of the open slide.
    #[must_use]
    pub const fn slide_index(&self) -> usize {
        self.slide_index
    }

    /// Layout template id of the open slide.
    #[must_use]
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Slot content keyed by slot name.
    #[must_use]
    pub const fn content(&self) -> &Value {
        &self.content
    }

    /// Slide background overrides.
    #[must_use]
    pub const fn background(&self) -> Option<&SlideBackground> {
        self.background.as_ref()
    }

    /// Mutation counter. Increases on every successful change.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Shared id counter.
    #[must_use]
    pub const fn id_source(&self) -> &IdSource {
        &self.ids
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the slide has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Drop all state and point the registry at another slide.
    ///
    /// The id counter is kept, so ids stay unique across slides.
    pub fn begin_slide(&mut self, slide_index: usize, layout: impl Into<String>) {
        self.slide_index = slide_index;
        self.layout = layout.into();
        self.content = Value::Object(serde_json::Map::new());
        self.background = None;
        self.elements.clear();
        self.bump();
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn position_of(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|element| &element.id == id)
    }

    fn element_mut(&mut self, id: &ElementId) -> DeckResult<&mut Element> {
        self.elements
            .iter_mut()
            .find(|element| &element.id == id)
            .ok_or_else(|| DeckError::ElementNotFound(id.to_string()))
    }

    fn next_z_index(&self) -> i32 {
        self.elements
            .iter()
            .map(|element| element.z_index)
            .max()
            .map_or(DEFAULT_Z_INDEX, |max| max.saturating_add(1))
    }

    /// Create an element.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::DuplicateElementId`] if a caller-supplied id was
    /// already used in this session, or [`DeckError::IdsExhausted`].
    pub fn insert(&mut self, content: ElementContent, options: NewElement) -> DeckResult<Element> {
        let element_type = content.element_type();
        let id = match options.id {
            Some(id) => {
                self.ids.claim(&id)?;
                id
            }
            None => self.ids.next_id(element_type)?,
        };

        let mut element = Element::new(
            id,
            content,
            options
                .position
                .unwrap_or_else(|| element_type.default_position()),
        )
        .with_z_index(options.z_index.unwrap_or_else(|| self.next_z_index()));
        if let Some(locked) = options.locked {
            element.locked = locked;
        }
        if let Some(visible) = options.visible {
            element.visible = visible;
        }

        tracing::debug!(
            slide = self.slide_index,
            id = %element.id,
            kind = %element_type,
            z = element.z_index,
            "element inserted"
        );
        self.elements.push(element.clone());
        self.bump();
        Ok(element)
    }

    /// Merge a payload or property patch into an element.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ElementNotFound`] or [`DeckError::TypeMismatch`].
    pub fn update(&mut self, id: &ElementId, patch: ElementPatch) -> DeckResult<Element> {
        let element = self.element_mut(id)?;
        element.apply(patch)?;
        let updated = element.clone();
        self.bump();
        Ok(updated)
    }

    /// Move an element to a new position.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ElementNotFound`] if the id is absent.
    pub fn move_element(&mut self, id: &ElementId, position: Position) -> DeckResult<Element> {
        self.reposition(id, position)
    }

    /// Resize an element by giving it a new position.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ElementNotFound`] if the id is absent.
    pub fn resize_element(&mut self, id: &ElementId, position: Position) -> DeckResult<Element> {
        self.reposition(id, position)
    }

    fn reposition(&mut self, id: &ElementId, position: Position) -> DeckResult<Element> {
        let element = self.element_mut(id)?;
        element.position = position;
        let updated = element.clone();
        self.bump();
        Ok(updated)
    }

    /// Change lock state, visibility or z-index.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ElementNotFound`] if the id is absent.
    pub fn set_properties(
        &mut self,
        id: &ElementId,
        locked: Option<bool>,
        visible: Option<bool>,
        z_index: Option<i32>,
    ) -> DeckResult<Element> {
        self.update(
            id,
            ElementPatch::Properties {
                locked,
                visible,
                z_index,
            },
        )
    }

    /// Remove an element. A missing id is not an error.
    pub fn delete(&mut self, id: &ElementId) -> DeleteOutcome {
        match self.position_of(id) {
            Some(index) => {
                let removed = self.elements.remove(index);
                self.bump();
                tracing::debug!(slide = self.slide_index, id = %id, "element deleted");
                DeleteOutcome::Removed(removed)
            }
            None => DeleteOutcome::NotFound,
        }
    }

    /// Get an element by id.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|element| &element.id == id)
    }

    /// All elements in insertion order.
    #[must_use]
    pub fn list(&self) -> &[Element] {
        &self.elements
    }

    /// Elements in paint order: ascending z-index, insertion order on ties.
    #[must_use]
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut ordered: Vec<_> = self.elements.iter().collect();
        // Stable sort keeps insertion order for equal z-indexes.
        ordered.sort_by_key(|element| element.z_index);
        ordered
    }

    /// Replace every element wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::DuplicateElementId`] if two elements share an id.
    /// The registry is unchanged in that case.
    pub fn restore(&mut self, elements: Vec<Element>) -> DeckResult<()> {
        for (i, element) in elements.iter().enumerate() {
            if elements[..i].iter().any(|other| other.id == element.id) {
                return Err(DeckError::DuplicateElementId(element.id.to_string()));
            }
        }
        for element in &elements {
            self.ids.observe(&element.id);
        }
        self.elements = elements;
        self.bump();
        Ok(())
    }

    /// Change the layout template.
    pub fn set_layout(&mut self, layout: impl Into<String>) {
        self.layout = layout.into();
        self.bump();
    }

    /// Replace the slide background.
    pub fn set_background(&mut self, background: Option<SlideBackground>) {
        self.background = background;
        self.bump();
    }

    /// Replace the slot content.
    pub fn set_content(&mut self, content: Value) {
        self.content = content;
        self.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ContentKind;

    fn registry() -> ElementRegistry {
        ElementRegistry::new(0, "C1-text", IdSource::new())
    }

    fn image(url: &str) -> ElementContent {
        ElementContent::image(url)
    }

    #[test]
    fn test_insert_assigns_ids_and_z_order() {
        let mut registry = registry();
        let first = registry
            .insert(image("a.png"), NewElement::default())
            .expect("insert");
        let second = registry
            .insert(
                ElementContent::text("hi", ContentKind::Plain),
                NewElement::default(),
            )
            .expect("insert");

        assert_eq!(first.id.as_str(), "image-1");
        assert_eq!(second.id.as_str(), "textbox-2");
        assert_eq!(first.z_index, DEFAULT_Z_INDEX);
        assert_eq!(second.z_index, DEFAULT_Z_INDEX + 1);
        assert_eq!(first.position, ElementType::Image.default_position());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = registry();
        let ids: Vec<_> = (0..3)
            .map(|i| {
                registry
                    .insert(image(&format!("{i}.png")), NewElement::default())
                    .expect("insert")
                    .id
            })
            .collect();
        assert!(registry.delete(&ids[1]).is_removed());
        let fourth = registry
            .insert(image("3.png"), NewElement::default())
            .expect("insert")
            .id;

        let mut all = ids.clone();
        all.push(fourth);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_ids_unique_across_slides() {
        let ids = IdSource::new();
        let mut first = ElementRegistry::new(0, "C1-text", ids.clone());
        let mut second = ElementRegistry::new(1, "C1-text", ids);
        let a = first
            .insert(image("a.png"), NewElement::default())
            .expect("insert");
        let b = second
            .insert(image("b.png"), NewElement::default())
            .expect("insert");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_caller_supplied_id() {
        let mut registry = registry();
        let options = NewElement {
            id: Some(ElementId::from_raw("image-40")),
            ..NewElement::default()
        };
        registry
            .insert(image("a.png"), options.clone())
            .expect("insert");
        let err = registry
            .insert(image("b.png"), options)
            .expect_err("duplicate");
        assert!(matches!(err, DeckError::DuplicateElementId(_)));

        // The counter skips past the supplied suffix.
        let next = registry
            .insert(image("c.png"), NewElement::default())
            .expect("insert");
        assert_eq!(next.id.as_str(), "image-41");
    }

    #[test]
    fn test_huge_supplied_suffix_does_not_wrap_counter() {
        let mut registry = registry();
        let options = NewElement {
            id: Some(ElementId::from_raw("image-18446744073709551615")),
            ..NewElement::default()
        };
        registry.insert(image("a.png"), options).expect("insert");
        let b = registry
            .insert(image("b.png"), NewElement::default())
            .expect("insert");
        let c = registry
            .insert(image("c.png"), NewElement::default())
            .expect("insert");

        assert_eq!(b.id.as_str(), "image-1");
        assert_eq!(c.id.as_str(), "image-2");
        let mut ids: Vec<_> = registry.list().iter().map(|e| e.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_counter_overflow_is_an_error() {
        let ids = IdSource::new();
        ids.ledger().next = u64::MAX;
        let err = ids.next_id(ElementType::Chart).expect_err("exhausted");
        assert!(matches!(err, DeckError::IdsExhausted("chart")));
    }

    #[test]
    fn test_supplied_id_of_deleted_element_is_rejected() {
        let mut registry = registry();
        let element = registry
            .insert(image("a.png"), NewElement::default())
            .expect("insert");
        assert!(registry.delete(&element.id).is_removed());

        let err = registry
            .insert(
                ElementContent::chart_config(serde_json::json!({"type": "bar"})),
                NewElement {
                    id: Some(element.id.clone()),
                    ..NewElement::default()
                },
            )
            .expect_err("reused id");
        assert!(matches!(err, DeckError::DuplicateElementId(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_supplied_id_unique_across_slides() {
        let ids = IdSource::new();
        let mut first = ElementRegistry::new(0, "C1-text", ids.clone());
        let mut second = ElementRegistry::new(1, "C1-text", ids.clone());
        let logo = || NewElement {
            id: Some(ElementId::from_raw("logo")),
            ..NewElement::default()
        };
        first.insert(image("logo.png"), logo()).expect("insert");
        assert!(ids.contains(&ElementId::from_raw("logo")));
        let err = second
            .insert(image("logo.png"), logo())
            .expect_err("duplicate");
        assert!(matches!(err, DeckError::DuplicateElementId(_)));
    }

    #[test]
    fn test_supplied_sequential_id_advances_counter() {
        let mut registry = registry();
        registry
            .insert(
                image("a.png"),
                NewElement {
                    id: Some(ElementId::from_raw("chart-1")),
                    ..NewElement::default()
                },
            )
            .expect("insert");
        let next = registry
            .insert(
                ElementContent::chart_config(serde_json::json!({})),
                NewElement::default(),
            )
            .expect("insert");
        assert_eq!(next.id.as_str(), "chart-2");
    }

    #[test]
    fn test_delete_twice() {
        let mut registry = registry();
        let element = registry
            .insert(image("a.png"), NewElement::default())
            .expect("insert");
        assert!(registry.delete(&element.id).is_removed());
        let revision = registry.revision();
        assert_eq!(registry.delete(&element.id), DeleteOutcome::NotFound);
        assert_eq!(registry.revision(), revision);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_missing_and_mismatched() {
        let mut registry = registry();
        let err = registry
            .update(
                &ElementId::from_raw("chart-9"),
                ElementPatch::ChartHtml(String::new()),
            )
            .expect_err("missing");
        assert!(matches!(err, DeckError::ElementNotFound(_)));

        let element = registry
            .insert(image("a.png"), NewElement::default())
            .expect("insert");
        let revision = registry.revision();
        let err = registry
            .update(&element.id, ElementPatch::ChartHtml(String::new()))
            .expect_err("mismatch");
        assert!(matches!(err, DeckError::TypeMismatch { .. }));
        assert_eq!(registry.revision(), revision);
    }

    #[test]
    fn test_move_and_resize() {
        let mut registry = registry();
        let element = registry
            .insert(image("a.png"), NewElement::default())
            .expect("insert");
        let target = Position::parse("2/4", "2/4").expect("pos");
        let moved = registry.move_element(&element.id, target).expect("move");
        assert_eq!(moved.position, target);

        let bigger = Position::parse("2/10", "2/10").expect("pos");
        registry
            .resize_element(&element.id, bigger)
            .expect("resize");
        assert_eq!(registry.get(&element.id).expect("get").position, bigger);

        assert!(registry
            .move_element(&ElementId::from_raw("image-99"), target)
            .is_err());
    }

    #[test]
    fn test_paint_order_breaks_ties_by_insertion() {
        let mut registry = registry();
        let z = |z_index| NewElement {
            z_index: Some(z_index),
            ..NewElement::default()
        };
        let a = registry.insert(image("a"), z(5)).expect("a").id;
        let b = registry.insert(image("b"), z(1)).expect("b").id;
        let c = registry.insert(image("c"), z(5)).expect("c").id;

        let order: Vec<_> = registry.paint_order().iter().map(|e| e.id.clone()).collect();
        assert_eq!(order, vec![b, a, c]);
    }

    #[test]
    fn test_restore_rejects_duplicates() {
        let mut registry = registry();
        let element = Element::new(
            ElementId::from_raw("image-7"),
            image("a.png"),
            Position::full_canvas(),
        );
        let err = registry
            .restore(vec![element.clone(), element.clone()])
            .expect_err("duplicate");
        assert!(matches!(err, DeckError::DuplicateElementId(_)));
        assert!(registry.is_empty());

        registry.restore(vec![element]).expect("restore");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.id_source().peek(), 8);
    }

    #[test]
    fn test_begin_slide_keeps_counter() {
        let mut registry = registry();
        registry
            .insert(image("a.png"), NewElement::default())
            .expect("insert");
        registry.set_layout("C3-chart");
        registry.begin_slide(3, "V1-image-text");
        assert_eq!(registry.slide_index(), 3);
        assert_eq!(registry.layout(), "V1-image-text");
        assert!(registry.is_empty());
        let next = registry
            .insert(image("b.png"), NewElement::default())
            .expect("insert");
        assert_eq!(next.id.as_str(), "image-2");
    }

    #[test]
    fn test_shared_lock_survives_poison() {
        let shared = registry().into_shared();
        let clone = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().expect("lock");
            panic!("poison the lock");
        })
        .join();
        assert!(lock(&shared).is_empty());
    }
}
