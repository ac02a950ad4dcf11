//! Single-element selection for a slide view.

use crate::element::{Element, ElementId};
use crate::error::{DeckError, DeckResult};
use crate::event::Event;
use crate::registry::ElementRegistry;

/// Tracks at most one selected element.
///
/// Every successful transition returns the event to emit. Failed selections
/// return an error and leave the selection unchanged.
#[derive(Debug, Clone, Default)]
pub struct SelectionCoordinator {
    selected: Option<ElementId>,
}

impl SelectionCoordinator {
    /// Create with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected id.
    #[must_use]
    pub const fn selected(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    /// Whether `id` is the selected element.
    #[must_use]
    pub fn is_selected(&self, id: &ElementId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    /// Select an element.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::ElementNotFound`] if the element is missing, or
    /// [`DeckError::NotSelectable`] if it is locked or hidden.
    pub fn select(&mut self, registry: &ElementRegistry, id: &ElementId) -> DeckResult<Event> {
        let element = registry
            .get(id)
            .ok_or_else(|| DeckError::ElementNotFound(id.to_string()))?;
        if element.locked {
            return Err(DeckError::NotSelectable {
                id: id.to_string(),
                reason: "locked",
            });
        }
        if !element.visible {
            return Err(DeckError::NotSelectable {
                id: id.to_string(),
                reason: "hidden",
            });
        }
        self.selected = Some(id.clone());
        Ok(Event::selected(element))
    }

    /// Clear the selection. Returns an event if something was selected.
    pub fn deselect(&mut self) -> Option<Event> {
        self.selected
            .take()
            .map(|element_id| Event::ElementDeselected { element_id })
    }

    /// React to an element being removed.
    pub fn on_deleted(&mut self, id: &ElementId) -> Option<Event> {
        if self.is_selected(id) {
            self.deselect()
        } else {
            None
        }
    }

    /// React to an element changing: refresh the selection, or drop it if
    /// the element is no longer interactive.
    pub fn on_updated(&mut self, element: &Element) -> Option<Event> {
        if !self.is_selected(&element.id) {
            return None;
        }
        if element.is_interactive() {
            Some(Event::selected(element))
        } else {
            self.deselect()
        }
    }
}
