//! Rehydrating a registry from a persisted snapshot.

use std::collections::HashSet;

use crate::element::{Element, ElementId, ElementType};
use serde_json::Value;

use crate::registry::ElementRegistry;
use crate::snapshot::{SlideSnapshot, SnapshotEntry};

/// Why a snapshot entry was not restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry was filed under another type's group.
    WrongGroup {
        /// Group the entry was found in.
        group: ElementType,
        /// The entry's actual type.
        found: ElementType,
    },
    /// An earlier entry already used the id.
    DuplicateId,
    /// The entry does not parse as an element.
    Malformed(String),
}

/// A snapshot entry left out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Id of the entry, when it has one.
    pub id: Option<ElementId>,
    /// Reason it was skipped.
    pub reason: SkipReason,
}

/// Outcome of a restoration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Number of elements now in the registry.
    pub restored: usize,
    /// Entries that were skipped.
    pub skipped: Vec<SkippedEntry>,
}

impl RestoreReport {
    /// Whether every entry was restored.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn malformed_reason(value: &Value) -> String {
    match serde_json::from_value::<Element>(value.clone()) {
        Err(e) => e.to_string(),
        Ok(_) => "unrecognized entry".to_string(),
    }
}

/// Loads snapshots into a registry in type order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestorationLoader;

impl RestorationLoader {
    /// Replace the registry's slide with the snapshot's contents.
    ///
    /// Elements are restored text boxes first, then images, charts,
    /// infographics and diagrams, keeping order within each group.
    pub fn load(
        registry: &mut ElementRegistry,
        slide_index: usize,
        snapshot: SlideSnapshot,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();
        let mut seen = HashSet::new();
        let mut elements: Vec<Element> = Vec::with_capacity(snapshot.element_count());

        for (group, entries) in snapshot.groups() {
            for entry in entries {
                let (id, reason) = match entry {
                    SnapshotEntry::Element(element) => {
                        let found = element.element_type();
                        let reason = if found != group {
                            SkipReason::WrongGroup { group, found }
                        } else if !seen.insert(element.id.clone()) {
                            SkipReason::DuplicateId
                        } else {
                            elements.push(element.clone());
                            continue;
                        };
                        (Some(element.id.clone()), reason)
                    }
                    SnapshotEntry::Malformed(value) => (
                        value.get("id").and_then(Value::as_str).map(ElementId::from_raw),
                        SkipReason::Malformed(malformed_reason(value)),
                    ),
                };
                tracing::warn!(
                    slide = slide_index,
                    id = ?id,
                    ?reason,
                    "skipping snapshot entry"
                );
                if let Some(id) = &id {
                    // Skipped ids stay reserved so new elements never take them.
                    registry.id_source().observe(id);
                }
                report.skipped.push(SkippedEntry { id, reason });
            }
        }

        registry.begin_slide(slide_index, snapshot.layout);
        registry.set_content(snapshot.content);
        registry.set_background(snapshot.background);
        report.restored = elements.len();
        if let Err(e) = registry.restore(elements) {
            // Unreachable after de-duplication above; keep the slide empty.
            tracing::warn!(slide = slide_index, error = %e, "restore rejected");
            report.restored = 0;
        }

        tracing::debug!(
            slide = slide_index,
            restored = report.restored,
            skipped = report.skipped.len(),
            "slide restored"
        );
        report
    }
}
