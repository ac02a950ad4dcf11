//! # Deck Core
//!
//! Pure model for the deck slide editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  deck-core                   │
//! ├──────────────────────────────────────────────┤
//! │  Grid            │  Style Cascade            │
//! │  - Spans         │  - Profile defaults       │
//! │  - Pixel snap    │  - Theme / Template       │
//! │                  │  - Presentation / Inline  │
//! ├──────────────────────────────────────────────┤
//! │  Element Registry│  Selection                │
//! │  - Lifecycle     │  - Single element         │
//! │  - Monotonic ids │  - Selection events       │
//! ├──────────────────────────────────────────────┤
//! │  Snapshot        │  Restoration              │
//! │  - Grouped types │  - Fixed type order       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Nothing here performs I/O or spawns tasks; persistence and transport live
//! in `deck-protocol` and `deck-server`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod element;
pub mod error;
pub mod event;
pub mod grid;
pub mod presentation;
pub mod registry;
pub mod restore;
pub mod selection;
pub mod snapshot;
pub mod style;
pub mod template;
pub mod theme;

pub use element::{
    ChartSource, ContentKind, DiagramDirection, DiagramSource, Element, ElementContent,
    ElementId, ElementPatch, ElementType, ObjectFit, DEFAULT_Z_INDEX, MAX_ELEMENT_ID_LEN,
};
pub use error::{DeckError, DeckResult};
pub use event::{ElementProperties, Event};
pub use grid::{
    pixels_to_span, span_to_pixels, Axis, GridSpan, PixelRect, Position, CANVAS_HEIGHT,
    CANVAS_WIDTH, COLUMNS, ROWS, UNIT_HEIGHT, UNIT_WIDTH,
};
pub use presentation::{Presentation, SlideOutline, DEFAULT_LAYOUT};
pub use registry::{DeleteOutcome, ElementRegistry, IdSource, NewElement, SharedRegistry};
pub use restore::{RestorationLoader, RestoreReport, SkipReason, SkippedEntry};
pub use selection::SelectionCoordinator;
pub use snapshot::{SlideBackground, SlideSnapshot, SnapshotEntry};
pub use style::{
    CascadeLayer, Profile, ResolvedSlot, ResolvedStyle, StyleProperties, StyleRequest,
    StyleResolver, ThemeOverrides,
};
pub use template::{SlotDefinition, Template, TemplateRegistry, TemplateRenderer};
pub use theme::{Theme, ThemeRegistry, DEFAULT_THEME_ID};

/// Deck core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
