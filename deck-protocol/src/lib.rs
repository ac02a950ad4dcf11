//! # Deck Protocol
//!
//! The message protocol between a host application and the embedded slide
//! view.
//!
//! ## Commands (host → view)
//!
//! `{"action": "...", "params": {...}}`, decoded through
//! [`command::ACTION_TABLE`]. Inserts for every element type, payload
//! updates, move/resize, properties, delete, selection, slide switching,
//! layout/background changes, slot style resolution and explicit save.
//!
//! ## Responses and events (view → host)
//!
//! - Responses: `{"success": true, "action": "...", ...result}` or
//!   `{"success": false, "action": "...", "error": "..."}`
//! - Events: `{"type": "elementSelected" | "elementDeselected" |
//!   "autosaveCompleted" | "autosaveFailed", ...}`
//!
//! ## Persistence
//!
//! Mutations are debounced by the [`AutosaveCoordinator`] and written to a
//! [`SnapshotStore`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod autosave;
pub mod command;
pub mod handler;
pub mod storage;
pub mod validation;

pub use autosave::{AutosaveConfig, AutosaveCoordinator, AutosaveStatus, FlushOutcome};
pub use command::{Command, CommandError, RawCommand};
pub use handler::ProtocolHandler;
pub use storage::{FileStore, MemoryStore, PersistenceError, SnapshotStore};
pub use validation::ValidationError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reply to a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the command was carried out.
    pub success: bool,
    /// Echo of the command's action.
    pub action: String,
    /// Action-specific result fields.
    #[serde(flatten)]
    pub result: Map<String, Value>,
    /// Error message (if failed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Create a success response.
    #[must_use]
    pub fn success(action: impl Into<String>, result: Map<String, Value>) -> Self {
        Self {
            success: true,
            action: action.into(),
            result,
            error: None,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn failure(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            action: action.into(),
            result: Map::new(),
            error: Some(message.into()),
        }
    }

    /// A result field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.result.get(key)
    }
}

/// Deck protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
