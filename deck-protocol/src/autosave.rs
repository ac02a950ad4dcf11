//! Debounced persistence of the open slide.
//!
//! Each [`AutosaveCoordinator::schedule`] call aborts the pending timer task
//! and starts a new one (trailing-edge debounce). When a timer fires it spawns
//! the flush as its own task, so aborting a timer never interrupts a write.
//! Flushes take a write lock before capturing the registry, so they reach the
//! store in the order they captured state.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use deck_core::registry::{self, SharedRegistry};
use deck_core::{Event, SlideSnapshot};
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::storage::{PersistenceError, SnapshotStore};

/// Default quiet period before a flush.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(2500);

const AUTOSAVE_FLUSHES_TOTAL: &str = "deck_autosave_flushes_total";

/// Autosave settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Time without mutations before the slide is written.
    pub quiet_period: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

/// Running totals for the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosaveStatus {
    /// Successful flushes.
    pub flushes: u64,
    /// Failed flushes.
    pub failures: u64,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
    /// Registry revision of the last successful flush.
    pub last_saved_revision: Option<u64>,
}

/// Result of a successful flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Slide written.
    pub slide_index: usize,
    /// Elements written.
    pub element_count: usize,
    /// Registry revision captured.
    pub revision: u64,
}

struct FlushContext {
    presentation_id: String,
    registry: SharedRegistry,
    store: Arc<dyn SnapshotStore>,
    events: mpsc::UnboundedSender<Event>,
    write_lock: tokio::sync::Mutex<()>,
    status: Mutex<AutosaveStatus>,
}

impl FlushContext {
    async fn flush(&self) -> Result<FlushOutcome, PersistenceError> {
        let _write = self.write_lock.lock().await;
        let (slide_index, revision, snapshot) = {
            let registry = registry::lock(&self.registry);
            (
                registry.slide_index(),
                registry.revision(),
                SlideSnapshot::capture(&registry),
            )
        };
        let element_count = snapshot.element_count();

        let result = self
            .store
            .save(&self.presentation_id, slide_index, &snapshot)
            .await;

        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(()) => {
                status.flushes += 1;
                status.consecutive_failures = 0;
                status.last_error = None;
                status.last_saved_revision = Some(revision);
                drop(status);
                counter!(AUTOSAVE_FLUSHES_TOTAL, "outcome" => "ok").increment(1);
                tracing::debug!(
                    presentation = %self.presentation_id,
                    slide = slide_index,
                    elements = element_count,
                    revision,
                    "autosave completed"
                );
                self.emit(Event::AutosaveCompleted {
                    slide_index,
                    element_count,
                    revision,
                });
                Ok(FlushOutcome {
                    slide_index,
                    element_count,
                    revision,
                })
            }
            Err(e) => {
                status.failures += 1;
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                status.last_error = Some(e.to_string());
                drop(status);
                counter!(AUTOSAVE_FLUSHES_TOTAL, "outcome" => "error").increment(1);
                tracing::warn!(
                    presentation = %self.presentation_id,
                    slide = slide_index,
                    error = %e,
                    "autosave failed"
                );
                self.emit(Event::AutosaveFailed {
                    slide_index,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

/// Debounces registry mutations into snapshot writes.
pub struct AutosaveCoordinator {
    config: AutosaveConfig,
    context: Arc<FlushContext>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutosaveCoordinator {
    /// Create a coordinator for one presentation's open slide.
    #[must_use]
    pub fn new(
        config: AutosaveConfig,
        presentation_id: impl Into<String>,
        registry: SharedRegistry,
        store: Arc<dyn SnapshotStore>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            config,
            context: Arc::new(FlushContext {
                presentation_id: presentation_id.into(),
                registry,
                store,
                events,
                write_lock: tokio::sync::Mutex::new(()),
                status: Mutex::new(AutosaveStatus::default()),
            }),
            pending: Mutex::new(None),
        }
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> AutosaveConfig {
        self.config
    }

    /// Restart the quiet-period timer. Must be called within a tokio runtime.
    pub fn schedule(&self) {
        let context = Arc::clone(&self.context);
        let quiet_period = self.config.quiet_period;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            // Detached so that a later schedule() cannot abort the write.
            tokio::spawn(async move {
                let _ = context.flush().await;
            });
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(timer) {
            previous.abort();
        }
    }

    /// Whether a timer is waiting to fire.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel any pending timer without flushing.
    pub fn cancel(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    /// Cancel the pending timer and write the current state immediately.
    ///
    /// # Errors
    ///
    /// Returns the store's error. The failure is also recorded in
    /// [`AutosaveStatus`] and emitted as an `autosaveFailed` event.
    pub async fn flush_now(&self) -> Result<FlushOutcome, PersistenceError> {
        self.cancel();
        self.context.flush().await
    }

    /// Record that `revision` matches what the store holds, e.g. right after
    /// a slide was loaded from it.
    pub fn mark_clean(&self, revision: u64) {
        self.context
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_saved_revision = Some(revision);
    }

    /// Whether `revision` differs from the last state known to be stored.
    #[must_use]
    pub fn is_dirty(&self, revision: u64) -> bool {
        self.context
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_saved_revision
            != Some(revision)
    }

    /// Snapshot of the running totals.
    #[must_use]
    pub fn status(&self) -> AutosaveStatus {
        self.context
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for AutosaveCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for AutosaveCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveCoordinator")
            .field("config", &self.config)
            .field("presentation_id", &self.context.presentation_id)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}
