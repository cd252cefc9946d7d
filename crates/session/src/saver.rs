//! Debounced draft writes.
//!
//! Every [`DraftSaver::schedule`] call replaces the pending snapshot and
//! restarts the delay; only the snapshot present when the delay elapses is
//! written. A write that has already started runs to completion. Writes,
//! flushes and discards are serialized so a late timer can never resurrect a
//! draft that was just cleared.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use liftlog_core::types::EntityId;
use liftlog_core::workout::Session;
use tokio_util::sync::CancellationToken;

use crate::draft::{DraftError, DraftStore};

struct PendingSave {
    generation: u64,
    snapshot: Session,
    cancel: CancellationToken,
}

#[derive(Default)]
struct SaverState {
    generation: u64,
    pending: Option<PendingSave>,
}

/// Coalesces draft saves for one session.
pub struct DraftSaver {
    store: DraftStore,
    delay: Duration,
    state: Arc<Mutex<SaverState>>,
    /// Held for the duration of every backend write or clear.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

fn lock(state: &Mutex<SaverState>) -> MutexGuard<'_, SaverState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DraftSaver {
    pub fn new(store: DraftStore, delay: Duration) -> Self {
        Self {
            store,
            delay,
            state: Arc::new(Mutex::new(SaverState::default())),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a snapshot is waiting for its delay to elapse.
    pub fn has_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// Replace the pending snapshot and restart the delay.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, snapshot: Session) {
        let (generation, cancel) = {
            let mut state = lock(&self.state);
            if let Some(previous) = state.pending.take() {
                previous.cancel.cancel();
            }
            state.generation += 1;
            let cancel = CancellationToken::new();
            state.pending = Some(PendingSave {
                generation: state.generation,
                snapshot,
                cancel: cancel.clone(),
            });
            (state.generation, cancel)
        };

        let state = Arc::clone(&self.state);
        let write_lock = Arc::clone(&self.write_lock);
        let store = self.store.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let _write = write_lock.lock().await;
            let due = {
                let mut state = lock(&state);
                match state.pending.as_ref() {
                    Some(p) if p.generation == generation => state.pending.take(),
                    _ => None,
                }
            };
            if let Some(pending) = due {
                if let Err(e) = store.save(&pending.snapshot).await {
                    tracing::error!(
                        template_id = %pending.snapshot.template_id,
                        error = %e,
                        "Debounced draft save failed"
                    );
                }
            }
        });
    }

    /// Drop the pending snapshot without writing it.
    pub fn cancel_pending(&self) {
        if let Some(pending) = lock(&self.state).pending.take() {
            pending.cancel.cancel();
        }
    }

    /// Write the pending snapshot now, waiting for any write in progress.
    ///
    /// Returns `true` if a snapshot was written.
    pub async fn flush(&self) -> Result<bool, DraftError> {
        let _write = self.write_lock.lock().await;
        let pending = lock(&self.state).pending.take();
        match pending {
            Some(pending) => {
                pending.cancel.cancel();
                self.store.save(&pending.snapshot).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Cancel any pending save and remove the stored draft.
    pub async fn discard(&self, template_id: &EntityId) -> Result<(), DraftError> {
        self.cancel_pending();
        let _write = self.write_lock.lock().await;
        self.store.clear(template_id).await
    }
}
