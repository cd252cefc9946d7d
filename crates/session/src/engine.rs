//! The workout logging session engine.
//!
//! [`SessionEngine`] owns one [`Session`] and is its only writer. The
//! lifecycle is:
//!
//! ```text
//! open --submit--> submitting --ok--> submitted (terminal)
//!   ^                  |
//!   +----- failure ----+
//! open --cancel--> cancelled (terminal)
//! ```
//!
//! Every edit re-validates the touched set and schedules a debounced draft
//! save. Submission validates the whole form first and never contacts the
//! transport when anything is invalid. Server-side validation failures are
//! mapped back onto individual sets and the draft is kept.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use liftlog_core::command::{CreateWorkoutCommand, CreateWorkoutResponse};
use liftlog_core::error::CoreError;
use liftlog_core::error_mapper::{apply_server_errors, FIX_VALIDATION_ERRORS_MESSAGE};
use liftlog_core::prefill::{map_prefill_at, WorkoutPrefill};
use liftlog_core::types::{EntityId, Timestamp};
use liftlog_core::validation::{set_error, validate_form, SetRules, SESSION_SET_RULES};
use liftlog_core::workout::{SetField, Session};

use crate::config::{SessionConfig, DEFAULT_SAVE_DEBOUNCE_MS};
use crate::draft::{DraftError, DraftStore};
use crate::saver::DraftSaver;
use crate::transport::{SubmissionTransport, TransportError};

/// Banner text for any submission failure other than field validation.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to create workout";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Open,
    Submitting,
    Submitted,
    Cancelled,
}

/// Where the session's initial state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    Prefill,
    Draft,
}

/// Result of a single field edit, for rendering the touched row.
#[derive(Debug, Clone, PartialEq)]
pub struct SetUpdate {
    pub error: Option<String>,
    pub exercise_completed: bool,
}

/// Collaborators handed to the engine at construction.
#[derive(Clone)]
pub struct EngineContext {
    pub store: DraftStore,
    pub transport: Arc<dyn SubmissionTransport>,
    pub save_delay: Duration,
    pub rules: SetRules,
}

impl EngineContext {
    pub fn new(store: DraftStore, transport: Arc<dyn SubmissionTransport>) -> Self {
        Self {
            store,
            transport,
            save_delay: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
            rules: SESSION_SET_RULES,
        }
    }

    pub fn from_config(
        config: &SessionConfig,
        store: DraftStore,
        transport: Arc<dyn SubmissionTransport>,
    ) -> Self {
        Self::new(store, transport).with_save_delay(config.save_debounce)
    }

    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    pub fn with_rules(mut self, rules: SetRules) -> Self {
        self.rules = rules;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Session is closed")]
    Closed,

    #[error("A submission is in flight")]
    SubmissionInFlight,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("A submission is already in flight")]
    InFlight,

    #[error("Session is closed")]
    Closed,

    /// Client-side validation failed; nothing was sent.
    #[error("{invalid_sets} set(s) failed validation")]
    Invalid { invalid_sets: usize },

    /// The server rejected the workout; violations were mapped onto sets.
    #[error("Server rejected the workout ({applied} field error(s) mapped, {ignored} ignored)")]
    Rejected { applied: usize, ignored: usize },

    #[error("Submission failed: {0}")]
    Transport(TransportError),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct EngineState {
    session: Session,
    phase: SessionPhase,
    submit_error: Option<String>,
    submit_result: Option<CreateWorkoutResponse>,
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Restores `Open` if a submit future is dropped while awaiting the transport.
struct SubmissionGuard<'a> {
    state: &'a Mutex<EngineState>,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.phase == SessionPhase::Submitting {
            state.phase = SessionPhase::Open;
        }
    }
}

enum Settled {
    Saved(CreateWorkoutResponse),
    Failed(SubmitError),
}

/// Editable workout session backed by a local draft.
///
/// All methods take `&self`; the engine can be shared behind an `Arc` so a
/// UI can keep reading state while a submission is awaited. Edits are
/// refused until the submission settles. [`update_set`] must be called from
/// within a Tokio runtime because it schedules a timer.
///
/// [`update_set`]: SessionEngine::update_set
pub struct SessionEngine {
    template_id: EntityId,
    origin: SessionOrigin,
    rules: SetRules,
    state: Mutex<EngineState>,
    saver: DraftSaver,
    transport: Arc<dyn SubmissionTransport>,
}

impl SessionEngine {
    /// Resume the stored draft for the prefill's template, or start fresh
    /// from the prefill.
    pub async fn initialize(prefill: &WorkoutPrefill, context: EngineContext) -> Self {
        Self::initialize_at(prefill, context, Utc::now()).await
    }

    /// As [`initialize`](Self::initialize) with an explicit clock for the
    /// fresh-session case.
    pub async fn initialize_at(
        prefill: &WorkoutPrefill,
        context: EngineContext,
        now: Timestamp,
    ) -> Self {
        let template_id = prefill.template_id;
        let (session, origin) = match context.store.load(&template_id).await {
            Some(draft) => {
                tracing::info!(%template_id, "Resuming workout draft");
                (draft, SessionOrigin::Draft)
            }
            None => (map_prefill_at(prefill, now), SessionOrigin::Prefill),
        };

        tracing::debug!(
            %template_id,
            exercises = session.exercises.len(),
            sets = session.set_count(),
            ?origin,
            "Workout session initialized"
        );

        Self {
            template_id,
            origin,
            rules: context.rules,
            state: Mutex::new(EngineState {
                session,
                phase: SessionPhase::Open,
                submit_error: None,
                submit_result: None,
            }),
            saver: DraftSaver::new(context.store, context.save_delay),
            transport: context.transport,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock(&self.state)
    }

    // ---- read side ----

    pub fn template_id(&self) -> EntityId {
        self.template_id
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    pub fn snapshot(&self) -> Session {
        self.lock().session.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase() == SessionPhase::Submitting
    }

    /// Every set populated and error-free. Drives the submit control.
    pub fn is_form_valid(&self) -> bool {
        self.lock().session.is_complete()
    }

    pub fn exercise_completed(&self, exercise_index: usize) -> Option<bool> {
        self.lock()
            .session
            .exercises
            .get(exercise_index)
            .map(|e| e.completed())
    }

    pub fn submit_error(&self) -> Option<String> {
        self.lock().submit_error.clone()
    }

    pub fn dismiss_submit_error(&self) {
        self.lock().submit_error = None;
    }

    pub fn submit_result(&self) -> Option<CreateWorkoutResponse> {
        self.lock().submit_result.clone()
    }

    pub fn has_pending_save(&self) -> bool {
        self.saver.has_pending()
    }

    // ---- mutation ----

    /// Replace one field of one set and re-validate that set against its
    /// other, unchanged field. Schedules a debounced draft save.
    ///
    /// Refused while a submission is in flight: the command has already been
    /// built and a successful submit discards the draft.
    pub fn update_set(
        &self,
        exercise_index: usize,
        set_index: usize,
        field: SetField,
        value: Option<f64>,
    ) -> Result<SetUpdate, EngineError> {
        let (update, snapshot) = {
            let mut state = self.lock();
            match state.phase {
                SessionPhase::Submitting => return Err(EngineError::SubmissionInFlight),
                SessionPhase::Submitted | SessionPhase::Cancelled => {
                    return Err(EngineError::Closed)
                }
                SessionPhase::Open => {}
            }

            let set = state.session.assign(exercise_index, set_index, field, value)?;
            set.error = set_error(set.reps, set.weight, &self.rules);
            let error = set.error.clone();
            let exercise_completed = state.session.exercises[exercise_index].completed();

            (
                SetUpdate {
                    error,
                    exercise_completed,
                },
                state.session.clone(),
            )
        };

        tracing::debug!(
            template_id = %self.template_id,
            exercise_index,
            set_index,
            %field,
            valid = update.error.is_none(),
            "Set updated"
        );

        self.saver.schedule(snapshot);
        Ok(update)
    }

    /// Validate the whole form and, if valid, send it.
    ///
    /// On success the draft is removed and the session becomes terminal.
    /// On a server validation failure the violations are written onto their
    /// sets and the draft is kept. Any other failure records a generic
    /// banner message; the caller decides whether to retry.
    pub async fn submit(&self) -> Result<CreateWorkoutResponse, SubmitError> {
        let command = {
            let mut state = self.lock();
            match state.phase {
                SessionPhase::Submitting => return Err(SubmitError::InFlight),
                SessionPhase::Submitted | SessionPhase::Cancelled => {
                    return Err(SubmitError::Closed)
                }
                SessionPhase::Open => {}
            }

            let valid = validate_form(&mut state.session, &self.rules);
            let command = if valid {
                CreateWorkoutCommand::try_from(&state.session).ok()
            } else {
                None
            };
            let Some(command) = command else {
                let invalid_sets = state.session.error_count();
                self.saver.schedule(state.session.clone());
                tracing::debug!(
                    template_id = %self.template_id,
                    invalid_sets,
                    "Submit blocked by validation"
                );
                return Err(SubmitError::Invalid { invalid_sets });
            };

            state.phase = SessionPhase::Submitting;
            state.submit_error = None;
            command
        };

        let _guard = SubmissionGuard { state: &self.state };
        tracing::info!(
            template_id = %self.template_id,
            exercises = command.exercises.len(),
            "Submitting workout"
        );

        let result = self.transport.create_workout(&command).await;

        let settled = {
            let mut state = self.lock();
            match result {
                Ok(response) => {
                    state.phase = SessionPhase::Submitted;
                    state.submit_result = Some(response.clone());
                    Settled::Saved(response)
                }
                Err(TransportError::Validation(body)) => {
                    let report = apply_server_errors(&mut state.session, &body.details);
                    state.submit_error = Some(FIX_VALIDATION_ERRORS_MESSAGE.to_string());
                    state.phase = SessionPhase::Open;
                    self.saver.schedule(state.session.clone());
                    tracing::warn!(
                        template_id = %self.template_id,
                        applied = report.applied,
                        ignored = report.ignored,
                        "Workout rejected by server validation"
                    );
                    Settled::Failed(SubmitError::Rejected {
                        applied: report.applied,
                        ignored: report.ignored,
                    })
                }
                Err(e) => {
                    state.submit_error = Some(SUBMIT_FAILED_MESSAGE.to_string());
                    state.phase = SessionPhase::Open;
                    tracing::error!(
                        template_id = %self.template_id,
                        error = %e,
                        "Workout submission failed"
                    );
                    Settled::Failed(SubmitError::Transport(e))
                }
            }
        };

        match settled {
            Settled::Saved(response) => {
                if let Err(e) = self.saver.discard(&self.template_id).await {
                    tracing::warn!(
                        template_id = %self.template_id,
                        error = %e,
                        "Workout saved but draft could not be cleared"
                    );
                }
                tracing::info!(
                    template_id = %self.template_id,
                    workout_id = %response.id,
                    personal_bests = response.personal_bests_updated.len(),
                    "Workout saved"
                );
                Ok(response)
            }
            Settled::Failed(e) => Err(e),
        }
    }

    /// Abandon the session and remove its draft. Refused while a submission
    /// is in flight.
    pub async fn cancel(&self) -> Result<(), EngineError> {
        {
            let mut state = self.lock();
            match state.phase {
                SessionPhase::Submitting => return Err(EngineError::SubmissionInFlight),
                SessionPhase::Submitted => return Err(EngineError::Closed),
                SessionPhase::Open | SessionPhase::Cancelled => {
                    state.phase = SessionPhase::Cancelled;
                }
            }
        }

        self.saver.discard(&self.template_id).await?;
        tracing::info!(template_id = %self.template_id, "Workout session cancelled");
        Ok(())
    }

    /// Persist the latest edit now. Call before tearing the session down.
    ///
    /// Returns `true` if a pending snapshot was written.
    pub async fn flush(&self) -> Result<bool, DraftError> {
        self.saver.flush().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
