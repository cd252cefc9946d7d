//! Runtime side of workout logging.
//!
//! - [`SessionEngine`] -- owns one editable session, validates edits,
//!   schedules draft saves and drives submission.
//! - [`DraftStore`] -- local draft persistence over a pluggable
//!   [`DraftBackend`] (file or in-memory).
//! - [`DraftSaver`] -- debounced, flushable draft writes.
//! - [`SubmissionTransport`] -- the workout creation endpoint, with an HTTP
//!   implementation in [`HttpSubmissionTransport`].

pub mod config;
pub mod draft;
pub mod engine;
pub mod saver;
pub mod transport;

pub use config::SessionConfig;
pub use draft::{DraftBackend, DraftError, DraftStore, FileDraftBackend, MemoryDraftBackend};
pub use engine::{
    EngineContext, EngineError, SessionEngine, SessionOrigin, SessionPhase, SetUpdate, SubmitError,
};
pub use saver::DraftSaver;
pub use transport::{HttpSubmissionTransport, SubmissionTransport, TransportError};
