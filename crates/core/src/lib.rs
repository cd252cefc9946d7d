//! Domain types and pure logic for logging a workout against a template.
//!
//! Nothing in this crate performs I/O. The runtime pieces (draft
//! persistence, HTTP submission, the session engine) live in
//! `liftlog-session`.

pub mod command;
pub mod error;
pub mod error_mapper;
pub mod field_path;
pub mod prefill;
pub mod suggest;
pub mod types;
pub mod validation;
pub mod workout;
