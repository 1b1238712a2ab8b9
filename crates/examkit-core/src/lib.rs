//! examkit-core — Exam session engine, traits, and scoring.
//!
//! This crate flattens nested exam documents into an addressable answer
//! space, runs the timed session lifecycle, and scores submissions.

pub mod answers;
pub mod band;
pub mod clock;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
pub mod slots;
pub mod traits;

#[cfg(test)]
mod fixtures;

pub use error::{BackendError, SessionError};
pub use session::{ExamSession, SessionOptions, SessionPhase, SessionState, SubmitOutcome};
