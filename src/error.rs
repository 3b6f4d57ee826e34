//! Error taxonomy for a timetabling run.

use thiserror::Error;

use crate::data::SessionId;

/// Which solve pass an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvePass {
    Feasibility,
    Improvement,
}

impl std::fmt::Display for SolvePass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolvePass::Feasibility => write!(f, "feasibility pass"),
            SolvePass::Improvement => write!(f, "improvement pass"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TimetableError {
    /// The caller violated a precondition (bad configuration, unknown filter, ...).
    #[error("usage error: {0}")]
    Usage(String),

    /// The first pass proved the instance unsatisfiable.
    /// `conflicting` holds the labels of the constraint families found responsible,
    /// empty when diagnostics were disabled or inconclusive.
    #[error("no feasible timetable exists (conflicting constraint families: {conflicting:?})")]
    Infeasible { conflicting: Vec<String> },

    /// No contiguous window of the session's length fits inside any day.
    #[error(
        "session {session} needs {hours} contiguous slots but the longest available window is {longest_window}"
    )]
    SessionTooLong {
        session: SessionId,
        hours: u32,
        longest_window: u32,
    },

    /// The engine exhausted its time budget without deciding the instance.
    #[error("{pass} timed out after {seconds:.1}s without a verdict")]
    Timeout { pass: SolvePass, seconds: f64 },

    #[error("the satisfiability engine rejected the model: {0}")]
    ModelInvalid(String),

    #[error("data access error: {0}")]
    DataAccess(String),

    #[error("schedule storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, TimetableError>;
