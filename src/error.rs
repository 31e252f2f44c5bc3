//! Error types for the orchestration core

use std::fmt;

use thiserror::Error;

use crate::capability::CapabilityError;

/// One failed child within a parallel group
#[derive(Debug, Clone)]
pub struct ChildFailure {
    pub child: String,
    pub message: String,
}

impl fmt::Display for ChildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.child, self.message)
    }
}

fn join_failures(failures: &[ChildFailure]) -> String {
    failures
        .iter()
        .map(ChildFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can abort a run.
///
/// A routing no-match is not represented here: it is a normal fallback path,
/// not a failure.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Session triple was never created
    #[error("session not found: {app}/{user}/{session}")]
    SessionNotFound {
        app: String,
        user: String,
        session: String,
    },

    /// Session triple already exists
    #[error("session already exists: {app}/{user}/{session}")]
    DuplicateSession {
        app: String,
        user: String,
        session: String,
    },

    /// A leaf's external capability call failed
    #[error("capability failed in agent '{agent}': {source}")]
    Capability {
        agent: String,
        #[source]
        source: CapabilityError,
    },

    /// One or more children of a parallel group failed; every failed child
    /// is listed
    #[error("parallel children failed: [{}]", join_failures(.failures))]
    Parallel { failures: Vec<ChildFailure> },

    /// A routing rule names a branch the router does not hold
    #[error("router '{router}' references unknown branch '{branch}'")]
    UnknownBranch { router: String, branch: String },

    /// The run's cancellation signal was raised
    #[error("run cancelled")]
    Cancelled,
}
