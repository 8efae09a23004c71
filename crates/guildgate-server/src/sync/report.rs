//! Per-identity outcomes and the operator-facing report.

use std::fmt;

use crate::platform::JoinResult;

/// Why a single re-join attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The platform answered with a non-success status.
    Status(u16),
    /// The request never got an answer (timeout, connection refused).
    Transport(String),
    /// The stored token could not be opened.
    TokenUnreadable,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(403) => f.write_str("forbidden (403)"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::Transport(msg) => write!(f, "request failed: {msg}"),
            Self::TokenUnreadable => f.write_str("stored token unreadable"),
        }
    }
}

/// Result of one re-join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeResult {
    Joined,
    AlreadyMember,
    Failed(Failure),
}

impl OutcomeResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Joined | Self::AlreadyMember)
    }
}

impl From<JoinResult> for OutcomeResult {
    fn from(result: JoinResult) -> Self {
        match result {
            JoinResult::Joined => Self::Joined,
            JoinResult::AlreadyMember => Self::AlreadyMember,
            other => Self::Failed(Failure::Status(other.status())),
        }
    }
}

impl fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined => f.write_str("joined"),
            Self::AlreadyMember => f.write_str("already a member"),
            Self::Failed(reason) => write!(f, "failed, {reason}"),
        }
    }
}

/// One identity's re-join attempt against one community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub identity_id: String,
    pub display_name: String,
    pub target_community_id: String,
    pub result: OutcomeResult,
    /// `None` when no role assignment was attempted.
    pub role_assigned: Option<bool>,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) -> {}: {}",
            self.identity_id, self.display_name, self.target_community_id, self.result
        )?;
        match self.role_assigned {
            Some(true) => f.write_str(", role assigned"),
            Some(false) => f.write_str(", role not assigned"),
            None => Ok(()),
        }
    }
}

/// Collected outcomes of a replay or sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
    /// Identifiers that matched no stored identity.
    pub not_found: Vec<String>,
}

impl SyncReport {
    pub fn not_found(identifier: &str) -> Self {
        Self {
            outcomes: Vec::new(),
            not_found: vec![identifier.to_string()],
        }
    }

    pub fn push(&mut self, outcome: SyncOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Plain-text rendering: a summary line, then one line per identity.
    pub fn render(&self) -> String {
        let mut out = format!("{}/{} succeeded\n", self.succeeded(), self.total());
        for outcome in &self.outcomes {
            out.push_str(&outcome.to_string());
            out.push('\n');
        }
        for identifier in &self.not_found {
            out.push_str(identifier);
            out.push_str(": not found\n");
        }
        out
    }
}
