use crate::domain_model::CredentialPair;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    Ready,
    Refreshing,
    Cleared,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Loading => "loading",
            SessionPhase::Ready => "ready",
            SessionPhase::Refreshing => "refreshing",
            SessionPhase::Cleared => "cleared",
        };
        f.write_str(s)
    }
}

/// Readable snapshot of a session, published on every change.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub credentials: Option<CredentialPair>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl SessionView {
    pub fn uninitialized() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            credentials: None,
            refreshed_at: None,
        }
    }
}
