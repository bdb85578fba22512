//! Player decision policy.
//!
//! Chooses which player is authoritative for the current watch session.
//! The policy is not sticky toward either player: a later reading can flip
//! an active `Secondary` session back to `Primary` and vice versa. Only an
//! `Unknown` metrics status with no regional locale keeps the previous
//! decision.

use serde::Serialize;

use crate::metrics::MetricsStatus;
use crate::session::WatchSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Decision {
    Unknown,
    Primary,
    Secondary,
}

/// Transition function, evaluated on every decision tick.
pub fn decide(previous: Decision, status: MetricsStatus, regional: bool) -> Decision {
    if status == MetricsStatus::Normal && !regional {
        return Decision::Primary;
    }
    if status == MetricsStatus::Abnormal || regional {
        return Decision::Secondary;
    }
    match previous {
        Decision::Unknown => Decision::Primary,
        kept => kept,
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub previous: Decision,
    pub current: Decision,
}

impl DecisionOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Apply the transition function to a session in place.
pub fn evaluate(session: &mut WatchSession, status: MetricsStatus, regional: bool) -> DecisionOutcome {
    let previous = session.decision;
    let current = decide(previous, status, regional);
    session.decision = current;
    if current != previous {
        log::info!(
            "[DECISION] {}: {:?} -> {:?} (metrics {:?}, regional {})",
            session.watch_id,
            previous,
            current,
            status,
            regional
        );
    }
    DecisionOutcome { previous, current }
}
