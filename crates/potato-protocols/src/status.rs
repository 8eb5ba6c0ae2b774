//! Human-readable node status.

use potato_token::{NodeId, Token};

/// What a node shows to an outside observer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Status {
    /// Nothing in flight on this node.
    #[default]
    Idle,
    /// Mid-hop on this node.
    Passing {
        message: String,
        holder: NodeId,
        times_passed: u64,
        time_elapsed: f64,
    },
    /// The pass limit was reached here.
    Completed { time_elapsed: f64 },
}

impl Status {
    /// Status for a token about to be handed off.
    #[must_use]
    pub fn passing(token: &Token) -> Self {
        Self::Passing {
            message: token.message().to_string(),
            holder: token.holder.clone(),
            times_passed: token.times_passed,
            time_elapsed: token.time_elapsed,
        }
    }

    /// Status for a finished game.
    #[must_use]
    pub fn completed(token: &Token) -> Self {
        Self::Completed {
            time_elapsed: token.time_elapsed,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => Ok(()),
            Self::Passing {
                message,
                holder,
                times_passed,
                time_elapsed,
            } => write!(
                f,
                "M: {}, H: {}, P: {}, T: {:.2}",
                message, holder, times_passed, time_elapsed
            ),
            Self::Completed { time_elapsed } => write!(
                f,
                "Maximum passes reached. Time to completion is {:.2} seconds.",
                time_elapsed
            ),
        }
    }
}

/// Receives status updates from the forward engine.
pub trait StatusSink {
    fn set_status(&mut self, status: Status);
}

/// Keeps only the latest status.
impl StatusSink for Status {
    fn set_status(&mut self, status: Status) {
        *self = status;
    }
}

/// Records every update in order.
impl StatusSink for Vec<Status> {
    fn set_status(&mut self, status: Status) {
        self.push(status);
    }
}

/// Discards updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn set_status(&mut self, _status: Status) {}
}
