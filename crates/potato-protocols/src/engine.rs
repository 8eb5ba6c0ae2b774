//! Forward Engine - the per-node hot potato state machine.
//!
//! # Decision order
//!
//! For each incoming token the engine checks, in this order:
//!
//! 1. **Termination**: pass limit reached *and* this node is the holder.
//! 2. **Ownership**: another node is the holder, so nothing to do.
//! 3. **Hand-off**: choose the next holder, commit the hop, pause.
//!
//! When the hand-off re-selects this node the engine goes back to step 1 with
//! the updated token instead of transmitting it, so a run of self-hops
//! consumes one delay each and can end in termination without ever leaving
//! the node.
//!
//! # States
//!
//! ```text
//!          holder == self              limit reached
//!   Idle ─────────────────> Active ─────────────────> Terminated
//!    ^                      │    ^
//!    │  other holder picked │    │ self re-picked
//!    └──────────────────────┘    └──┘
//! ```

use std::time::Duration;

use tracing::{debug, info, trace};

use potato_token::{NodeId, PeerSet, Token};

use crate::clock::{Clock, SystemClock};
use crate::config::PassConfig;
use crate::error::Result;
use crate::select::{PeerSelector, RandomSelector};
use crate::status::{Status, StatusSink};

/// Local state of the forward state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// This node does not hold the token.
    #[default]
    Idle,
    /// This node holds the token and is processing a hop.
    ///
    /// Only held while a step runs. Once `forward` returns the engine is
    /// `Idle` or `Terminated`.
    Active,
    /// The pass limit was reached while this node held the token.
    Terminated,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Result of a forward step.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The game finished on this node. Nothing to transmit.
    Completed { token: Token },

    /// The token belongs to another node. Returned untouched, nothing to transmit.
    NotHolder { token: Token },

    /// Hand the token to `token.holder`. `hops` counts every hop committed
    /// during this step, self-hops included.
    Transmit { token: Token, hops: u64 },
}

impl Outcome {
    /// The token to write to the transport, if any.
    #[must_use]
    pub fn into_transmit(self) -> Option<Token> {
        match self {
            Self::Transmit { token, .. } => Some(token),
            Self::Completed { .. } | Self::NotHolder { .. } => None,
        }
    }

    /// Final token state, whatever the outcome.
    #[must_use]
    pub fn token(&self) -> &Token {
        match self {
            Self::Completed { token } | Self::NotHolder { token } | Self::Transmit { token, .. } => {
                token
            }
        }
    }

    /// Take the final token state, whatever the outcome.
    #[must_use]
    pub fn into_token(self) -> Token {
        match self {
            Self::Completed { token } | Self::NotHolder { token } | Self::Transmit { token, .. } => {
                token
            }
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Runs the hot potato decision logic for one node.
///
/// Owns the next-holder selector and the clock used to stamp hops; both are
/// replaceable so games can be made deterministic.
#[derive(Debug)]
pub struct ForwardEngine<S = RandomSelector, C = SystemClock> {
    selector: S,
    clock: C,
    state: EngineState,
}

impl ForwardEngine {
    /// Engine with an OS-seeded random selector and the system clock.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(RandomSelector::from_entropy(), SystemClock)
    }

    /// Engine with a seeded random selector and the system clock.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(RandomSelector::seeded(seed), SystemClock)
    }
}

impl<S: PeerSelector, C: Clock> ForwardEngine<S, C> {
    /// Create an engine from a selector and a clock.
    pub fn new(selector: S, clock: C) -> Self {
        Self {
            selector,
            clock,
            state: EngineState::Idle,
        }
    }

    /// State after the most recent step.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// The selector, e.g. to inspect a scripted one.
    pub fn selector(&self) -> &S {
        &self.selector
    }

    /// Build the first token of a game: zeroed counters, stamped now, held by
    /// a member chosen with this engine's selector.
    pub fn initiate(&mut self, message: impl Into<String>, peers: &PeerSet) -> Result<Token> {
        let holder = self.selector.select(peers)?.clone();
        Ok(Token::new(message, holder, self.clock.now()))
    }

    /// Process an incoming token on `self_id`.
    ///
    /// Fails only when the peer snapshot is unusable or the token cannot be
    /// passed again. The snapshot must be non-empty and contain `self_id`;
    /// `EmptyPeerSet` and `NotInPeerSet` are both fatal precondition failures,
    /// checked before the decision steps. A holder whose pass counter is
    /// already at `u64::MAX` fails with `PassCounterOverflow` instead of
    /// wrapping.
    pub fn forward(
        &mut self,
        mut token: Token,
        peers: &PeerSet,
        self_id: &NodeId,
        config: &PassConfig,
        status: &mut dyn StatusSink,
    ) -> Result<Outcome> {
        peers.validate_for(self_id)?;

        let mut hops = 0u64;
        loop {
            if token.is_held_by(self_id) && config.is_limit_reached(token.times_passed) {
                info!(
                    node = %self_id,
                    times_passed = token.times_passed,
                    time_elapsed = token.time_elapsed,
                    "Maximum passes reached"
                );
                status.set_status(Status::completed(&token));
                self.state = EngineState::Terminated;
                return Ok(Outcome::Completed { token });
            }

            if !token.is_held_by(self_id) {
                self.state = EngineState::Idle;
                if hops == 0 {
                    debug!(node = %self_id, holder = %token.holder, "Token not addressed to this node");
                    return Ok(Outcome::NotHolder { token });
                }
                return Ok(Outcome::Transmit { token, hops });
            }

            self.state = EngineState::Active;
            self.hop(&mut token, peers, config.delay, status)?;
            hops += 1;
        }
    }

    /// Commit one hand-off of a token held by this node.
    fn hop(
        &mut self,
        token: &mut Token,
        peers: &PeerSet,
        delay: Duration,
        status: &mut dyn StatusSink,
    ) -> Result<()> {
        status.set_status(Status::passing(token));

        let next = self.selector.select(peers)?.clone();
        if let Err(e) = token.record_hop(next, self.clock.now()) {
            status.set_status(Status::Idle);
            self.state = EngineState::Idle;
            return Err(e.into());
        }

        if !delay.is_zero() {
            trace!(delay = ?delay, "Pausing before hand-off");
            std::thread::sleep(delay);
        }

        status.set_status(Status::Idle);
        info!(
            holder = %token.holder,
            times_passed = token.times_passed,
            time_elapsed = token.time_elapsed,
            "Current token"
        );
        Ok(())
    }
}
