//! Potato Protocols - Token Forwarding State Machine
//!
//! This crate decides, for one node, what happens to an incoming hot potato:
//!
//! 1. **Termination**: the pass limit is reached while this node holds the
//!    token. The game is over and completion is reported.
//! 2. **Ownership**: the token is addressed to somebody else. Nothing to do.
//! 3. **Hand-off**: pick the next holder uniformly at random from the full
//!    peer set (self included), bump the counters, pause for the configured
//!    delay, and either transmit or keep going when self was re-picked.
//!
//! Self re-selection runs as a loop on the handling node, so a long run of
//! self-hops uses constant stack.
//!
//! # Example
//!
//! ```rust
//! use potato_protocols::{ForwardEngine, Outcome, PassConfig, Status};
//! use potato_token::{PeerSet, Token};
//!
//! let peers: PeerSet = ["unit/0"].into_iter().collect();
//! let me = "unit/0".into();
//! let mut engine = ForwardEngine::seeded(7);
//! let mut status = Status::Idle;
//!
//! let token = Token::new("hello", "unit/0".into(), 0.0);
//! let config = PassConfig::default().with_max_passes(3);
//! let outcome = engine.forward(token, &peers, &me, &config, &mut status).unwrap();
//!
//! assert!(matches!(outcome, Outcome::Completed { .. }));
//! assert_eq!(outcome.token().times_passed, 3);
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod select;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PassConfig;
pub use engine::{EngineState, ForwardEngine, Outcome};
pub use error::{Error, Result};
pub use select::{PeerSelector, RandomSelector, SequenceSelector};
pub use status::{NullStatus, Status, StatusSink};
