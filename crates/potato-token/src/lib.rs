//! Hot Potato Token
//!
//! The single unit of shared state passed between peers, the peer topology it
//! travels over, and the textual codec used to store it in a transport slot.
//!
//! # Token lifecycle
//!
//! A token is created once per game by an initiating node with zeroed
//! counters and a randomly chosen holder. Each completed hand-off bumps
//! `times_passed` by exactly one and folds the time since the previous
//! update into `time_elapsed`. The `message` never changes.
//!
//! # Wire format
//!
//! ```text
//! {"message":"hi","holder":"unit/0","times_passed":3,"time_elapsed":0.42,"timestamp":1700000000.5}
//! ```

mod codec;
mod error;
mod peers;
mod token;

pub use codec::{decode_slot, JsonCodec, TokenCodec};
pub use error::{Error, Result};
pub use peers::PeerSet;
pub use token::{NodeId, Token};
