//! Error types for potato-token.

use thiserror::Error;

use crate::NodeId;

/// Result type for potato-token operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding tokens or validating the peer topology.
#[derive(Debug, Error)]
pub enum Error {
    /// An incoming serialized token could not be parsed.
    #[error("failed to decode token: {0}")]
    Decode(#[source] serde_json::Error),

    /// A token could not be serialized.
    #[error("failed to encode token: {0}")]
    Encode(#[source] serde_json::Error),

    /// The peer set has no members, so no holder can be selected.
    #[error("peer set is empty")]
    EmptyPeerSet,

    /// The peer set does not contain the local node.
    #[error("local node {0} is not a member of the peer set")]
    NotInPeerSet(NodeId),

    /// One more hop would overflow the pass counter.
    #[error("pass counter is at its maximum")]
    PassCounterOverflow,
}
