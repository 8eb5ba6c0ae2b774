//! Error types for potato-protocols.

use thiserror::Error;

/// Result type for potato-protocols operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while forwarding a token.
///
/// Not-for-me deliveries, termination and hand-off are normal outcomes and
/// never appear here.
#[derive(Debug, Error)]
pub enum Error {
    /// Peer topology or codec failure.
    #[error(transparent)]
    Token(#[from] potato_token::Error),
}

impl Error {
    /// Check if the peer set had no members.
    #[must_use]
    pub fn is_empty_peer_set(&self) -> bool {
        matches!(self, Self::Token(potato_token::Error::EmptyPeerSet))
    }
}
