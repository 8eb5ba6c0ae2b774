//! Error types for Potato Node.

use std::time::Duration;

use potato_token::NodeId;
use thiserror::Error;

/// Result type for Potato Node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a node or a cluster.
#[derive(Debug, Error)]
pub enum Error {
    /// Forward engine error
    #[error("Protocol error: {0}")]
    Protocol(#[from] potato_protocols::Error),

    /// Token codec or topology error
    #[error("Token error: {0}")]
    Token(#[from] potato_token::Error),

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    Config(String),

    /// No node reported completion in time
    #[error("Game did not complete within {0:?}")]
    Timeout(Duration),

    /// A node's event loop is no longer running
    #[error("Node {0} is not running")]
    NodeGone(NodeId),

    /// No node exists at this index
    #[error("No node at index {0}")]
    UnknownNode(usize),
}
