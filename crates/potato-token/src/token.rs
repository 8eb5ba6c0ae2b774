//! Token and node identifier types.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Opaque node identifier (e.g. `unit/0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create an identifier from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The hot potato.
///
/// Passed by value between nodes. Only the holder may act on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    message: String,
    /// Node currently entitled to forward the token.
    pub holder: NodeId,
    /// Completed hand-offs since creation.
    pub times_passed: u64,
    /// Seconds spent in transit and processing since creation.
    pub time_elapsed: f64,
    /// Seconds since the Unix epoch of the last state update.
    pub timestamp: f64,
}

impl Token {
    /// Create a fresh token with zeroed counters.
    pub fn new(message: impl Into<String>, holder: NodeId, timestamp: f64) -> Self {
        Self {
            message: message.into(),
            holder,
            times_passed: 0,
            time_elapsed: 0.0,
            timestamp,
        }
    }

    /// Rebuild a token from all of its fields (e.g. after transport).
    pub fn from_parts(
        message: impl Into<String>,
        holder: NodeId,
        times_passed: u64,
        time_elapsed: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            message: message.into(),
            holder,
            times_passed,
            time_elapsed,
            timestamp,
        }
    }

    /// The payload. Immutable after creation.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check whether `node` currently holds the token.
    pub fn is_held_by(&self, node: &NodeId) -> bool {
        self.holder == *node
    }

    /// Commit one hand-off to `next` at time `now`.
    ///
    /// A clock that reads earlier than the stored timestamp contributes
    /// nothing, so `time_elapsed` never decreases. A pass counter already at
    /// `u64::MAX` fails and leaves the token untouched.
    pub fn record_hop(&mut self, next: NodeId, now: f64) -> Result<()> {
        let times_passed = self
            .times_passed
            .checked_add(1)
            .ok_or(Error::PassCounterOverflow)?;

        self.holder = next;
        self.times_passed = times_passed;
        self.time_elapsed += (now - self.timestamp).max(0.0);
        self.timestamp = now;
        Ok(())
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "message={:?} holder={} passes={} elapsed={:.2}s",
            self.message, self.holder, self.times_passed, self.time_elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_token_is_zeroed() {
        let token = Token::new("hi", "unit/0".into(), 100.0);
        assert_eq!(token.message(), "hi");
        assert_eq!(token.holder, "unit/0");
        assert_eq!(token.times_passed, 0);
        assert_eq!(token.time_elapsed, 0.0);
        assert_eq!(token.timestamp, 100.0);
    }

    #[test]
    fn record_hop_updates_counters() {
        let mut token = Token::new("hi", "A".into(), 100.0);
        token.record_hop("B".into(), 101.5).unwrap();

        assert_eq!(token.holder, "B");
        assert_eq!(token.times_passed, 1);
        assert_eq!(token.time_elapsed, 1.5);
        assert_eq!(token.timestamp, 101.5);
        assert_eq!(token.message(), "hi");
    }

    #[test]
    fn record_hop_ignores_backwards_clock() {
        let mut token = Token::new("hi", "A".into(), 100.0);
        token.time_elapsed = 2.0;
        token.record_hop("B".into(), 99.0).unwrap();

        assert_eq!(token.time_elapsed, 2.0);
        assert_eq!(token.timestamp, 99.0);
        assert_eq!(token.times_passed, 1);
    }

    #[test]
    fn record_hop_refuses_to_wrap_counter() {
        let mut token = Token::from_parts("hi", "A".into(), u64::MAX, 1.0, 100.0);
        let before = token.clone();

        let err = token.record_hop("B".into(), 101.0).unwrap_err();
        assert!(matches!(err, Error::PassCounterOverflow));
        assert_eq!(token, before);
    }

    #[test]
    fn holder_check() {
        let token = Token::new("hi", "A".into(), 0.0);
        assert!(token.is_held_by(&"A".into()));
        assert!(!token.is_held_by(&"B".into()));
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::new("unit/3").to_string(), "unit/3");
    }
}
