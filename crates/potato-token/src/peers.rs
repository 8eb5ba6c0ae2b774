//! Peer topology snapshot.

use crate::error::{Error, Result};
use crate::NodeId;

/// Ordered set of node identifiers taking part in a game.
///
/// Membership changes over time, but each forward step works on a
/// point-in-time snapshot. Insertion order is preserved and duplicates are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSet {
    members: Vec<NodeId>,
}

impl PeerSet {
    /// Create an empty peer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set as seen from `local`: the local node first, then
    /// every remote peer in arrival order.
    pub fn with_local<I>(local: NodeId, remotes: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut set = Self::new();
        set.insert(local);
        set.extend(remotes);
        set
    }

    /// Add a member. Returns false if it was already present.
    pub fn insert(&mut self, id: NodeId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.members.push(id);
        true
    }

    /// Remove a member. Returns false if it was not present.
    pub fn remove(&mut self, id: &NodeId) -> bool {
        match self.members.iter().position(|m| m == id) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Check membership.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.members.iter().any(|m| m == id)
    }

    /// Member at `index`, in insertion order.
    pub fn get(&self, index: usize) -> Option<&NodeId> {
        self.members.get(index)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate members in order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.members.iter()
    }

    /// Members as a slice.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.members
    }

    /// Check that a forward step on `local` can run against this snapshot.
    pub fn validate_for(&self, local: &NodeId) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyPeerSet);
        }
        if !self.contains(local) {
            return Err(Error::NotInPeerSet(local.clone()));
        }
        Ok(())
    }
}

impl Extend<NodeId> for PeerSet {
    fn extend<T: IntoIterator<Item = NodeId>>(&mut self, iter: T) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl FromIterator<NodeId> for PeerSet {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> FromIterator<&'a str> for PeerSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().map(NodeId::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_comes_first() {
        let set = PeerSet::with_local("unit/1".into(), ["unit/0".into(), "unit/2".into()]);
        let order: Vec<_> = set.iter().map(NodeId::as_str).collect();
        assert_eq!(order, ["unit/1", "unit/0", "unit/2"]);
    }

    #[test]
    fn duplicates_dropped() {
        let set: PeerSet = ["A", "B", "A", "B", "C"].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn insert_and_remove() {
        let mut set = PeerSet::new();
        assert!(set.insert("A".into()));
        assert!(!set.insert("A".into()));
        assert!(set.insert("B".into()));

        assert!(set.remove(&"A".into()));
        assert!(!set.remove(&"A".into()));
        assert_eq!(set.as_slice(), &[NodeId::from("B")]);
    }

    #[test]
    fn validate_empty() {
        let set = PeerSet::new();
        assert!(matches!(set.validate_for(&"A".into()), Err(Error::EmptyPeerSet)));
    }

    #[test]
    fn validate_missing_local() {
        let set: PeerSet = ["B", "C"].into_iter().collect();
        match set.validate_for(&"A".into()) {
            Err(Error::NotInPeerSet(id)) => assert_eq!(id, "A"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn validate_ok() {
        let set: PeerSet = ["A", "B"].into_iter().collect();
        assert!(set.validate_for(&"A".into()).is_ok());
    }
}
