//! Next-holder selection.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use potato_token::{NodeId, PeerSet};

use crate::error::Result;

/// Chooses the next holder from a peer set snapshot.
pub trait PeerSelector {
    /// Pick one member. Fails with `EmptyPeerSet` when there is nobody to pick.
    fn select<'a>(&mut self, peers: &'a PeerSet) -> Result<&'a NodeId>;
}

impl<T: PeerSelector + ?Sized> PeerSelector for Box<T> {
    fn select<'a>(&mut self, peers: &'a PeerSet) -> Result<&'a NodeId> {
        (**self).select(peers)
    }
}

/// Uniform choice over every member, the local node included.
#[derive(Debug, Clone)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
}

impl RandomSelector<StdRng> {
    /// Seed from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Deterministic selector for reproducible games.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSelector<R> {
    /// Wrap an existing random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> PeerSelector for RandomSelector<R> {
    fn select<'a>(&mut self, peers: &'a PeerSet) -> Result<&'a NodeId> {
        peers
            .as_slice()
            .choose(&mut self.rng)
            .ok_or_else(|| potato_token::Error::EmptyPeerSet.into())
    }
}

/// Replays a fixed script of member indices, wrapping around at the end.
///
/// Indices are taken modulo the peer set size, so a script stays valid as
/// membership shrinks. An empty script always picks the first member.
#[derive(Debug, Clone, Default)]
pub struct SequenceSelector {
    script: Vec<usize>,
    cursor: usize,
}

impl SequenceSelector {
    /// Create a selector replaying `script`.
    pub fn new(script: Vec<usize>) -> Self {
        Self {
            script,
            cursor: 0,
        }
    }

    /// Number of selections made so far.
    #[must_use]
    pub fn selections(&self) -> usize {
        self.cursor
    }
}

impl PeerSelector for SequenceSelector {
    fn select<'a>(&mut self, peers: &'a PeerSet) -> Result<&'a NodeId> {
        if peers.is_empty() {
            return Err(potato_token::Error::EmptyPeerSet.into());
        }
        let index = match self.script.len() {
            0 => 0,
            n => self.script[self.cursor % n],
        };
        self.cursor += 1;
        peers
            .get(index % peers.len())
            .ok_or_else(|| potato_token::Error::EmptyPeerSet.into())
    }
}
