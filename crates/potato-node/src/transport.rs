//! Shared per-node data slots.
//!
//! Every node owns one slot holding the most recent token it sent. A write
//! bumps the slot's version and announces itself on a broadcast channel so
//! the other nodes can go and read it. Versions let a reader tell a fresh
//! write from one it already handled.
//!
//! Slots are scoped to a game. Starting a new game empties every slot, and
//! from then on writes tagged with an earlier game are refused, so a token
//! still in flight from an abandoned game cannot come back.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, trace};

use potato_token::NodeId;

/// Notification that `writer` replaced the contents of its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChanged {
    pub writer: NodeId,
    pub version: u64,
}

/// Contents of one node's slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slot {
    /// Number of writes so far. Never reset.
    pub version: u64,
    /// Game the data belongs to.
    pub game: u64,
    /// Latest serialized token, or empty when nothing is pending.
    pub data: String,
}

#[derive(Debug, Default)]
struct Board {
    game: u64,
    slots: HashMap<NodeId, Slot>,
}

/// Handle to the shared slots. Clones share the same storage.
#[derive(Debug, Clone)]
pub struct Transport {
    board: Arc<RwLock<Board>>,
    changes: broadcast::Sender<SlotChanged>,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    /// Create an empty transport. The first game is game 0.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(1024);
        Self {
            board: Arc::new(RwLock::new(Board::default())),
            changes,
        }
    }

    /// Contents of `node`'s slot, if it ever wrote one.
    pub fn read(&self, node: &NodeId) -> Option<String> {
        self.read_slot(node).map(|slot| slot.data)
    }

    /// Contents, version and game of `node`'s slot.
    pub fn read_slot(&self, node: &NodeId) -> Option<Slot> {
        let board = self.board.read().unwrap_or_else(|e| e.into_inner());
        board.slots.get(node).cloned()
    }

    /// The game new writes must belong to.
    pub fn current_game(&self) -> u64 {
        self.board.read().unwrap_or_else(|e| e.into_inner()).game
    }

    /// Replace `node`'s slot with data from `game` and announce the change.
    ///
    /// Returns the new slot version, or `None` when `game` is no longer the
    /// current game. Refused writes change nothing and announce nothing.
    pub fn write(&self, node: &NodeId, game: u64, data: String) -> Option<u64> {
        let version = {
            let mut board = self.board.write().unwrap_or_else(|e| e.into_inner());
            if board.game != game {
                debug!(writer = %node, game, current = board.game, "Refusing write from an old game");
                return None;
            }
            let slot = board.slots.entry(node.clone()).or_default();
            slot.version += 1;
            slot.game = game;
            slot.data = data;
            slot.version
        };
        // Nobody listening is fine.
        let receivers = self
            .changes
            .send(SlotChanged {
                writer: node.clone(),
                version,
            })
            .unwrap_or(0);
        trace!(writer = %node, game, version, receivers, "Slot written");
        Some(version)
    }

    /// Start a new game: empty every slot without announcing anything and
    /// return the new game number. Versions are kept.
    pub fn begin_game(&self) -> u64 {
        let mut board = self.board.write().unwrap_or_else(|e| e.into_inner());
        board.game += 1;
        for slot in board.slots.values_mut() {
            slot.data.clear();
        }
        board.game
    }

    /// Listen for slot changes made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SlotChanged> {
        self.changes.subscribe()
    }
}
