//! Potato Node - one player in the game.
//!
//! Each lifecycle callback is an explicit handler taking the inputs it needs.
//! Handlers run one at a time on the node; a handler that forwards the token
//! blocks for the configured delay on every hop it commits.

use std::collections::HashMap;

use tracing::{debug, info};

use potato_protocols::{
    Clock, EngineState, ForwardEngine, Outcome, PeerSelector, RandomSelector, Status, SystemClock,
};
use potato_token::{decode_slot, JsonCodec, NodeId, PeerSet, Token, TokenCodec};

use crate::config::{ConfigStore, GameConfig};
use crate::error::Result;
use crate::transport::Transport;

/// Something that happened to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// The node came up.
    Install,
    /// The operator changed the game settings.
    ConfigChanged(GameConfig),
    /// A peer entered the game.
    PeerJoined(NodeId),
    /// A peer left the game.
    PeerDeparted(NodeId),
    /// `writer` updated its slot.
    TokenChanged { writer: NodeId },
    /// The operator asked this node to start a game.
    Start { message: String },
}

/// What a handler did.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// Bookkeeping only.
    Done,
    /// The writer's slot was absent or empty.
    NoToken,
    /// This slot version was already handled.
    Duplicate,
    /// The token is held by another node.
    Ignored,
    /// The token belongs to a game that has since been replaced. Dropped.
    Stale,
    /// A token addressed to `to` was written to this node's slot.
    Forwarded { to: NodeId, times_passed: u64 },
    /// The game ended on this node.
    Completed { times_passed: u64, time_elapsed: f64 },
}

/// A hot potato player.
#[derive(Debug)]
pub struct PotatoNode<S = RandomSelector, C = SystemClock> {
    id: NodeId,
    peers: PeerSet,
    config: ConfigStore,
    status: Status,
    engine: ForwardEngine<S, C>,
    codec: JsonCodec,
    transport: Transport,
    /// Highest slot version handled per writer.
    delivered: HashMap<NodeId, u64>,
    /// Game of the last token this node acted on.
    game: u64,
}

impl PotatoNode {
    /// Create a node with an OS-seeded engine.
    pub fn new(id: NodeId, transport: Transport) -> Self {
        Self::with_engine(id, transport, ForwardEngine::from_entropy())
    }
}

impl<S: PeerSelector, C: Clock> PotatoNode<S, C> {
    /// Create a node around an existing engine.
    pub fn with_engine(id: NodeId, transport: Transport, engine: ForwardEngine<S, C>) -> Self {
        let peers = PeerSet::with_local(id.clone(), std::iter::empty());
        Self {
            id,
            peers,
            config: ConfigStore::new(),
            status: Status::Idle,
            engine,
            codec: JsonCodec,
            transport,
            delivered: HashMap::new(),
            game: 0,
        }
    }

    /// This node's identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Current membership, this node first.
    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    /// Current settings.
    pub fn config(&self) -> GameConfig {
        self.config.current()
    }

    /// Status line shown to an observer.
    pub fn status(&self) -> String {
        self.status.to_string()
    }

    /// Structured status.
    pub fn current_status(&self) -> &Status {
        &self.status
    }

    /// Game of the last token this node acted on.
    pub fn game(&self) -> u64 {
        self.game
    }

    /// State of the forward engine after its last step.
    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Dispatch an event to its handler.
    pub fn handle(&mut self, event: NodeEvent) -> Result<Handled> {
        match event {
            NodeEvent::Install => Ok(self.on_install()),
            NodeEvent::ConfigChanged(config) => Ok(self.on_config_changed(&config)),
            NodeEvent::PeerJoined(peer) => Ok(self.on_peer_joined(peer)),
            NodeEvent::PeerDeparted(peer) => Ok(self.on_peer_departed(&peer)),
            NodeEvent::TokenChanged { writer } => self.on_token_changed(&writer),
            NodeEvent::Start { message } => self.on_start(message),
        }
    }

    pub fn on_install(&mut self) -> Handled {
        self.status = Status::Idle;
        Handled::Done
    }

    pub fn on_config_changed(&mut self, config: &GameConfig) -> Handled {
        self.config.apply(config);
        Handled::Done
    }

    pub fn on_peer_joined(&mut self, peer: NodeId) -> Handled {
        info!("{}: Hello {}!", self.id, peer);
        self.peers.insert(peer);
        Handled::Done
    }

    pub fn on_peer_departed(&mut self, peer: &NodeId) -> Handled {
        info!("{}: Goodbye {}!", self.id, peer);
        if *peer != self.id {
            self.peers.remove(peer);
        }
        Handled::Done
    }

    /// Read `writer`'s slot and run the forward engine on what is there.
    ///
    /// Each slot version is handled at most once, so a late notification
    /// cannot replay a token this node already acted on. Tokens from a game
    /// other than the transport's current one are dropped.
    pub fn on_token_changed(&mut self, writer: &NodeId) -> Result<Handled> {
        let Some(slot) = self.transport.read_slot(writer) else {
            info!(writer = %writer, "No token present in slot");
            return Ok(Handled::NoToken);
        };

        let seen = self.delivered.entry(writer.clone()).or_insert(0);
        if slot.version <= *seen {
            debug!(writer = %writer, version = slot.version, "Slot version already handled");
            return Ok(Handled::Duplicate);
        }
        *seen = slot.version;

        let current = self.transport.current_game();
        if slot.game != current {
            debug!(writer = %writer, game = slot.game, current, "Dropping token from an old game");
            return Ok(Handled::Stale);
        }

        let Some(token) = decode_slot(&self.codec, Some(&slot.data))? else {
            info!(writer = %writer, "No token present in slot");
            return Ok(Handled::NoToken);
        };
        self.game = slot.game;

        let outcome = self.engine.forward(
            token,
            &self.peers,
            &self.id,
            &self.config.pass_config(),
            &mut self.status,
        )?;

        match outcome {
            Outcome::Completed { token } => Ok(completed(&token)),
            Outcome::NotHolder { .. } => Ok(Handled::Ignored),
            Outcome::Transmit { token, hops } => {
                debug!(node = %self.id, to = %token.holder, hops, "Forwarding token");
                if !self.publish(&token)? {
                    return Ok(Handled::Stale);
                }
                Ok(forwarded(&token))
            }
        }
    }

    /// Start a game with `message`: build the first token, play any hops
    /// that land on this node, then publish the token.
    pub fn on_start(&mut self, message: impl Into<String>) -> Result<Handled> {
        info!("Constructing message and mapping peer topology.");
        self.game = self.transport.current_game();
        let token = self.engine.initiate(message, &self.peers)?;

        let outcome = self.engine.forward(
            token,
            &self.peers,
            &self.id,
            &self.config.pass_config(),
            &mut self.status,
        )?;

        let handled = match &outcome {
            Outcome::Completed { token } => completed(token),
            Outcome::NotHolder { token } | Outcome::Transmit { token, .. } => forwarded(token),
        };
        if !self.publish(&outcome.into_token())? {
            return Ok(Handled::Stale);
        }
        Ok(handled)
    }

    /// Write `token` to this node's slot. `false` when the game it belongs
    /// to has been replaced.
    fn publish(&self, token: &Token) -> Result<bool> {
        let data = self.codec.encode(token)?;
        Ok(self.transport.write(&self.id, self.game, data).is_some())
    }
}

fn completed(token: &Token) -> Handled {
    Handled::Completed {
        times_passed: token.times_passed,
        time_elapsed: token.time_elapsed,
    }
}

fn forwarded(token: &Token) -> Handled {
    Handled::Forwarded {
        to: token.holder.clone(),
        times_passed: token.times_passed,
    }
}
