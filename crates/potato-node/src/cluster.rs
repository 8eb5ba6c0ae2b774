//! In-process cluster of potato nodes sharing one transport.
//!
//! Each node runs on its own blocking task and drains its inbox one event at
//! a time, so a node pausing between hops never stalls the others. A router
//! task turns every slot write into a `TokenChanged` event for all other
//! nodes.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use potato_protocols::ForwardEngine;
use potato_token::NodeId;

use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::node::{Handled, NodeEvent, PotatoNode};
use crate::transport::{SlotChanged, Transport};

/// Configuration for a local cluster.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Number of nodes, named `unit/0` .. `unit/N-1`.
    pub nodes: usize,

    /// Settings pushed to every node at launch.
    pub game: GameConfig,

    /// Base seed for next-holder selection. Node `i` uses `seed + i`.
    /// `None` seeds every node from OS entropy.
    pub seed: Option<u64>,

    /// How long [`Cluster::play`] waits for a node to report completion.
    pub timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: 3,
            game: GameConfig::default(),
            seed: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClusterConfig {
    /// Create a config for `nodes` nodes.
    #[must_use]
    pub fn new(nodes: usize) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    /// Set the game settings.
    #[must_use]
    pub fn with_game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    /// Make selection deterministic per node.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the completion timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Completion reported by the node where the game ended.
#[derive(Debug, Clone, PartialEq)]
pub struct GameReport {
    pub node: NodeId,
    /// Transport game the finished token belonged to.
    pub game: u64,
    pub times_passed: u64,
    pub time_elapsed: f64,
    /// The node's status line at completion.
    pub status: String,
}

/// Inboxes the router fans slot changes out to.
type Routes = Arc<RwLock<Vec<(NodeId, mpsc::UnboundedSender<NodeEvent>)>>>;

struct NodeHandle {
    id: NodeId,
    inbox: mpsc::UnboundedSender<NodeEvent>,
    task: JoinHandle<()>,
}

impl NodeHandle {
    fn send(&self, event: NodeEvent) -> Result<()> {
        self.inbox
            .send(event)
            .map_err(|_| Error::NodeGone(self.id.clone()))
    }
}

/// A set of nodes playing over a shared transport.
pub struct Cluster {
    transport: Transport,
    nodes: Vec<NodeHandle>,
    reports: mpsc::UnboundedReceiver<GameReport>,
    routes: Routes,
    router: JoinHandle<()>,
    game: GameConfig,
    timeout: Duration,
}

impl Cluster {
    /// Start every node and introduce them to each other.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(config: ClusterConfig) -> Result<Self> {
        if config.nodes == 0 {
            return Err(Error::Config("cluster needs at least one node".into()));
        }
        config.game.validate()?;
        check_playable(config.nodes, &config.game)?;

        let transport = Transport::new();
        let changes = transport.subscribe();
        let (report_tx, reports) = mpsc::unbounded_channel();

        let ids: Vec<NodeId> = (0..config.nodes)
            .map(|i| NodeId::new(format!("unit/{}", i)))
            .collect();

        let mut nodes = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let engine = match config.seed {
                Some(seed) => ForwardEngine::seeded(seed.wrapping_add(i as u64)),
                None => ForwardEngine::from_entropy(),
            };
            let node = PotatoNode::with_engine(id.clone(), transport.clone(), engine);

            let (inbox, rx) = mpsc::unbounded_channel();
            let report_tx = report_tx.clone();
            let task = tokio::task::spawn_blocking(move || run_node(node, rx, report_tx));

            let handle = NodeHandle {
                id: id.clone(),
                inbox,
                task,
            };
            handle.send(NodeEvent::Install)?;
            handle.send(NodeEvent::ConfigChanged(config.game))?;
            for peer in ids.iter().filter(|peer| *peer != id) {
                handle.send(NodeEvent::PeerJoined(peer.clone()))?;
            }
            nodes.push(handle);
        }

        let routes: Routes = Arc::new(RwLock::new(
            nodes
                .iter()
                .map(|n| (n.id.clone(), n.inbox.clone()))
                .collect(),
        ));
        let router = tokio::spawn(route_changes(changes, Arc::clone(&routes)));

        info!(nodes = nodes.len(), game = ?config.game, "Cluster launched");

        Ok(Self {
            transport,
            nodes,
            reports,
            routes,
            router,
            game: config.game,
            timeout: config.timeout,
        })
    }

    /// Identifiers of the running nodes.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// The shared transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Push new settings to every node.
    pub fn configure(&mut self, game: GameConfig) -> Result<()> {
        game.validate()?;
        for node in &self.nodes {
            node.send(NodeEvent::ConfigChanged(game))?;
        }
        self.game = game;
        Ok(())
    }

    /// Stop the node at `index` and tell the others it left.
    pub async fn leave(&mut self, index: usize) -> Result<NodeId> {
        if index >= self.nodes.len() {
            return Err(Error::UnknownNode(index));
        }
        let NodeHandle { id, inbox, task } = self.nodes.remove(index);
        self.routes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(route, _)| *route != id);
        drop(inbox);
        if let Err(e) = task.await {
            warn!(node = %id, error = %e, "Node task failed");
        }

        for node in &self.nodes {
            node.send(NodeEvent::PeerDeparted(id.clone()))?;
        }
        Ok(id)
    }

    /// Start a game on the node at `starter` and wait for it to finish.
    ///
    /// Each call begins a new transport game. A token still moving from an
    /// earlier game, e.g. one that timed out, is dropped at its next
    /// hand-off and its completion is never reported for this game.
    pub async fn play(&mut self, starter: usize, message: impl Into<String>) -> Result<GameReport> {
        let handle = self.nodes.get(starter).ok_or(Error::UnknownNode(starter))?;
        check_playable(self.nodes.len(), &self.game)?;

        let game = self.transport.begin_game();
        while let Ok(stale) = self.reports.try_recv() {
            debug!(node = %stale.node, game = stale.game, "Discarding stale game report");
        }

        handle.send(NodeEvent::Start {
            message: message.into(),
        })?;

        let reports = &mut self.reports;
        let wait = async {
            while let Some(report) = reports.recv().await {
                if report.game == game {
                    return Some(report);
                }
                debug!(node = %report.node, game = report.game, "Discarding report from an old game");
            }
            None
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(Some(report)) => Ok(report),
            Ok(None) => Err(Error::NodeGone(handle.id.clone())),
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    /// Stop routing and wait for every node to drain its inbox.
    pub async fn shutdown(self) {
        let Self {
            nodes,
            routes,
            router,
            ..
        } = self;

        router.abort();
        let _ = router.await;
        // The routing table holds a sender for every inbox.
        drop(routes);

        for NodeHandle { id, inbox, task } in nodes {
            drop(inbox);
            if let Err(e) = task.await {
                warn!(node = %id, error = %e, "Node task failed");
            }
        }
        debug!("Cluster stopped");
    }
}

/// A lone node without a pass limit would hand the token to itself forever
/// on a blocking thread that could never be stopped.
fn check_playable(nodes: usize, game: &GameConfig) -> Result<()> {
    if nodes == 1 && game.max_passes.is_none() {
        return Err(Error::Config("a single-node game needs a pass limit".into()));
    }
    Ok(())
}

/// Node event loop. Runs until the inbox closes.
fn run_node(
    mut node: PotatoNode,
    mut inbox: mpsc::UnboundedReceiver<NodeEvent>,
    reports: mpsc::UnboundedSender<GameReport>,
) {
    while let Some(event) = inbox.blocking_recv() {
        match node.handle(event) {
            Ok(Handled::Completed {
                times_passed,
                time_elapsed,
            }) => {
                info!(node = %node.id(), times_passed, time_elapsed, "Game complete");
                let report = GameReport {
                    node: node.id().clone(),
                    game: node.game(),
                    times_passed,
                    time_elapsed,
                    status: node.status(),
                };
                if reports.send(report).is_err() {
                    debug!(node = %node.id(), "Nobody waiting for the game report");
                }
            }
            Ok(handled) => trace!(node = %node.id(), ?handled, "Event handled"),
            Err(e) => warn!(node = %node.id(), error = %e, "Event handling failed"),
        }
    }
    debug!(node = %node.id(), "Node stopped");
}

/// Fan slot writes out to every node except the writer.
async fn route_changes(mut changes: broadcast::Receiver<SlotChanged>, routes: Routes) {
    loop {
        match changes.recv().await {
            Ok(SlotChanged { writer, .. }) => {
                let targets = routes.read().unwrap_or_else(|e| e.into_inner());
                for (id, inbox) in targets.iter().filter(|(id, _)| *id != writer) {
                    let event = NodeEvent::TokenChanged {
                        writer: writer.clone(),
                    };
                    if inbox.send(event).is_err() {
                        debug!(node = %id, "Skipping stopped node");
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Slot notifications dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETED: &str = "Maximum passes reached. Time to completion is";

    #[tokio::test]
    async fn three_nodes_complete_game() {
        let config = ClusterConfig::new(3)
            .with_game(GameConfig::new(Some(10), 0.0))
            .with_seed(42)
            .with_timeout(Duration::from_secs(10));
        let mut cluster = Cluster::launch(config).unwrap();

        let report = cluster.play(0, "hot").await.unwrap();
        assert_eq!(report.times_passed, 10);
        assert!(report.time_elapsed >= 0.0);
        assert!(report.status.starts_with(COMPLETED), "status: {}", report.status);
        assert!(cluster.node_ids().contains(&report.node));

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn lone_node_plays_alone() {
        let config = ClusterConfig::new(1)
            .with_game(GameConfig::new(Some(5), 0.0))
            .with_timeout(Duration::from_secs(10));
        let mut cluster = Cluster::launch(config).unwrap();

        let report = cluster.play(0, "solo").await.unwrap();
        assert_eq!(report.node, "unit/0");
        assert_eq!(report.times_passed, 5);

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn zero_passes_ends_on_first_holder() {
        let config = ClusterConfig::new(4)
            .with_game(GameConfig::new(Some(0), 0.0))
            .with_seed(1)
            .with_timeout(Duration::from_secs(10));
        let mut cluster = Cluster::launch(config).unwrap();

        let report = cluster.play(2, "quick").await.unwrap();
        assert_eq!(report.times_passed, 0);
        assert_eq!(report.time_elapsed, 0.0);

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn games_can_be_replayed() {
        let config = ClusterConfig::new(2)
            .with_game(GameConfig::new(Some(4), 0.0))
            .with_seed(9)
            .with_timeout(Duration::from_secs(10));
        let mut cluster = Cluster::launch(config).unwrap();

        assert_eq!(cluster.play(0, "first").await.unwrap().times_passed, 4);

        cluster.configure(GameConfig::new(Some(7), 0.0)).unwrap();
        assert_eq!(cluster.play(1, "second").await.unwrap().times_passed, 7);

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn delay_counts_towards_elapsed_time() {
        let config = ClusterConfig::new(2)
            .with_game(GameConfig::new(Some(3), 0.01))
            .with_seed(5)
            .with_timeout(Duration::from_secs(10));
        let mut cluster = Cluster::launch(config).unwrap();

        let report = cluster.play(0, "slow").await.unwrap();
        assert_eq!(report.times_passed, 3);
        assert!(report.time_elapsed >= 0.02, "elapsed {}", report.time_elapsed);

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn unbounded_game_times_out() {
        let config = ClusterConfig::new(2)
            .with_seed(3)
            .with_timeout(Duration::from_millis(50));
        let mut cluster = Cluster::launch(config).unwrap();

        let err = cluster.play(0, "forever").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn timed_out_game_does_not_outlive_the_next_one() {
        let config = ClusterConfig::new(2)
            .with_game(GameConfig::new(None, 0.02))
            .with_seed(8)
            .with_timeout(Duration::from_millis(300));
        let mut cluster = Cluster::launch(config).unwrap();

        let err = cluster.play(0, "forever").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));

        cluster.configure(GameConfig::new(Some(4), 0.0)).unwrap();
        let report = cluster.play(1, "second").await.unwrap();
        assert_eq!(report.times_passed, 4);
        assert_eq!(report.game, cluster.transport().current_game());

        // A finished game writes nothing more. A surviving token from the
        // first game would keep overwriting slots.
        let mut writes = cluster.transport().subscribe();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(writes.try_recv().is_err());

        for id in cluster.node_ids() {
            let data = cluster.transport().read(&id).unwrap_or_default();
            assert!(!data.contains("forever"), "{} still holds {}", id, data);
        }

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn departed_node_is_never_picked() {
        let config = ClusterConfig::new(3)
            .with_game(GameConfig::new(Some(6), 0.0))
            .with_seed(11)
            .with_timeout(Duration::from_secs(10));
        let mut cluster = Cluster::launch(config).unwrap();

        let gone = cluster.leave(2).await.unwrap();
        assert_eq!(gone, "unit/2");
        assert_eq!(cluster.node_ids().len(), 2);

        let report = cluster.play(0, "two left").await.unwrap();
        assert_eq!(report.times_passed, 6);
        assert_ne!(report.node, gone);

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn bad_arguments() {
        assert!(matches!(
            Cluster::launch(ClusterConfig::new(0)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Cluster::launch(ClusterConfig::new(2).with_game(GameConfig::new(None, -1.0))),
            Err(Error::Config(_))
        ));

        assert!(matches!(
            Cluster::launch(ClusterConfig::new(1)),
            Err(Error::Config(_))
        ));

        let mut cluster = Cluster::launch(ClusterConfig::new(2)).unwrap();
        assert!(matches!(
            cluster.play(5, "nobody").await,
            Err(Error::UnknownNode(5))
        ));
        assert!(matches!(cluster.leave(5).await, Err(Error::UnknownNode(5))));

        cluster.leave(1).await.unwrap();
        assert!(matches!(
            cluster.play(0, "alone forever").await,
            Err(Error::Config(_))
        ));
        cluster.shutdown().await;
    }
}
