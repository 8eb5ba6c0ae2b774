//! Potato Node - a hot potato player.
//!
//! Wires the forward engine into the lifecycle of a peer node.
//!
//! # Architecture
//!
//! - **Config**: pass limit and delay from the environment, with change detection
//! - **Transport**: shared per-node slots holding the latest serialized token
//! - **Node**: explicit handlers for install, config, membership, token and start events
//! - **Cluster**: N nodes in one process, one blocking task per node
//!
//! # Example
//!
//! ```no_run
//! use potato_node::{Cluster, ClusterConfig, GameConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClusterConfig::new(3).with_game(GameConfig::new(Some(10), 0.0));
//!     let mut cluster = Cluster::launch(config)?;
//!     let report = cluster.play(0, "hello").await?;
//!     println!("{}", report.status);
//!     cluster.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod node;
pub mod transport;

pub use cluster::{Cluster, ClusterConfig, GameReport};
pub use config::{ConfigChange, ConfigStore, GameConfig};
pub use error::{Error, Result};
pub use node::{Handled, NodeEvent, PotatoNode};
pub use transport::{SlotChanged, Transport};
