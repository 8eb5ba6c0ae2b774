//! Game configuration and change detection.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use potato_protocols::PassConfig;

use crate::error::{Error, Result};

/// Operator-facing game settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GameConfig {
    /// Hops before the game ends. `None` plays forever.
    #[serde(default)]
    pub max_passes: Option<u64>,

    /// Seconds to pause on every hop.
    #[serde(default)]
    pub delay: f64,
}

impl GameConfig {
    /// Create a config.
    pub fn new(max_passes: Option<u64>, delay: f64) -> Self {
        Self { max_passes, delay }
    }

    /// Read `POTATO_MAX_PASSES` and `POTATO_DELAY`, defaulting to an
    /// unbounded game without delay.
    pub fn from_env() -> Result<Self> {
        let max_passes = std::env::var("POTATO_MAX_PASSES").ok();
        let delay = std::env::var("POTATO_DELAY").ok();
        Self::from_vars(max_passes.as_deref(), delay.as_deref())
    }

    /// Parse raw variable values. Empty values count as unset.
    pub fn from_vars(max_passes: Option<&str>, delay: Option<&str>) -> Result<Self> {
        let max_passes = match max_passes.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| Error::Config(format!("max passes {:?}: {}", raw, e)))?,
            ),
        };

        let delay = match delay.map(str::trim) {
            None | Some("") => 0.0,
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|e| Error::Config(format!("delay {:?}: {}", raw, e)))?,
        };

        let config = Self { max_passes, delay };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON settings document, e.g. `{"max-passes": 10, "delay": 0.5}`.
    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(data).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the delay is a non-negative number of seconds.
    pub fn validate(&self) -> Result<()> {
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(Error::Config(format!(
                "delay must be a non-negative number of seconds, got {}",
                self.delay
            )));
        }
        Ok(())
    }
}

/// A setting that changed on [`ConfigStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigChange {
    MaxPasses(Option<u64>),
    Delay(f64),
}

/// The values a node currently plays with.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    current: GameConfig,
}

impl ConfigStore {
    /// Create a store holding the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings.
    pub fn current(&self) -> GameConfig {
        self.current
    }

    /// Take on `incoming`, reporting only the values that differ.
    pub fn apply(&mut self, incoming: &GameConfig) -> Vec<ConfigChange> {
        let mut changes = Vec::new();

        if incoming.max_passes != self.current.max_passes {
            match incoming.max_passes {
                Some(n) => info!("Updating max passes to {}.", n),
                None => info!("Updating max passes to unbounded."),
            }
            self.current.max_passes = incoming.max_passes;
            changes.push(ConfigChange::MaxPasses(incoming.max_passes));
        }
        if incoming.delay != self.current.delay {
            info!("Updating total delay to {}.", incoming.delay);
            self.current.delay = incoming.delay;
            changes.push(ConfigChange::Delay(incoming.delay));
        }

        changes
    }

    /// Settings in the form the forward engine consumes.
    pub fn pass_config(&self) -> PassConfig {
        PassConfig::new(self.current.max_passes, Duration::ZERO).with_delay_secs(self.current.delay)
    }
}
