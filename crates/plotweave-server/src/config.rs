use plotweave_common::{PlotError, Result};
use plotweave_world::{AreaConfig, PlotArea};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "plotweave.json";

/// How a world's chunks are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSpec {
    #[default]
    Replacing,
    /// Plots are laid over flat terrain of `foreign_height`
    Augmenting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSpec {
    pub area: AreaConfig,
    pub mode: ModeSpec,
    /// Chunks generated in every direction around chunk (0, 0)
    pub radius: i32,
    /// `key=value` area modifiers applied on top of `area`
    pub modifiers: Vec<String>,
    pub foreign_height: i32,
}

impl Default for WorldSpec {
    fn default() -> Self {
        WorldSpec {
            area: AreaConfig::default(),
            mode: ModeSpec::Replacing,
            radius: 4,
            modifiers: Vec::new(),
            foreign_height: 60,
        }
    }
}

impl WorldSpec {
    /// Validated plot area of this world
    pub fn build_area(&self, world: &str) -> Result<PlotArea> {
        if self.radius < 0 {
            return Err(PlotError::ConfigurationError(format!(
                "radius of world {} must not be negative",
                world
            )));
        }
        let mut config = self.area.clone();
        config.apply_modifiers(self.modifiers.iter().map(String::as_str))?;
        PlotArea::new(world, config)
    }

    pub fn chunk_count(&self) -> usize {
        let side = (self.radius.max(0) * 2 + 1) as usize;
        side * side
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Milliseconds between two flushes of the block queues
    pub flush_interval_ms: u64,
    pub worlds: BTreeMap<String, WorldSpec>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mut worlds = BTreeMap::new();
        worlds.insert("plotworld".to_owned(), WorldSpec::default());
        ServerConfig {
            flush_interval_ms: 50,
            worlds,
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ServerConfig = serde_json::from_str(json)?;
        if config.flush_interval_ms == 0 {
            return Err(PlotError::ConfigurationError(
                "flush_interval_ms must be positive".to_owned(),
            ));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        ServerConfig::from_json(&json)
    }
}
