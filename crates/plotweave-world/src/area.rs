use crate::block::{biome_id, BlockBucket, BlockState};
use crate::chunk::WORLD_HEIGHT;
use plotweave_common::{PlotError, PlotId, Result};
use serde::{Deserialize, Serialize};

/// How much of an area's non-plot space is left to a foreign generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainMode {
    /// Plots, walls and roads are all generated
    #[default]
    None,
    /// Plots and walls are generated, roads keep foreign terrain
    Partial,
    /// Only plot bodies are generated
    All,
}

impl TerrainMode {
    pub fn from_name(name: &str) -> Option<TerrainMode> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(TerrainMode::None),
            "partial" => Some(TerrainMode::Partial),
            "all" => Some(TerrainMode::All),
            _ => None,
        }
    }
}

/// Parsed area settings as found in world configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub plot_size: i32,
    pub road_width: i32,
    pub plot_height: i32,
    pub road_height: i32,
    pub wall_height: i32,
    pub bedrock: bool,
    pub floor: BlockBucket,
    pub main: BlockBucket,
    pub wall_filling: BlockBucket,
    pub wall_border: BlockBucket,
    pub road: BlockBucket,
    pub biome: String,
    pub terrain: TerrainMode,
    pub min: Option<PlotId>,
    pub max: Option<PlotId>,
    pub road_offset_x: i32,
    pub road_offset_z: i32,
}

impl Default for AreaConfig {
    fn default() -> Self {
        AreaConfig {
            plot_size: 32,
            road_width: 7,
            plot_height: 64,
            road_height: 64,
            wall_height: 65,
            bedrock: true,
            floor: BlockBucket::single(BlockState::GRASS_BLOCK),
            main: BlockBucket::single(BlockState::DIRT),
            wall_filling: BlockBucket::single(BlockState::STONE),
            wall_border: BlockBucket::single(BlockState::STONE_SLAB),
            road: BlockBucket::single(BlockState::QUARTZ_BLOCK),
            biome: "plains".to_owned(),
            terrain: TerrainMode::None,
            min: None,
            max: None,
            road_offset_x: 0,
            road_offset_z: 0,
        }
    }
}

fn parse_int(key: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| {
            PlotError::ConfigurationError(format!("{} expects a number, got '{}'", key, value))
        })
}

impl AreaConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn period(&self) -> i32 {
        self.plot_size + self.road_width
    }

    /// Applies one `key=value` modifier from the area creation syntax
    pub fn apply_modifier(&mut self, key: &str, value: &str) -> Result<()> {
        match key.trim().to_ascii_lowercase().as_str() {
            "s" | "size" => self.plot_size = parse_int(key, value)?,
            "g" | "gap" => self.road_width = parse_int(key, value)?,
            "h" | "height" => {
                let height = parse_int(key, value)?;
                self.plot_height = height;
                self.road_height = height;
                self.wall_height = height + 1;
            }
            "f" | "floor" => self.floor = BlockBucket::parse(value)?,
            "m" | "main" => self.main = BlockBucket::parse(value)?,
            "w" | "wall" => self.wall_filling = BlockBucket::parse(value)?,
            "b" | "border" => self.wall_border = BlockBucket::parse(value)?,
            "road" => self.road = BlockBucket::parse(value)?,
            "terrain" => {
                self.terrain = TerrainMode::from_name(value).ok_or_else(|| {
                    PlotError::ConfigurationError(format!("{} is not a valid terrain", value))
                })?
            }
            "bedrock" => {
                self.bedrock = value.trim().parse::<bool>().map_err(|_| {
                    let msg = format!("bedrock expects true/false, got '{}'", value);
                    PlotError::ConfigurationError(msg)
                })?
            }
            "biome" => {
                biome_id(value).ok_or_else(|| {
                    PlotError::ConfigurationError(format!("unknown biome '{}'", value))
                })?;
                self.biome = value.trim().to_owned();
            }
            other => {
                return Err(PlotError::ConfigurationError(format!(
                    "unknown area modifier '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Applies a list of `key=value` modifiers
    pub fn apply_modifiers<'a>(
        &mut self,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                PlotError::ConfigurationError(format!("expected <modifier>=<value>, got '{}'", arg))
            })?;
            self.apply_modifier(key, value)?;
        }
        Ok(())
    }

    /// Bounds and offsets the area so its plots cover the rectangle spanned by two corners.
    pub fn fit_to_region(&mut self, pos1: (i32, i32), pos2: (i32, i32)) {
        let period = self.period().max(1);
        let dx = (pos1.0 - pos2.0).abs();
        let dz = (pos1.1 - pos2.1).abs();
        let num_x = ((dx + 1 + self.road_width + period / 2) / period).max(1);
        let num_z = ((dz + 1 + self.road_width + period / 2) / period).max(1);
        let ddx = dx - (num_x * period - self.road_width);
        let ddz = dz - (num_z * period - self.road_width);
        let bottom_x = pos1.0.min(pos2.0) + ddx;
        let bottom_z = pos1.1.min(pos2.1) + ddz;

        self.min = Some(PlotId::new(0, 0));
        self.max = Some(PlotId::new(num_x - 1, num_z - 1));
        // Plot (0,0) starts right after the first road band
        self.road_offset_x = bottom_x - self.road_width + self.road_width / 2;
        self.road_offset_z = bottom_z - self.road_width + self.road_width / 2;
    }
}

/// Immutable plot layout of one world, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArea {
    world: String,
    plot_size: i32,
    road_width: i32,
    plot_height: i32,
    road_height: i32,
    wall_height: i32,
    bedrock: bool,
    floor: BlockBucket,
    main: BlockBucket,
    wall_filling: BlockBucket,
    wall_border: BlockBucket,
    road: BlockBucket,
    biome: i32,
    terrain: TerrainMode,
    bounds: Option<(PlotId, PlotId)>,
    road_offset_x: i32,
    road_offset_z: i32,
}

fn check_height(name: &str, value: i32, max: i32) -> Result<()> {
    if value < 1 || value > max {
        return Err(PlotError::ConfigurationError(format!(
            "{} must be within 1..={}, got {}",
            name, max, value
        )));
    }
    Ok(())
}

impl PlotArea {
    pub fn new(world: impl Into<String>, config: AreaConfig) -> Result<Self> {
        let world = world.into();
        if config.plot_size <= 0 {
            return Err(PlotError::ConfigurationError(format!(
                "plot_size must be positive, got {}",
                config.plot_size
            )));
        }
        if config.road_width < 0 {
            return Err(PlotError::ConfigurationError(format!(
                "road_width must not be negative, got {}",
                config.road_width
            )));
        }
        check_height("plot_height", config.plot_height, WORLD_HEIGHT - 1)?;
        check_height("road_height", config.road_height, WORLD_HEIGHT - 1)?;
        check_height("wall_height", config.wall_height, WORLD_HEIGHT - 1)?;

        let biome = biome_id(&config.biome).ok_or_else(|| {
            PlotError::ConfigurationError(format!("unknown biome '{}'", config.biome))
        })?;

        let bounds = match (config.min, config.max) {
            (Some(min), Some(max)) => {
                if min.x > max.x || min.z > max.z {
                    return Err(PlotError::ConfigurationError(format!(
                        "min plot {} is not below max plot {}",
                        min, max
                    )));
                }
                Some((min, max))
            }
            (None, None) => None,
            _ => {
                return Err(PlotError::ConfigurationError(
                    "min and max must be given together".to_owned(),
                ))
            }
        };

        Ok(PlotArea {
            world,
            plot_size: config.plot_size,
            road_width: config.road_width,
            plot_height: config.plot_height,
            road_height: config.road_height,
            wall_height: config.wall_height,
            bedrock: config.bedrock,
            floor: config.floor,
            main: config.main,
            wall_filling: config.wall_filling,
            wall_border: config.wall_border,
            road: config.road,
            biome,
            terrain: config.terrain,
            bounds,
            road_offset_x: config.road_offset_x,
            road_offset_z: config.road_offset_z,
        })
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn plot_size(&self) -> i32 {
        self.plot_size
    }

    pub fn road_width(&self) -> i32 {
        self.road_width
    }

    /// Edge length of one grid cell (plot body plus the gap before it)
    pub fn period(&self) -> i32 {
        self.plot_size + self.road_width
    }

    pub fn plot_height(&self) -> i32 {
        self.plot_height
    }

    pub fn road_height(&self) -> i32 {
        self.road_height
    }

    pub fn wall_height(&self) -> i32 {
        self.wall_height
    }

    pub fn bedrock(&self) -> bool {
        self.bedrock
    }

    pub fn floor(&self) -> &BlockBucket {
        &self.floor
    }

    pub fn main(&self) -> &BlockBucket {
        &self.main
    }

    pub fn wall_filling(&self) -> &BlockBucket {
        &self.wall_filling
    }

    pub fn wall_border(&self) -> &BlockBucket {
        &self.wall_border
    }

    pub fn road(&self) -> &BlockBucket {
        &self.road
    }

    pub fn biome(&self) -> i32 {
        self.biome
    }

    pub fn terrain(&self) -> TerrainMode {
        self.terrain
    }

    pub fn bounds(&self) -> Option<(PlotId, PlotId)> {
        self.bounds
    }

    pub fn road_offset_x(&self) -> i32 {
        self.road_offset_x
    }

    pub fn road_offset_z(&self) -> i32 {
        self.road_offset_z
    }

    /// Whether a plot id lies inside the area's bounds
    pub fn contains(&self, id: PlotId) -> bool {
        match self.bounds {
            Some((min, max)) => {
                (min.x..=max.x).contains(&id.x) && (min.z..=max.z).contains(&id.z)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults_are_valid() {
        let area = PlotArea::new("plotworld", AreaConfig::default()).unwrap();
        assert_eq!(area.period(), 39);
        assert_eq!(area.biome(), 1);
        assert!(area.contains(PlotId::new(-1000, 1000)));
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let config = AreaConfig {
            plot_size: 0,
            ..AreaConfig::default()
        };
        assert_matches!(
            PlotArea::new("w", config),
            Err(PlotError::ConfigurationError(_))
        );
        let config = AreaConfig {
            road_width: -1,
            ..AreaConfig::default()
        };
        assert_matches!(
            PlotArea::new("w", config),
            Err(PlotError::ConfigurationError(_))
        );
        let config = AreaConfig {
            plot_height: WORLD_HEIGHT,
            ..AreaConfig::default()
        };
        assert_matches!(
            PlotArea::new("w", config),
            Err(PlotError::ConfigurationError(_))
        );
    }

    #[test]
    fn test_rejects_half_bounds_and_inverted_bounds() {
        let config = AreaConfig {
            min: Some(PlotId::new(0, 0)),
            ..AreaConfig::default()
        };
        assert_matches!(
            PlotArea::new("w", config),
            Err(PlotError::ConfigurationError(_))
        );
        let config = AreaConfig {
            min: Some(PlotId::new(2, 0)),
            max: Some(PlotId::new(1, 5)),
            ..AreaConfig::default()
        };
        assert_matches!(
            PlotArea::new("w", config),
            Err(PlotError::ConfigurationError(_))
        );
    }

    #[test]
    fn test_bounded_contains() {
        let config = AreaConfig {
            min: Some(PlotId::new(0, 0)),
            max: Some(PlotId::new(2, 1)),
            ..AreaConfig::default()
        };
        let area = PlotArea::new("w", config).unwrap();
        assert!(area.contains(PlotId::new(2, 1)));
        assert!(!area.contains(PlotId::new(3, 1)));
        assert!(!area.contains(PlotId::new(0, -1)));
    }

    #[test]
    fn test_json_with_partial_fields() {
        let config = AreaConfig::from_json(
            r#"{ "plot_size": 20, "road_width": 4, "floor": "stone:2,andesite", "terrain": "partial" }"#,
        )
        .unwrap();
        assert_eq!(config.plot_size, 20);
        assert_eq!(config.road_width, 4);
        assert_eq!(config.plot_height, 64);
        assert_eq!(config.terrain, TerrainMode::Partial);
        assert!(!config.floor.is_single());
    }

    #[test]
    fn test_json_unknown_block_is_configuration_error() {
        assert_matches!(
            AreaConfig::from_json(r#"{ "main": "cheese" }"#),
            Err(PlotError::ConfigurationError(_))
        );
    }

    #[test]
    fn test_modifiers() {
        let mut config = AreaConfig::default();
        config
            .apply_modifiers(["s=42", "g=5", "h=70", "f=sand", "terrain=all", "biome=desert"])
            .unwrap();
        assert_eq!(config.plot_size, 42);
        assert_eq!(config.road_width, 5);
        assert_eq!(config.plot_height, 70);
        assert_eq!(config.road_height, 70);
        assert_eq!(config.wall_height, 71);
        assert_eq!(config.floor.to_string(), "minecraft:sand");
        assert_eq!(config.terrain, TerrainMode::All);
        assert_eq!(config.biome, "desert");

        assert_matches!(
            config.apply_modifier("size", "big"),
            Err(PlotError::ConfigurationError(_))
        );
        assert_matches!(
            config.apply_modifiers(["nonsense"]),
            Err(PlotError::ConfigurationError(_))
        );
        assert_matches!(
            config.apply_modifier("colour", "red"),
            Err(PlotError::ConfigurationError(_))
        );
    }

    #[test]
    fn test_fit_to_region_counts_plots() {
        let mut config = AreaConfig::default();
        // Three plots and two inner roads fit in 3 * 39 - 7 blocks
        config.fit_to_region((100, 100), (100 + 3 * 39 - 7 - 1, 100 + 39 - 7 - 1));
        assert_eq!(config.min, Some(PlotId::new(0, 0)));
        assert_eq!(config.max, Some(PlotId::new(2, 0)));
    }
}
