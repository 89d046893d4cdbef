//! Game configuration file loading.
//!
//! The file is JSON with camelCase keys. Map-level `dogSpeed` and
//! `bagCapacity` override the top-level defaults; the loot generator period is
//! given in seconds.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::{
    IntPoint,
    game::{Game, GameError},
    loot::{DEFAULT_LOOT_PERIOD, DEFAULT_LOOT_PROBABILITY, LootGeneratorConfig},
    map::{
        Building, DEFAULT_BAG_CAPACITY, DEFAULT_DOG_SPEED, LootType, Map, MapError, MapId, Office,
        OfficeId, Road,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid loot generator config: {0}")]
    InvalidLootGenerator(String),
    #[error("Dog speed must be a finite non-negative number, got {0}")]
    InvalidDogSpeed(f64),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Map(#[from] MapError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    #[serde(default)]
    pub default_dog_speed: Option<f64>,
    #[serde(default)]
    pub default_bag_capacity: Option<usize>,
    #[serde(default)]
    pub loot_generator_config: Option<LootGeneratorSection>,
    pub maps: Vec<MapConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LootGeneratorSection {
    /// Seconds.
    pub period: Option<f64>,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dog_speed: Option<f64>,
    #[serde(default)]
    pub bag_capacity: Option<usize>,
    pub roads: Vec<RoadConfig>,
    #[serde(default)]
    pub buildings: Vec<BuildingConfig>,
    #[serde(default)]
    pub offices: Vec<OfficeConfig>,
    #[serde(default)]
    pub loot_types: Vec<LootType>,
}

/// A road is horizontal when it has `x1`, vertical when it has `y1`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoadConfig {
    Horizontal { x0: i64, y0: i64, x1: i64 },
    Vertical { x0: i64, y0: i64, y1: i64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingConfig {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeConfig {
    pub id: String,
    pub x: i64,
    pub y: i64,
    pub offset_x: i64,
    pub offset_y: i64,
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn loot_generator(&self) -> Result<LootGeneratorConfig, ConfigError> {
        let section = self.loot_generator_config.as_ref();
        let period = section.and_then(|s| s.period);
        let probability = section
            .and_then(|s| s.probability)
            .unwrap_or(DEFAULT_LOOT_PROBABILITY);

        let period = match period {
            None => DEFAULT_LOOT_PERIOD,
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::try_from_secs_f64(secs)
                .map_err(|e| {
                    ConfigError::InvalidLootGenerator(format!("period {secs} out of range: {e}"))
                })?,
            Some(secs) => {
                return Err(ConfigError::InvalidLootGenerator(format!(
                    "period must be positive, got {secs}"
                )));
            }
        };
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidLootGenerator(format!(
                "probability must be within [0, 1], got {probability}"
            )));
        }
        Ok(LootGeneratorConfig {
            period,
            probability,
        })
    }

    /// Builds the game. Every map and office id must be unique.
    pub fn build(&self, seed: u64) -> Result<Game, ConfigError> {
        let dog_speed = checked_speed(self.default_dog_speed.unwrap_or(DEFAULT_DOG_SPEED))?;
        let bag_capacity = self.default_bag_capacity.unwrap_or(DEFAULT_BAG_CAPACITY);
        let mut game = Game::new(self.loot_generator()?, seed);
        for map in &self.maps {
            game.add_map(map.build(dog_speed, bag_capacity)?)?;
        }
        Ok(game)
    }
}

impl MapConfig {
    pub fn build(&self, default_dog_speed: f64, default_bag_capacity: usize) -> Result<Map, ConfigError> {
        let mut map = Map::new(MapId(self.id.clone()), self.name.clone());
        for road in &self.roads {
            map.add_road(match *road {
                RoadConfig::Horizontal { x0, y0, x1 } => Road::horizontal(IntPoint::new(x0, y0), x1),
                RoadConfig::Vertical { x0, y0, y1 } => Road::vertical(IntPoint::new(x0, y0), y1),
            });
        }
        for b in &self.buildings {
            map.add_building(Building {
                position: IntPoint::new(b.x, b.y),
                width: b.w,
                height: b.h,
            });
        }
        for o in &self.offices {
            map.add_office(Office {
                id: OfficeId(o.id.clone()),
                position: IntPoint::new(o.x, o.y),
                offset: IntPoint::new(o.offset_x, o.offset_y),
            })?;
        }
        for loot_type in &self.loot_types {
            let mut loot_type = loot_type.clone();
            loot_type.retain_known_keys();
            map.add_loot_type(loot_type);
        }
        map.set_dog_speed(checked_speed(self.dog_speed.unwrap_or(default_dog_speed))?);
        map.set_bag_capacity(self.bag_capacity.unwrap_or(default_bag_capacity));
        Ok(map)
    }
}

fn checked_speed(speed: f64) -> Result<f64, ConfigError> {
    if speed.is_finite() && speed >= 0.0 {
        Ok(speed)
    } else {
        Err(ConfigError::InvalidDogSpeed(speed))
    }
}

/// Reads and builds a game from a JSON config file.
pub fn load_game(path: impl AsRef<Path>, seed: u64) -> Result<Game, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let game = GameConfig::from_json(&text)?.build(seed)?;
    info!(path = %path.display(), maps = game.maps().len(), "config loaded");
    Ok(game)
}
