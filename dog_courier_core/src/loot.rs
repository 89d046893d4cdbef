use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{LootId, LootTypeIndex, Point, ROAD_HALF_WIDTH, map::RoadIndex};

/// Default interval of the loot generator.
pub const DEFAULT_LOOT_PERIOD: Duration = Duration::from_secs(5);

/// Default probability of the loot generator.
pub const DEFAULT_LOOT_PROBABILITY: f64 = 0.5;

/// A loot item lying on (or taken from) the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootState {
    pub id: LootId,
    pub loot_type: LootTypeIndex,
    pub position: Point,
    /// Set once a dog picked the item up. Collected items stay in the session
    /// so ids are never reused.
    pub collected: bool,
}

/// Parameters of the loot spawn model, shared by every session of a game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootGeneratorConfig {
    /// Interval over which `probability` applies.
    pub period: Duration,
    /// Chance that a missing item appears within one `period`.
    pub probability: f64,
}

impl Default for LootGeneratorConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_LOOT_PERIOD,
            probability: DEFAULT_LOOT_PROBABILITY,
        }
    }
}

/// Source of the multiplier applied to the spawn probability.
pub type RandomFactor = Box<dyn FnMut() -> f64 + Send>;

/// Decides how much loot a session gains per tick.
///
/// The target is one item per looter. The longer a shortage persists, the
/// more likely it is filled; the clock resets whenever something spawns.
pub struct LootGenerator {
    config: LootGeneratorConfig,
    time_without_loot: Duration,
    random_factor: RandomFactor,
}

impl fmt::Debug for LootGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LootGenerator")
            .field("config", &self.config)
            .field("time_without_loot", &self.time_without_loot)
            .finish_non_exhaustive()
    }
}

impl LootGenerator {
    pub fn new(config: LootGeneratorConfig) -> Self {
        Self::with_random_factor(config, Box::new(|| 1.0))
    }

    /// Uses `random_factor` (expected in `[0, 1]`) to scale the spawn probability.
    pub fn with_random_factor(config: LootGeneratorConfig, random_factor: RandomFactor) -> Self {
        Self {
            config,
            time_without_loot: Duration::ZERO,
            random_factor,
        }
    }

    pub fn config(&self) -> &LootGeneratorConfig {
        &self.config
    }

    /// Returns how many items to spawn after `time_delta`, given `loot_count`
    /// items on the map and `looter_count` dogs.
    pub fn generate(&mut self, time_delta: Duration, loot_count: usize, looter_count: usize) -> usize {
        self.time_without_loot += time_delta;
        let shortage = looter_count.saturating_sub(loot_count);
        let ratio = self.time_without_loot.as_secs_f64() / self.config.period.as_secs_f64();
        let probability = ((1.0 - (1.0 - self.config.probability).powf(ratio))
            * (self.random_factor)())
        .clamp(0.0, 1.0);
        let generated = (shortage as f64 * probability).round();
        // NaN (zero period at zero time) saturates to 0.
        let generated = generated as usize;
        if generated > 0 {
            self.time_without_loot = Duration::ZERO;
        }
        generated
    }
}

/// Picks a uniformly random road and a random spot on its widened envelope.
///
/// Returns `None` when there are no roads.
pub fn random_road_position(roads: &RoadIndex, rng: &mut impl Rng) -> Option<Point> {
    if roads.is_empty() {
        return None;
    }
    let road = roads.all()[rng.random_range(0..roads.len())];
    let along_step: u32 = rng.random_range(0..=100);
    let cross_step: u32 = rng.random_range(0..=100);

    let (start, end) = road.span();
    let along = (end - start) as f64 + 2.0 * ROAD_HALF_WIDTH;
    let along = start as f64 - ROAD_HALF_WIDTH + along / 100.0 * along_step as f64;
    let cross =
        road.cross_key() as f64 - ROAD_HALF_WIDTH + 2.0 * ROAD_HALF_WIDTH / 100.0 * cross_step as f64;

    Some(if road.is_horizontal() {
        Point::new(along, cross)
    } else {
        Point::new(cross, along)
    })
}
