use std::collections::BTreeMap;
use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Direction, DogId, LootId, LootTypeIndex, Move, Point, Velocity,
    collision::{Gatherer, Item, VecProvider, find_gather_events},
    loot::{LootGenerator, LootGeneratorConfig, LootState, random_road_position},
    map::{Map, MapError, MapId},
    movement::{Segment, advance_dog},
};

/// Collection radius of a dog.
pub const DOG_RADIUS: f64 = 0.3;

/// Radius of a loot item.
pub const LOOT_RADIUS: f64 = 0.0;

/// Radius of an office.
pub const OFFICE_RADIUS: f64 = 0.25;

/// Loot carried by a dog: loot id to loot type.
pub type Bag = BTreeMap<LootId, LootTypeIndex>;

/// One player's avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    id: DogId,
    name: String,
    position: Point,
    velocity: Velocity,
    direction: Direction,
    bag: Bag,
}

impl Dog {
    pub fn new(id: DogId, name: String, position: Point) -> Self {
        Dog {
            id,
            name,
            position,
            velocity: Velocity::ZERO,
            direction: Direction::default(),
            bag: Bag::new(),
        }
    }

    pub fn id(&self) -> DogId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn set_velocity(&mut self, velocity: Velocity) {
        self.velocity = velocity;
    }

    /// Applies a movement command at `speed`.
    ///
    /// `Move::Stop` zeroes the velocity and keeps the current facing.
    pub fn apply_move(&mut self, command: Move, speed: f64) {
        match command {
            Move::Go(direction) => {
                self.direction = direction;
                self.velocity = match direction {
                    Direction::Left => Velocity { vx: -speed, vy: 0.0 },
                    Direction::Right => Velocity { vx: speed, vy: 0.0 },
                    Direction::Up => Velocity { vx: 0.0, vy: -speed },
                    Direction::Down => Velocity { vx: 0.0, vy: speed },
                };
            }
            Move::Stop => self.velocity = Velocity::ZERO,
        }
    }

    /// Puts loot into the bag unless it is full. Returns whether it fit.
    pub fn try_pick_up(&mut self, loot: &LootState, capacity: usize) -> bool {
        if self.bag.len() >= capacity {
            return false;
        }
        self.bag.insert(loot.id, loot.loot_type);
        true
    }

    /// Empties the bag, returning what was in it.
    pub fn deliver(&mut self) -> Bag {
        std::mem::take(&mut self.bag)
    }
}

/// Where a joining dog is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnPoint {
    /// A random spot on a random road.
    Random,
    At(Point),
}

/// Independent random streams of one session.
///
/// Kept apart so that, for example, the number of joins does not shift where
/// loot lands.
#[derive(Debug, Clone)]
pub struct SpawnStreams {
    pub loot_position: StdRng,
    pub loot_type: StdRng,
    pub join_position: StdRng,
}

impl SpawnStreams {
    pub fn from_seed(seed: u64) -> Self {
        let mut root = StdRng::seed_from_u64(seed);
        SpawnStreams {
            loot_position: StdRng::seed_from_u64(root.random()),
            loot_type: StdRng::seed_from_u64(root.random()),
            join_position: StdRng::seed_from_u64(root.random()),
        }
    }
}

/// What happened to a session during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub spawned: usize,
    pub collected: usize,
    pub delivered: usize,
}

impl TickReport {
    pub fn merge(&mut self, other: &TickReport) {
        self.spawned += other.spawned;
        self.collected += other.collected;
        self.delivered += other.delivered;
    }
}

/// Runtime state of one map: its dogs and its loot.
///
/// Dogs and loot are only ever appended; their ids are their indices.
#[derive(Debug)]
pub struct GameSession {
    map_id: MapId,
    dogs: Vec<Dog>,
    loot: Vec<LootState>,
    next_dog_id: DogId,
    next_loot_id: LootId,
    loot_generator: LootGenerator,
    streams: SpawnStreams,
}

impl GameSession {
    pub fn new(map_id: MapId, loot_generator: LootGenerator, streams: SpawnStreams) -> Self {
        GameSession {
            map_id,
            dogs: Vec::new(),
            loot: Vec::new(),
            next_dog_id: 0,
            next_loot_id: 0,
            loot_generator,
            streams,
        }
    }

    pub fn with_config(map_id: MapId, config: LootGeneratorConfig, seed: u64) -> Self {
        Self::new(map_id, LootGenerator::new(config), SpawnStreams::from_seed(seed))
    }

    pub fn map_id(&self) -> &MapId {
        &self.map_id
    }

    pub fn dogs(&self) -> &[Dog] {
        &self.dogs
    }

    pub fn dog(&self, id: DogId) -> Option<&Dog> {
        self.dogs.get(id as usize)
    }

    pub fn dog_mut(&mut self, id: DogId) -> Option<&mut Dog> {
        self.dogs.get_mut(id as usize)
    }

    /// Every loot item ever spawned, collected ones included.
    pub fn loot(&self) -> &[LootState] {
        &self.loot
    }

    /// Loot still lying on the map.
    pub fn active_loot(&self) -> impl Iterator<Item = &LootState> {
        self.loot.iter().filter(|l| !l.collected)
    }

    pub fn streams(&self) -> &SpawnStreams {
        &self.streams
    }

    /// Adds a dog named `name` at `spawn`. Random placement needs at least one road.
    pub fn add_dog(&mut self, map: &Map, name: String, spawn: SpawnPoint) -> Result<&Dog, MapError> {
        let position = match spawn {
            SpawnPoint::At(point) => point,
            SpawnPoint::Random => {
                random_road_position(map.roads(), &mut self.streams.join_position)
                    .ok_or_else(|| MapError::NoRoads(map.id().clone()))?
            }
        };
        let id = self.next_dog_id;
        self.next_dog_id += 1;
        info!(map = %self.map_id, dog = id, %name, x = position.x, y = position.y, "dog joined");
        self.dogs.push(Dog::new(id, name, position));
        Ok(&self.dogs[id as usize])
    }

    /// Appends loot, assigning it the next id.
    pub fn add_loot(&mut self, loot_type: LootTypeIndex, position: Point) -> LootId {
        let id = self.next_loot_id;
        self.next_loot_id += 1;
        self.loot.push(LootState {
            id,
            loot_type,
            position,
            collected: false,
        });
        id
    }

    /// Advances the session by `delta`: spawn loot, move dogs, then resolve
    /// pickups and deliveries in the order they happened.
    pub fn tick(&mut self, map: &Map, delta: Duration) -> TickReport {
        let mut report = TickReport {
            spawned: self.spawn_loot(map, delta),
            ..TickReport::default()
        };

        let segments: Vec<Segment> = self
            .dogs
            .iter_mut()
            .map(|dog| advance_dog(dog, delta, map.roads()))
            .collect();

        self.gather(map, &segments, &mut report);
        debug!(
            map = %self.map_id,
            dt_ms = delta.as_millis() as u64,
            spawned = report.spawned,
            collected = report.collected,
            delivered = report.delivered,
            "session tick"
        );
        report
    }

    fn spawn_loot(&mut self, map: &Map, delta: Duration) -> usize {
        let active = self.active_loot().count();
        let count = self.loot_generator.generate(delta, active, self.dogs.len());
        if count == 0 {
            return 0;
        }
        if map.roads().is_empty() || map.loot_types().is_empty() {
            warn!(map = %self.map_id, count, "map cannot hold loot, skipping spawn");
            return 0;
        }
        for _ in 0..count {
            let loot_type = self.streams.loot_type.random_range(0..map.loot_types().len());
            let Some(position) = random_road_position(map.roads(), &mut self.streams.loot_position)
            else {
                break;
            };
            self.add_loot(loot_type, position);
        }
        count
    }

    fn gather(&mut self, map: &Map, segments: &[Segment], report: &mut TickReport) {
        // Items: active loot first, then offices.
        let loot_slots: Vec<usize> = (0..self.loot.len()).filter(|&i| !self.loot[i].collected).collect();
        let mut items: Vec<Item> = loot_slots
            .iter()
            .map(|&i| Item {
                position: self.loot[i].position,
                radius: LOOT_RADIUS,
            })
            .collect();
        items.extend(map.offices().iter().map(|office| Item {
            position: office.position.into(),
            radius: OFFICE_RADIUS,
        }));
        let gatherers = segments
            .iter()
            .map(|s| Gatherer {
                start: s.start,
                end: s.end,
                radius: DOG_RADIUS,
            })
            .collect();

        let provider = VecProvider::new(items, gatherers);
        for event in find_gather_events(&provider) {
            let dog = &mut self.dogs[event.gatherer_id];
            match loot_slots.get(event.item_id) {
                Some(&slot) => {
                    let loot = &mut self.loot[slot];
                    if !loot.collected && dog.try_pick_up(loot, map.bag_capacity()) {
                        loot.collected = true;
                        report.collected += 1;
                        debug!(map = %self.map_id, dog = dog.id(), loot = loot.id, "loot collected");
                    }
                }
                None => {
                    let office = &map.offices()[event.item_id - loot_slots.len()];
                    let bag = dog.deliver();
                    if !bag.is_empty() {
                        report.delivered += bag.len();
                        info!(
                            map = %self.map_id,
                            dog = dog.id(),
                            office = %office.id,
                            items = bag.len(),
                            "loot delivered"
                        );
                    }
                }
            }
        }
    }
}
