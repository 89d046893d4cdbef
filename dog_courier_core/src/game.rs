use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Direction, DogId, LootId, LootTypeIndex, Move, PlayerId, Point, Velocity,
    loot::LootGeneratorConfig,
    map::{Map, MapError, MapId},
    player::{Player, Players, SessionIndex},
    session::{GameSession, SpawnPoint, TickReport},
};

/// Represents errors that can occur while building or playing a game.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Map with id '{0}' already exists")]
    DuplicateMap(MapId),
    #[error("Map '{0}' not found")]
    MapNotFound(MapId),
    #[error("Invalid player name")]
    InvalidName,
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Outcome of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResult {
    pub player_id: PlayerId,
    pub dog_id: DogId,
}

/// Public entry in a map listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    pub id: MapId,
    pub name: String,
}

/// Name of a dog as seen by the other players of its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerListing {
    pub dog_id: DogId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagItem {
    pub id: LootId,
    pub loot_type: LootTypeIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogState {
    pub id: DogId,
    pub position: Point,
    pub velocity: Velocity,
    pub direction: Direction,
    pub bag: Vec<BagItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootView {
    pub id: LootId,
    pub loot_type: LootTypeIndex,
    pub position: Point,
}

/// Everything a player sees of its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    pub dogs: Vec<DogState>,
    pub loot: Vec<LootView>,
}

/// Owns every map, every session and every player.
///
/// Maps are fixed once added. A session is opened for a map on its first join
/// and lives as long as the game.
#[derive(Debug)]
pub struct Game {
    maps: Vec<Map>,
    map_index: HashMap<MapId, usize>,
    sessions: Vec<GameSession>,
    session_index: HashMap<MapId, SessionIndex>,
    players: Players,
    loot_config: LootGeneratorConfig,
    seed: u64,
}

impl Game {
    /// Creates an empty game. `seed` drives every random stream of every session.
    pub fn new(loot_config: LootGeneratorConfig, seed: u64) -> Self {
        Game {
            maps: Vec::new(),
            map_index: HashMap::new(),
            sessions: Vec::new(),
            session_index: HashMap::new(),
            players: Players::new(),
            loot_config,
            seed,
        }
    }

    pub fn loot_config(&self) -> &LootGeneratorConfig {
        &self.loot_config
    }

    pub fn add_map(&mut self, map: Map) -> Result<(), GameError> {
        if self.map_index.contains_key(map.id()) {
            return Err(GameError::DuplicateMap(map.id().clone()));
        }
        info!(map = %map.id(), roads = map.roads().len(), offices = map.offices().len(), "map loaded");
        self.map_index.insert(map.id().clone(), self.maps.len());
        self.maps.push(map);
        Ok(())
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn list_maps(&self) -> Vec<MapInfo> {
        self.maps
            .iter()
            .map(|m| MapInfo {
                id: m.id().clone(),
                name: m.name().to_string(),
            })
            .collect()
    }

    pub fn find_map(&self, id: &MapId) -> Option<&Map> {
        self.map_index.get(id).map(|&i| &self.maps[i])
    }

    pub fn sessions(&self) -> &[GameSession] {
        &self.sessions
    }

    pub fn find_session(&self, map_id: &MapId) -> Option<&GameSession> {
        self.session_index.get(map_id).map(|&i| &self.sessions[i])
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub fn find_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.find(id)
    }

    /// The start of the map's first road, a sensible fixed spawn point.
    pub fn default_spawn(&self, map_id: &MapId) -> Option<Point> {
        let map = self.find_map(map_id)?;
        map.roads().all().first().map(|road| road.start().into())
    }

    /// Adds a dog named `name` to the session of `map_id`, opening it if needed.
    pub fn join(&mut self, map_id: &MapId, name: &str, spawn: SpawnPoint) -> Result<JoinResult, GameError> {
        if name.is_empty() {
            return Err(GameError::InvalidName);
        }
        let map_slot = *self
            .map_index
            .get(map_id)
            .ok_or_else(|| GameError::MapNotFound(map_id.clone()))?;
        // Reject before a session is opened for the map.
        if spawn == SpawnPoint::Random && self.maps[map_slot].roads().is_empty() {
            return Err(MapError::NoRoads(map_id.clone()).into());
        }
        let session_slot = self.open_session(map_id);

        let map = &self.maps[map_slot];
        let dog_id = self.sessions[session_slot].add_dog(map, name.to_string(), spawn)?.id();
        let player = self.players.add(session_slot, dog_id);
        Ok(JoinResult {
            player_id: player.id,
            dog_id,
        })
    }

    fn open_session(&mut self, map_id: &MapId) -> SessionIndex {
        if let Some(&slot) = self.session_index.get(map_id) {
            return slot;
        }
        let slot = self.sessions.len();
        let seed = self.seed.wrapping_add(slot as u64);
        self.sessions
            .push(GameSession::with_config(map_id.clone(), self.loot_config, seed));
        self.session_index.insert(map_id.clone(), slot);
        debug!(map = %map_id, session = slot, "session opened");
        slot
    }

    /// Steers a player's dog at its map's speed. Returns `false` for an unknown player.
    pub fn set_direction(&mut self, player_id: PlayerId, command: Move) -> bool {
        let Some(&player) = self.players.find(player_id) else {
            return false;
        };
        let session = &mut self.sessions[player.session];
        let Some(speed) = self.map_index.get(session.map_id()).map(|&i| self.maps[i].dog_speed()) else {
            return false;
        };
        match session.dog_mut(player.dog) {
            Some(dog) => {
                dog.apply_move(command, speed);
                true
            }
            None => false,
        }
    }

    /// Drops loot on the map's session. `None` if no one has joined that map yet.
    pub fn place_loot(&mut self, map_id: &MapId, loot_type: LootTypeIndex, position: Point) -> Option<LootId> {
        let &slot = self.session_index.get(map_id)?;
        Some(self.sessions[slot].add_loot(loot_type, position))
    }

    pub fn session_for(&self, player_id: PlayerId) -> Option<&GameSession> {
        let player = self.players.find(player_id)?;
        self.sessions.get(player.session)
    }

    /// Names of every dog sharing the player's session.
    pub fn list_players(&self, player_id: PlayerId) -> Option<Vec<PlayerListing>> {
        let session = self.session_for(player_id)?;
        Some(
            session
                .dogs()
                .iter()
                .map(|dog| PlayerListing {
                    dog_id: dog.id(),
                    name: dog.name().to_string(),
                })
                .collect(),
        )
    }

    /// Dogs and uncollected loot of the player's session.
    pub fn state(&self, player_id: PlayerId) -> Option<GameStateView> {
        let session = self.session_for(player_id)?;
        let dogs = session
            .dogs()
            .iter()
            .map(|dog| DogState {
                id: dog.id(),
                position: dog.position(),
                velocity: dog.velocity(),
                direction: dog.direction(),
                bag: dog
                    .bag()
                    .iter()
                    .map(|(&id, &loot_type)| BagItem { id, loot_type })
                    .collect(),
            })
            .collect();
        let loot = session
            .active_loot()
            .map(|l| LootView {
                id: l.id,
                loot_type: l.loot_type,
                position: l.position,
            })
            .collect();
        Some(GameStateView { dogs, loot })
    }

    /// Runs one tick of length `delta` over every session.
    pub fn tick(&mut self, delta: Duration) -> TickReport {
        let mut total = TickReport::default();
        for session in &mut self.sessions {
            let Some(&slot) = self.map_index.get(session.map_id()) else {
                continue;
            };
            total.merge(&session.tick(&self.maps[slot], delta));
        }
        total
    }
}
