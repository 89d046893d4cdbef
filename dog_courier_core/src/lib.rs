use serde::{Deserialize, Serialize};

pub mod agent;
pub mod collision;
pub mod config;
pub mod game;
pub mod loot;
pub mod map;
pub mod movement;
pub mod player;
pub mod session;

/// Identifier of a dog inside its session. Equal to the dog's index.
pub type DogId = u32;

/// Identifier of a loot item inside its session. Equal to the item's index.
pub type LootId = u32;

/// Identifier of a player across the whole game.
pub type PlayerId = u32;

/// Index into a map's loot type list.
pub type LootTypeIndex = usize;

/// Half of the walkable road width, in world units.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// A continuous world position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An integer map coordinate (road ends, buildings, offices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

impl IntPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<IntPoint> for Point {
    fn from(p: IntPoint) -> Self {
        Point::new(p.x as f64, p.y as f64)
    }
}

/// Velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { vx: 0.0, vy: 0.0 };

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

/// The axis a dog moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// The way a dog is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    #[default]
    Up,
    Down,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Horizontal,
            Direction::Up | Direction::Down => Axis::Vertical,
        }
    }

    /// Single-letter code used by clients.
    pub fn code(self) -> &'static str {
        match self {
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::Up => "U",
            Direction::Down => "D",
        }
    }
}

/// A movement command issued for a dog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Go(Direction),
    Stop,
}

impl Move {
    /// Parses the client encoding: `"L"`, `"R"`, `"U"`, `"D"`, or `""` to stop.
    ///
    /// Returns `None` for anything else.
    pub fn parse(code: &str) -> Option<Move> {
        match code {
            "L" => Some(Move::Go(Direction::Left)),
            "R" => Some(Move::Go(Direction::Right)),
            "U" => Some(Move::Go(Direction::Up)),
            "D" => Some(Move::Go(Direction::Down)),
            "" => Some(Move::Stop),
            _ => None,
        }
    }
}
