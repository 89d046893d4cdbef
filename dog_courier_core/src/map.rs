use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Axis, IntPoint, LootTypeIndex};

/// Default dog speed when neither the map nor the config sets one.
pub const DEFAULT_DOG_SPEED: f64 = 1.0;

/// Default bag capacity when neither the map nor the config sets one.
pub const DEFAULT_BAG_CAPACITY: usize = 3;

/// Represents errors that can occur while building a map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Office '{office}' is defined twice on map '{map}'")]
    DuplicateOffice { map: MapId, office: OfficeId },
    #[error("Map '{0}' has no roads")]
    NoRoads(MapId),
}

/// Identifier of a map, unique within a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(pub String);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapId {
    fn from(id: &str) -> Self {
        MapId(id.to_string())
    }
}

/// Identifier of an office, unique within a map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfficeId(pub String);

impl fmt::Display for OfficeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OfficeId {
    fn from(id: &str) -> Self {
        OfficeId(id.to_string())
    }
}

/// An axis-aligned road segment between two integer points.
///
/// Horizontal roads share `start.y == end.y`, vertical roads share
/// `start.x == end.x`. The end may lie before the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Road {
    start: IntPoint,
    end: IntPoint,
    axis: Axis,
}

impl Road {
    pub fn horizontal(start: IntPoint, end_x: i64) -> Self {
        Road {
            start,
            end: IntPoint::new(end_x, start.y),
            axis: Axis::Horizontal,
        }
    }

    pub fn vertical(start: IntPoint, end_y: i64) -> Self {
        Road {
            start,
            end: IntPoint::new(start.x, end_y),
            axis: Axis::Vertical,
        }
    }

    #[inline]
    pub fn start(&self) -> IntPoint {
        self.start
    }

    #[inline]
    pub fn end(&self) -> IntPoint {
        self.end
    }

    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn is_horizontal(&self) -> bool {
        self.axis == Axis::Horizontal
    }

    /// The fixed coordinate the road runs along: `y` for horizontal roads,
    /// `x` for vertical ones.
    pub fn cross_key(&self) -> i64 {
        match self.axis {
            Axis::Horizontal => self.start.y,
            Axis::Vertical => self.start.x,
        }
    }

    /// The along-axis extent as `(min, max)`, regardless of drawing direction.
    pub fn span(&self) -> (i64, i64) {
        let (a, b) = match self.axis {
            Axis::Horizontal => (self.start.x, self.end.x),
            Axis::Vertical => (self.start.y, self.end.y),
        };
        (a.min(b), a.max(b))
    }
}

/// Roads grouped by orientation and cross-axis coordinate.
///
/// Within a group, roads are kept sorted by the start of their along-axis
/// span. All roads are also kept in insertion order for sampling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadIndex {
    horizontal: BTreeMap<i64, Vec<Road>>,
    vertical: BTreeMap<i64, Vec<Road>>,
    all: Vec<Road>,
}

impl RoadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, road: Road) {
        let group = match road.axis() {
            Axis::Horizontal => self.horizontal.entry(road.cross_key()).or_default(),
            Axis::Vertical => self.vertical.entry(road.cross_key()).or_default(),
        };
        let at = group.partition_point(|r| r.span().0 <= road.span().0);
        group.insert(at, road);
        self.all.push(road);
    }

    /// Returns the roads of `axis` orientation lying on cross-coordinate `key`,
    /// sorted by along-axis start. Empty if there are none.
    pub fn roads_at(&self, axis: Axis, key: i64) -> &[Road] {
        let groups = match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        };
        groups.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All roads in the order they were added.
    pub fn all(&self) -> &[Road] {
        &self.all
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// An axis-aligned rectangle. Buildings are decoration only and never block movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub position: IntPoint,
    pub width: i64,
    pub height: i64,
}

/// A delivery point. Dogs passing through an office empty their bags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub position: IntPoint,
    /// Visual offset of the office sprite, in map units.
    pub offset: IntPoint,
}

/// One value inside a loot type description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LootParam {
    Integer(i64),
    Number(f64),
    Text(String),
}

/// Loot type keys kept from a config. Anything else is dropped on load.
pub const LOOT_TYPE_KEYS: [&str; 6] = ["name", "file", "type", "rotation", "color", "scale"];

/// A kind of loot that may spawn on a map, described by free-form parameters
/// (name, model file, color, scale, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LootType {
    pub parameters: BTreeMap<String, LootParam>,
}

impl LootType {
    /// Drops every parameter not listed in [`LOOT_TYPE_KEYS`].
    pub fn retain_known_keys(&mut self) {
        self.parameters
            .retain(|key, _| LOOT_TYPE_KEYS.contains(&key.as_str()));
    }

    pub fn name(&self) -> Option<&str> {
        match self.parameters.get("name") {
            Some(LootParam::Text(name)) => Some(name),
            _ => None,
        }
    }
}

/// Static description of a playing field. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    id: MapId,
    name: String,
    roads: RoadIndex,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    office_index: HashMap<OfficeId, usize>,
    loot_types: Vec<LootType>,
    dog_speed: f64,
    bag_capacity: usize,
}

impl Map {
    pub fn new(id: MapId, name: impl Into<String>) -> Self {
        Map {
            id,
            name: name.into(),
            roads: RoadIndex::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            office_index: HashMap::new(),
            loot_types: Vec::new(),
            dog_speed: DEFAULT_DOG_SPEED,
            bag_capacity: DEFAULT_BAG_CAPACITY,
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &RoadIndex {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn loot_types(&self) -> &[LootType] {
        &self.loot_types
    }

    pub fn loot_type(&self, index: LootTypeIndex) -> Option<&LootType> {
        self.loot_types.get(index)
    }

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn add_road(&mut self, road: Road) {
        self.roads.insert(road);
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// Adds an office, rejecting an id that is already present.
    pub fn add_office(&mut self, office: Office) -> Result<(), MapError> {
        if self.office_index.contains_key(&office.id) {
            return Err(MapError::DuplicateOffice {
                map: self.id.clone(),
                office: office.id,
            });
        }
        self.office_index.insert(office.id.clone(), self.offices.len());
        self.offices.push(office);
        Ok(())
    }

    pub fn find_office(&self, id: &OfficeId) -> Option<&Office> {
        self.office_index.get(id).map(|&i| &self.offices[i])
    }

    pub fn add_loot_type(&mut self, loot_type: LootType) {
        self.loot_types.push(loot_type);
    }

    pub fn set_dog_speed(&mut self, speed: f64) {
        self.dog_speed = speed;
    }

    pub fn set_bag_capacity(&mut self, capacity: usize) {
        self.bag_capacity = capacity;
    }
}
