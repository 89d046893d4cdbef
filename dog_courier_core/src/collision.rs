//! Swept point collection.
//!
//! A gatherer moves along a straight segment during a tick. It collects an
//! item when the item's projection onto that segment falls within it and the
//! item lies within the sum of both radii of the segment's line.

use serde::{Deserialize, Serialize};

use crate::Point;

/// A stationary collectible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub position: Point,
    pub radius: f64,
}

/// An actor sweeping from `start` to `end` during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gatherer {
    pub start: Point,
    pub end: Point,
    pub radius: f64,
}

/// Source of items and gatherers for [`find_gather_events`].
pub trait ItemGathererProvider {
    fn items_count(&self) -> usize;
    fn get_item(&self, idx: usize) -> Item;
    fn gatherers_count(&self) -> usize;
    fn get_gatherer(&self, idx: usize) -> Gatherer;
}

/// A plain vector-backed provider.
#[derive(Debug, Clone, Default)]
pub struct VecProvider {
    pub items: Vec<Item>,
    pub gatherers: Vec<Gatherer>,
}

impl VecProvider {
    pub fn new(items: Vec<Item>, gatherers: Vec<Gatherer>) -> Self {
        Self { items, gatherers }
    }
}

impl ItemGathererProvider for VecProvider {
    fn items_count(&self) -> usize {
        self.items.len()
    }

    fn get_item(&self, idx: usize) -> Item {
        self.items[idx]
    }

    fn gatherers_count(&self) -> usize {
        self.gatherers.len()
    }

    fn get_gatherer(&self, idx: usize) -> Gatherer {
        self.gatherers[idx]
    }
}

/// One item reached by one gatherer during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatheringEvent {
    pub item_id: usize,
    pub gatherer_id: usize,
    pub sq_distance: f64,
    /// Fraction of the tick at which the gatherer passes closest to the item.
    pub time: f64,
}

/// Projection of a point onto a movement segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionResult {
    pub sq_distance: f64,
    pub proj_ratio: f64,
}

impl CollectionResult {
    pub fn is_collected(&self, collect_radius: f64) -> bool {
        (0.0..=1.0).contains(&self.proj_ratio)
            && self.sq_distance <= collect_radius * collect_radius
    }
}

/// Projects `c` onto the segment `a -> b`.
///
/// `a` and `b` must differ.
pub fn try_collect_point(a: Point, b: Point, c: Point) -> CollectionResult {
    debug_assert!(a != b, "gatherer must move");
    let u_x = c.x - a.x;
    let u_y = c.y - a.y;
    let v_x = b.x - a.x;
    let v_y = b.y - a.y;
    let u_dot_v = u_x * v_x + u_y * v_y;
    let u_len2 = u_x * u_x + u_y * u_y;
    let v_len2 = v_x * v_x + v_y * v_y;

    CollectionResult {
        sq_distance: u_len2 - (u_dot_v * u_dot_v) / v_len2,
        proj_ratio: u_dot_v / v_len2,
    }
}

/// Finds every (gatherer, item) contact in a tick, in chronological order.
///
/// Gatherers that did not move are skipped. Several gatherers may reach the
/// same item; deciding who keeps it is up to the caller.
pub fn find_gather_events(provider: &impl ItemGathererProvider) -> Vec<GatheringEvent> {
    let mut events = Vec::new();
    if provider.items_count() == 0 || provider.gatherers_count() == 0 {
        return events;
    }

    for gatherer_id in 0..provider.gatherers_count() {
        let gatherer = provider.get_gatherer(gatherer_id);
        if gatherer.start == gatherer.end {
            continue;
        }
        for item_id in 0..provider.items_count() {
            let item = provider.get_item(item_id);
            let result = try_collect_point(gatherer.start, gatherer.end, item.position);
            if result.is_collected(gatherer.radius + item.radius) {
                events.push(GatheringEvent {
                    item_id,
                    gatherer_id,
                    sq_distance: result.sq_distance,
                    time: result.proj_ratio,
                });
            }
        }
    }

    events.sort_by(|l, r| l.time.total_cmp(&r.time));
    events
}
