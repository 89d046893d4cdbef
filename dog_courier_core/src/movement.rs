use std::time::Duration;

use crate::{Axis, Point, ROAD_HALF_WIDTH, Velocity, map::RoadIndex, session::Dog};

/// The walkable interval along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveBounds {
    pub min: f64,
    pub max: f64,
}

impl MoveBounds {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Where a dog was before and after one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// Computes how far along `axis` an actor at `position` may travel.
///
/// Roads are looked up on the rounded cross-axis coordinate. The interval
/// starts as the rounded along-axis coordinate widened by the road half-width
/// and absorbs every road (also widened) that overlaps it.
pub fn compute_bounds(roads: &RoadIndex, position: Point, axis: Axis) -> MoveBounds {
    let (along, cross) = match axis {
        Axis::Horizontal => (position.x, position.y),
        Axis::Vertical => (position.y, position.x),
    };
    let key = along.round();
    let mut bounds = MoveBounds {
        min: key - ROAD_HALF_WIDTH,
        max: key + ROAD_HALF_WIDTH,
    };

    for road in roads.roads_at(axis, cross.round() as i64) {
        let (start, end) = road.span();
        let min = start as f64 - ROAD_HALF_WIDTH;
        let max = end as f64 + ROAD_HALF_WIDTH;

        if bounds.min > max {
            continue;
        }
        // Sorted by start, nothing further can overlap.
        if bounds.max < min {
            break;
        }
        bounds.min = bounds.min.min(min);
        bounds.max = bounds.max.max(max);
    }
    bounds
}

/// Moves `dog` for one tick of length `delta` along the axis it faces.
///
/// Bounds are computed once at the pre-step position. Reaching or crossing a
/// bound clamps the dog onto it and stops it.
pub fn advance_dog(dog: &mut Dog, delta: Duration, roads: &RoadIndex) -> Segment {
    let start = dog.position();
    let dt = delta.as_secs_f64();
    let axis = dog.direction().axis();
    let bounds = compute_bounds(roads, start, axis);

    let (current, speed) = match axis {
        Axis::Horizontal => (start.x, dog.velocity().vx),
        Axis::Vertical => (start.y, dog.velocity().vy),
    };
    let mut candidate = current + speed * dt;
    if candidate >= bounds.max || candidate <= bounds.min {
        candidate = candidate.clamp(bounds.min, bounds.max);
        dog.set_velocity(Velocity::ZERO);
    }

    let end = match axis {
        Axis::Horizontal => Point::new(candidate, start.y),
        Axis::Vertical => Point::new(start.x, candidate),
    };
    dog.set_position(end);
    Segment { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, IntPoint, Move, map::Road};

    const EPS: f64 = 1e-9;

    fn cross_roads() -> RoadIndex {
        let mut roads = RoadIndex::new();
        roads.insert(Road::horizontal(IntPoint::new(0, 0), 10));
        roads.insert(Road::vertical(IntPoint::new(10, 0), 20));
        roads.insert(Road::horizontal(IntPoint::new(10, 20), 0));
        roads
    }

    fn dog_at(x: f64, y: f64) -> Dog {
        Dog::new(0, "Rex".to_string(), Point::new(x, y))
    }

    #[test]
    fn bounds_cover_whole_road() {
        let roads = cross_roads();
        let bounds = compute_bounds(&roads, Point::new(3.2, 0.1), Axis::Horizontal);
        assert!((bounds.min + 0.4).abs() < EPS);
        assert!((bounds.max - 10.4).abs() < EPS);

        let bounds = compute_bounds(&roads, Point::new(10.0, 5.0), Axis::Vertical);
        assert!((bounds.min + 0.4).abs() < EPS);
        assert!((bounds.max - 20.4).abs() < EPS);
    }

    #[test]
    fn bounds_off_road_are_a_single_cell() {
        let roads = cross_roads();
        let bounds = compute_bounds(&roads, Point::new(5.0, 7.0), Axis::Horizontal);
        assert!((bounds.min - 4.6).abs() < EPS);
        assert!((bounds.max - 5.4).abs() < EPS);
    }

    #[test]
    fn bounds_merge_touching_roads_only() {
        let mut roads = RoadIndex::new();
        roads.insert(Road::horizontal(IntPoint::new(0, 0), 5));
        roads.insert(Road::horizontal(IntPoint::new(5, 0), 9));
        roads.insert(Road::horizontal(IntPoint::new(12, 0), 20));

        let bounds = compute_bounds(&roads, Point::new(1.0, 0.0), Axis::Horizontal);
        assert!((bounds.min + 0.4).abs() < EPS);
        assert!((bounds.max - 9.4).abs() < EPS);

        let bounds = compute_bounds(&roads, Point::new(15.0, 0.0), Axis::Horizontal);
        assert!((bounds.min - 11.6).abs() < EPS);
        assert!((bounds.max - 20.4).abs() < EPS);
    }

    #[test]
    fn advance_moves_freely_inside_road() {
        let roads = cross_roads();
        let mut dog = dog_at(1.0, 0.0);
        dog.apply_move(Move::Go(Direction::Right), 2.0);

        let segment = advance_dog(&mut dog, Duration::from_millis(1500), &roads);
        assert_eq!(segment.start, Point::new(1.0, 0.0));
        assert!((dog.position().x - 4.0).abs() < EPS);
        assert_eq!(dog.position().y, 0.0);
        assert_eq!(dog.velocity(), Velocity { vx: 2.0, vy: 0.0 });
    }

    #[test]
    fn advance_clamps_and_stops_at_road_end() {
        let roads = cross_roads();
        let mut dog = dog_at(1.0, 0.0);
        dog.apply_move(Move::Go(Direction::Left), 3.0);

        advance_dog(&mut dog, Duration::from_secs(1), &roads);
        assert!((dog.position().x + 0.4).abs() < EPS);
        assert_eq!(dog.velocity(), Velocity::ZERO);
        assert_eq!(dog.direction(), Direction::Left);
    }

    #[test]
    fn advance_keeps_inactive_axis_bits() {
        let roads = cross_roads();
        let y = 0.123_456_789_f64;
        let mut dog = dog_at(2.0, y);
        dog.apply_move(Move::Go(Direction::Right), 1.0);
        advance_dog(&mut dog, Duration::from_millis(100), &roads);
        assert_eq!(dog.position().y.to_bits(), y.to_bits());
    }

    #[test]
    fn advance_turns_onto_crossing_road() {
        let roads = cross_roads();
        let mut dog = dog_at(10.0, 0.2);
        dog.apply_move(Move::Go(Direction::Down), 1.0);
        advance_dog(&mut dog, Duration::from_secs(5), &roads);
        assert!((dog.position().y - 5.2).abs() < EPS);
        assert_eq!(dog.position().x, 10.0);
    }

    #[test]
    fn stopped_dog_stays_put() {
        let roads = cross_roads();
        let mut dog = dog_at(3.0, 0.0);
        let segment = advance_dog(&mut dog, Duration::from_secs(1), &roads);
        assert_eq!(segment.start, segment.end);
    }
}
