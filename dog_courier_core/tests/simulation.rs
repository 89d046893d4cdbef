use std::time::Duration;

use dog_courier_core::{
    Axis, Direction, IntPoint, Move, Point, ROAD_HALF_WIDTH, Velocity,
    config::GameConfig,
    map::{MapId, Road, RoadIndex},
    movement::{advance_dog, compute_bounds},
    session::{Dog, SpawnPoint},
};
use proptest::prelude::*;

fn road_strategy() -> impl Strategy<Value = Road> {
    (-20i64..20, -20i64..20, -20i64..20, any::<bool>()).prop_map(|(a, b, end, horizontal)| {
        if horizontal {
            Road::horizontal(IntPoint::new(a, b), end)
        } else {
            Road::vertical(IntPoint::new(a, b), end)
        }
    })
}

/// A point strictly inside the road's widened envelope.
fn point_on(road: &Road, along_frac: f64, cross_offset: f64) -> Point {
    let (min, max) = road.span();
    let along = (min as f64 - ROAD_HALF_WIDTH)
        + along_frac * ((max - min) as f64 + 2.0 * ROAD_HALF_WIDTH);
    let cross = road.cross_key() as f64 + cross_offset;
    match road.axis() {
        Axis::Horizontal => Point::new(along, cross),
        Axis::Vertical => Point::new(cross, along),
    }
}

fn on_some_road(roads: &RoadIndex, p: Point) -> bool {
    roads.all().iter().any(|road| {
        let (min, max) = road.span();
        let (along, cross) = match road.axis() {
            Axis::Horizontal => (p.x, p.y),
            Axis::Vertical => (p.y, p.x),
        };
        let eps = 1e-9;
        along >= min as f64 - ROAD_HALF_WIDTH - eps
            && along <= max as f64 + ROAD_HALF_WIDTH + eps
            && (cross - road.cross_key() as f64).abs() <= ROAD_HALF_WIDTH + eps
    })
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Left),
        Just(Direction::Right),
        Just(Direction::Up),
        Just(Direction::Down),
    ]
}

proptest! {
    #[test]
    fn bounds_contain_points_on_the_road(
        road in road_strategy(),
        others in prop::collection::vec(road_strategy(), 0..6),
        along_frac in 0.001f64..0.999,
        cross_offset in -0.39f64..0.39,
    ) {
        let mut roads = RoadIndex::new();
        for other in &others {
            roads.insert(*other);
        }
        roads.insert(road);

        let p = point_on(&road, along_frac, cross_offset);
        let bounds = compute_bounds(&roads, p, road.axis());
        let along = match road.axis() {
            Axis::Horizontal => p.x,
            Axis::Vertical => p.y,
        };
        prop_assert!(bounds.contains(along), "{:?} not in {:?}", p, bounds);
    }

    #[test]
    fn advance_stays_within_bounds(
        roads in prop::collection::vec(road_strategy(), 1..8),
        pick in any::<prop::sample::Index>(),
        along_frac in 0.001f64..0.999,
        cross_offset in -0.39f64..0.39,
        direction in direction_strategy(),
        speed in 0.0f64..20.0,
        dt_ms in 0u64..3000,
    ) {
        let mut index = RoadIndex::new();
        for road in &roads {
            index.insert(*road);
        }
        let road = roads[pick.index(roads.len())];
        let start = point_on(&road, along_frac, cross_offset);

        let mut dog = Dog::new(0, "prop".to_string(), start);
        dog.apply_move(Move::Go(direction), speed);
        let bounds = compute_bounds(&index, start, direction.axis());
        let before = dog.velocity();

        let segment = advance_dog(&mut dog, Duration::from_millis(dt_ms), &index);
        let end = dog.position();
        prop_assert_eq!(segment.start, start);
        prop_assert_eq!(segment.end, end);

        let (active, inactive_before, inactive_after) = match direction.axis() {
            Axis::Horizontal => (end.x, start.y, end.y),
            Axis::Vertical => (end.y, start.x, end.x),
        };
        prop_assert!(bounds.contains(active), "{} outside {:?}", active, bounds);
        prop_assert_eq!(inactive_before.to_bits(), inactive_after.to_bits());

        let clamped = active == bounds.min || active == bounds.max;
        if clamped {
            prop_assert_eq!(dog.velocity(), Velocity::ZERO);
        } else {
            prop_assert_eq!(dog.velocity(), before);
        }
    }
}

const CONFIG: &str = r#"{
    "defaultDogSpeed": 2.0,
    "defaultBagCapacity": 2,
    "lootGeneratorConfig": { "period": 1.0, "probability": 0.9 },
    "maps": [{
        "id": "town",
        "name": "Town",
        "roads": [
            { "x0": 0, "y0": 0, "x1": 20 },
            { "x0": 20, "y0": 0, "y1": 15 },
            { "x0": 20, "y0": 15, "x1": 0 },
            { "x0": 0, "y0": 15, "y1": 0 },
            { "x0": 10, "y0": 0, "y1": 15 }
        ],
        "buildings": [ { "x": 2, "y": 2, "w": 6, "h": 11 } ],
        "offices": [ { "id": "post", "x": 10, "y": 7, "offsetX": 1, "offsetY": 0 } ],
        "lootTypes": [ { "name": "key" }, { "name": "wallet" } ]
    }]
}"#;

/// Same world with the loot generator switched off.
fn quiet_config() -> GameConfig {
    GameConfig::from_json(&CONFIG.replace("\"probability\": 0.9", "\"probability\": 0.0")).unwrap()
}

#[test]
fn random_joins_land_on_roads() {
    let mut game = GameConfig::from_json(CONFIG).unwrap().build(17).unwrap();
    let map_id = MapId::from("town");
    for i in 0..200 {
        game.join(&map_id, &format!("dog{i}"), SpawnPoint::Random).unwrap();
    }
    let roads = game.find_map(&map_id).unwrap().roads();
    let session = game.find_session(&map_id).unwrap();
    assert_eq!(session.dogs().len(), 200);
    for dog in session.dogs() {
        assert!(on_some_road(roads, dog.position()), "{:?}", dog.position());
    }
}

#[test]
fn spawned_loot_lands_on_roads_with_known_types() {
    let mut game = GameConfig::from_json(CONFIG).unwrap().build(23).unwrap();
    let map_id = MapId::from("town");
    for i in 0..5 {
        game.join(&map_id, &format!("dog{i}"), SpawnPoint::At(Point::new(100.0, 100.0)))
            .unwrap();
    }
    let report = game.tick(Duration::from_secs(3));
    assert!(report.spawned > 0);

    let map = game.find_map(&map_id).unwrap();
    let session = game.find_session(&map_id).unwrap();
    assert_eq!(session.loot().len(), report.spawned);
    for (i, loot) in session.loot().iter().enumerate() {
        assert_eq!(loot.id as usize, i);
        assert!(loot.loot_type < map.loot_types().len());
        assert!(on_some_road(map.roads(), loot.position), "{:?}", loot.position);
    }
}

#[test]
fn collected_loot_is_tombstoned_and_ids_stay_stable() {
    let mut game = quiet_config().build(1).unwrap();
    let map_id = MapId::from("town");
    let joined = game
        .join(&map_id, "Rex", SpawnPoint::At(Point::new(0.0, 0.0)))
        .unwrap();
    let first = game.place_loot(&map_id, 0, Point::new(3.0, 0.0)).unwrap();
    let second = game.place_loot(&map_id, 1, Point::new(6.0, 0.1)).unwrap();

    game.set_direction(joined.player_id, Move::parse("R").unwrap());
    game.tick(Duration::from_secs(4));

    let state = game.state(joined.player_id).unwrap();
    let bag: Vec<_> = state.dogs[0].bag.iter().map(|b| (b.id, b.loot_type)).collect();
    assert_eq!(bag, vec![(first, 0), (second, 1)]);
    assert!(state.loot.iter().all(|l| l.id != first && l.id != second));

    let session = game.session_for(joined.player_id).unwrap();
    assert!(session.loot()[first as usize].collected);
    assert!(session.loot()[second as usize].collected);
    assert_eq!(session.loot().len(), 2);

    let third = game.place_loot(&map_id, 0, Point::new(1.0, 15.0)).unwrap();
    assert_eq!(third, 2);
}

#[test]
fn full_round_trip_to_the_office() {
    let mut game = quiet_config().build(2).unwrap();
    let map_id = MapId::from("town");
    let joined = game
        .join(&map_id, "Rex", SpawnPoint::At(Point::new(10.0, 0.0)))
        .unwrap();
    game.place_loot(&map_id, 0, Point::new(10.0, 3.0)).unwrap();

    game.set_direction(joined.player_id, Move::Go(Direction::Down));
    let mut delivered = 0;
    for _ in 0..20 {
        delivered += game.tick(Duration::from_millis(500)).delivered;
    }
    assert_eq!(delivered, 1);
    let state = game.state(joined.player_id).unwrap();
    assert!(state.dogs[0].bag.is_empty());
    // Runs on to the end of the road and stops there.
    assert!((state.dogs[0].position.y - 15.4).abs() < 1e-9);
    assert_eq!(state.dogs[0].velocity, Velocity::ZERO);
}

#[test]
fn identical_seeds_give_identical_worlds() {
    let run = |seed: u64| {
        let mut game = GameConfig::from_json(CONFIG).unwrap().build(seed).unwrap();
        let map_id = MapId::from("town");
        let mut players = Vec::new();
        for i in 0..3 {
            players.push(game.join(&map_id, &format!("dog{i}"), SpawnPoint::Random).unwrap());
        }
        let moves = ["L", "U", "R", "D", ""];
        for step in 0..60usize {
            let player = players[step % players.len()].player_id;
            game.set_direction(player, Move::parse(moves[step % moves.len()]).unwrap());
            game.tick(Duration::from_millis(100));
        }
        serde_json::to_string(&game.state(players[0].player_id).unwrap()).unwrap()
    };
    assert_eq!(run(99), run(99));
}

#[test]
fn bundled_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../maps/town.json");
    let game = dog_courier_core::config::load_game(path, 0).unwrap();
    let ids: Vec<_> = game.list_maps().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![MapId::from("town"), MapId::from("alley")]);
    let alley = game.find_map(&MapId::from("alley")).unwrap();
    assert_eq!(alley.bag_capacity(), 1);
    assert_eq!(alley.dog_speed(), 1.5);
}
