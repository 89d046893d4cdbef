use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Direction, Move, PlayerId, Point, ROAD_HALF_WIDTH,
    game::Game,
    map::Map,
    movement::compute_bounds,
    session::{Dog, GameSession},
};

/// Smallest remaining distance worth walking towards.
const MIN_STEP: f64 = 1e-6;

/// What a bot gets to look at before steering its dog.
#[derive(Debug)]
pub struct DogView<'a> {
    pub dog: &'a Dog,
    pub map: &'a Map,
    pub session: &'a GameSession,
}

/// Trait defining the behavior of a bot.
/// Bots steer a player's dog through the same commands a human would send.
pub trait Agent {
    /// The player whose dog this bot drives.
    fn player_id(&self) -> PlayerId;

    /// Returns the command to issue this tick, or `None` to leave the dog as is.
    fn get_action(&mut self, view: &DogView) -> Option<Move>;
}

/// Lets every bot look at its dog and issue its command.
pub fn steer_all(game: &mut Game, agents: &mut [Box<dyn Agent>]) {
    for agent in agents.iter_mut() {
        let command = {
            let Some(player) = game.find_player(agent.player_id()) else {
                continue;
            };
            let Some(session) = game.sessions().get(player.session) else {
                continue;
            };
            let (Some(dog), Some(map)) = (session.dog(player.dog), game.find_map(session.map_id()))
            else {
                continue;
            };
            agent.get_action(&DogView { dog, map, session })
        };
        if let Some(command) = command {
            game.set_direction(agent.player_id(), command);
        }
    }
}

/// How far a dog at `position` can still go in `direction`.
fn room_ahead(map: &Map, position: Point, direction: Direction) -> f64 {
    let bounds = compute_bounds(map.roads(), position, direction.axis());
    match direction {
        Direction::Left => position.x - bounds.min,
        Direction::Right => bounds.max - position.x,
        Direction::Up => position.y - bounds.min,
        Direction::Down => bounds.max - position.y,
    }
}

const DIRECTIONS: [Direction; 4] = [
    Direction::Left,
    Direction::Right,
    Direction::Up,
    Direction::Down,
];

/// A bot that picks a new random direction whenever its dog stops.
#[derive(Debug)]
pub struct RandomWalker {
    player_id: PlayerId,
    rng: StdRng,
}

impl RandomWalker {
    pub fn new(player_id: PlayerId, seed: u64) -> Self {
        Self {
            player_id,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomWalker {
    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn get_action(&mut self, view: &DogView) -> Option<Move> {
        if !view.dog.velocity().is_zero() {
            return None;
        }
        let open: Vec<Direction> = DIRECTIONS
            .into_iter()
            .filter(|&d| room_ahead(view.map, view.dog.position(), d) > ROAD_HALF_WIDTH + MIN_STEP)
            .collect();
        if open.is_empty() {
            return None;
        }
        Some(Move::Go(open[self.rng.random_range(0..open.len())]))
    }
}

/// A bot that walks to the nearest loot while its bag has room, then to the
/// nearest office.
///
/// Movement is greedy: it prefers the axis with the larger gap to the target
/// and falls back to the other axis when the road does not allow it.
#[derive(Debug)]
pub struct Courier {
    player_id: PlayerId,
}

impl Courier {
    pub fn new(player_id: PlayerId) -> Self {
        Self { player_id }
    }

    fn distance_sq(a: Point, b: Point) -> f64 {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        dx * dx + dy * dy
    }

    /// Picks the closest point from `targets`.
    fn nearest(from: Point, targets: impl Iterator<Item = Point>) -> Option<Point> {
        targets.min_by(|a, b| Self::distance_sq(from, *a).total_cmp(&Self::distance_sq(from, *b)))
    }

    fn target(view: &DogView) -> Option<Point> {
        let from = view.dog.position();
        if view.dog.bag().len() < view.map.bag_capacity() {
            if let Some(loot) = Self::nearest(from, view.session.active_loot().map(|l| l.position)) {
                return Some(loot);
            }
        }
        if view.dog.bag().is_empty() {
            return None;
        }
        Self::nearest(from, view.map.offices().iter().map(|o| o.position.into()))
    }
}

impl Agent for Courier {
    fn player_id(&self) -> PlayerId {
        self.player_id
    }

    fn get_action(&mut self, view: &DogView) -> Option<Move> {
        let Some(target) = Self::target(view) else {
            return (!view.dog.velocity().is_zero()).then_some(Move::Stop);
        };
        let from = view.dog.position();
        let dx = target.x - from.x;
        let dy = target.y - from.y;

        let horizontal = if dx < 0.0 { Direction::Left } else { Direction::Right };
        let vertical = if dy < 0.0 { Direction::Up } else { Direction::Down };
        let mut preferred = [(horizontal, dx.abs()), (vertical, dy.abs())];
        if dy.abs() > dx.abs() {
            preferred.swap(0, 1);
        }

        // Off-road slack only counts when the target lies within it.
        let choice = preferred
            .into_iter()
            .filter(|&(_, gap)| gap > MIN_STEP)
            .find(|&(d, gap)| {
                let room = room_ahead(view.map, from, d);
                room > MIN_STEP && (room > ROAD_HALF_WIDTH || gap <= room)
            })
            .map(|(d, _)| d)?;

        let already_going = view.dog.direction() == choice && !view.dog.velocity().is_zero();
        (!already_going).then_some(Move::Go(choice))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        IntPoint,
        loot::LootGeneratorConfig,
        map::{LootType, MapId, Office, OfficeId, Road},
        session::SpawnPoint,
    };

    fn quiet_game() -> Game {
        let config = LootGeneratorConfig {
            period: Duration::from_secs(1),
            probability: 0.0,
        };
        let mut game = Game::new(config, 11);
        let mut map = Map::new(MapId::from("block"), "Block");
        map.add_road(Road::horizontal(IntPoint::new(0, 0), 10));
        map.add_road(Road::vertical(IntPoint::new(10, 0), 10));
        map.add_office(Office {
            id: OfficeId::from("post"),
            position: IntPoint::new(10, 10),
            offset: IntPoint::new(0, 0),
        })
        .unwrap();
        map.add_loot_type(LootType::default());
        map.set_dog_speed(5.0);
        game.add_map(map).unwrap();
        game
    }

    #[test]
    fn random_walker_only_acts_when_stopped() {
        let mut game = quiet_game();
        let joined = game
            .join(&MapId::from("block"), "bot", SpawnPoint::At(Point::new(5.0, 0.0)))
            .unwrap();
        let mut agents: Vec<Box<dyn Agent>> = vec![Box::new(RandomWalker::new(joined.player_id, 3))];

        steer_all(&mut game, &mut agents);
        let dog = &game.sessions()[0].dogs()[0];
        assert!(matches!(dog.direction(), Direction::Left | Direction::Right));
        let first = dog.direction();

        steer_all(&mut game, &mut agents);
        assert_eq!(game.sessions()[0].dogs()[0].direction(), first);
    }

    #[test]
    fn courier_fetches_and_delivers() {
        let mut game = quiet_game();
        let map_id = MapId::from("block");
        let joined = game
            .join(&map_id, "courier", SpawnPoint::At(Point::new(0.0, 0.0)))
            .unwrap();
        let mut agents: Vec<Box<dyn Agent>> = vec![Box::new(Courier::new(joined.player_id))];

        let state_before = game.state(joined.player_id).unwrap();
        assert!(state_before.loot.is_empty());
        game.place_loot(&map_id, 0, Point::new(6.0, 0.0));

        let mut delivered = 0;
        for _ in 0..40 {
            steer_all(&mut game, &mut agents);
            delivered += game.tick(Duration::from_millis(200)).delivered;
        }
        assert_eq!(delivered, 1);
        let dog = &game.sessions()[0].dogs()[0];
        assert!(dog.bag().is_empty());
    }
}
