use serde::{Deserialize, Serialize};

use crate::{DogId, PlayerId};

/// Index of a session inside its [`Game`](crate::game::Game).
pub type SessionIndex = usize;

/// Links a player to the dog it controls and the session that dog lives in.
///
/// Only indices are stored; the game owns the session and the dog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub session: SessionIndex,
    pub dog: DogId,
}

/// Registry of all players. Ids are handed out in order and never reused.
#[derive(Debug, Clone, Default)]
pub struct Players {
    players: Vec<Player>,
}

impl Players {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, session: SessionIndex, dog: DogId) -> Player {
        let player = Player {
            id: self.players.len() as PlayerId,
            session,
            dog,
        };
        self.players.push(player);
        player
    }

    pub fn find(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }
}
