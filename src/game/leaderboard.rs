//! Score ranking: the top few players plus the local player's own rank

use serde::{Deserialize, Serialize};

use crate::game::state::{Player, PlayerId};

/// Number of players shown at the top of the board
pub const TOP_N: usize = 5;

/// One ranked row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based rank
    pub rank: usize,
    pub id: PlayerId,
    pub name: String,
    pub country: Option<String>,
    pub color: String,
    pub points: u32,
}

/// Anything that can appear on the board
pub trait Scored {
    fn id(&self) -> PlayerId;
    fn name(&self) -> &str;
    fn country(&self) -> Option<&str>;
    fn color(&self) -> &str;
    fn points(&self) -> u32;
}

impl Scored for Player {
    fn id(&self) -> PlayerId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
    fn color(&self) -> &str {
        &self.color
    }
    fn points(&self) -> u32 {
        self.points
    }
}

/// Ranked view of the current players
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub top: Vec<Standing>,
    /// The local player's row when they are outside the top rows
    pub local: Option<Standing>,
}

impl Leaderboard {
    /// Rank `players` by points, highest first. Ties keep input order.
    pub fn rank<'a, T, I>(players: I, local_id: Option<PlayerId>, top_n: usize) -> Self
    where
        T: Scored + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut ordered: Vec<&T> = players.into_iter().collect();
        ordered.sort_by(|a, b| b.points().cmp(&a.points()));

        let standing = |index: usize, player: &T| Standing {
            rank: index + 1,
            id: player.id(),
            name: player.name().to_string(),
            country: player.country().map(str::to_string),
            color: player.color().to_string(),
            points: player.points(),
        };

        let top = ordered
            .iter()
            .take(top_n)
            .enumerate()
            .map(|(i, p)| standing(i, p))
            .collect();

        let local = local_id.and_then(|id| {
            ordered
                .iter()
                .position(|p| p.id() == id)
                .filter(|index| *index >= top_n)
                .map(|index| standing(index, ordered[index]))
        });

        Self { top, local }
    }

    /// Rank of `id` if it is shown anywhere on the board
    pub fn rank_of(&self, id: PlayerId) -> Option<usize> {
        self.top
            .iter()
            .chain(self.local.iter())
            .find(|s| s.id == id)
            .map(|s| s.rank)
    }
}
