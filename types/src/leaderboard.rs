use serde::{Deserialize, Serialize};

use crate::{UserId, LEADERBOARD_SIZE};

/// Leaderboard entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub points: u64,
    pub rank: u32,
}

/// Top point holders, maintained on every settlement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn update(&mut self, user: &UserId, points: u64) {
        // Remove existing entry for this user
        self.entries.retain(|e| &e.user != user);

        // Add new entry
        self.entries.push(LeaderboardEntry {
            user: user.clone(),
            points,
            rank: 0,
        });

        // Sort by points descending
        self.entries.sort_by(|a, b| b.points.cmp(&a.points));

        // Keep the top entries and update ranks
        self.entries.truncate(LEADERBOARD_SIZE);
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = (i + 1) as u32;
        }
    }
}
