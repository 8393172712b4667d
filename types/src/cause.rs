use serde::{Deserialize, Serialize};

/// Lifecycle of a charitable cause competition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseStatus {
    #[default]
    Draft,
    Active,
    Finished,
}

/// A community competing for a cause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityEntry {
    pub id: u64,
    pub name: String,
    /// Whether the community's entry fee has been paid. The cause jackpot is
    /// playable only once every participant has paid.
    pub paid: bool,
}

/// A charitable cause funding a community jackpot.
///
/// The cause jackpot variant draws its prize from `winning_amount` instead of
/// the standard variant table, and is eligible only while the cause is active
/// with a full, fully-paid roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    pub id: u64,
    pub title: String,
    pub status: CauseStatus,
    /// Jackpot paid to the winner, in points.
    pub winning_amount: u64,
    /// Required number of participating communities.
    pub max_communities: u32,
    pub communities: Vec<CommunityEntry>,
}

impl Cause {
    /// Whether the cause currently satisfies the jackpot preconditions.
    pub fn is_eligible(&self) -> bool {
        self.status == CauseStatus::Active
            && self.communities.len() == self.max_communities as usize
            && self.communities.iter().all(|c| c.paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cause(status: CauseStatus, paid: &[bool], max: u32) -> Cause {
        Cause {
            id: 1,
            title: "Clean water".to_string(),
            status,
            winning_amount: 500,
            max_communities: max,
            communities: paid
                .iter()
                .enumerate()
                .map(|(i, &paid)| CommunityEntry {
                    id: i as u64,
                    name: format!("community-{i}"),
                    paid,
                })
                .collect(),
        }
    }

    #[test]
    fn eligible_when_active_full_and_paid() {
        assert!(cause(CauseStatus::Active, &[true, true], 2).is_eligible());
    }

    #[test]
    fn ineligible_when_unpaid_or_incomplete() {
        assert!(!cause(CauseStatus::Active, &[true, false], 2).is_eligible());
        assert!(!cause(CauseStatus::Active, &[true], 2).is_eligible());
        assert!(!cause(CauseStatus::Draft, &[true, true], 2).is_eligible());
        assert!(!cause(CauseStatus::Finished, &[true, true], 2).is_eligible());
    }
}
