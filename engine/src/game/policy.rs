//! Prize policy and variant registry.
//!
//! The registry provides:
//! - Centralized listing of supported game variants
//! - Per-variant configuration with defaults and runtime overrides
//! - Active/inactive variant filtering
//! - The prize plan resolved for each new session
//!
//! Call sites must never hardcode the variant table; they look it up here.

use std::collections::HashMap;

use bingoo_types::{Cause, GameVariant, MAX_FLIPS_PER_SESSION, MAX_GRID_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::GameRng;

/// How a session is won.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinRule {
    /// Revealing any single prize-bearing slot wins its prize.
    PrizeSlot,
    /// Winning slots come in pairs; revealing both halves of a pair wins its
    /// prize.
    MatchPair,
}

/// How prize values are assigned to winning slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeValuePolicy {
    /// Every winning slot carries the same fixed value.
    Fixed(u64),
    /// Each winning slot draws a value uniformly, capped so the board's
    /// aggregate never exceeds the variant's maximum prize.
    UniformPerSlot,
}

/// Configuration for one game variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub variant: GameVariant,
    pub grid_size: usize,
    pub min_bet: u64,
    pub max_prize: u64,
    pub max_flips: u32,
    /// Bounds on the number of winning units (slots for `PrizeSlot`, pairs
    /// for `MatchPair`) rolled per board.
    pub min_winning_slots: u8,
    pub max_winning_slots: u8,
    pub win_rule: WinRule,
    pub value_policy: PrizeValuePolicy,
}

impl VariantConfig {
    /// Create the default configuration for a variant.
    pub fn default_for(variant: GameVariant) -> Self {
        match variant {
            GameVariant::Grid9 => Self {
                variant,
                grid_size: 9,
                min_bet: 5,
                max_prize: 100,
                max_flips: 3,
                min_winning_slots: 1,
                max_winning_slots: 3,
                win_rule: WinRule::PrizeSlot,
                value_policy: PrizeValuePolicy::UniformPerSlot,
            },
            GameVariant::Grid12 => Self {
                variant,
                grid_size: 12,
                min_bet: 10,
                max_prize: 200,
                max_flips: 4,
                min_winning_slots: 1,
                max_winning_slots: 3,
                win_rule: WinRule::MatchPair,
                value_policy: PrizeValuePolicy::UniformPerSlot,
            },
            GameVariant::Grid16 => Self {
                variant,
                grid_size: 16,
                min_bet: 20,
                max_prize: 3_800,
                max_flips: 5,
                min_winning_slots: 1,
                max_winning_slots: 3,
                win_rule: WinRule::PrizeSlot,
                value_policy: PrizeValuePolicy::UniformPerSlot,
            },
            // The jackpot board always hides exactly one winning card; its
            // value comes from the cause, so the fixed value here is a
            // placeholder overwritten at resolution time.
            GameVariant::CauseJackpot => Self {
                variant,
                grid_size: 16,
                min_bet: 10,
                max_prize: u64::MAX,
                max_flips: 3,
                min_winning_slots: 1,
                max_winning_slots: 1,
                win_rule: WinRule::PrizeSlot,
                value_policy: PrizeValuePolicy::Fixed(0),
            },
        }
    }
}

/// Prize assignment resolved for one new board.
///
/// `prize_values` holds one entry per winning unit: one slot each under
/// `PrizeSlot`, one pair (two slots) each under `MatchPair`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrizePlan {
    pub prize_values: Vec<u64>,
}

impl PrizePlan {
    /// Number of winning slots this plan will place on the board.
    pub fn winning_slots(&self, rule: WinRule) -> usize {
        match rule {
            WinRule::PrizeSlot => self.prize_values.len(),
            WinRule::MatchPair => self.prize_values.len() * 2,
        }
    }
}

/// Context the policy evaluates against.
pub enum PolicyContext<'a> {
    /// Standard table variant; nothing external to check.
    Standard,
    /// Cause jackpot, funded and gated by the given cause.
    Cause(&'a Cause),
}

/// Prize policy rejection.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("cause jackpot not eligible: {0}")]
    Eligibility(String),
}

/// Resolve the prize plan for a new session.
///
/// Cause preconditions are evaluated here, before any debit: the cause must
/// be active with a full, fully-paid roster, otherwise the session never
/// starts.
pub fn resolve_prize_policy(
    config: &VariantConfig,
    context: &PolicyContext<'_>,
    rng: &mut GameRng,
) -> Result<PrizePlan, PolicyError> {
    match context {
        PolicyContext::Cause(cause) => {
            if cause.status != bingoo_types::CauseStatus::Active {
                return Err(PolicyError::Eligibility(format!(
                    "cause {} is not active",
                    cause.id
                )));
            }
            if cause.communities.len() != cause.max_communities as usize {
                return Err(PolicyError::Eligibility(format!(
                    "cause {} has {} of {} communities",
                    cause.id,
                    cause.communities.len(),
                    cause.max_communities
                )));
            }
            if let Some(unpaid) = cause.communities.iter().find(|c| !c.paid) {
                return Err(PolicyError::Eligibility(format!(
                    "community {} has not paid",
                    unpaid.id
                )));
            }
            // Single winning card, valued by the cause.
            Ok(PrizePlan {
                prize_values: vec![cause.winning_amount],
            })
        }
        PolicyContext::Standard => {
            let count = rng.next_in_range(
                config.min_winning_slots.max(1) as u64,
                config.max_winning_slots.max(1) as u64,
            ) as usize;
            let prize_values = match config.value_policy {
                PrizeValuePolicy::Fixed(value) => {
                    // Shrink the count rather than overrun the variant cap.
                    let value = value.min(config.max_prize).max(1);
                    let count = count.min((config.max_prize / value).max(1) as usize);
                    vec![value; count]
                }
                PrizeValuePolicy::UniformPerSlot => {
                    let cap = (config.max_prize / count as u64).max(1);
                    let floor = config.min_bet.min(cap);
                    (0..count)
                        .map(|_| rng.next_in_range(floor.max(1), cap))
                        .collect()
                }
            };
            Ok(PrizePlan { prize_values })
        }
    }
}

/// Static metadata about a variant for listings.
#[derive(Clone, Debug, Serialize)]
pub struct VariantInfo {
    pub variant: GameVariant,
    pub name: &'static str,
    pub description: &'static str,
    pub grid_size: usize,
    pub min_bet: u64,
    pub max_prize: u64,
    pub max_flips: u32,
    pub active: bool,
}

/// Registry of available variants and their configurations.
#[derive(Clone, Debug)]
pub struct VariantRegistry {
    configs: HashMap<GameVariant, VariantConfig>,
    active: HashMap<GameVariant, bool>,
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantRegistry {
    /// Create a new registry with all variants using default configurations.
    pub fn new() -> Self {
        let mut configs = HashMap::new();
        let mut active = HashMap::new();
        for &variant in GameVariant::all() {
            configs.insert(variant, VariantConfig::default_for(variant));
            active.insert(variant, true);
        }
        Self { configs, active }
    }

    /// Get static display metadata for a variant.
    fn metadata(variant: GameVariant) -> (&'static str, &'static str) {
        match variant {
            GameVariant::Grid9 => (
                "Quick Nine",
                "Nine cards, three flips. Find a prize card to win.",
            ),
            GameVariant::Grid12 => (
                "Match Twelve",
                "Twelve cards. Reveal a matching prize pair to win.",
            ),
            GameVariant::Grid16 => (
                "Big Sixteen",
                "Sixteen cards with the largest prize table.",
            ),
            GameVariant::CauseJackpot => (
                "Community Jackpot",
                "One winning card, funded by the active cause.",
            ),
        }
    }

    pub fn is_active(&self, variant: GameVariant) -> bool {
        self.active.get(&variant).copied().unwrap_or(false)
    }

    pub fn set_active(&mut self, variant: GameVariant, active: bool) {
        self.active.insert(variant, active);
    }

    pub fn get_config(&self, variant: GameVariant) -> Option<&VariantConfig> {
        self.configs.get(&variant)
    }

    /// Replace a variant's configuration, clamped to the platform bounds.
    pub fn set_config(&mut self, mut config: VariantConfig) {
        config.grid_size = config.grid_size.clamp(1, MAX_GRID_SIZE);
        config.max_flips = config.max_flips.clamp(1, MAX_FLIPS_PER_SESSION);
        self.configs.insert(config.variant, config);
    }

    /// All variants with their current configuration and active status.
    pub fn all_infos(&self) -> Vec<VariantInfo> {
        GameVariant::all()
            .iter()
            .filter_map(|&variant| {
                let config = self.configs.get(&variant)?;
                let (name, description) = Self::metadata(variant);
                Some(VariantInfo {
                    variant,
                    name,
                    description,
                    grid_size: config.grid_size,
                    min_bet: config.min_bet,
                    max_prize: config.max_prize,
                    max_flips: config.max_flips,
                    active: self.is_active(variant),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bingoo_types::{CauseStatus, CommunityEntry};

    fn test_cause(status: CauseStatus, paid: &[bool], max: u32) -> Cause {
        Cause {
            id: 9,
            title: "Reforestation".to_string(),
            status,
            winning_amount: 750,
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
    fn registry_defaults_match_variant_table() {
        let registry = VariantRegistry::new();

        let grid9 = registry.get_config(GameVariant::Grid9).unwrap();
        assert_eq!((grid9.grid_size, grid9.min_bet, grid9.max_prize), (9, 5, 100));

        let grid12 = registry.get_config(GameVariant::Grid12).unwrap();
        assert_eq!((grid12.grid_size, grid12.min_bet, grid12.max_prize), (12, 10, 200));
        assert_eq!(grid12.win_rule, WinRule::MatchPair);

        let grid16 = registry.get_config(GameVariant::Grid16).unwrap();
        assert_eq!((grid16.grid_size, grid16.min_bet, grid16.max_prize), (16, 20, 3_800));

        for variant in GameVariant::all() {
            assert!(registry.is_active(*variant));
        }
    }

    #[test]
    fn registry_overrides_and_activation() {
        let mut registry = VariantRegistry::new();
        let mut config = VariantConfig::default_for(GameVariant::Grid9);
        config.min_bet = 50;
        registry.set_config(config);
        assert_eq!(registry.get_config(GameVariant::Grid9).unwrap().min_bet, 50);

        registry.set_active(GameVariant::Grid16, false);
        assert!(!registry.is_active(GameVariant::Grid16));
        let infos = registry.all_infos();
        let grid16 = infos
            .iter()
            .find(|i| i.variant == GameVariant::Grid16)
            .unwrap();
        assert!(!grid16.active);

        // Overrides are clamped to the platform bounds.
        let mut config = VariantConfig::default_for(GameVariant::Grid16);
        config.grid_size = 1_000;
        config.max_flips = 0;
        registry.set_config(config);
        let clamped = registry.get_config(GameVariant::Grid16).unwrap();
        assert_eq!(clamped.grid_size, MAX_GRID_SIZE);
        assert_eq!(clamped.max_flips, 1);
    }

    #[test]
    fn standard_plan_respects_bounds() {
        let config = VariantConfig::default_for(GameVariant::Grid9);
        for session in 0..200u64 {
            let mut rng = GameRng::new(17, session);
            let plan =
                resolve_prize_policy(&config, &PolicyContext::Standard, &mut rng).unwrap();
            let count = plan.prize_values.len();
            assert!((1..=3).contains(&count));
            let total: u64 = plan.prize_values.iter().sum();
            assert!(total <= config.max_prize, "total {total} over cap");
            assert!(plan.prize_values.iter().all(|&v| v >= 1));
        }
    }

    #[test]
    fn fixed_policy_shrinks_count_to_fit_cap() {
        let mut config = VariantConfig::default_for(GameVariant::Grid9);
        config.value_policy = PrizeValuePolicy::Fixed(60);
        config.min_winning_slots = 3;
        config.max_winning_slots = 3;
        let mut rng = GameRng::new(1, 1);
        let plan = resolve_prize_policy(&config, &PolicyContext::Standard, &mut rng).unwrap();
        // 3 slots at 60 would exceed max_prize 100, so the count shrinks.
        assert_eq!(plan.prize_values, vec![60]);
    }

    #[test]
    fn cause_plan_is_single_slot_at_winning_amount() {
        let cause = test_cause(CauseStatus::Active, &[true, true], 2);
        let config = VariantConfig::default_for(GameVariant::CauseJackpot);
        let mut rng = GameRng::new(3, 3);
        let plan =
            resolve_prize_policy(&config, &PolicyContext::Cause(&cause), &mut rng).unwrap();
        assert_eq!(plan.prize_values, vec![750]);
        assert_eq!(plan.winning_slots(config.win_rule), 1);
    }

    #[test]
    fn cause_plan_rejects_ineligible_causes() {
        let config = VariantConfig::default_for(GameVariant::CauseJackpot);
        let mut rng = GameRng::new(3, 3);

        let draft = test_cause(CauseStatus::Draft, &[true, true], 2);
        assert!(matches!(
            resolve_prize_policy(&config, &PolicyContext::Cause(&draft), &mut rng),
            Err(PolicyError::Eligibility(_))
        ));

        let short = test_cause(CauseStatus::Active, &[true], 2);
        assert!(matches!(
            resolve_prize_policy(&config, &PolicyContext::Cause(&short), &mut rng),
            Err(PolicyError::Eligibility(_))
        ));

        let unpaid = test_cause(CauseStatus::Active, &[true, false], 2);
        let err = resolve_prize_policy(&config, &PolicyContext::Cause(&unpaid), &mut rng)
            .unwrap_err();
        assert!(err.to_string().contains("has not paid"));
    }

    #[test]
    fn match_pair_plan_doubles_slot_count() {
        let config = VariantConfig::default_for(GameVariant::Grid12);
        let mut rng = GameRng::new(5, 8);
        let plan = resolve_prize_policy(&config, &PolicyContext::Standard, &mut rng).unwrap();
        assert_eq!(
            plan.winning_slots(WinRule::MatchPair),
            plan.prize_values.len() * 2
        );
    }
}
