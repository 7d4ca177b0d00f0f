//! Outcome policies, one per game variant
//!
//! A policy owns two decisions: what a round's committed outcome is, and
//! what each bet pays against it. The round clock is generic over this
//! trait, so variants never duplicate the phase machine.

use crate::config::{BattleConfig, ColorConfig, CrashConfig};
use crate::errors::{BetError, BetResult};
use crate::types::{Bet, BetStatus, Color, GameKind, Outcome, RoundContext};
use rand::Rng;
use std::time::Duration;

/// Pluggable outcome and payout rules for one game variant
pub trait OutcomePolicy: Send + Sync {
    fn game(&self) -> GameKind;

    /// Draw the round's committed outcome from the wager pressure at the
    /// close of the betting window
    fn generate(&self, ctx: &RoundContext) -> Outcome;

    /// Payout for a bet against the revealed outcome. Cashed bets pay from
    /// their stamped multiplier; everything else pays from the outcome.
    fn payout_for(&self, bet: &Bet, outcome: &Outcome) -> f64;

    /// Variant-specific wager rules beyond stake positivity
    fn validate_wager(&self, _stake: f64, _pick: Option<Color>) -> BetResult<()> {
        Ok(())
    }

    /// Whether a player may hold at most one entry per round, regardless
    /// of slot
    fn single_entry_per_player(&self) -> bool {
        false
    }

    /// Continuous value as a function of time in the active phase. Only
    /// meaningful when `reveal_window` is `None`.
    fn advance(&self, _elapsed: Duration) -> f64 {
        1.0
    }

    /// Whether mid-round cash-outs are legal for this variant
    fn cash_out_allowed(&self) -> bool {
        false
    }

    /// Fixed reveal duration for round-based variants. `None` means the
    /// round resolves when the advancing value reaches the target.
    fn reveal_window(&self) -> Option<Duration> {
        None
    }

    /// Whether the advancing value has reached the committed target
    fn target_reached(&self, _value: f64, _outcome: &Outcome) -> bool {
        false
    }
}

/// Continuous-multiplier crash policy with a load-adaptive outcome range.
///
/// The draw is uniform over the full range with a small instant-bust
/// probability, except when active bets exceed the load threshold, in
/// which case the draw is restricted to the low sub-range. House edge
/// scales with exposure.
pub struct CrashPolicy {
    cfg: CrashConfig,
}

impl CrashPolicy {
    pub fn new(cfg: CrashConfig) -> Self {
        Self { cfg }
    }
}

impl OutcomePolicy for CrashPolicy {
    fn game(&self) -> GameKind {
        GameKind::Crash
    }

    fn generate(&self, ctx: &RoundContext) -> Outcome {
        let mut rng = rand::thread_rng();

        let multiplier = if ctx.active_bets > self.cfg.load_threshold {
            rng.gen_range(self.cfg.min_multiplier..=self.cfg.constrained_max)
        } else if rng.gen::<f64>() < self.cfg.instant_bust_probability {
            1.00
        } else {
            rng.gen_range(self.cfg.min_multiplier..=self.cfg.max_multiplier)
        };

        Outcome::Crash {
            multiplier: (multiplier * 100.0).round() / 100.0,
        }
    }

    fn payout_for(&self, bet: &Bet, _outcome: &Outcome) -> f64 {
        // Only a cash-out before the crash pays; bets still active at
        // resolution lose their stake
        match (bet.status, bet.settled_multiplier) {
            (BetStatus::Cashed, Some(multiplier)) => bet.stake * multiplier,
            _ => 0.0,
        }
    }

    fn advance(&self, elapsed: Duration) -> f64 {
        self.cfg.growth_base.powf(elapsed.as_secs_f64())
    }

    fn cash_out_allowed(&self) -> bool {
        true
    }

    fn target_reached(&self, value: f64, outcome: &Outcome) -> bool {
        match outcome {
            Outcome::Crash { multiplier } => value >= *multiplier,
            _ => false,
        }
    }
}

/// Three-way color draw with fixed odds.
///
/// Category count times inverse odds exceeds 1, so the house edge is
/// structural.
pub struct ColorDrawPolicy {
    cfg: ColorConfig,
}

impl ColorDrawPolicy {
    pub fn new(cfg: ColorConfig) -> Self {
        Self { cfg }
    }
}

impl OutcomePolicy for ColorDrawPolicy {
    fn game(&self) -> GameKind {
        GameKind::ColorDraw
    }

    fn generate(&self, _ctx: &RoundContext) -> Outcome {
        const COLORS: [Color; 3] = [Color::Red, Color::Green, Color::Blue];
        let winning = COLORS[rand::thread_rng().gen_range(0..COLORS.len())];
        Outcome::ColorDraw { winning }
    }

    /// A pick is mandatory; a bet with no color could never win
    fn validate_wager(&self, _stake: f64, pick: Option<Color>) -> BetResult<()> {
        if pick.is_none() {
            return Err(BetError::MissingPick);
        }
        Ok(())
    }

    fn payout_for(&self, bet: &Bet, outcome: &Outcome) -> f64 {
        match (bet.pick, outcome) {
            (Some(pick), Outcome::ColorDraw { winning }) if pick == *winning => {
                bet.stake * self.cfg.odds
            }
            _ => 0.0,
        }
    }

    fn reveal_window(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.cfg.reveal_secs))
    }
}

/// Pooled battle: every entry fee joins the pool, one uniformly drawn
/// winner takes the pool minus the house cut.
pub struct BattlePolicy {
    cfg: BattleConfig,
}

impl BattlePolicy {
    pub fn new(cfg: BattleConfig) -> Self {
        Self { cfg }
    }
}

impl OutcomePolicy for BattlePolicy {
    fn game(&self) -> GameKind {
        GameKind::Battle
    }

    fn generate(&self, ctx: &RoundContext) -> Outcome {
        if ctx.players.is_empty() {
            return Outcome::Battle {
                winner: None,
                pool: 0.0,
            };
        }

        let index = rand::thread_rng().gen_range(0..ctx.players.len());
        Outcome::Battle {
            winner: Some(ctx.players[index].clone()),
            pool: ctx.total_staked,
        }
    }

    /// Every entrant pays the same fixed fee into the pool
    fn validate_wager(&self, stake: f64, _pick: Option<Color>) -> BetResult<()> {
        if stake != self.cfg.entry_fee {
            return Err(BetError::InvalidStake(stake));
        }
        Ok(())
    }

    /// The pool pays one full share to the winner; a second entry under
    /// another slot would let one player collect it twice
    fn single_entry_per_player(&self) -> bool {
        true
    }

    fn payout_for(&self, bet: &Bet, outcome: &Outcome) -> f64 {
        match outcome {
            Outcome::Battle {
                winner: Some(winner),
                pool,
            } if *winner == bet.player => pool * (1.0 - self.cfg.house_cut),
            _ => 0.0,
        }
    }

    fn reveal_window(&self) -> Option<Duration> {
        Some(Duration::from_secs(self.cfg.reveal_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bet;

    fn context(active_bets: usize) -> RoundContext {
        RoundContext {
            active_bets,
            players: (0..active_bets).map(|i| format!("player-{}", i)).collect(),
            total_staked: active_bets as f64 * 10.0,
        }
    }

    #[test]
    fn test_crash_draws_stay_in_range() {
        let cfg = CrashConfig::default();
        let policy = CrashPolicy::new(cfg.clone());

        for _ in 0..500 {
            let outcome = policy.generate(&context(1));
            let multiplier = outcome.multiplier().unwrap();
            assert!(
                multiplier == 1.00
                    || (cfg.min_multiplier..=cfg.max_multiplier).contains(&multiplier),
                "out of range: {}",
                multiplier
            );
        }
    }

    #[test]
    fn test_load_adaptive_range_constrains_every_draw() {
        let cfg = CrashConfig::default();
        let policy = CrashPolicy::new(cfg.clone());
        let ctx = context(cfg.load_threshold + 1);

        for _ in 0..500 {
            let multiplier = policy.generate(&ctx).multiplier().unwrap();
            assert!(
                (cfg.min_multiplier..=cfg.constrained_max).contains(&multiplier),
                "over-threshold draw escaped the constrained range: {}",
                multiplier
            );
        }
    }

    #[test]
    fn test_certain_instant_bust() {
        let cfg = CrashConfig {
            instant_bust_probability: 1.0,
            ..CrashConfig::default()
        };
        let policy = CrashPolicy::new(cfg);
        assert_eq!(
            policy.generate(&context(1)),
            Outcome::Crash { multiplier: 1.00 }
        );
    }

    #[test]
    fn test_crash_payout_only_for_cashed_bets() {
        let policy = CrashPolicy::new(CrashConfig::default());
        let outcome = Outcome::Crash { multiplier: 2.30 };

        let mut cashed = Bet::new("alice", "panel1", 100.0, None);
        cashed.status = BetStatus::Cashed;
        cashed.settled_multiplier = Some(1.42);
        assert_eq!(policy.payout_for(&cashed, &outcome), 142.0);

        let rode_it_down = Bet::new("bob", "panel1", 100.0, None);
        assert_eq!(policy.payout_for(&rode_it_down, &outcome), 0.0);
    }

    #[test]
    fn test_color_payout_fixed_odds() {
        let policy = ColorDrawPolicy::new(ColorConfig::default());
        let outcome = Outcome::ColorDraw {
            winning: Color::Red,
        };

        let red = Bet::new("alice", "main", 50.0, Some(Color::Red));
        let blue = Bet::new("bob", "main", 50.0, Some(Color::Blue));
        assert_eq!(policy.payout_for(&red, &outcome), 100.0);
        assert_eq!(policy.payout_for(&blue, &outcome), 0.0);
    }

    #[test]
    fn test_battle_winner_takes_pool_minus_cut() {
        let policy = BattlePolicy::new(BattleConfig::default());
        let ctx = RoundContext {
            active_bets: 3,
            players: vec!["a".into(), "b".into(), "c".into()],
            total_staked: 150.0,
        };

        let outcome = policy.generate(&ctx);
        let Outcome::Battle { winner, pool } = &outcome else {
            panic!("expected a battle outcome");
        };
        assert_eq!(*pool, 150.0);
        let winner = winner.clone().expect("three entrants, one must win");
        assert!(ctx.players.contains(&winner));

        let winning_bet = Bet::new(&winner, "entry", 50.0, None);
        assert_eq!(policy.payout_for(&winning_bet, &outcome), 135.0);

        let loser = ctx.players.iter().find(|p| **p != winner).unwrap();
        let losing_bet = Bet::new(loser, "entry", 50.0, None);
        assert_eq!(policy.payout_for(&losing_bet, &outcome), 0.0);
    }

    #[test]
    fn test_battle_rejects_stakes_other_than_the_entry_fee() {
        let policy = BattlePolicy::new(BattleConfig::default());
        assert_eq!(policy.validate_wager(50.0, None), Ok(()));
        assert_eq!(
            policy.validate_wager(49.0, None),
            Err(BetError::InvalidStake(49.0))
        );
        assert!(policy.single_entry_per_player());
    }

    #[test]
    fn test_color_requires_a_pick() {
        let policy = ColorDrawPolicy::new(ColorConfig::default());
        assert_eq!(policy.validate_wager(10.0, Some(Color::Red)), Ok(()));
        assert_eq!(policy.validate_wager(10.0, None), Err(BetError::MissingPick));
    }

    #[test]
    fn test_battle_with_no_entrants() {
        let policy = BattlePolicy::new(BattleConfig::default());
        let outcome = policy.generate(&context(0));
        assert_eq!(
            outcome,
            Outcome::Battle {
                winner: None,
                pool: 0.0
            }
        );
    }
}
