//! Round settlement
//!
//! Runs exactly once per round, triggered only by the clock's transition
//! into the resolved phase. Every credit attempt is independent: a
//! failing balance store rejects one payout, gets retried and logged, and
//! never aborts the rest of the round or stalls the clock.

use crate::balance::BalanceStore;
use crate::policy::OutcomePolicy;
use crate::registry::ConnectionRegistry;
use crate::types::{Bet, BetStatus, GameKind, Outcome, PushEvent};
use tracing::{debug, info, warn};

const CREDIT_ATTEMPTS: u32 = 3;

/// What one settlement pass did, for logging and tests
#[derive(Debug)]
pub struct SettlementReport {
    pub round_id: String,
    pub bets: Vec<Bet>,
    pub won: usize,
    pub lost: usize,
    pub total_paid: f64,
    pub failed_credits: usize,
}

/// Settle every bet left active at resolution. The bets arrive already
/// drained from the ledger, so this consumes each exactly once.
pub async fn settle_round(
    game: GameKind,
    round_id: &str,
    mut bets: Vec<Bet>,
    outcome: &Outcome,
    policy: &dyn OutcomePolicy,
    balances: &dyn BalanceStore,
    registry: &ConnectionRegistry,
) -> SettlementReport {
    let mut report = SettlementReport {
        round_id: round_id.to_string(),
        bets: Vec::with_capacity(bets.len()),
        won: 0,
        lost: 0,
        total_paid: 0.0,
        failed_credits: 0,
    };

    for bet in bets.iter_mut() {
        let payout = policy.payout_for(bet, outcome);

        if payout > 0.0 {
            bet.status = BetStatus::Won;
            bet.settled_multiplier = Some(payout / bet.stake);
            report.won += 1;

            match credit_with_retry(balances, &bet.player, payout).await {
                Some(new_balance) => {
                    report.total_paid += payout;
                    // Offline players are still credited; they just miss
                    // the live notification
                    registry.send_to(&bet.player, PushEvent::BalanceUpdate { new_balance });
                }
                None => {
                    report.failed_credits += 1;
                    warn!(
                        %game,
                        round_id,
                        player = %bet.player,
                        payout,
                        "credit abandoned after {} attempts",
                        CREDIT_ATTEMPTS
                    );
                }
            }
        } else {
            bet.status = BetStatus::Lost;
            report.lost += 1;
        }
    }

    report.bets = bets;
    info!(
        %game,
        round_id,
        won = report.won,
        lost = report.lost,
        total_paid = report.total_paid,
        failed_credits = report.failed_credits,
        "round settled"
    );

    report
}

/// Independent per-bet credit with bounded retry
pub(crate) async fn credit_with_retry(
    balances: &dyn BalanceStore,
    player: &str,
    amount: f64,
) -> Option<f64> {
    for attempt in 1..=CREDIT_ATTEMPTS {
        match balances.credit(player, amount).await {
            Ok(new_balance) => return Some(new_balance),
            Err(e) => {
                debug!(player, amount, attempt, error = %e, "credit attempt failed");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::InMemoryBalanceStore;
    use crate::config::{BattleConfig, ColorConfig};
    use crate::errors::BalanceError;
    use crate::policy::{BattlePolicy, ColorDrawPolicy};
    use crate::types::Color;
    use async_trait::async_trait;

    #[tokio::test]
    async fn test_color_round_pays_matching_pick_only() {
        let policy = ColorDrawPolicy::new(ColorConfig::default());
        let balances = InMemoryBalanceStore::new();
        balances.seed("red-player", 0.0);
        balances.seed("blue-player", 0.0);
        let registry = ConnectionRegistry::new();

        let bets = vec![
            Bet::new("red-player", "main", 50.0, Some(Color::Red)),
            Bet::new("blue-player", "main", 50.0, Some(Color::Blue)),
        ];
        let outcome = Outcome::ColorDraw {
            winning: Color::Red,
        };

        let report = settle_round(
            GameKind::ColorDraw,
            "round-1",
            bets,
            &outcome,
            &policy,
            &balances,
            &registry,
        )
        .await;

        assert_eq!(report.won, 1);
        assert_eq!(report.lost, 1);
        assert_eq!(report.total_paid, 100.0);
        assert_eq!(balances.get_balance("red-player").await.unwrap(), 100.0);
        assert_eq!(balances.get_balance("blue-player").await.unwrap(), 0.0);

        // No bet leaves settlement still active
        assert!(report
            .bets
            .iter()
            .all(|b| b.status == BetStatus::Won || b.status == BetStatus::Lost));
    }

    #[tokio::test]
    async fn test_battle_single_winner() {
        let policy = BattlePolicy::new(BattleConfig::default());
        let balances = InMemoryBalanceStore::new();
        let registry = ConnectionRegistry::new();

        let bets = vec![
            Bet::new("a", "entry", 50.0, None),
            Bet::new("b", "entry", 50.0, None),
            Bet::new("c", "entry", 50.0, None),
        ];
        let outcome = Outcome::Battle {
            winner: Some("b".to_string()),
            pool: 150.0,
        };

        let report = settle_round(
            GameKind::Battle,
            "round-1",
            bets,
            &outcome,
            &policy,
            &balances,
            &registry,
        )
        .await;

        assert_eq!(report.won, 1);
        assert_eq!(report.lost, 2);
        assert_eq!(report.total_paid, 135.0);
        assert_eq!(balances.get_balance("b").await.unwrap(), 135.0);
    }

    /// Store that refuses credits for one player but works for the rest
    struct GrudgeStore {
        inner: InMemoryBalanceStore,
        refuse: String,
    }

    #[async_trait]
    impl BalanceStore for GrudgeStore {
        async fn get_balance(&self, player: &str) -> Result<f64, BalanceError> {
            self.inner.get_balance(player).await
        }

        async fn credit(&self, player: &str, amount: f64) -> Result<f64, BalanceError> {
            if player == self.refuse {
                return Err(BalanceError::Unavailable("store timeout".to_string()));
            }
            self.inner.credit(player, amount).await
        }

        async fn debit(&self, player: &str, amount: f64) -> Result<f64, BalanceError> {
            self.inner.debit(player, amount).await
        }
    }

    #[tokio::test]
    async fn test_one_failing_credit_does_not_abort_the_rest() {
        let policy = ColorDrawPolicy::new(ColorConfig::default());
        let balances = GrudgeStore {
            inner: InMemoryBalanceStore::new(),
            refuse: "unlucky".to_string(),
        };
        let registry = ConnectionRegistry::new();

        let bets = vec![
            Bet::new("unlucky", "main", 10.0, Some(Color::Green)),
            Bet::new("lucky", "main", 10.0, Some(Color::Green)),
        ];
        let outcome = Outcome::ColorDraw {
            winning: Color::Green,
        };

        let report = settle_round(
            GameKind::ColorDraw,
            "round-1",
            bets,
            &outcome,
            &policy,
            &balances,
            &registry,
        )
        .await;

        assert_eq!(report.won, 2);
        assert_eq!(report.failed_credits, 1);
        assert_eq!(report.total_paid, 20.0);
        assert_eq!(balances.get_balance("lucky").await.unwrap(), 20.0);
    }
}
