//! Round engine: clock, state machine, and bet entry points
//!
//! One engine per game variant. The tick task owns every phase transition
//! and is the only writer of the continuous value; `place_bet` and
//! `cash_out` race against it through the round mutex, which is the single
//! serialization point. No path holds the mutex across an await, so a slow
//! balance store can never stall the clock or block other players.

use crate::balance::BalanceStore;
use crate::config::EngineConfig;
use crate::errors::{BetError, BetResult};
use crate::policy::{BattlePolicy, ColorDrawPolicy, CrashPolicy, OutcomePolicy};
use crate::registry::ConnectionRegistry;
use crate::round::RoundState;
use crate::settlement;
use crate::types::{
    mask_player, Bet, CashOutReceipt, Color, GameKind, Outcome, Phase, PushEvent, RoundSnapshot,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Phase durations and tick cadence for one engine
#[derive(Debug, Clone)]
pub struct RoundTiming {
    pub betting_window: Duration,
    pub cooldown: Duration,
    pub tick: Duration,
}

/// The per-game round engine. Collaborators are injected, never looked up.
pub struct RoundEngine {
    game: GameKind,
    timing: RoundTiming,
    policy: Arc<dyn OutcomePolicy>,
    state: Mutex<RoundState>,
    balances: Arc<dyn BalanceStore>,
    registry: Arc<ConnectionRegistry>,
}

impl RoundEngine {
    pub fn new(
        policy: Arc<dyn OutcomePolicy>,
        timing: RoundTiming,
        history_cap: usize,
        balances: Arc<dyn BalanceStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Arc<Self> {
        let state = RoundState::open(timing.betting_window, history_cap);
        Arc::new(Self {
            game: policy.game(),
            timing,
            policy,
            state: Mutex::new(state),
            balances,
            registry,
        })
    }

    /// Continuous-multiplier crash engine
    pub fn crash(
        cfg: &EngineConfig,
        balances: Arc<dyn BalanceStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Arc<Self> {
        Self::new(
            Arc::new(CrashPolicy::new(cfg.crash.clone())),
            RoundTiming {
                betting_window: Duration::from_secs(cfg.crash.betting_window_secs),
                cooldown: Duration::from_secs(cfg.crash.cooldown_secs),
                tick: Duration::from_millis(cfg.crash.tick_ms),
            },
            cfg.history_cap,
            balances,
            registry,
        )
    }

    /// Three-way color draw engine
    pub fn color_draw(
        cfg: &EngineConfig,
        balances: Arc<dyn BalanceStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Arc<Self> {
        Self::new(
            Arc::new(ColorDrawPolicy::new(cfg.color.clone())),
            RoundTiming {
                betting_window: Duration::from_secs(cfg.color.betting_window_secs),
                cooldown: Duration::from_secs(cfg.color.cooldown_secs),
                tick: Duration::from_millis(cfg.color.tick_ms),
            },
            cfg.history_cap,
            balances,
            registry,
        )
    }

    /// Pooled battle engine
    pub fn battle(
        cfg: &EngineConfig,
        balances: Arc<dyn BalanceStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Arc<Self> {
        Self::new(
            Arc::new(BattlePolicy::new(cfg.battle.clone())),
            RoundTiming {
                betting_window: Duration::from_secs(cfg.battle.betting_window_secs),
                cooldown: Duration::from_secs(cfg.battle.cooldown_secs),
                tick: Duration::from_millis(cfg.battle.tick_ms),
            },
            cfg.history_cap,
            balances,
            registry,
        )
    }

    pub fn game(&self) -> GameKind {
        self.game
    }

    /// Place a bet into the open betting window.
    ///
    /// The stake is debited from the balance store before the bet is
    /// registered; a bet record never exists without its stake reserved.
    /// An out-of-window or duplicate request is rejected before any debit.
    /// Returns the player's new balance.
    pub async fn place_bet(
        &self,
        player: &str,
        slot: &str,
        stake: f64,
        pick: Option<Color>,
    ) -> BetResult<f64> {
        if stake <= 0.0 {
            return Err(BetError::InvalidStake(stake));
        }
        self.policy.validate_wager(stake, pick)?;

        // Reject before touching the balance store
        {
            let state = self.lock_state();
            if state.phase != Phase::Waiting {
                return Err(BetError::PhaseClosed);
            }
            if state.ledger.contains(player, slot) {
                return Err(BetError::DuplicateSlot);
            }
            if self.policy.single_entry_per_player() && state.ledger.contains_player(player) {
                return Err(BetError::DuplicateSlot);
            }
        }

        let new_balance = self.balances.debit(player, stake).await?;

        let placed = {
            let mut state = self.lock_state();
            if state.phase != Phase::Waiting {
                Err(BetError::PhaseClosed)
            } else if self.policy.single_entry_per_player() && state.ledger.contains_player(player)
            {
                Err(BetError::DuplicateSlot)
            } else {
                state.ledger.place(Bet::new(player, slot, stake, pick))
            }
        };

        if let Err(e) = placed {
            // The window closed or the slot was raced between the debit
            // and registration; hand the stake back
            if let Err(refund_err) = self.balances.credit(player, stake).await {
                warn!(
                    game = %self.game,
                    player,
                    stake,
                    error = %refund_err,
                    "refund failed after rejected placement"
                );
            }
            return Err(e);
        }

        info!(game = %self.game, player, slot, stake, "bet placed");
        self.registry.broadcast(&PushEvent::NewBet {
            game: self.game,
            player: mask_player(player),
            slot: slot.to_string(),
            amount: stake,
        });

        Ok(new_balance)
    }

    /// Cash a bet out at the round's current multiplier.
    ///
    /// The read of the current value and the status flip happen in one
    /// critical section, so a cash-out either lands strictly before the
    /// tick that applies the crash or is rejected with `NotActive` after
    /// it. The credit happens after the in-memory transition committed.
    pub async fn cash_out(&self, player: &str, slot: &str) -> BetResult<CashOutReceipt> {
        let (multiplier, payout) = {
            let mut state = self.lock_state();
            if state.phase != Phase::Active || !self.policy.cash_out_allowed() {
                return Err(BetError::NotActive);
            }

            let value = state.value;
            let bet = state.ledger.cash_out(player, slot, value)?;
            let payout = match &state.target {
                Some(target) => self.policy.payout_for(&bet, target),
                // Active always carries a committed target
                None => return Err(BetError::NotActive),
            };
            (value, payout)
        };

        info!(game = %self.game, player, slot, multiplier, payout, "cashed out");

        match settlement::credit_with_retry(self.balances.as_ref(), player, payout).await {
            Some(new_balance) => {
                self.registry
                    .send_to(player, PushEvent::BalanceUpdate { new_balance });
            }
            None => {
                warn!(game = %self.game, player, payout, "cash-out credit abandoned");
            }
        }

        Ok(CashOutReceipt { multiplier, payout })
    }

    /// Advance the round by one tick and broadcast the resulting state.
    /// This is the only driver of phase transitions and the only writer of
    /// the continuous value.
    pub async fn tick(&self) {
        let now = Instant::now();
        let mut job: Option<(String, Vec<Bet>, Outcome)> = None;

        let snapshot = {
            let mut state = self.lock_state();

            if state.phase == Phase::Waiting && now >= state.phase_deadline {
                // Commit the outcome at window close, when exposure is
                // known and before any cash-out is possible
                let outcome = self.policy.generate(&state.ledger.context());
                state.target = Some(outcome);
                state.phase = Phase::Active;
                state.phase_started = now;
                state.phase_deadline = match self.policy.reveal_window() {
                    Some(window) => now + window,
                    // Continuous rounds run until the value hits the target
                    None => now,
                };
                state.value = 1.0;
                debug!(game = %self.game, round_id = %state.round_id, "round active");
            }

            if state.phase == Phase::Active {
                let elapsed = now.duration_since(state.phase_started);
                let done = match self.policy.reveal_window() {
                    None => {
                        let advanced = self.policy.advance(elapsed);
                        if advanced > state.value {
                            state.value = advanced;
                        }
                        match &state.target {
                            Some(target) => self.policy.target_reached(state.value, target),
                            None => false,
                        }
                    }
                    Some(_) => now >= state.phase_deadline,
                };

                if done {
                    if let Some(outcome) = state.target.clone() {
                        // The displayed value never overshoots the
                        // committed crash point
                        if let Outcome::Crash { multiplier } = &outcome {
                            state.value = *multiplier;
                        }
                        state.phase = Phase::Resolved;
                        state.phase_started = now;
                        state.phase_deadline = now + self.timing.cooldown;
                        state.push_history(&outcome);
                        let bets = state.ledger.drain_active();
                        job = Some((state.round_id.clone(), bets, outcome));
                    }
                }
            } else if state.phase == Phase::Resolved && now >= state.phase_deadline {
                state.recycle(self.timing.betting_window);
                debug!(game = %self.game, round_id = %state.round_id, "betting window open");
            }

            state.snapshot(self.game, self.policy.reveal_window().is_none(), now)
        };

        self.registry.broadcast(&PushEvent::RoundState(snapshot));

        if let Some((round_id, bets, outcome)) = job {
            info!(
                game = %self.game,
                round_id = %round_id,
                outcome = %outcome.label(),
                bets = bets.len(),
                "round resolved"
            );
            self.registry.broadcast(&PushEvent::RoundResolved {
                game: self.game,
                round_id: round_id.clone(),
                outcome: outcome.clone(),
            });

            settlement::settle_round(
                self.game,
                &round_id,
                bets,
                &outcome,
                self.policy.as_ref(),
                self.balances.as_ref(),
                self.registry.as_ref(),
            )
            .await;
        }
    }

    /// Run the round clock forever at the configured cadence
    pub async fn run(self: Arc<Self>) {
        info!(game = %self.game, tick_ms = self.timing.tick.as_millis() as u64, "round clock started");
        let mut ticker = interval(self.timing.tick);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Current phase, as the clock last left it
    pub fn phase(&self) -> Phase {
        self.lock_state().phase
    }

    /// Point-in-time view of the live round
    pub fn snapshot(&self) -> RoundSnapshot {
        self.lock_state()
            .snapshot(self.game, self.policy.reveal_window().is_none(), Instant::now())
    }

    fn lock_state(&self) -> MutexGuard<'_, RoundState> {
        // Held only for one read-modify-write, never across an await;
        // no holder panics, so poisoning cannot occur
        self.state.lock().unwrap()
    }

    /// Expire the current phase so the next tick transitions immediately
    #[cfg(test)]
    pub(crate) fn force_phase_expiry(&self) {
        let mut state = self.lock_state();
        state.phase_deadline = state.phase_started;
    }
}
