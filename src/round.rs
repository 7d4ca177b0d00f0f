//! Round state
//!
//! One `RoundState` per engine, exclusively owned behind the engine's
//! mutex. The clock task is the only writer of phase and value; request
//! paths only touch the ledger. Nothing here persists across a process
//! restart.

use crate::ledger::BetLedger;
use crate::types::{current_timestamp, GameKind, Outcome, OutcomeRecord, Phase, RoundSnapshot};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Authoritative state of the live round
pub struct RoundState {
    pub round_id: String,
    pub phase: Phase,
    pub phase_started: Instant,
    pub phase_deadline: Instant,
    /// Continuous multiplier, monotonically non-decreasing while active
    pub value: f64,
    /// Committed at the close of the betting window, revealed at
    /// resolution
    pub target: Option<Outcome>,
    pub ledger: BetLedger,
    history: VecDeque<OutcomeRecord>,
    history_cap: usize,
}

impl RoundState {
    /// Open a fresh round with its betting window
    pub fn open(betting_window: Duration, history_cap: usize) -> Self {
        let now = Instant::now();
        Self {
            round_id: Uuid::new_v4().to_string(),
            phase: Phase::Waiting,
            phase_started: now,
            phase_deadline: now + betting_window,
            value: 1.0,
            target: None,
            ledger: BetLedger::new(),
            history: VecDeque::new(),
            history_cap,
        }
    }

    /// Supersede this round with the next one, carrying the history across
    /// the boundary. Everything else starts fresh.
    pub fn recycle(&mut self, betting_window: Duration) {
        let now = Instant::now();
        self.round_id = Uuid::new_v4().to_string();
        self.phase = Phase::Waiting;
        self.phase_started = now;
        self.phase_deadline = now + betting_window;
        self.value = 1.0;
        self.target = None;
        self.ledger = BetLedger::new();
    }

    /// Append a resolved outcome, most-recent-first, evicting the oldest
    /// past the cap
    pub fn push_history(&mut self, outcome: &Outcome) {
        self.history.push_front(OutcomeRecord {
            round_id: self.round_id.clone(),
            label: outcome.label(),
            multiplier: outcome.multiplier(),
            timestamp: current_timestamp(),
        });
        while self.history.len() > self.history_cap {
            self.history.pop_back();
        }
    }

    /// Time remaining in the current phase. Zero while a continuous round
    /// is unfolding (its deadline is the crash point, not a clock).
    pub fn remaining_ms(&self, now: Instant) -> u64 {
        if self.phase == Phase::Active && self.phase_deadline <= self.phase_started {
            return 0;
        }
        self.phase_deadline
            .saturating_duration_since(now)
            .as_millis() as u64
    }

    /// Build the per-tick broadcast view
    pub fn snapshot(&self, game: GameKind, continuous: bool, now: Instant) -> RoundSnapshot {
        RoundSnapshot {
            game,
            round_id: self.round_id.clone(),
            phase: self.phase,
            remaining_ms: self.remaining_ms(now),
            multiplier: if continuous { Some(self.value) } else { None },
            active_bets: self.ledger.active_count(),
            history: self.history.iter().cloned().collect(),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
