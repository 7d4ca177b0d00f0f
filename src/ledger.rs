//! Per-round bet ledger
//!
//! Maps (player, slot) to a bet record and enforces the at-most-one-bet-
//! per-slot invariant. The ledger never touches balances; it only records
//! intent-to-settle. Phase checks live in the engine, which serializes all
//! access through the round mutex.

use crate::errors::{BetError, BetResult};
use crate::types::{Bet, BetStatus, RoundContext};
use std::collections::HashMap;

/// Bets registered for the current round, keyed by (player, slot)
#[derive(Debug, Default)]
pub struct BetLedger {
    bets: HashMap<(String, String), Bet>,
}

impl BetLedger {
    pub fn new() -> Self {
        Self {
            bets: HashMap::new(),
        }
    }

    /// Register a new bet. Fails with `DuplicateSlot` if the (player, slot)
    /// key is already taken this round.
    pub fn place(&mut self, bet: Bet) -> BetResult<()> {
        let key = (bet.player.clone(), bet.slot.clone());
        if self.bets.contains_key(&key) {
            return Err(BetError::DuplicateSlot);
        }
        self.bets.insert(key, bet);
        Ok(())
    }

    pub fn contains(&self, player: &str, slot: &str) -> bool {
        self.bets
            .contains_key(&(player.to_string(), slot.to_string()))
    }

    /// Whether the player holds any bet this round, in any slot
    pub fn contains_player(&self, player: &str) -> bool {
        self.bets.keys().any(|(p, _)| p == player)
    }

    /// Stamp the given multiplier onto an active bet and flip it to
    /// `Cashed`. Returns a copy of the settled bet.
    pub fn cash_out(&mut self, player: &str, slot: &str, multiplier: f64) -> BetResult<Bet> {
        let bet = self
            .bets
            .get_mut(&(player.to_string(), slot.to_string()))
            .ok_or(BetError::NoSuchBet)?;

        if bet.status != BetStatus::Active {
            return Err(BetError::AlreadySettled);
        }

        bet.status = BetStatus::Cashed;
        bet.settled_multiplier = Some(multiplier);
        Ok(bet.clone())
    }

    /// Number of bets still awaiting settlement
    pub fn active_count(&self) -> usize {
        self.bets
            .values()
            .filter(|b| b.status == BetStatus::Active)
            .count()
    }

    /// Total stake across active bets
    pub fn total_staked(&self) -> f64 {
        self.bets
            .values()
            .filter(|b| b.status == BetStatus::Active)
            .map(|b| b.stake)
            .sum()
    }

    /// Distinct players with an active bet
    pub fn active_players(&self) -> Vec<String> {
        let mut players: Vec<String> = self
            .bets
            .values()
            .filter(|b| b.status == BetStatus::Active)
            .map(|b| b.player.clone())
            .collect();
        players.sort();
        players.dedup();
        players
    }

    /// Wager pressure snapshot for the outcome policy
    pub fn context(&self) -> RoundContext {
        RoundContext {
            active_bets: self.active_count(),
            players: self.active_players(),
            total_staked: self.total_staked(),
        }
    }

    /// Remove and return every bet still `Active`, leaving cashed bets
    /// behind. Settlement consumes the result exactly once.
    pub fn drain_active(&mut self) -> Vec<Bet> {
        let keys: Vec<(String, String)> = self
            .bets
            .iter()
            .filter(|(_, b)| b.status == BetStatus::Active)
            .map(|(k, _)| k.clone())
            .collect();

        keys.into_iter()
            .filter_map(|k| self.bets.remove(&k))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}
