//! Balance store interface
//!
//! The engine consumes an external balance store through this trait; each
//! call is assumed atomic on the store's side. Debits happen before a bet
//! is registered, credits only from settlement and cash-outs. The
//! in-memory implementation backs the binary and the tests.

use crate::errors::BalanceError;
use async_trait::async_trait;
use dashmap::DashMap;

/// External balance store, atomic per call
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn get_balance(&self, player: &str) -> Result<f64, BalanceError>;

    /// Credit the amount and return the new balance
    async fn credit(&self, player: &str, amount: f64) -> Result<f64, BalanceError>;

    /// Debit the amount and return the new balance, or
    /// `InsufficientFunds` without changing anything
    async fn debit(&self, player: &str, amount: f64) -> Result<f64, BalanceError>;
}

/// In-memory balance store keyed by player identity
#[derive(Default)]
pub struct InMemoryBalanceStore {
    accounts: DashMap<String, f64>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Seed an account balance, creating the account if needed
    pub fn seed(&self, player: &str, amount: f64) {
        self.accounts.insert(player.to_string(), amount);
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn get_balance(&self, player: &str) -> Result<f64, BalanceError> {
        self.accounts
            .get(player)
            .map(|entry| *entry)
            .ok_or_else(|| BalanceError::UnknownPlayer(player.to_string()))
    }

    async fn credit(&self, player: &str, amount: f64) -> Result<f64, BalanceError> {
        let mut entry = self.accounts.entry(player.to_string()).or_insert(0.0);
        *entry += amount;
        Ok(*entry)
    }

    async fn debit(&self, player: &str, amount: f64) -> Result<f64, BalanceError> {
        let mut entry = self
            .accounts
            .get_mut(player)
            .ok_or_else(|| BalanceError::UnknownPlayer(player.to_string()))?;

        if *entry < amount {
            return Err(BalanceError::InsufficientFunds);
        }
        *entry -= amount;
        Ok(*entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_debit_and_credit() {
        let store = InMemoryBalanceStore::new();
        store.seed("alice", 100.0);

        assert_eq!(store.debit("alice", 40.0).await.unwrap(), 60.0);
        assert_eq!(store.credit("alice", 15.0).await.unwrap(), 75.0);
        assert_eq!(store.get_balance("alice").await.unwrap(), 75.0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance_untouched() {
        let store = InMemoryBalanceStore::new();
        store.seed("alice", 10.0);

        assert_eq!(
            store.debit("alice", 50.0).await,
            Err(BalanceError::InsufficientFunds)
        );
        assert_eq!(store.get_balance("alice").await.unwrap(), 10.0);
    }

    #[tokio::test]
    async fn test_unknown_player() {
        let store = InMemoryBalanceStore::new();
        assert!(matches!(
            store.get_balance("ghost").await,
            Err(BalanceError::UnknownPlayer(_))
        ));
        // Crediting an unknown player creates the account; settlement must
        // never lose a payout to a missing row
        assert_eq!(store.credit("ghost", 5.0).await.unwrap(), 5.0);
    }
}
