//! Error types for the wagering engine
//!
//! Every error in this crate resolves to a rejected single operation or a
//! logged, retried side effect. Nothing here is fatal to the process.

use thiserror::Error;

/// Errors surfaced by `place_bet` / `cash_out`
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BetError {
    /// Bet placement attempted outside the betting window
    #[error("betting window is closed")]
    PhaseClosed,

    /// Cash-out attempted while the round is not unfolding
    #[error("round is not active")]
    NotActive,

    /// A bet already exists for this (player, slot) in the current round
    #[error("bet already placed for this slot")]
    DuplicateSlot,

    /// No bet found for this (player, slot)
    #[error("no bet found for this slot")]
    NoSuchBet,

    /// The bet was already cashed out or settled
    #[error("bet already settled")]
    AlreadySettled,

    /// Stake must be a positive amount
    #[error("invalid stake: {0}")]
    InvalidStake(f64),

    /// The variant requires a color pick and none was supplied
    #[error("a color pick is required")]
    MissingPick,

    /// Propagated from the balance store before any bet is created
    #[error("balance error: {0}")]
    Balance(#[from] BalanceError),
}

/// Errors from the external balance store
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BalanceError {
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("no account for player: {0}")]
    UnknownPlayer(String),

    #[error("balance store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Convenience alias for bet operation results
pub type BetResult<T> = Result<T, BetError>;

/// Convenience alias for configuration results
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(BetError::PhaseClosed.to_string(), "betting window is closed");
        assert_eq!(BetError::NotActive.to_string(), "round is not active");
        assert!(BetError::InvalidStake(-1.0).to_string().contains("-1"));
        assert_eq!(BetError::MissingPick.to_string(), "a color pick is required");
    }

    #[test]
    fn test_balance_error_conversion() {
        let err: BetError = BalanceError::InsufficientFunds.into();
        assert_eq!(err, BetError::Balance(BalanceError::InsufficientFunds));
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "crash.tick_ms".to_string(),
            value: "0".to_string(),
            reason: "tick period cannot be zero".to_string(),
        };
        assert!(err.to_string().contains("crash.tick_ms"));
        assert!(err.to_string().contains("cannot be zero"));
    }
}
