//! Updraft - Real-Time Wagering Round Engine
//!
//! Timed betting rounds for three game variants (continuous-multiplier
//! crash, three-way color draw, pooled battle) driven by one generic phase
//! machine. Each engine owns its round state behind a single mutex; a
//! clock task advances the round and broadcasts state every tick while
//! request handlers place bets and cash out concurrently. Settlement runs
//! exactly once per round and credits an injected balance store.
//!
//! Round state is ephemeral: nothing survives a process restart beyond
//! what the balance store keeps.

pub mod balance;
pub mod config;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod round;
pub mod settlement;
pub mod types;

pub use balance::{BalanceStore, InMemoryBalanceStore};
pub use config::{ConfigLoader, EngineConfig};
pub use engine::{RoundEngine, RoundTiming};
pub use errors::{BalanceError, BetError, BetResult, ConfigError};
pub use policy::{BattlePolicy, ColorDrawPolicy, CrashPolicy, OutcomePolicy};
pub use registry::ConnectionRegistry;
pub use types::{
    Bet, BetStatus, CashOutReceipt, Color, GameKind, Outcome, Phase, PushEvent, RoundSnapshot,
};
