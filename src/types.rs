//! Core data types shared across the engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supported game variants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Crash,
    ColorDraw,
    Battle,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Crash => write!(f, "crash"),
            GameKind::ColorDraw => write!(f, "colordraw"),
            GameKind::Battle => write!(f, "battle"),
        }
    }
}

/// Round lifecycle phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Betting window is open
    Waiting,
    /// Outcome is unfolding; crash cash-outs accepted here
    Active,
    /// Outcome revealed, settlement done, cooldown before the next round
    Resolved,
}

/// Color choice for the three-way draw variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Green => write!(f, "green"),
            Color::Blue => write!(f, "blue"),
        }
    }
}

/// Bet status, transitions monotonically forward and is never reverted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Active,
    Cashed,
    Won,
    Lost,
}

/// A single registered bet. The stake has already been debited from the
/// player's balance before the bet exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub player: String,
    /// Distinguishes concurrent bets by the same player in one round,
    /// e.g. "panel1"/"panel2" bet panels or "entry" for battle
    pub slot: String,
    pub stake: f64,
    /// Color pick for the draw variant; other variants carry no pick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pick: Option<Color>,
    pub status: BetStatus,
    /// Stamped once, on cash-out or at round resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_multiplier: Option<f64>,
    pub placed_at: u64,
}

impl Bet {
    pub fn new(player: &str, slot: &str, stake: f64, pick: Option<Color>) -> Self {
        Self {
            player: player.to_string(),
            slot: slot.to_string(),
            stake,
            pick,
            status: BetStatus::Active,
            settled_multiplier: None,
            placed_at: current_timestamp(),
        }
    }
}

/// A round's committed outcome. Generated once, never mutated, revealed at
/// resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    /// The multiplier at which the round crashes
    Crash { multiplier: f64 },
    /// The drawn winning color
    ColorDraw { winning: Color },
    /// The drawn winner and the pool they take (minus the house cut);
    /// `None` when nobody joined the round
    Battle { winner: Option<String>, pool: f64 },
}

impl Outcome {
    /// Short display label used in the history feed
    pub fn label(&self) -> String {
        match self {
            Outcome::Crash { multiplier } => format!("{:.2}x", multiplier),
            Outcome::ColorDraw { winning } => winning.to_string(),
            Outcome::Battle { winner, .. } => match winner {
                Some(player) => mask_player(player),
                None => "no entrants".to_string(),
            },
        }
    }

    /// Crash multiplier, when applicable
    pub fn multiplier(&self) -> Option<f64> {
        match self {
            Outcome::Crash { multiplier } => Some(*multiplier),
            _ => None,
        }
    }
}

/// One entry in the bounded recent-outcome history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub round_id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    pub timestamp: u64,
}

/// Point-in-time view of a round, broadcast after every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub game: GameKind,
    pub round_id: String,
    pub phase: Phase,
    /// Time remaining in the current phase; zero while a continuous round
    /// is unfolding (it has no fixed deadline)
    pub remaining_ms: u64,
    /// Current continuous multiplier, for the crash variant only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    pub active_bets: usize,
    /// Most-recent-first, capped
    pub history: Vec<OutcomeRecord>,
}

/// Wager pressure snapshot handed to the outcome policy at generation time
#[derive(Debug, Clone)]
pub struct RoundContext {
    pub active_bets: usize,
    /// Distinct players with an active bet, used for pooled-winner draws
    pub players: Vec<String>,
    pub total_staked: f64,
}

/// Result of a successful cash-out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashOutReceipt {
    pub multiplier: f64,
    pub payout: f64,
}

/// Push events delivered over the live channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    /// Public round state, broadcast every tick
    #[serde(rename = "round_state")]
    RoundState(RoundSnapshot),

    /// Public spectator feed entry; identity is pseudonymised
    #[serde(rename = "new_bet")]
    NewBet {
        game: GameKind,
        player: String,
        slot: String,
        amount: f64,
    },

    /// Public resolution announcement
    #[serde(rename = "round_resolved")]
    RoundResolved {
        game: GameKind,
        round_id: String,
        outcome: Outcome,
    },

    /// Private balance update after a cash-out or settlement credit
    #[serde(rename = "balance_update")]
    BalanceUpdate { new_balance: f64 },
}

/// Mask a player identity for public feeds (the spectator feed must never
/// leak the full identity)
pub fn mask_player(player: &str) -> String {
    let visible: String = player.chars().take(3).collect();
    format!("{}***", visible)
}

/// Current unix timestamp in seconds
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_player() {
        assert_eq!(mask_player("alice@example.com"), "ali***");
        assert_eq!(mask_player("ab"), "ab***");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Crash { multiplier: 2.3 }.label(), "2.30x");
        assert_eq!(
            Outcome::ColorDraw { winning: Color::Red }.label(),
            "red"
        );
        let battle = Outcome::Battle {
            winner: Some("bob@example.com".to_string()),
            pool: 150.0,
        };
        assert_eq!(battle.label(), "bob***");
    }

    #[test]
    fn test_push_event_serialization() {
        let event = PushEvent::NewBet {
            game: GameKind::Crash,
            player: mask_player("alice@example.com"),
            slot: "panel1".to_string(),
            amount: 100.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"new_bet\""));
        assert!(json.contains("ali***"));
        assert!(!json.contains("alice@example.com"));
    }

    #[test]
    fn test_bet_starts_active() {
        let bet = Bet::new("alice", "panel1", 50.0, None);
        assert_eq!(bet.status, BetStatus::Active);
        assert!(bet.settled_multiplier.is_none());
    }
}
