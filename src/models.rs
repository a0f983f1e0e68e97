// Data models for no-loss wagers

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::yield_venue::PositionId;

/// Integer base units. 1 token = `UNITS_PER_TOKEN` units.
pub type Amount = u64;

/// Registry key, assigned in increasing order starting at 1.
pub type BetId = u64;

pub const UNITS_PER_TOKEN: Amount = 100;
const TOKEN_SCALE: u32 = 2;

/// Convert base units into a token-denominated decimal (e.g. 2625 -> 26.25).
pub fn to_tokens(amount: Amount) -> Decimal {
    Decimal::from_i128_with_scale(amount as i128, TOKEN_SCALE)
}

/// Convert a token-denominated decimal into base units. Sub-unit precision is truncated.
pub fn from_tokens(tokens: Decimal) -> Option<Amount> {
    if tokens.is_sign_negative() {
        return None;
    }
    (tokens * Decimal::from(UNITS_PER_TOKEN)).trunc().to_u64()
}

// ============================================================================
// PARTICIPANTS & RESOLUTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub side: bool,
    pub stake: Amount,
    pub joined_at: DateTime<Utc>,
}

/// Terminal outcome of a bet. Absent while the bet is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resolution {
    Finalized {
        outcome: bool,
        by_admin: bool,
        at: DateTime<Utc>,
    },
    Cancelled {
        at: DateTime<Utc>,
    },
}

/// Lifecycle phase.
///
/// Flow: Open → Expired (voting window) → AwaitingResolution → Finalized | Cancelled
///
/// Only the two terminal phases are stored; the rest are derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    /// Accepting joins
    Open,
    /// Past expiry, voting window running
    Expired,
    /// Voting window elapsed, unattended finalize allowed
    AwaitingResolution,
    Finalized,
    Cancelled,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Open => "open",
            BetStatus::Expired => "expired",
            BetStatus::AwaitingResolution => "awaiting_resolution",
            BetStatus::Finalized => "finalized",
            BetStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BetStatus::Finalized | BetStatus::Cancelled)
    }
}

// ============================================================================
// SETTLEMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementMode {
    Resolve { outcome: bool },
    Refund,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub identity: String,
    pub side: bool,
    pub stake: Amount,
    pub amount: Amount,
}

impl Payout {
    pub fn yield_share(&self) -> Amount {
        self.amount - self.stake
    }
}

/// Audit record produced by a successful settlement.
///
/// `sum(payouts.amount) == total_stake + distributed_yield` and
/// `distributed_yield + retained == yield_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub bet_id: BetId,
    pub mode: SettlementMode,
    pub total_stake: Amount,
    pub yield_amount: Amount,
    pub yield_for_winners: Amount,
    pub yield_for_losers: Amount,
    pub distributed_yield: Amount,
    /// Truncation dust left over by the proportional split
    pub undistributed: Amount,
    /// Everything kept by the engine reserve (dust, or the whole yield on refund)
    pub retained: Amount,
    pub payouts: Vec<Payout>,
    pub settled_at: DateTime<Utc>,
}

impl SettlementReport {
    pub fn total_paid(&self) -> Amount {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    pub fn payout_for(&self, identity: &str) -> Option<Amount> {
        self.payouts
            .iter()
            .find(|p| p.identity == identity)
            .map(|p| p.amount)
    }
}

// ============================================================================
// BET
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub creator: String,
    pub condition: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
    pub stake_true: Amount,
    pub stake_false: Amount,
    pub participants: BTreeMap<String, Participant>,
    pub votes: BTreeMap<String, bool>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    /// Venue position holding the pooled principal; every stake tops it up
    #[serde(default)]
    pub position: Option<PositionId>,
    /// Yield already withdrawn by a settlement attempt that failed afterwards
    #[serde(default)]
    pub carried_yield: Amount,
    /// Principal already withdrawn by a settlement attempt that failed afterwards
    #[serde(default)]
    pub held_principal: Amount,
    #[serde(default)]
    pub settlement: Option<SettlementReport>,
}

impl Bet {
    pub fn status(&self, now: DateTime<Utc>) -> BetStatus {
        match &self.resolution {
            Some(Resolution::Finalized { .. }) => BetStatus::Finalized,
            Some(Resolution::Cancelled { .. }) => BetStatus::Cancelled,
            None if now < self.expires_at => BetStatus::Open,
            None if now < self.resolution_deadline => BetStatus::Expired,
            None => BetStatus::AwaitingResolution,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn winning_outcome(&self) -> Option<bool> {
        match self.resolution {
            Some(Resolution::Finalized { outcome, .. }) => Some(outcome),
            _ => None,
        }
    }

    pub fn side_total(&self, side: bool) -> Amount {
        if side {
            self.stake_true
        } else {
            self.stake_false
        }
    }

    pub fn total_stake(&self) -> Amount {
        self.stake_true + self.stake_false
    }

    pub fn is_participant(&self, identity: &str) -> bool {
        self.participants.contains_key(identity)
    }

    pub fn stake_of(&self, identity: &str) -> Amount {
        self.participants.get(identity).map(|p| p.stake).unwrap_or(0)
    }

    pub fn details(&self, now: DateTime<Utc>) -> BetDetails {
        BetDetails {
            id: self.id,
            creator: self.creator.clone(),
            condition: self.condition.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            resolution_deadline: self.resolution_deadline,
            status: self.status(now),
            stake_true: self.stake_true,
            stake_false: self.stake_false,
            winning_outcome: self.winning_outcome(),
            participant_count: self.participants.len(),
        }
    }
}

/// Read-only view returned by the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetDetails {
    pub id: BetId,
    pub creator: String,
    pub condition: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
    pub status: BetStatus,
    pub stake_true: Amount,
    pub stake_false: Amount,
    pub winning_outcome: Option<bool>,
    pub participant_count: usize,
}

/// Stake-weighted view of submitted votes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub voted_true_stake: Amount,
    pub voted_false_stake: Amount,
    pub abstained_stake: Amount,
    pub voters: usize,
}
