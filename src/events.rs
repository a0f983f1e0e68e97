// Activity events emitted on every successful state transition

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Amount, BetId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetEventKind {
    Created { creator: String, stake: Amount, side: bool },
    Joined { participant: String, stake: Amount, side: bool },
    OutcomeSubmitted { participant: String, outcome: bool },
    Finalized { outcome: bool, by_admin: bool, paid: Amount },
    Cancelled { refunded: Amount },
    YieldRateChanged { from: u32, to: u32 },
    OwnershipTransferred { from: String, to: String },
}

impl BetEventKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            BetEventKind::Created { .. } => "📊",
            BetEventKind::Joined { .. } => "🎯",
            BetEventKind::OutcomeSubmitted { .. } => "🗳️",
            BetEventKind::Finalized { .. } => "✅",
            BetEventKind::Cancelled { .. } => "↩️",
            BetEventKind::YieldRateChanged { .. } => "📈",
            BetEventKind::OwnershipTransferred { .. } => "🔑",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetEvent {
    pub at: DateTime<Utc>,
    /// `None` for engine-wide events (configuration, ownership)
    pub bet_id: Option<BetId>,
    pub kind: BetEventKind,
}

impl BetEvent {
    pub fn for_bet(at: DateTime<Utc>, bet_id: BetId, kind: BetEventKind) -> Self {
        Self { at, bet_id: Some(bet_id), kind }
    }

    pub fn engine(at: DateTime<Utc>, kind: BetEventKind) -> Self {
        Self { at, bet_id: None, kind }
    }
}
