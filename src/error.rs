//! Error taxonomy for the wager engine.
//!
//! Every public operation returns `Result<_, BetError>`. Callers branch on the family
//! (validation, state, authorization, external) and then on the concrete variant.

use serde::{Deserialize, Serialize};

use crate::models::{Amount, BetId};

// ============================================================================
// VALIDATION
// ============================================================================

/// Caller input violates a static constraint. Raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    BelowMinimum { stake: Amount, minimum: Amount },
    BadDuration(i64),
    AmountOverflow,
    YieldRateOutOfRange(u32),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::BelowMinimum { stake, minimum } => {
                write!(f, "Stake {} is below minimum {}", stake, minimum)
            }
            ValidationError::BadDuration(days) => {
                write!(f, "Duration must be a positive number of days, got {}", days)
            }
            ValidationError::AmountOverflow => write!(f, "Stake total would overflow"),
            ValidationError::YieldRateOutOfRange(rate) => {
                write!(f, "Yield rate {}% is out of range (0-100)", rate)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// STATE
// ============================================================================

/// The requested transition is not valid for the bet's current phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateError {
    NotFound(BetId),
    Expired(BetId),
    NotExpired(BetId),
    ResolutionWindowOpen(BetId),
    NoSupermajority(BetId),
    AlreadyResolved(BetId),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::NotFound(id) => write!(f, "Bet {} not found", id),
            StateError::Expired(id) => write!(f, "Bet {} has expired, joining is closed", id),
            StateError::NotExpired(id) => write!(f, "Bet {} has not expired yet", id),
            StateError::ResolutionWindowOpen(id) => {
                write!(f, "Bet {} is still inside its resolution window", id)
            }
            StateError::NoSupermajority(id) => {
                write!(f, "Bet {} has no supermajority, waiting for admin", id)
            }
            StateError::AlreadyResolved(id) => write!(f, "Bet {} is already resolved", id),
        }
    }
}

impl std::error::Error for StateError {}

// ============================================================================
// AUTHORIZATION
// ============================================================================

/// Caller lacks the capability or violates an identity/side rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationError {
    NotOwner(String),
    NotParticipant(String),
    SideMismatch { identity: String, staked: bool, submitted: bool },
    AlreadyJoined(String),
}

impl std::fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationError::NotOwner(who) => write!(f, "{} is not the owner", who),
            AuthorizationError::NotParticipant(who) => write!(f, "{} is not a participant", who),
            AuthorizationError::SideMismatch { identity, staked, submitted } => write!(
                f,
                "{} staked on {} but submitted outcome {}",
                identity, staked, submitted
            ),
            AuthorizationError::AlreadyJoined(who) => write!(f, "{} already joined this bet", who),
        }
    }
}

impl std::error::Error for AuthorizationError {}

// ============================================================================
// EXTERNAL
// ============================================================================

/// Failure reported by the balance service or the yield venue, propagated verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExternalFailure {
    InsufficientFunds { identity: String, available: Amount, requested: Amount },
    DebitRejected(String),
    CreditRejected(String),
    VenueUnavailable(String),
    UnknownPosition(String),
    PrincipalMismatch { expected: Amount, actual: Amount },
}

impl std::fmt::Display for ExternalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalFailure::InsufficientFunds { identity, available, requested } => write!(
                f,
                "Insufficient funds for {}: have {}, need {}",
                identity, available, requested
            ),
            ExternalFailure::DebitRejected(msg) => write!(f, "Debit rejected: {}", msg),
            ExternalFailure::CreditRejected(msg) => write!(f, "Credit rejected: {}", msg),
            ExternalFailure::VenueUnavailable(msg) => write!(f, "Yield venue unavailable: {}", msg),
            ExternalFailure::UnknownPosition(id) => write!(f, "Unknown venue position: {}", id),
            ExternalFailure::PrincipalMismatch { expected, actual } => write!(
                f,
                "Venue returned principal {} but bet holds {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for ExternalFailure {}

// ============================================================================
// TOP-LEVEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetError {
    Validation(ValidationError),
    State(StateError),
    Authorization(AuthorizationError),
    External(ExternalFailure),
}

impl std::fmt::Display for BetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BetError::Validation(e) => write!(f, "Validation error: {}", e),
            BetError::State(e) => write!(f, "State error: {}", e),
            BetError::Authorization(e) => write!(f, "Authorization error: {}", e),
            BetError::External(e) => write!(f, "External failure: {}", e),
        }
    }
}

impl std::error::Error for BetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BetError::Validation(e) => Some(e),
            BetError::State(e) => Some(e),
            BetError::Authorization(e) => Some(e),
            BetError::External(e) => Some(e),
        }
    }
}

impl From<ValidationError> for BetError {
    fn from(err: ValidationError) -> Self {
        BetError::Validation(err)
    }
}

impl From<StateError> for BetError {
    fn from(err: StateError) -> Self {
        BetError::State(err)
    }
}

impl From<AuthorizationError> for BetError {
    fn from(err: AuthorizationError) -> Self {
        BetError::Authorization(err)
    }
}

impl From<ExternalFailure> for BetError {
    fn from(err: ExternalFailure) -> Self {
        BetError::External(err)
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Failure while saving or loading a registry snapshot.
#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "Snapshot I/O failed: {}", e),
            SnapshotError::Serde(e) => write!(f, "Snapshot encoding failed: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(e) => Some(e),
            SnapshotError::Serde(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serde(err)
    }
}
