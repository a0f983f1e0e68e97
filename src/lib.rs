/// BlackBook No-Loss Wagers
/// Exports all modules for use as a library crate

pub mod bets;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod models;
pub mod registry;
pub mod yield_venue;

pub use bets::{
    build_report, split_yield, BetEngine, EngineSnapshot, PayoutEngine, ResolutionVoting,
    StakeLedger,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, MIN_STAKE, RESOLUTION_WINDOW_HOURS, SUPERMAJORITY_PERCENT, WINNERS_YIELD_PERCENT};
pub use error::{AuthorizationError, BetError, ExternalFailure, SnapshotError, StateError, ValidationError};
pub use events::{BetEvent, BetEventKind};
pub use ledger::{Balance, BalanceService, Ledger, LedgerStats, Transaction, TxType};
pub use models::{
    from_tokens, to_tokens, Amount, Bet, BetDetails, BetId, BetStatus, Participant, Payout,
    Resolution, SettlementMode, SettlementReport, VoteTally, UNITS_PER_TOKEN,
};
pub use registry::{BetRegistry, RegistrySnapshot, ACTIVITY_LOG_LIMIT};
pub use yield_venue::{
    PositionId, SimulatedYieldVenue, VenuePosition, VenueSnapshot, VenueStats, Withdrawal,
    YieldRate, YieldVenue, DEFAULT_YIELD_RATE,
};
