// ============================================================================
// Bets Module - No-Loss Binary Wagers
// ============================================================================
//
// Participants stake on a yes/no condition; stakes are pooled in a yield venue and
// everyone gets their principal back at settlement. Only the yield is at stake.
//
//   - stake_ledger: bet creation, joining, per-side stake totals
//   - voting: outcome submissions and the stake supermajority rule
//   - payout: venue custody, yield split and atomic payouts
//   - lifecycle: the BetEngine orchestrating the above
//
// ============================================================================

pub mod lifecycle;
pub mod payout;
pub mod stake_ledger;
pub mod voting;

pub use lifecycle::*;
pub use payout::*;
pub use stake_ledger::*;
pub use voting::*;
