// ============================================================================
// Bet Lifecycle - the engine every caller talks to
// ============================================================================
//
// Flow: create → join (while Open) → expiry → outcome submissions (voting window)
//       → finalize (supermajority) or admin finalize/cancel → Finalized | Cancelled
//
// Each call locks exactly one bet for its whole duration, runs every fallible step
// first (validation, balance moves, venue calls) and only then mutates the bet.
// A failed external step is compensated before the error is returned.
//
// ============================================================================

use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::payout::PayoutEngine;
use super::stake_ledger::StakeLedger;
use super::voting::ResolutionVoting;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{AuthorizationError, BetError, SnapshotError, StateError, ValidationError};
use crate::events::{BetEvent, BetEventKind};
use crate::ledger::BalanceService;
use crate::models::{
    to_tokens, Amount, Bet, BetDetails, BetId, BetStatus, Resolution, SettlementMode,
    SettlementReport, VoteTally,
};
use crate::registry::{lock_bet, BetHandle, BetRegistry, RegistrySnapshot};
use crate::yield_venue::{VenueSnapshot, YieldRate, YieldVenue};

/// Everything needed to bring an engine back after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub owner: String,
    pub yield_rate: u32,
    pub registry: RegistrySnapshot,
    /// Positions of an in-process venue; absent for venues that keep their own books.
    #[serde(default)]
    pub venue: Option<VenueSnapshot>,
}

impl EngineSnapshot {
    pub fn read(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

pub struct BetEngine {
    config: EngineConfig,
    owner: RwLock<String>,
    yield_rate: YieldRate,
    registry: BetRegistry,
    balances: Arc<dyn BalanceService>,
    venue: Arc<dyn YieldVenue>,
    clock: Arc<dyn Clock>,
}

impl BetEngine {
    /// `yield_rate` is the handle shared with the venue; it is reset to the configured rate.
    pub fn new(
        config: EngineConfig,
        balances: Arc<dyn BalanceService>,
        venue: Arc<dyn YieldVenue>,
        clock: Arc<dyn Clock>,
        yield_rate: YieldRate,
    ) -> Self {
        yield_rate.set(config.yield_rate);
        info!(
            owner = %config.owner,
            min_stake = config.min_stake,
            yield_rate = config.yield_rate,
            "🚀 Wager engine ready"
        );
        Self {
            owner: RwLock::new(config.owner.clone()),
            config,
            yield_rate,
            registry: BetRegistry::new(),
            balances,
            venue,
            clock,
        }
    }

    /// Replace the (empty) registry, owner and rate with a saved snapshot, and hand the
    /// saved venue positions back to the venue.
    pub fn restore(mut self, snapshot: EngineSnapshot) -> Self {
        self.yield_rate.set(snapshot.yield_rate);
        self.owner = RwLock::new(snapshot.owner);
        self.registry = BetRegistry::from_snapshot(snapshot.registry);
        if let Some(custody) = snapshot.venue {
            self.venue.restore_custody(custody);
        }
        self
    }

    pub fn load_snapshot(self, path: &Path) -> Result<Self, SnapshotError> {
        let snapshot = EngineSnapshot::read(path)?;
        Ok(self.restore(snapshot))
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            owner: self.owner(),
            yield_rate: self.yield_rate.get(),
            registry: self.registry.snapshot(),
            venue: self.venue.custody(),
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json)?;
        info!("💾 Saved {} bets to {}", self.registry.len(), path.display());
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // STAKING
    // ========================================================================

    pub fn create_bet(
        &self,
        creator: &str,
        creator_stake: Amount,
        condition: &str,
        duration_days: i64,
        creator_side: bool,
    ) -> Result<BetId, BetError> {
        let now = self.clock.now();
        let stakes = self.stakes();
        stakes.check_stake(creator_stake)?;
        let (expires_at, deadline) =
            StakeLedger::schedule(now, duration_days, self.config.resolution_window)?;

        stakes.collect(creator, creator_stake)?;
        let position = match self.payouts().acquire(None, creator_stake) {
            Ok(position) => position,
            Err(e) => {
                warn!(creator, error = %e, "venue deposit failed, returning creator stake");
                stakes.release(creator, creator_stake);
                return Err(e);
            }
        };

        let bet_id = self.registry.insert_with(|id| {
            StakeLedger::open(
                id,
                creator,
                condition,
                creator_stake,
                creator_side,
                now,
                expires_at,
                deadline,
                position,
            )
        });

        info!(
            "📊 Bet {} created by {}: \"{}\" ({} BB on {}, expires {})",
            bet_id,
            creator,
            condition,
            to_tokens(creator_stake),
            creator_side,
            expires_at
        );
        self.record(
            now,
            Some(bet_id),
            BetEventKind::Created {
                creator: creator.to_string(),
                stake: creator_stake,
                side: creator_side,
            },
        );
        Ok(bet_id)
    }

    pub fn join_bet(
        &self,
        bet_id: BetId,
        participant: &str,
        stake: Amount,
        side: bool,
    ) -> Result<(), BetError> {
        let handle = self.handle(bet_id)?;
        let mut bet = lock_bet(&handle);
        let now = self.clock.now();
        let stakes = self.stakes();

        stakes.check_join(&bet, participant, stake, side, now)?;
        stakes.collect(participant, stake)?;
        let position = match self.payouts().acquire(bet.position, stake) {
            Ok(position) => position,
            Err(e) => {
                warn!(bet_id, participant, error = %e, "venue deposit failed, returning stake");
                stakes.release(participant, stake);
                return Err(e);
            }
        };
        StakeLedger::record_join(&mut bet, participant, stake, side, now, position);
        drop(bet);

        info!("🎯 {} joined bet {} with {} BB on {}", participant, bet_id, to_tokens(stake), side);
        self.record(
            now,
            Some(bet_id),
            BetEventKind::Joined { participant: participant.to_string(), stake, side },
        );
        Ok(())
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    pub fn submit_resolution_outcome(
        &self,
        bet_id: BetId,
        participant: &str,
        outcome: bool,
    ) -> Result<(), BetError> {
        let handle = self.handle(bet_id)?;
        let mut bet = lock_bet(&handle);
        let now = self.clock.now();

        self.voting().submit(&mut bet, participant, outcome, now)?;
        drop(bet);

        info!(bet_id, participant, outcome, "🗳️ outcome submitted");
        self.record(
            now,
            Some(bet_id),
            BetEventKind::OutcomeSubmitted { participant: participant.to_string(), outcome },
        );
        Ok(())
    }

    /// Side holding a stake supermajority, if any. Pure read.
    pub fn evaluate_supermajority(&self, bet_id: BetId) -> Result<Option<bool>, BetError> {
        let handle = self.handle(bet_id)?;
        let bet = lock_bet(&handle);
        Ok(self.voting().evaluate(&bet))
    }

    /// Unattended finalize, callable by anyone once the voting window has elapsed.
    pub fn finalize_resolution(
        &self,
        bet_id: BetId,
        caller: &str,
    ) -> Result<SettlementReport, BetError> {
        let handle = self.handle(bet_id)?;
        let mut bet = lock_bet(&handle);
        let now = self.clock.now();

        match bet.status(now) {
            BetStatus::Finalized | BetStatus::Cancelled => {
                return Err(StateError::AlreadyResolved(bet_id).into())
            }
            BetStatus::Open => return Err(StateError::NotExpired(bet_id).into()),
            BetStatus::Expired => return Err(StateError::ResolutionWindowOpen(bet_id).into()),
            BetStatus::AwaitingResolution => {}
        }

        let outcome = self
            .voting()
            .evaluate(&bet)
            .ok_or(StateError::NoSupermajority(bet_id))?;

        info!(bet_id, caller, outcome, "finalizing by supermajority");
        self.settle(&mut bet, SettlementMode::Resolve { outcome }, false, now)
    }

    /// Owner override: settle with the supplied outcome, or refund everyone when `cancel`.
    pub fn admin_finalize_resolution(
        &self,
        bet_id: BetId,
        caller: &str,
        winning_outcome: bool,
        cancel: bool,
    ) -> Result<SettlementReport, BetError> {
        self.require_owner(caller)?;
        let handle = self.handle(bet_id)?;
        let mut bet = lock_bet(&handle);
        let now = self.clock.now();

        if bet.is_terminal() {
            return Err(StateError::AlreadyResolved(bet_id).into());
        }
        if now < bet.expires_at {
            return Err(StateError::NotExpired(bet_id).into());
        }

        let mode = if cancel {
            SettlementMode::Refund
        } else {
            SettlementMode::Resolve { outcome: winning_outcome }
        };
        info!(bet_id, caller, ?mode, "admin settlement");
        self.settle(&mut bet, mode, true, now)
    }

    fn settle(
        &self,
        bet: &mut Bet,
        mode: SettlementMode,
        by_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<SettlementReport, BetError> {
        let report = match self.payouts().settle(bet, mode, now) {
            Ok(report) => report,
            Err(e) => {
                warn!(bet_id = bet.id, error = %e, "settlement aborted, bet left open for retry");
                return Err(e);
            }
        };

        bet.resolution = Some(match mode {
            SettlementMode::Resolve { outcome } => Resolution::Finalized { outcome, by_admin, at: now },
            SettlementMode::Refund => Resolution::Cancelled { at: now },
        });
        bet.settlement = Some(report.clone());
        self.registry.add_retained(report.retained);

        let kind = match mode {
            SettlementMode::Resolve { outcome } => {
                BetEventKind::Finalized { outcome, by_admin, paid: report.total_paid() }
            }
            SettlementMode::Refund => BetEventKind::Cancelled { refunded: report.total_paid() },
        };
        self.record(now, Some(bet.id), kind);
        Ok(report)
    }

    // ========================================================================
    // OWNER CONFIGURATION
    // ========================================================================

    pub fn set_yield_rate(&self, caller: &str, percent: u32) -> Result<(), BetError> {
        self.require_owner(caller)?;
        if percent > 100 {
            return Err(ValidationError::YieldRateOutOfRange(percent).into());
        }
        let from = self.yield_rate.get();
        self.yield_rate.set(percent);

        info!("📈 Yield rate changed {}% -> {}%", from, percent);
        self.record(self.clock.now(), None, BetEventKind::YieldRateChanged { from, to: percent });
        Ok(())
    }

    pub fn transfer_ownership(&self, caller: &str, new_owner: &str) -> Result<(), BetError> {
        let mut owner = self.owner.write().unwrap_or_else(|p| p.into_inner());
        if *owner != caller {
            return Err(AuthorizationError::NotOwner(caller.to_string()).into());
        }
        *owner = new_owner.to_string();
        drop(owner);

        info!("🔑 Ownership transferred from {} to {}", caller, new_owner);
        self.record(
            self.clock.now(),
            None,
            BetEventKind::OwnershipTransferred { from: caller.to_string(), to: new_owner.to_string() },
        );
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_bet_details(&self, bet_id: BetId) -> Result<BetDetails, BetError> {
        let now = self.clock.now();
        self.with_bet(bet_id, |bet| bet.details(now))
    }

    /// Stake held by `identity`, 0 if they never joined.
    pub fn get_participant_stake(&self, bet_id: BetId, identity: &str) -> Result<Amount, BetError> {
        self.with_bet(bet_id, |bet| bet.stake_of(identity))
    }

    pub fn status_of(&self, bet_id: BetId) -> Result<BetStatus, BetError> {
        let now = self.clock.now();
        self.with_bet(bet_id, |bet| bet.status(now))
    }

    pub fn is_participant(&self, bet_id: BetId, identity: &str) -> Result<bool, BetError> {
        self.with_bet(bet_id, |bet| bet.is_participant(identity))
    }

    pub fn vote_of(&self, bet_id: BetId, identity: &str) -> Result<Option<bool>, BetError> {
        self.with_bet(bet_id, |bet| bet.votes.get(identity).copied())
    }

    pub fn vote_tally(&self, bet_id: BetId) -> Result<VoteTally, BetError> {
        self.with_bet(bet_id, ResolutionVoting::tally)
    }

    pub fn settlement_report(&self, bet_id: BetId) -> Result<Option<SettlementReport>, BetError> {
        self.with_bet(bet_id, |bet| bet.settlement.clone())
    }

    /// All bets in creation order.
    pub fn list_bets(&self) -> Vec<BetDetails> {
        let now = self.clock.now();
        self.registry
            .handles()
            .iter()
            .map(|h| lock_bet(h).details(now))
            .collect()
    }

    pub fn bets_for(&self, identity: &str) -> Vec<BetDetails> {
        let now = self.clock.now();
        self.registry
            .handles()
            .iter()
            .filter_map(|h| {
                let bet = lock_bet(h);
                bet.is_participant(identity).then(|| bet.details(now))
            })
            .collect()
    }

    /// Yield kept by the engine across all settled bets.
    pub fn retained_yield(&self) -> Amount {
        self.registry.retained()
    }

    pub fn yield_rate(&self) -> u32 {
        self.yield_rate.get()
    }

    pub fn owner(&self) -> String {
        self.owner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_owner(&self, caller: &str) -> bool {
        *self.owner.read().unwrap_or_else(|p| p.into_inner()) == caller
    }

    /// Newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<BetEvent> {
        self.registry.recent(limit)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn stakes(&self) -> StakeLedger<'_> {
        StakeLedger::new(self.balances.as_ref(), self.config.min_stake)
    }

    fn voting(&self) -> ResolutionVoting {
        ResolutionVoting::new(self.config.supermajority_percent)
    }

    fn payouts(&self) -> PayoutEngine<'_> {
        PayoutEngine::new(
            self.venue.as_ref(),
            self.balances.as_ref(),
            self.config.winners_yield_percent,
        )
    }

    fn handle(&self, bet_id: BetId) -> Result<BetHandle, BetError> {
        self.registry
            .get(bet_id)
            .ok_or_else(|| StateError::NotFound(bet_id).into())
    }

    fn with_bet<T>(&self, bet_id: BetId, read: impl FnOnce(&Bet) -> T) -> Result<T, BetError> {
        let handle = self.handle(bet_id)?;
        let bet = lock_bet(&handle);
        Ok(read(&bet))
    }

    fn require_owner(&self, caller: &str) -> Result<(), BetError> {
        if !self.is_owner(caller) {
            return Err(AuthorizationError::NotOwner(caller.to_string()).into());
        }
        Ok(())
    }

    fn record(&self, at: DateTime<Utc>, bet_id: Option<BetId>, kind: BetEventKind) {
        let event = match bet_id {
            Some(id) => BetEvent::for_bet(at, id, kind),
            None => BetEvent::engine(at, kind),
        };
        debug!("{} {:?}", event.kind.emoji(), event.kind);
        self.registry.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ExternalFailure;
    use crate::ledger::Ledger;
    use crate::yield_venue::SimulatedYieldVenue;
    use chrono::{Duration, TimeZone};

    struct Harness {
        engine: BetEngine,
        ledger: Arc<Ledger>,
        venue: Arc<SimulatedYieldVenue>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
        let ledger = Arc::new(Ledger::new());
        for who in ["CREATOR", "ALICE", "BOB"] {
            ledger.mint(who, 100_000);
        }
        let rate = YieldRate::default();
        let venue = Arc::new(SimulatedYieldVenue::new(rate.clone()));
        let clock = Arc::new(ManualClock::new(start));
        let engine = BetEngine::new(
            EngineConfig::with_owner("OWNER"),
            ledger.clone(),
            venue.clone(),
            clock.clone(),
            rate,
        );
        Harness { engine, ledger, venue, clock }
    }

    #[test]
    fn test_create_and_join() {
        let h = harness();
        let id = h.engine.create_bet("CREATOR", 10_000, "Rain on Friday?", 7, true).unwrap();
        assert_eq!(id, 1);
        h.engine.join_bet(id, "BOB", 7_500, false).unwrap();

        let details = h.engine.get_bet_details(id).unwrap();
        assert_eq!(details.status, BetStatus::Open);
        assert_eq!(details.stake_true, 10_000);
        assert_eq!(details.stake_false, 7_500);
        assert_eq!(details.participant_count, 2);
        assert_eq!(h.engine.get_participant_stake(id, "BOB").unwrap(), 7_500);
        assert_eq!(h.engine.get_participant_stake(id, "ALICE").unwrap(), 0);
        assert_eq!(h.ledger.balance("BOB"), 92_500);
        assert_eq!(h.venue.stats().total_principal, 17_500);
        assert_eq!(h.venue.stats().open_positions, 1);
        assert_eq!(h.engine.recent_events(10).len(), 2);
    }

    #[test]
    fn test_create_rejects_before_touching_funds() {
        let h = harness();
        assert!(matches!(
            h.engine.create_bet("CREATOR", 999, "too small", 7, true),
            Err(BetError::Validation(ValidationError::BelowMinimum { .. }))
        ));
        assert!(matches!(
            h.engine.create_bet("CREATOR", 10_000, "no time", 0, true),
            Err(BetError::Validation(ValidationError::BadDuration(0)))
        ));
        assert!(matches!(
            h.engine.create_bet("NOBODY", 10_000, "broke", 7, true),
            Err(BetError::External(ExternalFailure::InsufficientFunds { .. }))
        ));
        h.ledger.freeze("ALICE");
        assert!(matches!(
            h.engine.create_bet("ALICE", 10_000, "frozen", 7, true),
            Err(BetError::External(ExternalFailure::DebitRejected(_)))
        ));
        assert_eq!(h.ledger.balance("CREATOR"), 100_000);
        assert_eq!(h.ledger.balance("ALICE"), 100_000);
        assert!(h.engine.list_bets().is_empty());
    }

    #[test]
    fn test_venue_outage_returns_stake() {
        let h = harness();
        let id = h.engine.create_bet("CREATOR", 10_000, "outage", 7, true).unwrap();

        h.venue.set_offline(true);
        assert!(matches!(
            h.engine.join_bet(id, "ALICE", 5_000, true),
            Err(BetError::External(ExternalFailure::VenueUnavailable(_)))
        ));
        assert!(h.engine.create_bet("BOB", 5_000, "outage 2", 7, false).is_err());

        assert_eq!(h.ledger.balance("ALICE"), 100_000);
        assert_eq!(h.ledger.balance("BOB"), 100_000);
        assert_eq!(h.engine.get_bet_details(id).unwrap().stake_true, 10_000);
        assert_eq!(h.engine.list_bets().len(), 1);
    }

    #[test]
    fn test_join_after_expiry() {
        let h = harness();
        let id = h.engine.create_bet("CREATOR", 10_000, "expiry", 1, true).unwrap();
        h.clock.advance(Duration::days(1));

        assert!(matches!(
            h.engine.join_bet(id, "ALICE", 5_000, true),
            Err(BetError::State(StateError::Expired(_)))
        ));
        assert!(matches!(
            h.engine.join_bet(99, "ALICE", 5_000, true),
            Err(BetError::State(StateError::NotFound(99)))
        ));
        assert_eq!(h.engine.status_of(id).unwrap(), BetStatus::Expired);
    }

    #[test]
    fn test_finalize_phases() {
        let h = harness();
        let id = h.engine.create_bet("CREATOR", 10_000, "phases", 1, true).unwrap();
        h.engine.join_bet(id, "ALICE", 35_000, true).unwrap();
        h.engine.join_bet(id, "BOB", 7_500, false).unwrap();

        assert!(matches!(
            h.engine.finalize_resolution(id, "ANYONE"),
            Err(BetError::State(StateError::NotExpired(_)))
        ));
        h.clock.advance(Duration::days(1));
        h.engine.submit_resolution_outcome(id, "ALICE", true).unwrap();
        assert!(matches!(
            h.engine.finalize_resolution(id, "ANYONE"),
            Err(BetError::State(StateError::ResolutionWindowOpen(_)))
        ));

        h.clock.advance(Duration::hours(24));
        assert_eq!(h.engine.status_of(id).unwrap(), BetStatus::AwaitingResolution);
        let report = h.engine.finalize_resolution(id, "ANYONE").unwrap();
        assert_eq!(report.payout_for("BOB"), Some(8_025));

        let details = h.engine.get_bet_details(id).unwrap();
        assert_eq!(details.status, BetStatus::Finalized);
        assert_eq!(details.winning_outcome, Some(true));
        assert_eq!(h.engine.retained_yield(), 1);
        assert!(h.engine.settlement_report(id).unwrap().is_some());

        assert!(matches!(
            h.engine.finalize_resolution(id, "ANYONE"),
            Err(BetError::State(StateError::AlreadyResolved(_)))
        ));
        assert!(matches!(
            h.engine.admin_finalize_resolution(id, "OWNER", false, true),
            Err(BetError::State(StateError::AlreadyResolved(_)))
        ));
    }

    #[test]
    fn test_no_supermajority_needs_admin() {
        let h = harness();
        let id = h.engine.create_bet("CREATOR", 10_000, "split", 1, true).unwrap();
        h.engine.join_bet(id, "BOB", 10_000, false).unwrap();
        h.clock.advance(Duration::days(3));

        assert!(matches!(
            h.engine.finalize_resolution(id, "ANYONE"),
            Err(BetError::State(StateError::NoSupermajority(_)))
        ));
        assert!(matches!(
            h.engine.admin_finalize_resolution(id, "CREATOR", true, false),
            Err(BetError::Authorization(AuthorizationError::NotOwner(_)))
        ));

        let report = h.engine.admin_finalize_resolution(id, "OWNER", false, false).unwrap();
        assert_eq!(report.mode, SettlementMode::Resolve { outcome: false });
        assert_eq!(h.engine.get_bet_details(id).unwrap().winning_outcome, Some(false));
    }

    #[test]
    fn test_admin_cancel_inside_window() {
        let h = harness();
        let id = h.engine.create_bet("CREATOR", 10_000, "cancel", 1, true).unwrap();
        h.engine.join_bet(id, "BOB", 5_000, false).unwrap();

        assert!(matches!(
            h.engine.admin_finalize_resolution(id, "OWNER", false, true),
            Err(BetError::State(StateError::NotExpired(_)))
        ));
        h.clock.advance(Duration::days(1));
        let report = h.engine.admin_finalize_resolution(id, "OWNER", false, true).unwrap();

        assert_eq!(report.retained, 750);
        assert_eq!(h.ledger.balance("CREATOR"), 100_000);
        assert_eq!(h.ledger.balance("BOB"), 100_000);
        assert_eq!(h.engine.status_of(id).unwrap(), BetStatus::Cancelled);
        assert!(h.engine.get_bet_details(id).unwrap().winning_outcome.is_none());
        assert_eq!(h.engine.retained_yield(), 750);
    }

    #[test]
    fn test_owner_operations() {
        let h = harness();
        assert_eq!(h.engine.yield_rate(), 5);
        assert!(matches!(
            h.engine.set_yield_rate("ALICE", 9),
            Err(BetError::Authorization(AuthorizationError::NotOwner(_)))
        ));
        assert!(matches!(
            h.engine.set_yield_rate("OWNER", 101),
            Err(BetError::Validation(ValidationError::YieldRateOutOfRange(101)))
        ));
        h.engine.set_yield_rate("OWNER", 9).unwrap();
        assert_eq!(h.venue.rate().get(), 9);

        h.engine.transfer_ownership("OWNER", "TREASURY").unwrap();
        assert!(h.engine.is_owner("TREASURY"));
        assert!(h.engine.set_yield_rate("OWNER", 3).is_err());
        assert!(h.engine.transfer_ownership("OWNER", "MALLORY").is_err());
        assert_eq!(h.engine.owner(), "TREASURY");

        let events = h.engine.recent_events(5);
        assert!(matches!(events[0].kind, BetEventKind::OwnershipTransferred { .. }));
        assert!(events[0].bet_id.is_none());
    }

    #[test]
    fn test_queries_across_bets() {
        let h = harness();
        let first = h.engine.create_bet("CREATOR", 10_000, "first", 2, true).unwrap();
        let second = h.engine.create_bet("ALICE", 2_000, "second", 2, false).unwrap();
        h.engine.join_bet(second, "BOB", 2_000, true).unwrap();
        h.clock.advance(Duration::days(2));
        h.engine.submit_resolution_outcome(second, "BOB", true).unwrap();

        assert_eq!(h.engine.list_bets().len(), 2);
        let bobs: Vec<BetId> = h.engine.bets_for("BOB").iter().map(|d| d.id).collect();
        assert_eq!(bobs, vec![second]);
        assert!(h.engine.is_participant(first, "CREATOR").unwrap());
        assert_eq!(h.engine.vote_of(second, "BOB").unwrap(), Some(true));
        assert_eq!(h.engine.vote_of(second, "ALICE").unwrap(), None);

        let tally = h.engine.vote_tally(second).unwrap();
        assert_eq!(tally.voted_true_stake, 2_000);
        assert_eq!(tally.abstained_stake, 2_000);
        assert_eq!(h.engine.evaluate_supermajority(second).unwrap(), None);
        assert_eq!(h.engine.evaluate_supermajority(first).unwrap(), Some(true));
    }
}
