// ============================================================================
// Payout Engine - venue custody and settlement
// ============================================================================
//
// A bet's stakes are pooled in a single venue position: the first stake opens it and
// every join tops it up, so yield is computed once on the whole pool. Settlement withdraws
// the position, checks the principal against the recorded stake, and credits every
// participant in one batch.
//
// Resolve: each participant gets their stake back plus a pro-rata share of their side's
// yield pool (winners 80% / losers 20% by default).
// Refund: stakes only; the yield stays in the engine reserve.
//
// A withdrawal happens at most once per bet. If anything fails after it, the withdrawn
// principal and yield stay held on the bet and the next attempt pays them out as they are.
//
// ============================================================================

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::error::{BetError, ExternalFailure, ValidationError};
use crate::ledger::BalanceService;
use crate::models::{to_tokens, Amount, Bet, Payout, SettlementMode, SettlementReport};
use crate::yield_venue::{PositionId, YieldVenue};

pub struct PayoutEngine<'a> {
    venue: &'a dyn YieldVenue,
    balances: &'a dyn BalanceService,
    winners_yield_percent: u32,
}

impl<'a> PayoutEngine<'a> {
    pub fn new(
        venue: &'a dyn YieldVenue,
        balances: &'a dyn BalanceService,
        winners_yield_percent: u32,
    ) -> Self {
        Self { venue, balances, winners_yield_percent }
    }

    /// Park a freshly collected stake in the venue: top up the bet's position if it has
    /// one, open a new one otherwise.
    pub fn acquire(
        &self,
        position: Option<PositionId>,
        amount: Amount,
    ) -> Result<PositionId, BetError> {
        match position {
            Some(position) => {
                self.venue.top_up(position, amount)?;
                Ok(position)
            }
            None => Ok(self.venue.deposit(amount)?),
        }
    }

    /// Withdraw the bet's position and pay every participant.
    ///
    /// On success the bet holds nothing and the report is returned; the caller records the
    /// terminal resolution. On failure the bet is left non-terminal with its funds either
    /// still in the venue or held on the bet.
    pub fn settle(
        &self,
        bet: &mut Bet,
        mode: SettlementMode,
        now: DateTime<Utc>,
    ) -> Result<SettlementReport, BetError> {
        if let Some(position) = bet.position {
            let withdrawal = self.venue.withdraw(position).map_err(|e| {
                warn!(bet_id = bet.id, position = %position, error = %e, "venue withdrawal failed");
                e
            })?;
            bet.position = None;
            bet.held_principal = bet.held_principal.saturating_add(withdrawal.principal);
            bet.carried_yield = bet.carried_yield.saturating_add(withdrawal.yield_amount);
        }

        if bet.held_principal != bet.total_stake() {
            let err = ExternalFailure::PrincipalMismatch {
                expected: bet.total_stake(),
                actual: bet.held_principal,
            };
            error!(bet_id = bet.id, error = %err, "principal check failed");
            return Err(err.into());
        }

        let yield_amount = bet.carried_yield;
        if bet.total_stake().checked_add(yield_amount).is_none() {
            return Err(ValidationError::AmountOverflow.into());
        }

        let report = build_report(bet, mode, yield_amount, self.winners_yield_percent, now);
        let credits: Vec<(String, Amount)> = report
            .payouts
            .iter()
            .map(|p| (p.identity.clone(), p.amount))
            .collect();

        if let Err(e) = self.balances.credit_all(&credits) {
            warn!(
                bet_id = bet.id,
                held = bet.held_principal,
                carried = bet.carried_yield,
                error = %e,
                "payout batch rejected, funds stay held on the bet"
            );
            return Err(e.into());
        }

        bet.carried_yield = 0;
        bet.held_principal = 0;

        info!(
            "💸 Settled bet {}: {} BB stake + {} BB yield ({} BB retained)",
            bet.id,
            to_tokens(report.total_stake),
            to_tokens(report.distributed_yield),
            to_tokens(report.retained)
        );
        Ok(report)
    }
}

/// Split a yield into `(winners, losers)` pools. The losers' pool is truncated, so any
/// remainder goes to the winners.
pub fn split_yield(yield_amount: Amount, winners_percent: u32) -> (Amount, Amount) {
    let losers_percent = 100u128.saturating_sub(winners_percent as u128);
    let losers = (yield_amount as u128 * losers_percent / 100) as Amount;
    (yield_amount - losers, losers)
}

/// Compute every payout for `bet` without moving any funds.
pub fn build_report(
    bet: &Bet,
    mode: SettlementMode,
    yield_amount: Amount,
    winners_percent: u32,
    now: DateTime<Utc>,
) -> SettlementReport {
    let total_stake = bet.total_stake();

    let (yield_for_winners, yield_for_losers, payouts) = match mode {
        SettlementMode::Refund => {
            let payouts: Vec<Payout> = bet
                .participants
                .iter()
                .map(|(identity, p)| Payout {
                    identity: identity.clone(),
                    side: p.side,
                    stake: p.stake,
                    amount: p.stake,
                })
                .collect();
            (0, 0, payouts)
        }
        SettlementMode::Resolve { outcome } => {
            let (mut winners_pool, mut losers_pool) = split_yield(yield_amount, winners_percent);
            let winning_stake = bet.side_total(outcome);
            let losing_stake = bet.side_total(!outcome);

            // an empty side has nobody to pay; its pool goes to the other side
            if losing_stake == 0 {
                winners_pool += losers_pool;
                losers_pool = 0;
            } else if winning_stake == 0 {
                losers_pool += winners_pool;
                winners_pool = 0;
            }

            let payouts: Vec<Payout> = bet
                .participants
                .iter()
                .map(|(identity, p)| {
                    let (pool, side_stake) = if p.side == outcome {
                        (winners_pool, winning_stake)
                    } else {
                        (losers_pool, losing_stake)
                    };
                    let share = pro_rata(p.stake, pool, side_stake);
                    Payout {
                        identity: identity.clone(),
                        side: p.side,
                        stake: p.stake,
                        amount: p.stake + share,
                    }
                })
                .collect();
            (winners_pool, losers_pool, payouts)
        }
    };

    let distributed_yield: Amount = payouts.iter().map(Payout::yield_share).sum();
    let undistributed = match mode {
        SettlementMode::Refund => 0,
        SettlementMode::Resolve { .. } => yield_amount - distributed_yield,
    };

    SettlementReport {
        bet_id: bet.id,
        mode,
        total_stake,
        yield_amount,
        yield_for_winners,
        yield_for_losers,
        distributed_yield,
        undistributed,
        retained: yield_amount - distributed_yield,
        payouts,
        settled_at: now,
    }
}

fn pro_rata(stake: Amount, pool: Amount, side_stake: Amount) -> Amount {
    if side_stake == 0 {
        return 0;
    }
    (stake as u128 * pool as u128 / side_stake as u128) as Amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::models::Participant;
    use crate::yield_venue::{SimulatedYieldVenue, YieldRate};
    use chrono::Duration;
    use std::collections::BTreeMap;

    /// Bet whose stakes are pooled in one funded position.
    fn funded_bet(venue: &SimulatedYieldVenue, stakes: &[(&str, bool, Amount)]) -> Bet {
        let now = Utc::now();
        let mut bet = Bet {
            id: 1,
            creator: stakes[0].0.to_string(),
            condition: "Will it snow in Lisbon?".into(),
            created_at: now,
            expires_at: now + Duration::days(1),
            resolution_deadline: now + Duration::days(2),
            stake_true: 0,
            stake_false: 0,
            participants: BTreeMap::new(),
            votes: BTreeMap::new(),
            resolution: None,
            position: None,
            carried_yield: 0,
            held_principal: 0,
            settlement: None,
        };
        for (who, side, stake) in stakes {
            bet.participants.insert(
                who.to_string(),
                Participant { side: *side, stake: *stake, joined_at: now },
            );
            if *side {
                bet.stake_true += stake;
            } else {
                bet.stake_false += stake;
            }
            bet.position = Some(match bet.position {
                Some(position) => {
                    venue.top_up(position, *stake).unwrap();
                    position
                }
                None => venue.deposit(*stake).unwrap(),
            });
        }
        bet
    }

    fn scenario_two(venue: &SimulatedYieldVenue) -> Bet {
        funded_bet(venue, &[("CREATOR", true, 10_000), ("A", true, 35_000), ("B", false, 7_500)])
    }

    #[test]
    fn test_split_yield() {
        assert_eq!(split_yield(2_625, 80), (2_100, 525));
        assert_eq!(split_yield(7, 80), (6, 1));
        assert_eq!(split_yield(0, 80), (0, 0));
        assert_eq!(split_yield(1_000, 100), (1_000, 0));
    }

    #[test]
    fn test_resolve_payouts() {
        let venue = SimulatedYieldVenue::new(YieldRate::new(5));
        let ledger = Ledger::new();
        let engine = PayoutEngine::new(&venue, &ledger, 80);
        let mut bet = scenario_two(&venue);

        let report = engine
            .settle(&mut bet, SettlementMode::Resolve { outcome: true }, Utc::now())
            .unwrap();

        assert_eq!(report.yield_amount, 2_625);
        assert_eq!(report.yield_for_winners, 2_100);
        assert_eq!(report.yield_for_losers, 525);
        assert_eq!(report.payout_for("CREATOR"), Some(10_466));
        assert_eq!(report.payout_for("A"), Some(36_633));
        assert_eq!(report.payout_for("B"), Some(8_025));
        assert_eq!(report.undistributed, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(report.total_paid(), report.total_stake + report.distributed_yield);

        assert_eq!(ledger.balance("B"), 8_025);
        assert!(bet.position.is_none());
        assert_eq!(bet.held_principal, 0);
        assert_eq!(venue.stats().open_positions, 0);
    }

    #[test]
    fn test_refund_retains_yield() {
        let venue = SimulatedYieldVenue::new(YieldRate::new(5));
        let ledger = Ledger::new();
        let engine = PayoutEngine::new(&venue, &ledger, 80);
        let mut bet = scenario_two(&venue);

        let report = engine.settle(&mut bet, SettlementMode::Refund, Utc::now()).unwrap();

        assert_eq!(report.distributed_yield, 0);
        assert_eq!(report.undistributed, 0);
        assert_eq!(report.retained, 2_625);
        assert_eq!(ledger.balance("CREATOR"), 10_000);
        assert_eq!(ledger.balance("A"), 35_000);
        assert_eq!(ledger.balance("B"), 7_500);
    }

    #[test]
    fn test_empty_side_folds_into_other_pool() {
        let venue = SimulatedYieldVenue::new(YieldRate::new(10));
        let bet = funded_bet(&venue, &[("CREATOR", true, 10_000), ("A", true, 30_000)]);

        let report = build_report(&bet, SettlementMode::Resolve { outcome: true }, 4_000, 80, Utc::now());
        assert_eq!(report.yield_for_winners, 4_000);
        assert_eq!(report.yield_for_losers, 0);
        assert_eq!(report.payout_for("CREATOR"), Some(11_000));
        assert_eq!(report.payout_for("A"), Some(33_000));
        assert_eq!(report.retained, 0);

        // admin picked the side nobody backed: the whole yield goes to the losers
        let report = build_report(&bet, SettlementMode::Resolve { outcome: false }, 4_000, 80, Utc::now());
        assert_eq!(report.yield_for_winners, 0);
        assert_eq!(report.yield_for_losers, 4_000);
        assert_eq!(report.total_paid(), 44_000);
    }

    #[test]
    fn test_failed_credit_holds_funds_on_bet() {
        let venue = SimulatedYieldVenue::new(YieldRate::new(5));
        let ledger = Ledger::new();
        let engine = PayoutEngine::new(&venue, &ledger, 80);
        let mut bet = scenario_two(&venue);

        ledger.freeze("B");
        let result = engine.settle(&mut bet, SettlementMode::Resolve { outcome: true }, Utc::now());
        assert!(matches!(result, Err(BetError::External(ExternalFailure::CreditRejected(_)))));
        assert_eq!(ledger.balance("CREATOR"), 0);
        assert_eq!(bet.carried_yield, 2_625);
        assert_eq!(bet.held_principal, 52_500);
        assert!(bet.position.is_none());
        assert_eq!(venue.stats().open_positions, 0);

        // a second failure must not withdraw or earn anything new
        let result = engine.settle(&mut bet, SettlementMode::Resolve { outcome: true }, Utc::now());
        assert!(result.is_err());
        assert_eq!(bet.carried_yield, 2_625);
        assert_eq!(venue.stats().total_yield_paid, 2_625);

        ledger.unfreeze("B");
        let report = engine
            .settle(&mut bet, SettlementMode::Resolve { outcome: true }, Utc::now())
            .unwrap();
        assert_eq!(report.yield_amount, 2_625);
        assert_eq!(report.payout_for("B"), Some(8_025));
        assert_eq!(report.total_paid(), 52_500 + report.distributed_yield);
        assert_eq!(bet.carried_yield, 0);
        assert_eq!(bet.held_principal, 0);
        assert_eq!(venue.stats().total_yield_paid, 2_625);
    }

    #[test]
    fn test_pooled_stakes_earn_yield_on_the_total() {
        let venue = SimulatedYieldVenue::new(YieldRate::new(5));
        let ledger = Ledger::new();
        let engine = PayoutEngine::new(&venue, &ledger, 80);
        let mut bet = funded_bet(&venue, &[("CREATOR", true, 1_010), ("A", false, 1_010)]);
        assert_eq!(venue.stats().open_positions, 1);

        let report = engine.settle(&mut bet, SettlementMode::Refund, Utc::now()).unwrap();
        assert_eq!(report.yield_amount, 101);
        assert_eq!(report.retained, 101);
    }

    #[test]
    fn test_venue_outage_keeps_position() {
        let venue = SimulatedYieldVenue::new(YieldRate::new(5));
        let ledger = Ledger::new();
        let engine = PayoutEngine::new(&venue, &ledger, 80);
        let mut bet = scenario_two(&venue);
        let position = bet.position;

        venue.set_offline(true);
        let result = engine.settle(&mut bet, SettlementMode::Refund, Utc::now());
        assert!(matches!(result, Err(BetError::External(ExternalFailure::VenueUnavailable(_)))));
        assert_eq!(bet.position, position);
        assert_eq!(bet.held_principal, 0);
        assert_eq!(bet.carried_yield, 0);
        assert_eq!(venue.stats().total_principal, 52_500);
        assert_eq!(ledger.stats().credits, 0);
    }

    #[test]
    fn test_principal_mismatch() {
        let venue = SimulatedYieldVenue::new(YieldRate::new(5));
        let ledger = Ledger::new();
        let engine = PayoutEngine::new(&venue, &ledger, 80);
        let mut bet = scenario_two(&venue);
        bet.stake_false += 1;

        let result = engine.settle(&mut bet, SettlementMode::Refund, Utc::now());
        assert!(matches!(
            result,
            Err(BetError::External(ExternalFailure::PrincipalMismatch { expected: 52_501, actual: 52_500 }))
        ));
        assert_eq!(ledger.stats().credits, 0);
    }
}
