// ============================================================================
// Stake Ledger - per-bet stake bookkeeping
// ============================================================================
//
// Owns creation and joining: validates stakes, moves them out of the participant's
// account, and keeps the per-side totals and participant entries. Knows nothing about
// voting or payouts.
//
// Checks are split from mutations so the orchestrator can run every fallible step
// (validation, debit, venue deposit) before touching the bet.
//
// ============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::error;

use crate::error::{AuthorizationError, BetError, StateError, ValidationError};
use crate::ledger::BalanceService;
use crate::models::{Amount, Bet, BetId, Participant};
use crate::yield_venue::PositionId;

pub struct StakeLedger<'a> {
    balances: &'a dyn BalanceService,
    min_stake: Amount,
}

impl<'a> StakeLedger<'a> {
    pub fn new(balances: &'a dyn BalanceService, min_stake: Amount) -> Self {
        Self { balances, min_stake }
    }

    pub fn check_stake(&self, stake: Amount) -> Result<(), BetError> {
        if stake < self.min_stake {
            return Err(ValidationError::BelowMinimum { stake, minimum: self.min_stake }.into());
        }
        Ok(())
    }

    /// Expiry and resolution deadline for a bet created at `created_at`.
    pub fn schedule(
        created_at: DateTime<Utc>,
        duration_days: i64,
        resolution_window: Duration,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), BetError> {
        if duration_days <= 0 {
            return Err(ValidationError::BadDuration(duration_days).into());
        }
        let expires_at = Duration::try_days(duration_days)
            .and_then(|d| created_at.checked_add_signed(d))
            .ok_or(ValidationError::BadDuration(duration_days))?;
        let deadline = expires_at
            .checked_add_signed(resolution_window)
            .ok_or(ValidationError::BadDuration(duration_days))?;
        Ok((expires_at, deadline))
    }

    pub fn check_join(
        &self,
        bet: &Bet,
        participant: &str,
        stake: Amount,
        side: bool,
        now: DateTime<Utc>,
    ) -> Result<(), BetError> {
        if bet.is_terminal() {
            return Err(StateError::AlreadyResolved(bet.id).into());
        }
        if now >= bet.expires_at {
            return Err(StateError::Expired(bet.id).into());
        }
        self.check_stake(stake)?;
        if bet.is_participant(participant) {
            return Err(AuthorizationError::AlreadyJoined(participant.to_string()).into());
        }
        // both the side total and the grand total must stay representable
        bet.side_total(side)
            .checked_add(stake)
            .and_then(|_| bet.total_stake().checked_add(stake))
            .ok_or(ValidationError::AmountOverflow)?;
        Ok(())
    }

    /// Move a stake out of the participant's account.
    pub fn collect(&self, identity: &str, amount: Amount) -> Result<(), BetError> {
        self.balances.debit(identity, amount)?;
        Ok(())
    }

    /// Return a collected stake after a later step of the same call failed.
    pub fn release(&self, identity: &str, amount: Amount) {
        if let Err(e) = self.balances.credit(identity, amount) {
            error!(identity, amount, error = %e, "failed to return stake after aborted call");
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: BetId,
        creator: &str,
        condition: &str,
        stake: Amount,
        side: bool,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        resolution_deadline: DateTime<Utc>,
        position: PositionId,
    ) -> Bet {
        let mut participants = BTreeMap::new();
        participants.insert(
            creator.to_string(),
            Participant { side, stake, joined_at: created_at },
        );

        Bet {
            id,
            creator: creator.to_string(),
            condition: condition.to_string(),
            created_at,
            expires_at,
            resolution_deadline,
            stake_true: if side { stake } else { 0 },
            stake_false: if side { 0 } else { stake },
            participants,
            votes: BTreeMap::new(),
            resolution: None,
            position: Some(position),
            carried_yield: 0,
            held_principal: 0,
            settlement: None,
        }
    }

    /// Apply a join that has already passed `check_join` and been collected.
    pub fn record_join(
        bet: &mut Bet,
        participant: &str,
        stake: Amount,
        side: bool,
        now: DateTime<Utc>,
        position: PositionId,
    ) {
        bet.participants.insert(
            participant.to_string(),
            Participant { side, stake, joined_at: now },
        );
        if side {
            bet.stake_true += stake;
        } else {
            bet.stake_false += stake;
        }
        bet.position = Some(position);
    }
}
