// ============================================================================
// Resolution Voting - outcome submissions and the supermajority rule
// ============================================================================
//
// Participants submit the outcome they believe happened once the bet has expired.
// A participant may only vouch for the side they staked on, so submissions double as
// a "my side won" claim. The supermajority itself is computed from stake totals; the
// recorded votes are kept for auditing.
//
// ============================================================================

use chrono::{DateTime, Utc};

use crate::error::{AuthorizationError, BetError, StateError};
use crate::models::{Bet, VoteTally};

#[derive(Debug, Clone, Copy)]
pub struct ResolutionVoting {
    threshold_percent: u32,
}

impl ResolutionVoting {
    pub fn new(threshold_percent: u32) -> Self {
        Self { threshold_percent }
    }

    /// Record (or overwrite) a participant's outcome submission.
    pub fn submit(
        &self,
        bet: &mut Bet,
        participant: &str,
        outcome: bool,
        now: DateTime<Utc>,
    ) -> Result<(), BetError> {
        if bet.is_terminal() {
            return Err(StateError::AlreadyResolved(bet.id).into());
        }
        if now < bet.expires_at {
            return Err(StateError::NotExpired(bet.id).into());
        }
        let staked = bet
            .participants
            .get(participant)
            .map(|p| p.side)
            .ok_or_else(|| AuthorizationError::NotParticipant(participant.to_string()))?;
        if staked != outcome {
            return Err(AuthorizationError::SideMismatch {
                identity: participant.to_string(),
                staked,
                submitted: outcome,
            }
            .into());
        }

        bet.votes.insert(participant.to_string(), outcome);
        Ok(())
    }

    /// The side holding at least `threshold_percent` of the total stake, if any.
    pub fn evaluate(&self, bet: &Bet) -> Option<bool> {
        let total = bet.total_stake() as u128;
        if total == 0 {
            return None;
        }
        let needed = total * self.threshold_percent as u128;
        if bet.stake_true as u128 * 100 >= needed {
            Some(true)
        } else if bet.stake_false as u128 * 100 >= needed {
            Some(false)
        } else {
            None
        }
    }

    pub fn tally(bet: &Bet) -> VoteTally {
        let mut tally = VoteTally::default();
        for (identity, participant) in &bet.participants {
            match bet.votes.get(identity) {
                Some(true) => tally.voted_true_stake += participant.stake,
                Some(false) => tally.voted_false_stake += participant.stake,
                None => tally.abstained_stake += participant.stake,
            }
        }
        tally.voters = bet.votes.len();
        tally
    }
}
