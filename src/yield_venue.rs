//! Yield Venue Port
//!
//! The engine parks each bet's pooled stake in one position at an external yield venue
//! (liquidity pool, lending market): the first stake opens it, every later stake tops it up,
//! and settlement withdraws it in one go. The venue's internals are not modelled here; only
//! the deposit/top-up/withdraw interface is consumed.
//!
//! `SimulatedYieldVenue` is the deterministic reference used by tests and the demo binary:
//! every withdrawal returns `principal * rate / 100` as yield, where `rate` is read from the
//! shared `YieldRate` at withdrawal time.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ExternalFailure;
use crate::models::Amount;

/// Default simulated yield, in percent of principal.
pub const DEFAULT_YIELD_RATE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub Uuid);

impl PositionId {
    pub fn new() -> Self {
        PositionId(Uuid::new_v4())
    }
}

impl Default for PositionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos_{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub principal: Amount,
    pub yield_amount: Amount,
}

/// External yield-generating venue.
///
/// A failed call must leave the venue unchanged.
pub trait YieldVenue: Send + Sync {
    fn deposit(&self, amount: Amount) -> Result<PositionId, ExternalFailure>;
    /// Add principal to an open position.
    fn top_up(&self, position: PositionId, amount: Amount) -> Result<(), ExternalFailure>;
    fn withdraw(&self, position: PositionId) -> Result<Withdrawal, ExternalFailure>;

    /// Positions held on the engine's behalf, for venues that live in-process and must be
    /// persisted alongside the engine snapshot. Remote venues keep their own books.
    fn custody(&self) -> Option<VenueSnapshot> {
        None
    }

    fn restore_custody(&self, _snapshot: VenueSnapshot) {}
}

// ============================================================================
// YIELD RATE
// ============================================================================

/// Owner-adjustable yield percentage shared between the engine and the simulated venue.
#[derive(Debug, Clone)]
pub struct YieldRate(Arc<AtomicU32>);

impl YieldRate {
    pub fn new(percent: u32) -> Self {
        YieldRate(Arc::new(AtomicU32::new(percent)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, percent: u32) {
        self.0.store(percent, Ordering::SeqCst);
    }
}

impl Default for YieldRate {
    fn default() -> Self {
        Self::new(DEFAULT_YIELD_RATE)
    }
}

// ============================================================================
// SIMULATED VENUE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenuePosition {
    pub id: PositionId,
    pub principal: Amount,
    pub opened_at: DateTime<Utc>,
}

/// Persisted form of an in-process venue's open positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueSnapshot {
    pub positions: Vec<VenuePosition>,
    #[serde(default)]
    pub total_yield_paid: Amount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueStats {
    pub open_positions: usize,
    pub total_principal: Amount,
    pub total_yield_paid: Amount,
}

/// Deterministic in-memory venue.
#[derive(Debug)]
pub struct SimulatedYieldVenue {
    rate: YieldRate,
    positions: Mutex<HashMap<PositionId, VenuePosition>>,
    yield_paid: Mutex<Amount>,
    offline: AtomicBool,
}

impl SimulatedYieldVenue {
    pub fn new(rate: YieldRate) -> Self {
        Self {
            rate,
            positions: Mutex::new(HashMap::new()),
            yield_paid: Mutex::new(0),
            offline: AtomicBool::new(false),
        }
    }

    pub fn rate(&self) -> &YieldRate {
        &self.rate
    }

    /// Simulate an outage: every call fails with `VenueUnavailable` until brought back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn stats(&self) -> VenueStats {
        let positions = lock(&self.positions);
        VenueStats {
            open_positions: positions.len(),
            total_principal: positions.values().map(|p| p.principal).sum(),
            total_yield_paid: *lock(&self.yield_paid),
        }
    }

    fn ensure_online(&self) -> Result<(), ExternalFailure> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ExternalFailure::VenueUnavailable("simulated venue is offline".into()));
        }
        Ok(())
    }
}

impl YieldVenue for SimulatedYieldVenue {
    fn deposit(&self, amount: Amount) -> Result<PositionId, ExternalFailure> {
        self.ensure_online()?;

        let position = VenuePosition {
            id: PositionId::new(),
            principal: amount,
            opened_at: Utc::now(),
        };
        let id = position.id;
        lock(&self.positions).insert(id, position);

        debug!(position = %id, principal = amount, "venue deposit");
        Ok(id)
    }

    fn top_up(&self, position: PositionId, amount: Amount) -> Result<(), ExternalFailure> {
        self.ensure_online()?;

        let mut positions = lock(&self.positions);
        let held = positions
            .get_mut(&position)
            .ok_or_else(|| ExternalFailure::UnknownPosition(position.to_string()))?;
        held.principal = held.principal.checked_add(amount).ok_or_else(|| {
            ExternalFailure::VenueUnavailable(format!("position {} is full", position))
        })?;

        debug!(position = %position, amount, principal = held.principal, "venue top-up");
        Ok(())
    }

    fn withdraw(&self, position: PositionId) -> Result<Withdrawal, ExternalFailure> {
        self.ensure_online()?;

        let removed = lock(&self.positions)
            .remove(&position)
            .ok_or_else(|| ExternalFailure::UnknownPosition(position.to_string()))?;

        let rate = self.rate.get() as u128;
        let yield_amount = (removed.principal as u128 * rate / 100) as Amount;
        *lock(&self.yield_paid) += yield_amount;

        debug!(position = %position, principal = removed.principal, yield_amount, "venue withdraw");
        Ok(Withdrawal { principal: removed.principal, yield_amount })
    }

    fn custody(&self) -> Option<VenueSnapshot> {
        let mut positions: Vec<VenuePosition> = lock(&self.positions).values().cloned().collect();
        positions.sort_by_key(|p| p.opened_at);
        Some(VenueSnapshot { positions, total_yield_paid: *lock(&self.yield_paid) })
    }

    fn restore_custody(&self, snapshot: VenueSnapshot) {
        let count = snapshot.positions.len();
        *lock(&self.positions) = snapshot.positions.into_iter().map(|p| (p.id, p)).collect();
        *lock(&self.yield_paid) = snapshot.total_yield_paid;
        debug!(positions = count, "venue custody restored");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
