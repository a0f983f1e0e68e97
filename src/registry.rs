// Bet registry: append-only arena of bets plus the engine-wide reserve and activity feed

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::BetEvent;
use crate::models::{Amount, Bet, BetId};

/// Number of activity entries kept in memory
pub const ACTIVITY_LOG_LIMIT: usize = 1000;

/// One bet, serialized independently of every other bet.
pub type BetHandle = Arc<Mutex<Bet>>;

#[derive(Debug)]
struct Arena {
    bets: BTreeMap<BetId, BetHandle>,
    next_id: BetId,
}

/// Process-wide bet storage.
///
/// The arena lock is held only to look up or insert a handle; all per-bet work happens
/// under that bet's own mutex, so calls on different bets never contend.
#[derive(Debug)]
pub struct BetRegistry {
    arena: RwLock<Arena>,
    /// Yield kept by the engine: refund-path yield and truncation dust
    retained: Mutex<Amount>,
    activity: Mutex<VecDeque<BetEvent>>,
}

impl BetRegistry {
    pub fn new() -> Self {
        Self {
            arena: RwLock::new(Arena { bets: BTreeMap::new(), next_id: 1 }),
            retained: Mutex::new(0),
            activity: Mutex::new(VecDeque::new()),
        }
    }

    /// Assign the next id and store the bet built for it.
    pub fn insert_with<F>(&self, build: F) -> BetId
    where
        F: FnOnce(BetId) -> Bet,
    {
        let mut arena = self.arena.write().unwrap_or_else(|p| p.into_inner());
        let id = arena.next_id;
        arena.next_id += 1;
        arena.bets.insert(id, Arc::new(Mutex::new(build(id))));
        id
    }

    pub fn get(&self, id: BetId) -> Option<BetHandle> {
        let arena = self.arena.read().unwrap_or_else(|p| p.into_inner());
        arena.bets.get(&id).cloned()
    }

    /// All handles in id order.
    pub fn handles(&self) -> Vec<BetHandle> {
        let arena = self.arena.read().unwrap_or_else(|p| p.into_inner());
        arena.bets.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.arena.read().unwrap_or_else(|p| p.into_inner()).bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_retained(&self, amount: Amount) {
        *lock(&self.retained) += amount;
    }

    pub fn retained(&self) -> Amount {
        *lock(&self.retained)
    }

    pub fn record(&self, event: BetEvent) {
        let mut activity = lock(&self.activity);
        activity.push_back(event);
        while activity.len() > ACTIVITY_LOG_LIMIT {
            activity.pop_front();
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<BetEvent> {
        lock(&self.activity).iter().rev().take(limit).cloned().collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let arena = self.arena.read().unwrap_or_else(|p| p.into_inner());
        RegistrySnapshot {
            next_id: arena.next_id,
            retained_yield: self.retained(),
            bets: arena.bets.values().map(|h| lock_bet(h).clone()).collect(),
        }
    }

    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let max_id = snapshot.bets.iter().map(|b| b.id).max().unwrap_or(0);
        let bets: BTreeMap<BetId, BetHandle> = snapshot
            .bets
            .into_iter()
            .map(|bet| (bet.id, Arc::new(Mutex::new(bet))))
            .collect();
        info!("📂 Restored {} bets from snapshot", bets.len());

        Self {
            arena: RwLock::new(Arena { bets, next_id: snapshot.next_id.max(max_id + 1) }),
            retained: Mutex::new(snapshot.retained_yield),
            activity: Mutex::new(VecDeque::new()),
        }
    }
}

impl Default for BetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub next_id: BetId,
    pub retained_yield: Amount,
    pub bets: Vec<Bet>,
}

/// Lock a bet. A poisoned lock is recovered: every mutation is applied only after all
/// fallible steps have succeeded.
pub fn lock_bet(handle: &BetHandle) -> MutexGuard<'_, Bet> {
    handle.lock().unwrap_or_else(|p| p.into_inner())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}
