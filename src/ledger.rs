/// Balance Ledger for No-Loss Wagers
///
/// The engine never holds balances itself. Stakes are debited from, and payouts credited
/// to, an external account store behind the `BalanceService` port.
///
/// `Ledger` is the in-memory reference store:
/// - Per-account available balance plus lifetime debit/credit totals
/// - Append-only transaction log (mints, stake debits, payouts and refunds)
/// - Account freezing, used to simulate a store that rejects transfers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::ExternalFailure;
use crate::models::{to_tokens, Amount};

// ============================================================================
// PORT
// ============================================================================

/// External account store.
///
/// `debit` and `credit` must be all-or-nothing: a failed call leaves balances unchanged.
pub trait BalanceService: Send + Sync {
    fn debit(&self, identity: &str, amount: Amount) -> Result<(), ExternalFailure>;
    fn credit(&self, identity: &str, amount: Amount) -> Result<(), ExternalFailure>;

    /// Credit a batch of accounts as one step.
    ///
    /// The default applies credits in order and reverses the applied prefix if one fails.
    fn credit_all(&self, credits: &[(String, Amount)]) -> Result<(), ExternalFailure> {
        for (applied, (identity, amount)) in credits.iter().enumerate() {
            if let Err(e) = self.credit(identity, *amount) {
                for (undo_identity, undo_amount) in credits[..applied].iter().rev() {
                    if let Err(undo_err) = self.debit(undo_identity, *undo_amount) {
                        error!(
                            identity = %undo_identity,
                            amount = undo_amount,
                            error = %undo_err,
                            "failed to reverse credit during batch rollback"
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

// ============================================================================
// CORE TYPES
// ============================================================================

/// Account balance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Balance {
    pub available: Amount,
    /// Lifetime amount debited (stakes)
    pub debited: Amount,
    /// Lifetime amount credited (payouts, refunds, mints)
    pub credited: Amount,
}

/// Transaction types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxType {
    Mint,
    Debit,
    Credit,
}

/// A single transaction record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub identity: String,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(tx_type: TxType, identity: &str, amount: Amount) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            identity: identity.to_string(),
            amount,
            timestamp: Utc::now(),
            description: None,
        }
    }

    pub fn mint(identity: &str, amount: Amount) -> Self {
        let mut tx = Self::new(TxType::Mint, identity, amount);
        tx.description = Some(format!("Minted {} BB", to_tokens(amount)));
        tx
    }

    pub fn debit(identity: &str, amount: Amount) -> Self {
        let mut tx = Self::new(TxType::Debit, identity, amount);
        tx.description = Some(format!("Debited {} BB", to_tokens(amount)));
        tx
    }

    pub fn credit(identity: &str, amount: Amount) -> Self {
        let mut tx = Self::new(TxType::Credit, identity, amount);
        tx.description = Some(format!("Credited {} BB", to_tokens(amount)));
        tx
    }
}

#[derive(Debug, Default)]
struct LedgerBook {
    balances: HashMap<String, Balance>,
    transactions: Vec<Transaction>,
    frozen: HashSet<String>,
}

impl LedgerBook {
    fn check_debit(&self, identity: &str) -> Result<(), ExternalFailure> {
        if self.frozen.contains(identity) {
            return Err(ExternalFailure::DebitRejected(format!("account {} is frozen", identity)));
        }
        Ok(())
    }

    fn check_credit(&self, identity: &str) -> Result<(), ExternalFailure> {
        if self.frozen.contains(identity) {
            return Err(ExternalFailure::CreditRejected(format!("account {} is frozen", identity)));
        }
        Ok(())
    }

    fn apply_credit(&mut self, identity: &str, amount: Amount, tx: Transaction) {
        let bal = self.balances.entry(identity.to_string()).or_default();
        bal.available += amount;
        bal.credited += amount;
        self.transactions.push(tx);
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// In-memory account store.
#[derive(Debug, Default)]
pub struct Ledger {
    book: Mutex<LedgerBook>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn book(&self) -> std::sync::MutexGuard<'_, LedgerBook> {
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fund an account, creating it if needed
    pub fn mint(&self, identity: &str, amount: Amount) -> Amount {
        let mut book = self.book();
        book.apply_credit(identity, amount, Transaction::mint(identity, amount));
        let available = book.balances[identity].available;
        info!("📥 Mint: {} received {} BB", identity, to_tokens(amount));
        available
    }

    pub fn balance(&self, identity: &str) -> Amount {
        self.book().balances.get(identity).map(|b| b.available).unwrap_or(0)
    }

    pub fn account(&self, identity: &str) -> Option<Balance> {
        self.book().balances.get(identity).cloned()
    }

    /// Reject every debit and credit touching this account until unfrozen
    pub fn freeze(&self, identity: &str) {
        self.book().frozen.insert(identity.to_string());
    }

    pub fn unfreeze(&self, identity: &str) {
        self.book().frozen.remove(identity);
    }

    /// Get transactions for an identity
    pub fn get_transactions(&self, identity: &str) -> Vec<Transaction> {
        self.book()
            .transactions
            .iter()
            .filter(|tx| tx.identity == identity)
            .cloned()
            .collect()
    }

    /// Get recent transactions, newest first
    pub fn recent_transactions(&self, limit: usize) -> Vec<Transaction> {
        self.book().transactions.iter().rev().take(limit).cloned().collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let book = self.book();
        let count = |t: TxType| book.transactions.iter().filter(|tx| tx.tx_type == t).count();
        LedgerStats {
            accounts: book.balances.len(),
            transactions: book.transactions.len(),
            debits: count(TxType::Debit),
            credits: count(TxType::Credit),
            total_available: book.balances.values().map(|b| b.available).sum(),
        }
    }
}

impl BalanceService for Ledger {
    fn debit(&self, identity: &str, amount: Amount) -> Result<(), ExternalFailure> {
        let mut book = self.book();
        book.check_debit(identity)?;

        let available = book.balances.get(identity).map(|b| b.available).unwrap_or(0);
        if available < amount {
            return Err(ExternalFailure::InsufficientFunds {
                identity: identity.to_string(),
                available,
                requested: amount,
            });
        }

        if let Some(bal) = book.balances.get_mut(identity) {
            bal.available -= amount;
            bal.debited += amount;
        }
        book.transactions.push(Transaction::debit(identity, amount));
        debug!(identity, amount, "ledger debit");
        Ok(())
    }

    fn credit(&self, identity: &str, amount: Amount) -> Result<(), ExternalFailure> {
        let mut book = self.book();
        book.check_credit(identity)?;
        book.apply_credit(identity, amount, Transaction::credit(identity, amount));
        debug!(identity, amount, "ledger credit");
        Ok(())
    }

    /// Validates every recipient first, then applies all credits under one lock.
    fn credit_all(&self, credits: &[(String, Amount)]) -> Result<(), ExternalFailure> {
        let mut book = self.book();
        for (identity, _) in credits {
            book.check_credit(identity)?;
        }
        for (identity, amount) in credits {
            book.apply_credit(identity, *amount, Transaction::credit(identity, *amount));
        }
        debug!(count = credits.len(), "ledger batch credit");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub accounts: usize,
    pub transactions: usize,
    pub debits: usize,
    pub credits: usize,
    pub total_available: Amount,
}
