use super::ids::{AccountId, EntryId};
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive number of EcoCoins.
///
/// Ledger postings only ever carry a `Coins` value, so zero and negative
/// amounts are rejected before they reach a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Coins(u64);

impl Coins {
    pub fn new(value: i64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value as u64))
        } else {
            Err(WorkflowError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Coins {
    type Error = WorkflowError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Coins> for i64 {
    fn from(coins: Coins) -> Self {
        coins.0 as i64
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    SignupBonus,
    TaskReward,
    HotelDiscount,
    BookingRefund,
}

/// A requested balance change, not yet applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerPosting {
    pub account_id: AccountId,
    pub direction: Direction,
    pub amount: Coins,
    pub reason: LedgerReason,
    /// Idempotency key: a second posting with the same reference is a no-op.
    pub reference: String,
    pub memo: String,
}

impl LedgerPosting {
    pub fn credit(
        account_id: AccountId,
        amount: Coins,
        reason: LedgerReason,
        reference: impl Into<String>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            direction: Direction::Credit,
            amount,
            reason,
            reference: reference.into(),
            memo: memo.into(),
        }
    }

    pub fn debit(
        account_id: AccountId,
        amount: Coins,
        reason: LedgerReason,
        reference: impl Into<String>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            direction: Direction::Debit,
            ..Self::credit(account_id, amount, reason, reference, memo)
        }
    }

    pub fn delta(&self) -> i64 {
        match self.direction {
            Direction::Credit => i64::from(self.amount),
            Direction::Debit => -i64::from(self.amount),
        }
    }
}

/// One line of the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub delta: i64,
    pub reason: LedgerReason,
    pub reference: String,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingReceipt {
    pub entry: LedgerEntry,
    pub balance: u64,
    /// True when the reference had already been applied and nothing changed.
    pub replayed: bool,
}

/// Balance and full log of a single account.
///
/// Invariant: `balance == sum(entries.delta)` and `balance >= 0`. A ledger
/// found violating it is frozen and refuses every further posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLedger {
    pub account_id: AccountId,
    pub balance: u64,
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub frozen: bool,
}

impl AccountLedger {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            balance: 0,
            entries: Vec::new(),
            frozen: false,
        }
    }

    /// Sum of all deltas, saturating at the `i64` bounds.
    pub fn sum(&self) -> i64 {
        self.entries.iter().fold(0i64, |acc, e| acc.saturating_add(e.delta))
    }

    /// Checks the balance against the log.
    pub fn verify(&self) -> Result<()> {
        let sum = self.sum();
        if sum < 0 || sum as u64 != self.balance {
            return Err(WorkflowError::LedgerCorrupted {
                account: self.account_id.to_string(),
                balance: self.balance,
                sum,
            });
        }
        Ok(())
    }

    pub fn find(&self, reference: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.reference == reference)
    }

    /// Applies a posting in place.
    ///
    /// On `LedgerCorrupted` the ledger is left frozen; callers persisting the
    /// ledger must write it back even though the posting failed.
    pub fn apply(&mut self, posting: &LedgerPosting, at: DateTime<Utc>) -> Result<PostingReceipt> {
        if posting.account_id != self.account_id {
            return Err(WorkflowError::internal(format!(
                "posting for {} routed to ledger {}",
                posting.account_id, self.account_id
            )));
        }
        if self.frozen {
            return Err(WorkflowError::LedgerFrozen(self.account_id.to_string()));
        }
        if let Err(e) = self.verify() {
            self.frozen = true;
            return Err(e);
        }

        if let Some(existing) = self.find(&posting.reference) {
            return Ok(PostingReceipt {
                entry: existing.clone(),
                balance: self.balance,
                replayed: true,
            });
        }

        let amount = posting.amount.value();
        let balance = match posting.direction {
            Direction::Credit => self
                .balance
                .checked_add(amount)
                .filter(|b| i64::try_from(*b).is_ok())
                .ok_or(WorkflowError::InvalidAmount(posting.delta()))?,
            Direction::Debit if self.balance >= amount => self.balance - amount,
            Direction::Debit => {
                return Err(WorkflowError::InsufficientBalance {
                    requested: amount,
                    available: self.balance,
                });
            }
        };

        let entry = LedgerEntry {
            id: EntryId::generate(),
            account_id: self.account_id.clone(),
            delta: posting.delta(),
            reason: posting.reason,
            reference: posting.reference.clone(),
            memo: posting.memo.clone(),
            created_at: at,
        };
        self.entries.push(entry.clone());
        self.balance = balance;

        Ok(PostingReceipt {
            entry,
            balance,
            replayed: false,
        })
    }
}
