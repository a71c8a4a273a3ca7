use crate::domain::access::{Caller, Capability};
use crate::domain::account::Role;
use crate::domain::ids::AccountId;
use crate::domain::ledger::{Coins, LedgerEntry, LedgerPosting, LedgerReason};
use crate::domain::ports::{AccountStoreRef, LedgerStoreRef};
use crate::error::Result;
use serde::Serialize;
use tracing::{error, info};

pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub account_id: AccountId,
    pub name: String,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditFinding {
    pub account_id: AccountId,
    pub balance: u64,
    pub sum_of_entries: i64,
    /// False when the ledger had already been frozen before this audit.
    pub newly_frozen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    pub accounts_checked: usize,
    /// Ledgers that are frozen, either found corrupted by this audit or
    /// frozen earlier.
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// EcoCoin balances and their history.
///
/// Every balance change in the platform goes through a [`LedgerPosting`];
/// this service is the entry point for the ones that are not tied to a
/// workflow record (signup bonus) and for all ledger reads.
#[derive(Clone)]
pub struct LedgerService {
    ledger: LedgerStoreRef,
    accounts: AccountStoreRef,
}

impl LedgerService {
    pub fn new(ledger: LedgerStoreRef, accounts: AccountStoreRef) -> Self {
        Self { ledger, accounts }
    }

    /// Credits `amount` coins. Returns the balance after the posting.
    pub async fn credit(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: LedgerReason,
        reference: &str,
    ) -> Result<u64> {
        let posting = LedgerPosting::credit(
            account_id.clone(),
            Coins::new(amount)?,
            reason,
            reference,
            memo(reason),
        );
        self.post(posting).await
    }

    /// Debits `amount` coins, failing with `InsufficientBalance` rather than
    /// going negative.
    pub async fn debit(
        &self,
        account_id: &AccountId,
        amount: i64,
        reason: LedgerReason,
        reference: &str,
    ) -> Result<u64> {
        let posting = LedgerPosting::debit(
            account_id.clone(),
            Coins::new(amount)?,
            reason,
            reference,
            memo(reason),
        );
        self.post(posting).await
    }

    async fn post(&self, posting: LedgerPosting) -> Result<u64> {
        let receipt = self.ledger.post(posting).await?;
        if !receipt.replayed {
            info!(
                account = %receipt.entry.account_id,
                delta = receipt.entry.delta,
                reference = %receipt.entry.reference,
                balance = receipt.balance,
                "ledger posting applied"
            );
        }
        Ok(receipt.balance)
    }

    pub async fn balance(&self, caller: &Caller, account_id: &AccountId) -> Result<u64> {
        caller.require(Capability::ReadLedger)?;
        caller.require_owner(account_id)?;
        Ok(self.ledger.get(account_id).await?.balance)
    }

    /// Entries of one account, newest first.
    pub async fn history(&self, caller: &Caller, account_id: &AccountId) -> Result<Vec<LedgerEntry>> {
        caller.require(Capability::ReadLedger)?;
        caller.require_owner(account_id)?;
        let mut entries = self.ledger.get(account_id).await?.entries;
        entries.reverse();
        Ok(entries)
    }

    /// Tourists with the highest balances.
    pub async fn leaderboard(&self, caller: &Caller, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        caller.require(Capability::ReadLedger)?;
        let mut board = Vec::new();
        for account in self.accounts.get_all().await? {
            if account.role != Role::Tourist {
                continue;
            }
            let balance = self.ledger.get(&account.id).await?.balance;
            board.push(LeaderboardEntry {
                account_id: account.id,
                name: account.name,
                balance,
            });
        }
        board.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.name.cmp(&b.name)));
        board.truncate(limit);
        Ok(board)
    }

    pub async fn audit(&self, caller: &Caller) -> Result<AuditReport> {
        caller.require(Capability::AuditLedger)?;
        self.audit_all().await
    }

    /// Verifies every ledger, freezing the ones whose balance disagrees with
    /// their log. Never repairs anything.
    pub async fn audit_all(&self) -> Result<AuditReport> {
        let mut report = AuditReport::default();
        for ledger in self.ledger.get_all().await? {
            report.accounts_checked += 1;
            let corrupted = ledger.verify().is_err();
            let newly_frozen = corrupted && !ledger.frozen;
            if newly_frozen {
                error!(
                    account = %ledger.account_id,
                    balance = ledger.balance,
                    sum = ledger.sum(),
                    "ledger integrity violation found by audit, freezing account"
                );
                self.ledger.freeze(&ledger.account_id).await?;
            }
            if corrupted || ledger.frozen {
                report.findings.push(AuditFinding {
                    account_id: ledger.account_id.clone(),
                    balance: ledger.balance,
                    sum_of_entries: ledger.sum(),
                    newly_frozen,
                });
            }
        }
        report.findings.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(report)
    }
}

fn memo(reason: LedgerReason) -> &'static str {
    match reason {
        LedgerReason::SignupBonus => "signup bonus",
        LedgerReason::TaskReward => "task reward",
        LedgerReason::HotelDiscount => "hotel discount",
        LedgerReason::BookingRefund => "booking refund",
    }
}
