use crate::domain::account::Account;
use crate::domain::booking::Booking;
use crate::domain::catalog::Catalog;
use crate::domain::dispatch::TaxiOrder;
use crate::domain::ids::AccountId;
use crate::domain::ledger::{AccountLedger, LedgerPosting, PostingReceipt};
use crate::domain::lifecycle::{Record, Transition};
use crate::domain::ports::{AccountStore, Committed, LedgerStore, RecordStore, Stores};
use crate::domain::review::Review;
use crate::domain::task::TaskSubmission;
use crate::error::{Result, WorkflowError};
use crate::infrastructure::in_memory::InMemoryCatalogStore;
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, Transaction, TransactionDB,
    TransactionDBOptions,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::error;

/// Column Family for account profiles.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for per-account ledgers (balance + log).
pub const CF_LEDGER: &str = "ledger";
/// Column Family for uniqueness claims (emails, live workflow records).
pub const CF_CLAIMS: &str = "claims";

/// Workflow record families; each one lives in the column family named
/// after `Record::ENTITY`.
const RECORD_FAMILIES: [&str; 4] = [
    TaskSubmission::ENTITY,
    Review::ENTITY,
    Booking::ENTITY,
    TaxiOrder::ENTITY,
];

/// A persistent store implementation using a RocksDB `TransactionDB`.
///
/// Every write runs in one pessimistic transaction: rows are read with
/// `get_for_update`, which takes the row lock, so a status transition is a
/// compare-and-set and a row change plus its ledger posting commit together.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_ACCOUNTS, CF_LEDGER, CF_CLAIMS]
            .into_iter()
            .chain(RECORD_FAMILIES)
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = TransactionDB::open_cf_descriptors(&opts, &TransactionDBOptions::default(), path, families)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Wires this database into a full set of stores. Reference data stays
    /// in memory; it is reloaded from the catalog on every start.
    pub fn stores(self, catalog: Catalog) -> Stores {
        let store = Arc::new(self);
        Stores {
            accounts: store.clone(),
            ledger: store.clone(),
            catalog: Arc::new(InMemoryCatalogStore::new(catalog)),
            submissions: store.clone(),
            reviews: store.clone(),
            bookings: store.clone(),
            orders: store,
        }
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| WorkflowError::internal(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, family: &str, key: &str) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(family)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_all<T: DeserializeOwned>(&self, family: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(family)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    /// Applies a posting inside an open transaction, locking the account's
    /// ledger row. On corruption the frozen ledger is written into the
    /// transaction so that [`settle`] persists the freeze.
    fn post_in(&self, txn: &Transaction<'_, TransactionDB>, posting: &LedgerPosting) -> Result<PostingReceipt> {
        let cf = self.cf(CF_LEDGER)?;
        let key = posting.account_id.as_str();
        let mut ledger = match txn.get_for_update_cf(cf, key, true)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => AccountLedger::new(posting.account_id.clone()),
        };
        let result = ledger.apply(posting, Utc::now());
        match &result {
            Ok(receipt) if !receipt.replayed => txn.put_cf(cf, key, serde_json::to_vec(&ledger)?)?,
            Err(e @ WorkflowError::LedgerCorrupted { .. }) => {
                error!(account = %posting.account_id, "ledger integrity violation, account frozen: {e}");
                txn.put_cf(cf, key, serde_json::to_vec(&ledger)?)?;
            }
            _ => {}
        }
        result
    }

    fn insert_account(&self, account: &Account) -> Result<()> {
        let claims = self.cf(CF_CLAIMS)?;
        let txn = self.db.transaction();
        let claim = format!("email:{}", account.email);
        if txn.get_for_update_cf(claims, &claim, true)?.is_some() {
            return Err(WorkflowError::EmailTaken(account.email.clone()));
        }
        txn.put_cf(self.cf(CF_ACCOUNTS)?, account.id.as_str(), serde_json::to_vec(account)?)?;
        txn.put_cf(claims, &claim, account.id.as_str())?;
        txn.commit()?;
        Ok(())
    }

    fn insert_record<R: Record>(&self, record: &R, effect: Option<&LedgerPosting>) -> Result<Option<PostingReceipt>> {
        let records = self.cf(R::ENTITY)?;
        let claims = self.cf(CF_CLAIMS)?;
        let txn = self.db.transaction();
        let result = (|| -> Result<Option<PostingReceipt>> {
            let key = record.id().to_string();
            if txn.get_for_update_cf(records, &key, true)?.is_some() {
                return Err(WorkflowError::internal(format!("{} {key} already stored", R::ENTITY)));
            }

            let claim = record.claim();
            let claim_key = claim.as_ref().map(|c| format!("{}:{c}", R::ENTITY));
            if let Some(claim_key) = &claim_key
                && let Some(holder_id) = txn.get_for_update_cf(claims, claim_key, true)?
                && let Some(bytes) = txn.get_for_update_cf(records, &holder_id, true)?
            {
                let holder: R = serde_json::from_slice(&bytes)?;
                if holder.claim() == claim {
                    return Err(record.duplicate());
                }
            }

            let receipt = effect.map(|posting| self.post_in(&txn, posting)).transpose()?;

            txn.put_cf(records, &key, serde_json::to_vec(record)?)?;
            if let Some(claim_key) = claim_key {
                txn.put_cf(claims, claim_key, &key)?;
            }
            Ok(receipt)
        })();
        settle(txn, result)
    }

    fn transition_record<R: Record>(
        &self,
        id: &R::Id,
        transition: &Transition<R::Status>,
        effect: Option<&LedgerPosting>,
    ) -> Result<(R, Option<PostingReceipt>)> {
        let records = self.cf(R::ENTITY)?;
        let txn = self.db.transaction();
        let result = (|| -> Result<(R, Option<PostingReceipt>)> {
            let key = id.to_string();
            let mut record: R = match txn.get_for_update_cf(records, &key, true)? {
                Some(bytes) => serde_json::from_slice(&bytes)?,
                None => return Err(WorkflowError::not_found(R::ENTITY, id)),
            };
            transition.apply(&mut record)?;
            let receipt = effect.map(|posting| self.post_in(&txn, posting)).transpose()?;
            txn.put_cf(records, &key, serde_json::to_vec(&record)?)?;
            Ok((record, receipt))
        })();
        settle(txn, result)
    }

    fn freeze_ledger(&self, account_id: &AccountId) -> Result<()> {
        let cf = self.cf(CF_LEDGER)?;
        let txn = self.db.transaction();
        let mut ledger = match txn.get_for_update_cf(cf, account_id.as_str(), true)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => AccountLedger::new(account_id.clone()),
        };
        ledger.frozen = true;
        txn.put_cf(cf, account_id.as_str(), serde_json::to_vec(&ledger)?)?;
        txn.commit()?;
        Ok(())
    }
}

/// Commits on success. A corrupted ledger is also committed, which persists
/// only the freeze: ledger postings run before any row is written.
/// Every other failure drops the transaction, rolling it back.
fn settle<T>(txn: Transaction<'_, TransactionDB>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            txn.commit()?;
            Ok(value)
        }
        Err(e @ WorkflowError::LedgerCorrupted { .. }) => {
            txn.commit()?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn insert(&self, account: Account) -> Result<()> {
        self.insert_account(&account)
    }

    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        self.read(CF_ACCOUNTS, id.as_str())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let claim = format!("email:{email}");
        match self.db.get_cf(self.cf(CF_CLAIMS)?, claim)? {
            Some(id) => self.read(CF_ACCOUNTS, &String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        self.read_all(CF_ACCOUNTS)
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn post(&self, posting: LedgerPosting) -> Result<PostingReceipt> {
        let txn = self.db.transaction();
        let result = self.post_in(&txn, &posting);
        settle(txn, result)
    }

    async fn get(&self, account_id: &AccountId) -> Result<AccountLedger> {
        Ok(self
            .read(CF_LEDGER, account_id.as_str())?
            .unwrap_or_else(|| AccountLedger::new(account_id.clone())))
    }

    async fn get_all(&self) -> Result<Vec<AccountLedger>> {
        self.read_all(CF_LEDGER)
    }

    async fn freeze(&self, account_id: &AccountId) -> Result<()> {
        self.freeze_ledger(account_id)
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for RocksDBStore {
    async fn insert(&self, record: R, effect: Option<LedgerPosting>) -> Result<Committed<R>> {
        let receipt = self.insert_record(&record, effect.as_ref())?;
        Ok(Committed { record, receipt })
    }

    async fn get(&self, id: &R::Id) -> Result<Option<R>> {
        self.read(R::ENTITY, &id.to_string())
    }

    async fn get_all(&self) -> Result<Vec<R>> {
        self.read_all(R::ENTITY)
    }

    async fn transition(
        &self,
        id: &R::Id,
        transition: Transition<R::Status>,
        effect: Option<LedgerPosting>,
    ) -> Result<Committed<R>> {
        let (record, receipt) = self.transition_record::<R>(id, &transition, effect.as_ref())?;
        Ok(Committed { record, receipt })
    }
}
