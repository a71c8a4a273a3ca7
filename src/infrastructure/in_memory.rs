use crate::domain::account::Account;
use crate::domain::catalog::{Attraction, Catalog, ChargingStation, Hotel, Region, RewardTask};
use crate::domain::ids::{AccountId, AttractionId, HotelId, RegionId, TaskId};
use crate::domain::ledger::{AccountLedger, LedgerPosting, PostingReceipt};
use crate::domain::lifecycle::{Record, Transition};
use crate::domain::ports::{AccountStore, CatalogStore, Committed, LedgerStore, RecordStore, Stores};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::error;

/// Builds a full set of in-memory stores sharing one ledger.
pub fn in_memory_stores(catalog: Catalog) -> Stores {
    let ledger = Arc::new(InMemoryLedgerStore::new());
    Stores {
        accounts: Arc::new(InMemoryAccountStore::new()),
        ledger: ledger.clone(),
        catalog: Arc::new(InMemoryCatalogStore::new(catalog)),
        submissions: Arc::new(InMemoryRecordStore::new(ledger.clone())),
        reviews: Arc::new(InMemoryRecordStore::new(ledger.clone())),
        bookings: Arc::new(InMemoryRecordStore::new(ledger.clone())),
        orders: Arc::new(InMemoryRecordStore::new(ledger)),
    }
}

#[derive(Default)]
struct AccountTable {
    by_id: HashMap<AccountId, Account>,
    by_email: HashMap<String, AccountId>,
}

/// A thread-safe in-memory store for accounts.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<AccountTable>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<()> {
        let mut table = self.accounts.write().await;
        if table.by_email.contains_key(&account.email) {
            return Err(WorkflowError::EmailTaken(account.email));
        }
        table.by_email.insert(account.email.clone(), account.id.clone());
        table.by_id.insert(account.id.clone(), account);
        Ok(())
    }

    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.by_id.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let table = self.accounts.read().await;
        Ok(table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().await.by_id.values().cloned().collect())
    }
}

/// In-memory ledger with one lock per account.
///
/// Postings to different accounts never contend; postings to the same
/// account are serialized by that account's mutex.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    ledgers: RwLock<HashMap<AccountId, Arc<Mutex<AccountLedger>>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, account_id: &AccountId) -> Arc<Mutex<AccountLedger>> {
        if let Some(slot) = self.ledgers.read().await.get(account_id) {
            return slot.clone();
        }
        self.ledgers
            .write()
            .await
            .entry(account_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(AccountLedger::new(account_id.clone()))))
            .clone()
    }

    /// Applies a posting under the account lock. Record stores call this
    /// while holding their own row lock, so the order is always row, then
    /// ledger.
    async fn apply(&self, posting: &LedgerPosting, at: DateTime<Utc>) -> Result<PostingReceipt> {
        let slot = self.slot(&posting.account_id).await;
        let mut ledger = slot.lock().await;
        let result = ledger.apply(posting, at);
        if let Err(e @ WorkflowError::LedgerCorrupted { .. }) = &result {
            error!(account = %posting.account_id, "ledger integrity violation, account frozen: {e}");
        }
        result
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn post(&self, posting: LedgerPosting) -> Result<PostingReceipt> {
        self.apply(&posting, Utc::now()).await
    }

    async fn get(&self, account_id: &AccountId) -> Result<AccountLedger> {
        let slot = self.ledgers.read().await.get(account_id).cloned();
        match slot {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(AccountLedger::new(account_id.clone())),
        }
    }

    async fn get_all(&self) -> Result<Vec<AccountLedger>> {
        let slots: Vec<_> = self.ledgers.read().await.values().cloned().collect();
        let mut ledgers = Vec::with_capacity(slots.len());
        for slot in slots {
            ledgers.push(slot.lock().await.clone());
        }
        Ok(ledgers)
    }

    async fn freeze(&self, account_id: &AccountId) -> Result<()> {
        let slot = self.slot(account_id).await;
        slot.lock().await.frozen = true;
        Ok(())
    }
}

struct Rows<R: Record> {
    by_id: HashMap<R::Id, Arc<Mutex<R>>>,
    /// Claim key → id of the record that last took it. The holder may have
    /// released it since; the holder's current `claim()` is authoritative.
    claims: HashMap<String, R::Id>,
}

impl<R: Record> Default for Rows<R> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            claims: HashMap::new(),
        }
    }
}

/// In-memory store for one workflow entity family.
///
/// Each row sits behind its own mutex; a status transition holds only that
/// row's lock (plus the affected ledger account's lock while a posting is
/// applied). Inserts take the table write lock so that claim checks and the
/// insert itself are one step.
pub struct InMemoryRecordStore<R: Record> {
    rows: RwLock<Rows<R>>,
    ledger: Arc<InMemoryLedgerStore>,
}

impl<R: Record> InMemoryRecordStore<R> {
    pub fn new(ledger: Arc<InMemoryLedgerStore>) -> Self {
        Self {
            rows: RwLock::new(Rows::default()),
            ledger,
        }
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for InMemoryRecordStore<R> {
    async fn insert(&self, record: R, effect: Option<LedgerPosting>) -> Result<Committed<R>> {
        let mut rows = self.rows.write().await;
        if rows.by_id.contains_key(record.id()) {
            return Err(WorkflowError::internal(format!(
                "{} {} already stored",
                R::ENTITY,
                record.id()
            )));
        }

        let claim = record.claim();
        if let Some(key) = &claim
            && let Some(holder_id) = rows.claims.get(key)
            && let Some(holder) = rows.by_id.get(holder_id)
            && holder.lock().await.claim().as_ref() == Some(key)
        {
            return Err(record.duplicate());
        }

        let receipt = match &effect {
            Some(posting) => Some(self.ledger.apply(posting, Utc::now()).await?),
            None => None,
        };

        if let Some(key) = claim {
            rows.claims.insert(key, record.id().clone());
        }
        rows.by_id
            .insert(record.id().clone(), Arc::new(Mutex::new(record.clone())));

        Ok(Committed { record, receipt })
    }

    async fn get(&self, id: &R::Id) -> Result<Option<R>> {
        let slot = self.rows.read().await.by_id.get(id).cloned();
        match slot {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<R>> {
        let slots: Vec<_> = self.rows.read().await.by_id.values().cloned().collect();
        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.lock().await.clone());
        }
        Ok(records)
    }

    async fn transition(
        &self,
        id: &R::Id,
        transition: Transition<R::Status>,
        effect: Option<LedgerPosting>,
    ) -> Result<Committed<R>> {
        let slot = self
            .rows
            .read()
            .await
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::not_found(R::ENTITY, id))?;

        let mut row = slot.lock().await;
        let mut next = row.clone();
        transition.apply(&mut next)?;

        let receipt = match &effect {
            Some(posting) => Some(self.ledger.apply(posting, transition.at).await?),
            None => None,
        };

        *row = next.clone();
        Ok(Committed {
            record: next,
            receipt,
        })
    }
}

/// Reference data held in memory for the life of the process.
pub struct InMemoryCatalogStore {
    catalog: Catalog,
}

impl InMemoryCatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn regions(&self) -> Result<Vec<Region>> {
        Ok(self.catalog.regions.clone())
    }

    async fn attractions(&self, region_id: &RegionId) -> Result<Vec<Attraction>> {
        Ok(self
            .catalog
            .attractions
            .iter()
            .filter(|a| &a.region_id == region_id)
            .cloned()
            .collect())
    }

    async fn attraction(&self, id: &AttractionId) -> Result<Option<Attraction>> {
        Ok(self.catalog.attractions.iter().find(|a| &a.id == id).cloned())
    }

    async fn hotels(&self, region_id: &RegionId) -> Result<Vec<Hotel>> {
        Ok(self
            .catalog
            .hotels
            .iter()
            .filter(|h| &h.region_id == region_id)
            .cloned()
            .collect())
    }

    async fn hotel(&self, id: &HotelId) -> Result<Option<Hotel>> {
        Ok(self.catalog.hotels.iter().find(|h| &h.id == id).cloned())
    }

    async fn tasks(&self) -> Result<Vec<RewardTask>> {
        Ok(self.catalog.tasks.clone())
    }

    async fn task(&self, id: &TaskId) -> Result<Option<RewardTask>> {
        Ok(self.catalog.tasks.iter().find(|t| &t.id == id).cloned())
    }

    async fn stations(&self) -> Result<Vec<ChargingStation>> {
        Ok(self.catalog.stations.clone())
    }
}
