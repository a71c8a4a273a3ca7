use super::account::Account;
use super::booking::Booking;
use super::catalog::{Attraction, ChargingStation, Hotel, Region, RewardTask};
use super::dispatch::TaxiOrder;
use super::ids::{AccountId, AttractionId, HotelId, RegionId, TaskId};
use super::ledger::{AccountLedger, LedgerPosting, PostingReceipt};
use super::lifecycle::{Record, Transition};
use super::review::Review;
use super::task::TaskSubmission;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `EmailTaken` when the email is already registered.
    async fn insert(&self, account: Account) -> Result<()>;
    async fn get(&self, id: &AccountId) -> Result<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn get_all(&self) -> Result<Vec<Account>>;
}

/// The only writer of EcoCoin balances.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Applies one posting atomically. Idempotent per `posting.reference`.
    async fn post(&self, posting: LedgerPosting) -> Result<PostingReceipt>;
    /// Ledger of an account; empty when nothing was ever posted.
    async fn get(&self, account_id: &AccountId) -> Result<AccountLedger>;
    async fn get_all(&self) -> Result<Vec<AccountLedger>>;
    /// Stops all further postings to the account.
    async fn freeze(&self, account_id: &AccountId) -> Result<()>;
}

/// Result of a committed write: the stored record and, if the write carried
/// one, the receipt of its ledger posting.
#[derive(Debug, Clone)]
pub struct Committed<R> {
    pub record: R,
    pub receipt: Option<PostingReceipt>,
}

/// Storage for one family of workflow entities.
///
/// Both writes take an optional ledger posting that commits in the same
/// atomic unit as the row: either both are applied or neither is.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Fails with `R::duplicate` if another live record holds the same claim.
    async fn insert(&self, record: R, effect: Option<LedgerPosting>) -> Result<Committed<R>>;
    async fn get(&self, id: &R::Id) -> Result<Option<R>>;
    async fn get_all(&self) -> Result<Vec<R>>;
    /// Compare-and-set on the record's status. The only path that changes a
    /// stored record.
    async fn transition(
        &self,
        id: &R::Id,
        transition: Transition<R::Status>,
        effect: Option<LedgerPosting>,
    ) -> Result<Committed<R>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn regions(&self) -> Result<Vec<Region>>;
    async fn attractions(&self, region_id: &RegionId) -> Result<Vec<Attraction>>;
    async fn attraction(&self, id: &AttractionId) -> Result<Option<Attraction>>;
    async fn hotels(&self, region_id: &RegionId) -> Result<Vec<Hotel>>;
    async fn hotel(&self, id: &HotelId) -> Result<Option<Hotel>>;
    async fn tasks(&self) -> Result<Vec<RewardTask>>;
    async fn task(&self, id: &TaskId) -> Result<Option<RewardTask>>;
    async fn stations(&self) -> Result<Vec<ChargingStation>>;
}

pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type CatalogStoreRef = Arc<dyn CatalogStore>;
pub type RecordStoreRef<R> = Arc<dyn RecordStore<R>>;

/// Every store the platform needs, sharing one backend so that compound
/// writes (row + ledger posting) can commit atomically.
#[derive(Clone)]
pub struct Stores {
    pub accounts: AccountStoreRef,
    pub ledger: LedgerStoreRef,
    pub catalog: CatalogStoreRef,
    pub submissions: RecordStoreRef<TaskSubmission>,
    pub reviews: RecordStoreRef<Review>,
    pub bookings: RecordStoreRef<Booking>,
    pub orders: RecordStoreRef<TaxiOrder>,
}
