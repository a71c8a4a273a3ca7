use crate::domain::access::{Caller, Capability};
use crate::domain::booking::{Booking, BookingStatus, Stay, coin_discount};
use crate::domain::ids::{BookingId, HotelId};
use crate::domain::ledger::{Coins, LedgerPosting, LedgerReason};
use crate::domain::lifecycle::{Record, Transition};
use crate::domain::ports::{CatalogStoreRef, LedgerStoreRef, RecordStoreRef};
use crate::error::{Result, WorkflowError};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub hotel_id: HotelId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i64,
    #[serde(default)]
    pub coin_discount: u64,
}

/// Hotel reservations paid partly with EcoCoins.
///
/// The discount debit is committed together with the booking row; when the
/// debit cannot be applied the booking is not created.
#[derive(Clone)]
pub struct BookingEngine {
    catalog: CatalogStoreRef,
    ledger: LedgerStoreRef,
    bookings: RecordStoreRef<Booking>,
}

impl BookingEngine {
    pub fn new(catalog: CatalogStoreRef, ledger: LedgerStoreRef, bookings: RecordStoreRef<Booking>) -> Self {
        Self {
            catalog,
            ledger,
            bookings,
        }
    }

    pub async fn book(&self, caller: &Caller, request: BookingRequest) -> Result<Booking> {
        caller.require(Capability::BookHotel)?;
        let stay = Stay::new(request.check_in, request.check_out)?;
        let guests = u32::try_from(request.guests)
            .ok()
            .filter(|g| *g >= 1)
            .ok_or(WorkflowError::InvalidGuestCount(request.guests))?;
        let hotel = self
            .catalog
            .hotel(&request.hotel_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("hotel", &request.hotel_id))?;

        // The balance read here only caps the discount; the debit itself is
        // checked again atomically when the booking commits.
        let balance = self.ledger.get(&caller.account_id).await?.balance;
        let discount = coin_discount(&hotel, request.coin_discount, balance);
        let booking = Booking::new(&hotel, caller.account_id.clone(), stay, guests, discount);

        let debit = match i64::try_from(discount) {
            Ok(amount) if amount > 0 => Some(LedgerPosting::debit(
                caller.account_id.clone(),
                Coins::new(amount)?,
                LedgerReason::HotelDiscount,
                booking.debit_reference(),
                format!("discount at {}", hotel.name),
            )),
            _ => None,
        };

        let committed = self.bookings.insert(booking, debit).await.map_err(|e| match e {
            WorkflowError::InsufficientBalance { requested, available } => {
                warn!(account = %caller.account_id, requested, available, "booking discount debit failed");
                WorkflowError::PaymentFailed(format!(
                    "EcoCoin balance changed during booking: {requested} requested, {available} available"
                ))
            }
            other => other,
        })?;
        let booking = committed.record;
        info!(
            booking = %booking.id,
            hotel = %booking.hotel_id,
            account = %booking.account_id,
            discount = booking.coin_discount_applied,
            "booking confirmed"
        );
        Ok(booking)
    }

    /// Cancels a confirmed booking, refunding its coin discount in the same
    /// commit.
    pub async fn cancel(&self, caller: &Caller, id: &BookingId) -> Result<Booking> {
        let booking = self
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(Booking::ENTITY, id))?;
        caller.require_owner(&booking.account_id)?;

        let refund = match i64::try_from(booking.coin_discount_applied) {
            Ok(amount) if amount > 0 => Some(LedgerPosting::credit(
                booking.account_id.clone(),
                Coins::new(amount)?,
                LedgerReason::BookingRefund,
                booking.refund_reference(),
                format!("refund for booking at {}", booking.hotel_name),
            )),
            _ => None,
        };
        let transition = Transition::new(
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            caller.account_id.clone(),
        );
        let committed = self.bookings.transition(id, transition, refund).await?;
        info!(booking = %id, refunded = booking.coin_discount_applied, "booking cancelled");
        Ok(committed.record)
    }

    /// The caller's bookings, newest first; admins see all.
    pub async fn bookings(&self, caller: &Caller) -> Result<Vec<Booking>> {
        let mut visible: Vec<_> = self
            .bookings
            .get_all()
            .await?
            .into_iter()
            .filter(|b| caller.is_admin() || b.account_id == caller.account_id)
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Role;
    use crate::domain::ids::AccountId;
    use crate::domain::ports::Stores;
    use crate::infrastructure::in_memory::in_memory_stores;
    use crate::infrastructure::seed::builtin_catalog;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn request(hotel: &str, discount: u64) -> BookingRequest {
        BookingRequest {
            hotel_id: HotelId::from(hotel),
            check_in: date("2026-07-01"),
            check_out: date("2026-07-03"),
            guests: 2,
            coin_discount: discount,
        }
    }

    async fn setup(balance: i64) -> (BookingEngine, Stores, Caller) {
        let stores = in_memory_stores(builtin_catalog().unwrap());
        let tourist = Caller::new(AccountId::from("tourist"), Role::Tourist);
        if balance > 0 {
            stores
                .ledger
                .post(LedgerPosting::credit(
                    tourist.account_id.clone(),
                    Coins::new(balance).unwrap(),
                    LedgerReason::TaskReward,
                    "seed",
                    "seed",
                ))
                .await
                .unwrap();
        }
        let engine = BookingEngine::new(stores.catalog.clone(), stores.ledger.clone(), stores.bookings.clone());
        (engine, stores, tourist)
    }

    #[tokio::test]
    async fn test_discount_capped_by_balance() {
        let (engine, stores, tourist) = setup(80).await;
        let booking = engine.book(&tourist, request("hotel_1", 100)).await.unwrap();

        assert_eq!(booking.coin_discount_applied, 80);
        assert_eq!(booking.total_price, dec!(30000));
        assert_eq!(booking.amount_due, dec!(29920));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(stores.ledger.get(&tourist.account_id).await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_discount_capped_at_hundred() {
        let (engine, stores, tourist) = setup(500).await;
        let booking = engine.book(&tourist, request("hotel_2", 400)).await.unwrap();
        assert_eq!(booking.coin_discount_applied, 100);
        assert_eq!(stores.ledger.get(&tourist.account_id).await.unwrap().balance, 400);
    }

    #[tokio::test]
    async fn test_non_partner_ignores_discount() {
        let (engine, stores, tourist) = setup(80).await;
        let booking = engine.book(&tourist, request("hotel_3", 50)).await.unwrap();
        assert_eq!(booking.coin_discount_applied, 0);
        assert_eq!(stores.ledger.get(&tourist.account_id).await.unwrap().balance, 80);
    }

    #[tokio::test]
    async fn test_validation() {
        let (engine, _, tourist) = setup(0).await;
        let mut backwards = request("hotel_1", 0);
        backwards.check_out = date("2026-06-30");
        assert!(matches!(
            engine.book(&tourist, backwards).await,
            Err(WorkflowError::InvalidDateRange)
        ));

        let mut nobody = request("hotel_1", 0);
        nobody.guests = 0;
        assert!(matches!(
            engine.book(&tourist, nobody).await,
            Err(WorkflowError::InvalidGuestCount(0))
        ));

        assert!(matches!(
            engine.book(&tourist, request("hotel_404", 0)).await,
            Err(WorkflowError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_refunds_discount_once() {
        let (engine, stores, tourist) = setup(60).await;
        let booking = engine.book(&tourist, request("hotel_1", 60)).await.unwrap();
        assert_eq!(stores.ledger.get(&tourist.account_id).await.unwrap().balance, 0);

        let cancelled = engine.cancel(&tourist, &booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(matches!(
            engine.cancel(&tourist, &booking.id).await,
            Err(WorkflowError::AlreadyResolved { .. })
        ));
        assert_eq!(stores.ledger.get(&tourist.account_id).await.unwrap().balance, 60);
    }

    #[tokio::test]
    async fn test_duplicate_stay_rejected_until_cancelled() {
        let (engine, _, tourist) = setup(0).await;
        let first = engine.book(&tourist, request("hotel_3", 0)).await.unwrap();
        assert!(matches!(
            engine.book(&tourist, request("hotel_3", 0)).await,
            Err(WorkflowError::Duplicate { .. })
        ));
        engine.cancel(&tourist, &first.id).await.unwrap();
        assert!(engine.book(&tourist, request("hotel_3", 0)).await.is_ok());
        assert_eq!(engine.bookings(&tourist).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_by_stranger_forbidden() {
        let (engine, _, tourist) = setup(0).await;
        let booking = engine.book(&tourist, request("hotel_3", 0)).await.unwrap();
        let stranger = Caller::new(AccountId::from("stranger"), Role::Tourist);
        assert!(matches!(
            engine.cancel(&stranger, &booking.id).await,
            Err(WorkflowError::Forbidden(_))
        ));
    }
}
