mod common;

use chrono::NaiveDate;
use common::{admin, caller, platform, platform_with};
use ecoledger::application::booking::{BookingEngine, BookingRequest};
use ecoledger::domain::account::Role;
use ecoledger::domain::booking::BookingStatus;
use ecoledger::domain::ids::{HotelId, TaskId};
use ecoledger::domain::ledger::{Coins, LedgerPosting, LedgerReason};
use ecoledger::domain::ports::LedgerStore;
use ecoledger::domain::task::SubmissionStatus;
use ecoledger::error::WorkflowError;
use ecoledger::infrastructure::in_memory::{InMemoryLedgerStore, in_memory_stores};
use ecoledger::infrastructure::seed::builtin_catalog;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn one_night(hotel: &str, discount: u64) -> BookingRequest {
    BookingRequest {
        hotel_id: HotelId::from(hotel),
        check_in: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2026, 8, 11).unwrap(),
        guests: 1,
        coin_discount: discount,
    }
}

#[tokio::test]
async fn test_task_reward_credited_exactly_once() {
    let platform = platform();
    let tourist = caller(&platform, "Dana", Role::Tourist).await;
    let admin = admin(&platform).await;

    let submission = platform
        .tasks
        .submit(&tourist, &TaskId::from("task_recycle"), "uploads/bottles.jpg")
        .await
        .unwrap();
    let approved = platform.tasks.approve(&admin, &submission.id).await.unwrap();
    assert_eq!(approved.status, SubmissionStatus::Approved);

    assert!(matches!(
        platform.tasks.approve(&admin, &submission.id).await,
        Err(WorkflowError::AlreadyResolved { .. })
    ));
    assert_eq!(platform.ledger.balance(&tourist, &tourist.account_id).await.unwrap(), 50);

    let history = platform.ledger.history(&tourist, &tourist.account_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, LedgerReason::TaskReward);
    assert_eq!(history[0].reference, submission.id.as_str());
}

#[tokio::test]
async fn test_booking_discount_limited_by_balance() {
    let mut catalog = builtin_catalog().unwrap();
    let partner = catalog.hotels.iter_mut().find(|h| h.is_partner).unwrap();
    partner.price_per_night = dec!(10000);
    let hotel_id = partner.id.clone();

    let platform = platform_with(catalog, 80);
    let tourist = caller(&platform, "Timur", Role::Tourist).await;
    assert_eq!(platform.ledger.balance(&tourist, &tourist.account_id).await.unwrap(), 80);

    let booking = platform
        .bookings
        .book(&tourist, one_night(hotel_id.as_str(), 100))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.coin_discount_applied, 80);
    assert_eq!(booking.total_price, dec!(10000));
    assert_eq!(booking.amount_due, dec!(9920));
    assert_eq!(platform.ledger.balance(&tourist, &tourist.account_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_discount_debit_leaves_no_booking() {
    let stores = in_memory_stores(builtin_catalog().unwrap());
    // Balance as seen when the discount is computed, ahead of the real ledger.
    let stale = Arc::new(InMemoryLedgerStore::new());
    let tourist = ecoledger::domain::access::Caller::new("tourist".into(), Role::Tourist);
    stale
        .post(LedgerPosting::credit(
            tourist.account_id.clone(),
            Coins::new(80).unwrap(),
            LedgerReason::TaskReward,
            "seed",
            "seed",
        ))
        .await
        .unwrap();
    let engine = BookingEngine::new(stores.catalog.clone(), stale, stores.bookings.clone());

    assert!(matches!(
        engine.book(&tourist, one_night("hotel_1", 80)).await,
        Err(WorkflowError::PaymentFailed(_))
    ));
    assert!(stores.bookings.get_all().await.unwrap().is_empty());
    let ledger = stores.ledger.get(&tourist.account_id).await.unwrap();
    assert_eq!(ledger.balance, 0);
    assert!(ledger.entries.is_empty());
}

#[tokio::test]
async fn test_cancelled_booking_refunds_and_frees_the_stay() {
    let platform = platform_with(builtin_catalog().unwrap(), 100);
    let tourist = caller(&platform, "Aigerim", Role::Tourist).await;

    let booking = platform.bookings.book(&tourist, one_night("hotel_2", 70)).await.unwrap();
    assert_eq!(platform.ledger.balance(&tourist, &tourist.account_id).await.unwrap(), 30);

    platform.bookings.cancel(&tourist, &booking.id).await.unwrap();
    assert_eq!(platform.ledger.balance(&tourist, &tourist.account_id).await.unwrap(), 100);

    let again = platform.bookings.book(&tourist, one_night("hotel_2", 0)).await.unwrap();
    assert_eq!(again.coin_discount_applied, 0);
    let history = platform.ledger.history(&tourist, &tourist.account_id).await.unwrap();
    let reasons: Vec<_> = history.iter().map(|e| e.reason).collect();
    assert_eq!(
        reasons,
        vec![LedgerReason::BookingRefund, LedgerReason::HotelDiscount, LedgerReason::SignupBonus]
    );
}

#[tokio::test]
async fn test_ledger_sum_matches_balance_after_mixed_activity() {
    let platform = platform_with(builtin_catalog().unwrap(), 100);
    let tourist = caller(&platform, "Nurlan", Role::Tourist).await;
    let admin = admin(&platform).await;

    for task in ["task_cleanup", "task_visit", "task_bin"] {
        let s = platform.tasks.submit(&tourist, &TaskId::from(task), "proof.jpg").await.unwrap();
        platform.tasks.approve(&admin, &s.id).await.unwrap();
    }
    platform.bookings.book(&tourist, one_night("hotel_1", 100)).await.unwrap();

    let history = platform.ledger.history(&tourist, &tourist.account_id).await.unwrap();
    let sum: i64 = history.iter().map(|e| e.delta).sum();
    let balance = platform.ledger.balance(&tourist, &tourist.account_id).await.unwrap();
    assert_eq!(balance, 100 + 100 + 30 + 40 - 100);
    assert_eq!(sum, balance as i64);
    assert!(platform.ledger.audit(&admin).await.unwrap().is_clean());
}

#[tokio::test]
async fn test_other_accounts_cannot_read_a_balance() {
    let platform = platform();
    let tourist = caller(&platform, "Aliya", Role::Tourist).await;
    let other = caller(&platform, "Berik", Role::Tourist).await;
    let admin = admin(&platform).await;

    assert!(matches!(
        platform.ledger.balance(&other, &tourist.account_id).await,
        Err(WorkflowError::Forbidden(_))
    ));
    assert_eq!(platform.ledger.balance(&admin, &tourist.account_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stats_follow_the_workflows() {
    let platform = platform();
    let tourist = caller(&platform, "Marat", Role::Tourist).await;
    let driver = caller(&platform, "Yerlan", Role::TaxiDriver).await;
    let admin = admin(&platform).await;

    let s = platform.tasks.submit(&tourist, &TaskId::from("task_bin"), "bin.jpg").await.unwrap();
    platform.tasks.approve(&admin, &s.id).await.unwrap();
    platform
        .reviews
        .submit(&tourist, &"zhumbaktas".into(), 5, "Beautiful")
        .await
        .unwrap();

    let stats = platform.stats.snapshot(&admin).await.unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.total_tasks_completed, 1);
    assert_eq!(stats.pending_reviews, 1);
    assert_eq!(stats.total_orders, 0);
    assert!(matches!(
        platform.stats.snapshot(&driver).await,
        Err(WorkflowError::Forbidden(_))
    ));
}
