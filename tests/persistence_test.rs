#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use ecoledger::application::accounts::Registration;
use ecoledger::application::dispatch::OrderRequest;
use ecoledger::application::{Platform, PlatformSettings};
use ecoledger::domain::access::Caller;
use ecoledger::domain::account::Role;
use ecoledger::domain::dispatch::OrderStatus;
use ecoledger::domain::ids::{AccountId, TaskId};
use ecoledger::error::WorkflowError;
use ecoledger::infrastructure::rocksdb::RocksDBStore;
use ecoledger::infrastructure::seed::builtin_catalog;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tempfile::tempdir;

fn open(path: &Path) -> Platform {
    let stores = RocksDBStore::open(path).unwrap().stores(builtin_catalog().unwrap());
    Platform::new(stores, PlatformSettings::dev())
}

#[tokio::test]
async fn test_workflow_state_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("eco_db");

    let (tourist_token, submission_id) = {
        let platform = open(&db_path);
        platform
            .accounts
            .register(Registration {
                email: "dina@example.kz".into(),
                password: "mountain-air".into(),
                name: "Dina".into(),
                role: Role::Tourist,
            })
            .await
            .unwrap();
        platform.accounts.bootstrap_admin("Admin", "admin@example.kz", "admin-pass").await.unwrap();

        let session = platform.accounts.login("dina@example.kz", "mountain-air").await.unwrap();
        let tourist = platform.accounts.authenticate(&session.access_token).await.unwrap();
        let admin_session = platform.accounts.login("admin@example.kz", "admin-pass").await.unwrap();
        let admin = platform.accounts.authenticate(&admin_session.access_token).await.unwrap();

        let submission = platform
            .tasks
            .submit(&tourist, &TaskId::from("task_cleanup"), "river.jpg")
            .await
            .unwrap();
        platform.tasks.approve(&admin, &submission.id).await.unwrap();
        (session.access_token, submission.id)
    };

    let platform = open(&db_path);
    let tourist = platform.accounts.authenticate(&tourist_token).await.unwrap();
    // Signup bonus plus the cleanup reward.
    assert_eq!(platform.ledger.balance(&tourist, &tourist.account_id).await.unwrap(), 200);

    let admin_session = platform.accounts.login("admin@example.kz", "admin-pass").await.unwrap();
    let admin = platform.accounts.authenticate(&admin_session.access_token).await.unwrap();
    assert!(matches!(
        platform.tasks.approve(&admin, &submission_id).await,
        Err(WorkflowError::AlreadyResolved { .. })
    ));
    assert!(matches!(
        platform
            .accounts
            .register(Registration {
                email: "DINA@example.kz".into(),
                password: "another-one".into(),
                name: "Dina 2".into(),
                role: Role::Tourist,
            })
            .await,
        Err(WorkflowError::EmailTaken(_))
    ));
    assert!(platform.ledger.audit(&admin).await.unwrap().is_clean());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_drivers_one_wins_on_disk() {
    let dir = tempdir().unwrap();
    let platform = Arc::new(open(&dir.path().join("eco_db")));
    let drivers = [
        Caller::new(AccountId::from("driver-1"), Role::TaxiDriver),
        Caller::new(AccountId::from("driver-2"), Role::TaxiDriver),
    ];

    for round in 0..10 {
        let rider = Caller::new(AccountId::from(format!("rider-{round}")), Role::Tourist);
        let trip = OrderRequest {
            from_address: "Aktau, 14th microdistrict".into(),
            from_lat: Some(43.6532),
            from_lng: Some(51.1975),
            to_address: "Caspian beach".into(),
            to_lat: Some(43.6280),
            to_lng: Some(51.1580),
        };
        let order = platform.dispatch.order(&rider, &trip).await.unwrap();

        let handles: Vec<_> = drivers
            .iter()
            .cloned()
            .map(|driver| {
                let platform = Arc::clone(&platform);
                let id = order.id.clone();
                tokio::spawn(async move { platform.dispatch.accept(&driver, &id).await })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(accepted) => winners.push(accepted),
                Err(WorkflowError::OrderAlreadyTaken(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = platform
            .dispatch
            .orders(&rider)
            .await
            .unwrap()
            .into_iter()
            .find(|o| o.id == order.id)
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Accepted);
        assert_eq!(stored.driver_account_id, winners[0].driver_account_id);
    }
}

#[test]
fn test_audit_command_on_clean_database() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("eco_db");
    drop(RocksDBStore::open(&db_path).unwrap());

    let mut cmd = Command::new(cargo_bin!("ecoledger"));
    cmd.arg("audit").arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("accounts checked: 0"));
}
