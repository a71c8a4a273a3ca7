#![allow(dead_code)]

use ecoledger::application::accounts::{Registration, Session};
use ecoledger::application::{Platform, PlatformSettings};
use ecoledger::domain::access::Caller;
use ecoledger::domain::account::{Account, Role};
use ecoledger::domain::catalog::Catalog;
use ecoledger::domain::ports::Stores;
use ecoledger::infrastructure::in_memory::in_memory_stores;
use ecoledger::infrastructure::seed::builtin_catalog;

pub const PASSWORD: &str = "correct-horse";
pub const ADMIN_EMAIL: &str = "admin@ecosayahat.kz";

pub fn platform() -> Platform {
    platform_with(builtin_catalog().unwrap(), 0)
}

/// In-memory platform with the dev token issuer.
pub fn platform_with(catalog: Catalog, signup_bonus: u64) -> Platform {
    platform_and_stores(catalog, signup_bonus).0
}

pub fn platform_and_stores(catalog: Catalog, signup_bonus: u64) -> (Platform, Stores) {
    let settings = PlatformSettings {
        signup_bonus,
        ..PlatformSettings::dev()
    };
    let stores = in_memory_stores(catalog);
    (Platform::new(stores.clone(), settings), stores)
}

/// Stores an account directly, skipping password hashing and the signup
/// bonus. For tests that need many accounts.
pub async fn member(stores: &Stores, name: &str, role: Role) -> Caller {
    let email = format!("{}@example.kz", name.to_lowercase());
    let account = Account::new(name, &email, role, "unused-hash".to_string()).unwrap();
    let caller = Caller::new(account.id.clone(), role);
    stores.accounts.insert(account).await.unwrap();
    caller
}

pub async fn session(platform: &Platform, name: &str, role: Role) -> Session {
    let email = format!("{}@example.kz", name.to_lowercase());
    platform
        .accounts
        .register(Registration {
            email: email.clone(),
            password: PASSWORD.to_string(),
            name: name.to_string(),
            role,
        })
        .await
        .unwrap();
    platform.accounts.login(&email, PASSWORD).await.unwrap()
}

pub async fn caller(platform: &Platform, name: &str, role: Role) -> Caller {
    let session = session(platform, name, role).await;
    platform.accounts.authenticate(&session.access_token).await.unwrap()
}

pub async fn admin_session(platform: &Platform) -> Session {
    platform
        .accounts
        .bootstrap_admin("Admin", ADMIN_EMAIL, PASSWORD)
        .await
        .unwrap();
    platform.accounts.login(ADMIN_EMAIL, PASSWORD).await.unwrap()
}

pub async fn admin(platform: &Platform) -> Caller {
    let session = admin_session(platform).await;
    platform.accounts.authenticate(&session.access_token).await.unwrap()
}
