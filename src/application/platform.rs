use crate::application::accounts::{AccountService, DEFAULT_SIGNUP_BONUS};
use crate::application::booking::BookingEngine;
use crate::application::catalog::CatalogService;
use crate::application::contact::{ContactDesk, DEFAULT_OPERATOR_EMAIL};
use crate::application::dispatch::DispatchEngine;
use crate::application::ledger::LedgerService;
use crate::application::reviews::ReviewEngine;
use crate::application::stats::StatsAggregator;
use crate::application::tasks::TaskEngine;
use crate::domain::ports::Stores;
use crate::infrastructure::token::TokenIssuer;

/// Runtime settings of the platform that are not storage.
#[derive(Clone)]
pub struct PlatformSettings {
    pub tokens: TokenIssuer,
    pub signup_bonus: u64,
    pub operator_email: String,
}

impl PlatformSettings {
    pub fn dev() -> Self {
        Self {
            tokens: TokenIssuer::new_dev(),
            signup_bonus: DEFAULT_SIGNUP_BONUS,
            operator_email: DEFAULT_OPERATOR_EMAIL.to_string(),
        }
    }
}

/// Every engine of the workflow core wired to one set of stores.
#[derive(Clone)]
pub struct Platform {
    pub accounts: AccountService,
    pub ledger: LedgerService,
    pub catalog: CatalogService,
    pub tasks: TaskEngine,
    pub reviews: ReviewEngine,
    pub bookings: BookingEngine,
    pub dispatch: DispatchEngine,
    pub stats: StatsAggregator,
    pub contact: ContactDesk,
}

impl Platform {
    pub fn new(stores: Stores, settings: PlatformSettings) -> Self {
        let ledger = LedgerService::new(stores.ledger.clone(), stores.accounts.clone());
        let reviews = ReviewEngine::new(stores.catalog.clone(), stores.accounts.clone(), stores.reviews.clone());
        Self {
            accounts: AccountService::new(
                stores.accounts.clone(),
                ledger.clone(),
                settings.tokens,
                settings.signup_bonus,
            ),
            catalog: CatalogService::new(stores.catalog.clone(), reviews.clone()),
            tasks: TaskEngine::new(stores.catalog.clone(), stores.submissions.clone()),
            bookings: BookingEngine::new(stores.catalog.clone(), stores.ledger.clone(), stores.bookings.clone()),
            dispatch: DispatchEngine::new(stores.orders.clone()),
            stats: StatsAggregator::new(stores.accounts, stores.orders, stores.submissions, stores.reviews),
            contact: ContactDesk::new(settings.operator_email),
            ledger,
            reviews,
        }
    }
}
