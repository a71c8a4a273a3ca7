use crate::application::ledger::LedgerService;
use crate::domain::access::Caller;
use crate::domain::account::{Account, AccountProfile, Role, normalize_email};
use crate::domain::ledger::LedgerReason;
use crate::domain::ports::AccountStoreRef;
use crate::error::{Result, WorkflowError};
use crate::infrastructure::password::{hash_password, verify_password};
use crate::infrastructure::token::TokenIssuer;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_SIGNUP_BONUS: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

/// A successful login: the bearer token and who it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: AccountProfile,
}

#[derive(Clone)]
pub struct AccountService {
    accounts: AccountStoreRef,
    ledger: LedgerService,
    tokens: TokenIssuer,
    signup_bonus: u64,
}

impl AccountService {
    pub fn new(accounts: AccountStoreRef, ledger: LedgerService, tokens: TokenIssuer, signup_bonus: u64) -> Self {
        Self {
            accounts,
            ledger,
            tokens,
            signup_bonus,
        }
    }

    /// Creates a tourist or driver account and credits the signup bonus.
    ///
    /// Account creation and the bonus are separate commits. Registering
    /// again with the same email, role and password returns the existing
    /// account and re-posts the bonus, which is keyed on the account id and
    /// therefore applied at most once.
    pub async fn register(&self, registration: Registration) -> Result<AccountProfile> {
        if registration.role == Role::Admin {
            warn!(email = %registration.email, "refused self-registration as admin");
            return Err(WorkflowError::Forbidden(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }
        let email = normalize_email(&registration.email)?;
        let account = match self.accounts.find_by_email(&email).await? {
            Some(existing)
                if existing.role == registration.role
                    && verify_password(&registration.password, &existing.credential_hash)? =>
            {
                info!(account = %existing.id, "repeated registration, re-checking signup bonus");
                existing
            }
            Some(existing) => return Err(WorkflowError::EmailTaken(existing.email)),
            None => {
                self.create(&registration.name, &registration.email, registration.role, &registration.password)
                    .await?
            }
        };
        self.credit_signup_bonus(&account).await?;
        Ok(account.profile())
    }

    async fn credit_signup_bonus(&self, account: &Account) -> Result<()> {
        if self.signup_bonus == 0 {
            return Ok(());
        }
        let amount = i64::try_from(self.signup_bonus)
            .map_err(|_| WorkflowError::ValidationError("signup bonus is out of range".to_string()))?;
        self.ledger
            .credit(
                &account.id,
                amount,
                LedgerReason::SignupBonus,
                &format!("signup:{}", account.id),
            )
            .await?;
        Ok(())
    }

    /// Ensures the configured administrator exists. Returns the existing
    /// account untouched when the email is already registered.
    pub async fn bootstrap_admin(&self, name: &str, email: &str, password: &str) -> Result<AccountProfile> {
        if let Some(existing) = self.accounts.find_by_email(&normalize_email(email)?).await? {
            if existing.role != Role::Admin {
                return Err(WorkflowError::EmailTaken(existing.email));
            }
            return Ok(existing.profile());
        }
        let account = self.create(name, email, Role::Admin, password).await?;
        info!(account = %account.id, "bootstrap admin created");
        Ok(account.profile())
    }

    async fn create(&self, name: &str, email: &str, role: Role, password: &str) -> Result<Account> {
        let account = Account::new(name, email, role, hash_password(password)?)?;
        self.accounts.insert(account.clone()).await?;
        info!(account = %account.id, role = %account.role, "account registered");
        Ok(account)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let invalid = || WorkflowError::Unauthorized("invalid credentials".to_string());
        let email = normalize_email(email).map_err(|_| invalid())?;
        let account = self.accounts.find_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &account.credential_hash)? {
            warn!(account = %account.id, "failed login");
            return Err(invalid());
        }
        Ok(Session {
            access_token: self.tokens.issue(&account)?,
            token_type: "bearer",
            user: account.profile(),
        })
    }

    /// Resolves a bearer token to a caller whose account still exists.
    pub async fn authenticate(&self, token: &str) -> Result<Caller> {
        let caller = self.tokens.verify(token)?;
        match self.accounts.get(&caller.account_id).await? {
            Some(account) if account.role == caller.role => Ok(caller),
            _ => Err(WorkflowError::Unauthorized("unknown account".to_string())),
        }
    }

    pub async fn me(&self, caller: &Caller) -> Result<AccountProfile> {
        self.accounts
            .get(&caller.account_id)
            .await?
            .map(|account| account.profile())
            .ok_or_else(|| WorkflowError::not_found("account", &caller.account_id))
    }
}
