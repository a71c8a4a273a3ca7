//! Bearer tokens (JWT, HS256) identifying an account and its role.

use crate::domain::access::Caller;
use crate::domain::account::{Account, Role};
use crate::domain::ids::AccountId;
use crate::error::{Result, WorkflowError};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const MIN_SECRET_CHARS: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry: Duration,
}

impl TokenIssuer {
    pub fn new(secret: String, expiry_hours: i64) -> Result<Self> {
        if secret.len() < MIN_SECRET_CHARS {
            return Err(WorkflowError::ValidationError(format!(
                "JWT secret must be at least {MIN_SECRET_CHARS} characters"
            )));
        }
        let expiry = Duration::try_hours(expiry_hours)
            .filter(|expiry| *expiry > Duration::zero())
            .filter(|expiry| Utc::now().checked_add_signed(*expiry).is_some())
            .ok_or_else(|| {
                WorkflowError::ValidationError(format!("token expiry of {expiry_hours} hours is out of range"))
            })?;
        Ok(Self { secret, expiry })
    }

    /// Fixed secret for local development.
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-secret-not-for-production-use-123456".into(),
            expiry: Duration::hours(24),
        }
    }

    pub fn issue(&self, account: &Account) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.expiry)
                .ok_or_else(|| WorkflowError::internal("token expiry overflows the calendar"))?
                .timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| WorkflowError::internal(format!("failed to sign token: {e}")))
    }

    /// Resolves a token to the caller it was issued for.
    pub fn verify(&self, token: &str) -> Result<Caller> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "invalid token signature",
                _ => "invalid token",
            };
            WorkflowError::Unauthorized(reason.to_string())
        })?;
        Ok(Caller::new(AccountId::from(data.claims.sub), data.claims.role))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
