use super::ids::AccountId;
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tourist,
    TaxiDriver,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Tourist => "tourist",
            Role::TaxiDriver => "taxi_driver",
            Role::Admin => "admin",
        })
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tourist" => Ok(Role::Tourist),
            "taxi_driver" => Ok(Role::TaxiDriver),
            "admin" => Ok(Role::Admin),
            other => Err(WorkflowError::ValidationError(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

/// A registered platform user.
///
/// The role is fixed at registration; nothing in the crate offers a way to
/// change it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: &str, email: &str, role: Role, credential_hash: String) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::ValidationError(
                "name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: AccountId::generate(),
            role,
            name: name.to_string(),
            email: normalize_email(email)?,
            credential_hash,
            created_at: Utc::now(),
        })
    }

    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id.clone(),
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public view of an account, without the credential hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Lowercases and trims an email, rejecting obviously malformed input.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(WorkflowError::ValidationError(format!(
            "'{email}' is not a valid email address"
        )))
    }
}
