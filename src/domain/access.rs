//! Role-based capability checks.
//!
//! Authorization is a predicate over the caller's role (and, where the engine
//! asks for it, ownership of the entity). There is no role hierarchy.

use super::account::Role;
use super::ids::AccountId;
use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadCatalog,
    ReadLedger,
    SubmitTaskProof,
    ResolveSubmissions,
    SubmitReview,
    ModerateReviews,
    BookHotel,
    OrderTaxi,
    DriveTaxi,
    ViewStats,
    AuditLedger,
    ReadContactInbox,
}

pub fn permits(role: Role, capability: Capability) -> bool {
    use Capability::*;
    match capability {
        ReadCatalog | ReadLedger => true,
        SubmitTaskProof | SubmitReview | BookHotel | OrderTaxi => role == Role::Tourist,
        DriveTaxi => role == Role::TaxiDriver,
        ResolveSubmissions | ModerateReviews | ViewStats | AuditLedger | ReadContactInbox => {
            role == Role::Admin
        }
    }
}

/// The authenticated account behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub account_id: AccountId,
    pub role: Role,
}

impl Caller {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if permits(self.role, capability) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(format!(
                "{} accounts may not perform {:?}",
                self.role, capability
            )))
        }
    }

    /// Owner-or-admin check for reading another account's data.
    pub fn require_owner(&self, owner: &AccountId) -> Result<()> {
        if &self.account_id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(
                "only the owner may access this resource".to_string(),
            ))
        }
    }
}
