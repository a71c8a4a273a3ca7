//! The guarded status transition shared by every workflow entity.
//!
//! Submissions, reviews, bookings and taxi orders all move through small
//! state machines. A [`Transition`] names the status the caller expects the
//! record to be in and the status it should move to; stores apply it under
//! the record's row lock, which turns it into a compare-and-set.

use super::ids::AccountId;
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::hash::Hash;

pub trait Lifecycle {
    type Status: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync;

    fn status(&self) -> Self::Status;

    /// Moves the record into `next`. Only called once the guard matched.
    fn enter(&mut self, next: Self::Status, actor: &AccountId, at: DateTime<Utc>);

    /// Error for a transition towards `attempted` that found the record in
    /// some other state.
    fn conflict(&self, attempted: Self::Status) -> WorkflowError;
}

/// A stored workflow entity.
pub trait Record: Lifecycle + Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;

    /// Human name of the entity family, also used as the storage namespace.
    const ENTITY: &'static str;

    fn id(&self) -> &Self::Id;

    /// Uniqueness key held while the record is live. Inserting a record whose
    /// claim is still held by another record fails with [`Record::duplicate`].
    fn claim(&self) -> Option<String>;

    fn duplicate(&self) -> WorkflowError;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    pub expected: S,
    pub next: S,
    pub actor: AccountId,
    pub at: DateTime<Utc>,
}

impl<S: Copy + Eq> Transition<S> {
    pub fn new(expected: S, next: S, actor: AccountId) -> Self {
        Self {
            expected,
            next,
            actor,
            at: Utc::now(),
        }
    }

    /// Compare-and-set on the record's status.
    pub fn apply<R>(&self, record: &mut R) -> Result<()>
    where
        R: Lifecycle<Status = S>,
    {
        if record.status() != self.expected {
            return Err(record.conflict(self.next));
        }
        record.enter(self.next, &self.actor, self.at);
        Ok(())
    }
}

/// Conflict error for a status move that is not allowed from `from`.
pub fn invalid_transition(
    entity: &'static str,
    id: impl fmt::Display,
    from: impl fmt::Display,
    to: impl fmt::Display,
) -> WorkflowError {
    WorkflowError::InvalidTransition {
        entity,
        id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}
