use super::ids::{AccountId, AttractionId, ReviewId};
use super::lifecycle::{Lifecycle, Record, invalid_transition};
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn target(self) -> ReviewStatus {
        match self {
            Self::Approve => ReviewStatus::Approved,
            Self::Reject => ReviewStatus::Rejected,
        }
    }
}

/// A star rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(WorkflowError::InvalidRating(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = WorkflowError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        rating.0 as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub attraction_id: AttractionId,
    pub account_id: AccountId,
    pub author_name: String,
    pub rating: Rating,
    pub comment: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub moderated_by: Option<AccountId>,
}

impl Review {
    pub fn new(
        attraction_id: AttractionId,
        account_id: AccountId,
        author_name: &str,
        rating: Rating,
        comment: &str,
    ) -> Result<Self> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(WorkflowError::ValidationError(
                "comment must not be empty".to_string(),
            ));
        }
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(WorkflowError::ValidationError(format!(
                "comment exceeds {MAX_COMMENT_CHARS} characters"
            )));
        }
        Ok(Self {
            id: ReviewId::generate(),
            attraction_id,
            account_id,
            author_name: author_name.to_string(),
            rating,
            comment: comment.to_string(),
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            moderated_at: None,
            moderated_by: None,
        })
    }
}

impl Lifecycle for Review {
    type Status = ReviewStatus;

    fn status(&self) -> ReviewStatus {
        self.status
    }

    fn enter(&mut self, next: ReviewStatus, actor: &AccountId, at: DateTime<Utc>) {
        self.status = next;
        self.moderated_at = Some(at);
        self.moderated_by = Some(actor.clone());
    }

    fn conflict(&self, attempted: ReviewStatus) -> WorkflowError {
        match self.status {
            ReviewStatus::Approved | ReviewStatus::Rejected => WorkflowError::AlreadyResolved {
                entity: Self::ENTITY,
                id: self.id.to_string(),
            },
            ReviewStatus::Pending => invalid_transition(Self::ENTITY, &self.id, self.status, attempted),
        }
    }
}

impl Record for Review {
    type Id = ReviewId;
    const ENTITY: &'static str = "review";

    fn id(&self) -> &ReviewId {
        &self.id
    }

    fn claim(&self) -> Option<String> {
        match self.status {
            ReviewStatus::Pending | ReviewStatus::Approved => {
                Some(format!("{}:{}", self.attraction_id, self.account_id))
            }
            ReviewStatus::Rejected => None,
        }
    }

    fn duplicate(&self) -> WorkflowError {
        WorkflowError::Duplicate {
            entity: Self::ENTITY,
            detail: format!("attraction {} already has a review from this account", self.attraction_id),
        }
    }
}

/// Aggregate rating of one attraction over its approved reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: usize,
}

impl RatingSummary {
    /// Computes the summary from scratch; non-approved reviews are ignored.
    pub fn over<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let (sum, count) = reviews
            .into_iter()
            .filter(|r| r.status == ReviewStatus::Approved)
            .fold((0u64, 0usize), |(sum, count), r| {
                (sum + r.rating.value() as u64, count + 1)
            });
        let average_rating = if count == 0 {
            0.0
        } else {
            ((sum as f64 / count as f64) * 10.0).round() / 10.0
        };
        Self {
            average_rating,
            review_count: count,
        }
    }
}
