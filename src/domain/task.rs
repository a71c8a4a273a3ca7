use super::ids::{AccountId, SubmissionId, TaskId};
use super::lifecycle::{Lifecycle, Record, invalid_transition};
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

/// Proof that a tourist completed a reward task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub id: SubmissionId,
    pub task_id: TaskId,
    pub account_id: AccountId,
    /// Opaque reference to the uploaded proof image.
    pub proof: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<AccountId>,
}

impl TaskSubmission {
    pub fn new(task_id: TaskId, account_id: AccountId, proof: &str) -> Result<Self> {
        let proof = proof.trim();
        if proof.is_empty() {
            return Err(WorkflowError::ValidationError(
                "a proof image is required".to_string(),
            ));
        }
        Ok(Self {
            id: SubmissionId::generate(),
            task_id,
            account_id,
            proof: proof.to_string(),
            status: SubmissionStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        })
    }
}

impl Lifecycle for TaskSubmission {
    type Status = SubmissionStatus;

    fn status(&self) -> SubmissionStatus {
        self.status
    }

    fn enter(&mut self, next: SubmissionStatus, actor: &AccountId, at: DateTime<Utc>) {
        self.status = next;
        self.resolved_at = Some(at);
        self.resolved_by = Some(actor.clone());
    }

    fn conflict(&self, attempted: SubmissionStatus) -> WorkflowError {
        match self.status {
            SubmissionStatus::Approved | SubmissionStatus::Rejected => {
                WorkflowError::AlreadyResolved {
                    entity: Self::ENTITY,
                    id: self.id.to_string(),
                }
            }
            SubmissionStatus::Pending => {
                invalid_transition(Self::ENTITY, &self.id, self.status, attempted)
            }
        }
    }
}

impl Record for TaskSubmission {
    type Id = SubmissionId;
    const ENTITY: &'static str = "submission";

    fn id(&self) -> &SubmissionId {
        &self.id
    }

    /// Pending and approved submissions block another one for the same task;
    /// a rejected one does not.
    fn claim(&self) -> Option<String> {
        match self.status {
            SubmissionStatus::Pending | SubmissionStatus::Approved => {
                Some(format!("{}:{}", self.task_id, self.account_id))
            }
            SubmissionStatus::Rejected => None,
        }
    }

    fn duplicate(&self) -> WorkflowError {
        WorkflowError::DuplicateSubmission {
            task_id: self.task_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::Transition;

    fn submission() -> TaskSubmission {
        TaskSubmission::new(TaskId::from("task_recycle"), AccountId::from("t1"), "img://1").unwrap()
    }

    #[test]
    fn test_proof_is_required() {
        let result = TaskSubmission::new(TaskId::from("task"), AccountId::from("t1"), "  ");
        assert!(matches!(result, Err(WorkflowError::ValidationError(_))));
    }

    #[test]
    fn test_resolution_is_terminal() {
        let mut s = submission();
        let admin = AccountId::from("admin");
        Transition::new(SubmissionStatus::Pending, SubmissionStatus::Approved, admin.clone())
            .apply(&mut s)
            .unwrap();
        assert_eq!(s.resolved_by, Some(admin.clone()));
        assert!(s.resolved_at.is_some());

        let again = Transition::new(SubmissionStatus::Pending, SubmissionStatus::Rejected, admin)
            .apply(&mut s);
        assert!(matches!(again, Err(WorkflowError::AlreadyResolved { .. })));
        assert_eq!(s.status, SubmissionStatus::Approved);
    }

    #[test]
    fn test_rejected_submission_releases_claim() {
        let mut s = submission();
        assert_eq!(s.claim(), Some("task_recycle:t1".to_string()));
        s.status = SubmissionStatus::Rejected;
        assert_eq!(s.claim(), None);
    }
}
