use crate::domain::access::{Caller, Capability};
use crate::domain::catalog::RewardTask;
use crate::domain::ids::{SubmissionId, TaskId};
use crate::domain::ledger::{Coins, LedgerPosting, LedgerReason};
use crate::domain::lifecycle::{Record, Transition};
use crate::domain::ports::{CatalogStoreRef, RecordStoreRef};
use crate::domain::task::{SubmissionStatus, TaskSubmission};
use crate::error::{Result, WorkflowError};
use tracing::info;

/// Eco-reward tasks and the verification of their proofs.
///
/// `pending → approved` credits the task's reward in the same commit as the
/// status change, keyed on the submission id. `pending → rejected` has no
/// ledger effect. Both are terminal.
#[derive(Clone)]
pub struct TaskEngine {
    catalog: CatalogStoreRef,
    submissions: RecordStoreRef<TaskSubmission>,
}

impl TaskEngine {
    pub fn new(catalog: CatalogStoreRef, submissions: RecordStoreRef<TaskSubmission>) -> Self {
        Self { catalog, submissions }
    }

    pub async fn tasks(&self, caller: &Caller) -> Result<Vec<RewardTask>> {
        caller.require(Capability::ReadCatalog)?;
        self.catalog.tasks().await
    }

    async fn task(&self, id: &TaskId) -> Result<RewardTask> {
        self.catalog
            .task(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("task", id))
    }

    pub async fn submit(&self, caller: &Caller, task_id: &TaskId, proof: &str) -> Result<TaskSubmission> {
        caller.require(Capability::SubmitTaskProof)?;
        self.task(task_id).await?;
        let submission = TaskSubmission::new(task_id.clone(), caller.account_id.clone(), proof)?;
        let committed = self.submissions.insert(submission, None).await?;
        info!(
            submission = %committed.record.id,
            task = %task_id,
            account = %caller.account_id,
            "task proof submitted"
        );
        Ok(committed.record)
    }

    pub async fn approve(&self, caller: &Caller, id: &SubmissionId) -> Result<TaskSubmission> {
        caller.require(Capability::ResolveSubmissions)?;
        let submission = self.get(id).await?;
        let task = self.task(&submission.task_id).await?;
        let reward = LedgerPosting::credit(
            submission.account_id.clone(),
            Coins::new(i64::from(task.reward_coins))?,
            LedgerReason::TaskReward,
            id.as_str(),
            format!("reward for {}", task.id),
        );
        let committed = self
            .submissions
            .transition(id, self.resolution(caller, SubmissionStatus::Approved), Some(reward))
            .await?;
        info!(
            submission = %id,
            account = %submission.account_id,
            reward = task.reward_coins,
            "task submission approved"
        );
        Ok(committed.record)
    }

    pub async fn reject(&self, caller: &Caller, id: &SubmissionId) -> Result<TaskSubmission> {
        caller.require(Capability::ResolveSubmissions)?;
        let committed = self
            .submissions
            .transition(id, self.resolution(caller, SubmissionStatus::Rejected), None)
            .await?;
        info!(submission = %id, "task submission rejected");
        Ok(committed.record)
    }

    fn resolution(&self, caller: &Caller, next: SubmissionStatus) -> Transition<SubmissionStatus> {
        Transition::new(SubmissionStatus::Pending, next, caller.account_id.clone())
    }

    async fn get(&self, id: &SubmissionId) -> Result<TaskSubmission> {
        self.submissions
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found(TaskSubmission::ENTITY, id))
    }

    /// The caller's own submissions, newest first.
    pub async fn submissions(&self, caller: &Caller) -> Result<Vec<TaskSubmission>> {
        caller.require(Capability::SubmitTaskProof)?;
        let mut own: Vec<_> = self
            .submissions
            .get_all()
            .await?
            .into_iter()
            .filter(|s| s.account_id == caller.account_id)
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(own)
    }

    /// Submissions waiting for an admin, oldest first.
    pub async fn pending(&self, caller: &Caller) -> Result<Vec<TaskSubmission>> {
        caller.require(Capability::ResolveSubmissions)?;
        let mut pending: Vec<_> = self
            .submissions
            .get_all()
            .await?
            .into_iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}
