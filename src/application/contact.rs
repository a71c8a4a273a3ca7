use crate::domain::access::{Caller, Capability};
use crate::domain::account::normalize_email;
use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_OPERATOR_EMAIL: &str = "contact@ecosayahat.kz";
pub const MAX_MESSAGE_CHARS: usize = 5000;
/// Messages kept for the operator; the oldest is dropped beyond this.
pub const INBOX_CAPACITY: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactReceipt {
    pub id: Uuid,
    pub message: &'static str,
    /// Operator address the message is forwarded to.
    pub contact_email: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

/// Messages from the public contact form.
///
/// Only the latest `INBOX_CAPACITY` messages are kept, in memory, for
/// the lifetime of the process.
#[derive(Clone)]
pub struct ContactDesk {
    operator_email: String,
    capacity: usize,
    inbox: Arc<Mutex<VecDeque<InboxMessage>>>,
}

impl ContactDesk {
    pub fn new(operator_email: impl Into<String>) -> Self {
        Self::with_capacity(operator_email, INBOX_CAPACITY)
    }

    pub fn with_capacity(operator_email: impl Into<String>, capacity: usize) -> Self {
        Self {
            operator_email: operator_email.into(),
            capacity,
            inbox: Arc::default(),
        }
    }

    pub async fn send(&self, message: ContactMessage) -> Result<ContactReceipt> {
        let name = message.name.trim().to_string();
        let text = message.message.trim().to_string();
        let email = normalize_email(&message.email)?;
        if name.is_empty() || text.is_empty() {
            return Err(WorkflowError::ValidationError(
                "name and message are required".to_string(),
            ));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(WorkflowError::ValidationError(format!(
                "message exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let entry = InboxMessage {
            id: Uuid::new_v4(),
            name,
            email,
            message: text,
            received_at: Utc::now(),
        };
        info!(
            id = %entry.id,
            from = %entry.email,
            to = %self.operator_email,
            "contact message received"
        );
        let receipt = ContactReceipt {
            id: entry.id,
            message: "Message sent successfully",
            contact_email: self.operator_email.clone(),
            received_at: entry.received_at,
        };

        let mut inbox = self.inbox.lock().await;
        while inbox.len() >= self.capacity.max(1) {
            inbox.pop_front();
        }
        inbox.push_back(entry);
        Ok(receipt)
    }

    /// Kept messages, newest first.
    pub async fn inbox(&self, caller: &Caller) -> Result<Vec<InboxMessage>> {
        caller.require(Capability::ReadContactInbox)?;
        Ok(self.inbox.lock().await.iter().rev().cloned().collect())
    }
}
