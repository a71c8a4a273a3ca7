use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Stable error categories surfaced to clients.
///
/// Every [`WorkflowError`] belongs to exactly one kind; the HTTP layer maps
/// kinds to status codes and clients localize messages from the `code()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidInput,
    Conflict,
    InsufficientBalance,
    PaymentFailed,
    Integrity,
    Internal,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
    #[error("Check-in date must be before check-out date")]
    InvalidDateRange,
    #[error("Guest count must be at least 1, got {0}")]
    InvalidGuestCount(i64),
    #[error("Amount must be a positive number of coins, got {0}")]
    InvalidAmount(i64),
    #[error("Invalid route: {0}")]
    InvalidRoute(String),
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{entity} {id} is already resolved")]
    AlreadyResolved { entity: &'static str, id: String },
    #[error("Order {0} was already taken by another driver")]
    OrderAlreadyTaken(String),
    #[error("Task {task_id} already has an active submission from this account")]
    DuplicateSubmission { task_id: String },
    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: &'static str, detail: String },
    #[error("Email {0} is already registered")]
    EmailTaken(String),
    #[error("{entity} {id} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Ledger for account {account} is corrupted: balance {balance}, sum of entries {sum}")]
    LedgerCorrupted {
        account: String,
        balance: u64,
        sum: i64,
    },
    #[error("Ledger for account {0} is frozen pending operator review")]
    LedgerFrozen(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidRating(_)
            | Self::InvalidDateRange
            | Self::InvalidGuestCount(_)
            | Self::InvalidAmount(_)
            | Self::InvalidRoute(_)
            | Self::ValidationError(_)
            | Self::CsvError(_) => ErrorKind::InvalidInput,
            Self::AlreadyResolved { .. }
            | Self::OrderAlreadyTaken(_)
            | Self::DuplicateSubmission { .. }
            | Self::Duplicate { .. }
            | Self::EmailTaken(_)
            | Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::PaymentFailed(_) => ErrorKind::PaymentFailed,
            Self::LedgerCorrupted { .. } | Self::LedgerFrozen(_) => ErrorKind::Integrity,
            Self::IoError(_) | Self::InternalError(_) => ErrorKind::Internal,
            #[cfg(feature = "storage-rocksdb")]
            Self::StorageError(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable error code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::InvalidRating(_) => "invalid_rating",
            Self::InvalidDateRange => "invalid_date_range",
            Self::InvalidGuestCount(_) => "invalid_guest_count",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidRoute(_) => "invalid_route",
            Self::ValidationError(_) | Self::CsvError(_) => "invalid_input",
            Self::AlreadyResolved { .. } => "already_resolved",
            Self::OrderAlreadyTaken(_) => "order_already_taken",
            Self::DuplicateSubmission { .. } => "duplicate_submission",
            Self::Duplicate { .. } => "duplicate",
            Self::EmailTaken(_) => "email_taken",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::PaymentFailed(_) => "payment_failed",
            Self::LedgerCorrupted { .. } => "ledger_corrupted",
            Self::LedgerFrozen(_) => "ledger_frozen",
            Self::IoError(_) | Self::InternalError(_) => "internal",
            #[cfg(feature = "storage-rocksdb")]
            Self::StorageError(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::InternalError(Box::new(e))
    }
}
