//! Error types for the order store.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// One or more form fields were rejected. Messages are user-facing.
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already exists: {0}")]
    DuplicateOrder(String),

    #[error("Cannot mark order {0} as Done. Order must be fully paid first.")]
    PaymentRequired(String),

    #[error("Order {0} must be Done and Paid before moving to history")]
    NotReadyForHistory(String),

    #[error("Order {0} is cancelled or in history and can no longer be changed")]
    OrderClosed(String),

    #[error("Order {0} is already fully paid")]
    AlreadyPaid(String),

    #[error("Sublimation type not found: {0}")]
    CatalogEntryNotFound(String),

    #[error("Demo mode is already active")]
    DemoModeActive,

    #[error("Demo mode is not active")]
    DemoModeInactive,
}

impl StoreError {
    /// Single-message validation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::Validation(vec![message.into()])
    }

    /// True for errors caused by caller input rather than storage.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::Validation(_)
                | StoreError::OrderNotFound(_)
                | StoreError::DuplicateOrder(_)
                | StoreError::PaymentRequired(_)
                | StoreError::NotReadyForHistory(_)
                | StoreError::OrderClosed(_)
                | StoreError::AlreadyPaid(_)
                | StoreError::CatalogEntryNotFound(_)
                | StoreError::DemoModeActive
                | StoreError::DemoModeInactive
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            StoreError::Deserialization(e.to_string())
        } else {
            StoreError::Serialization(e.to_string())
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
