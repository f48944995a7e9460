//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The store failed to complete a read or a transaction. Nothing from
    /// the failed attempt was kept.
    #[error("Transaction failed: {0}")]
    Transaction(#[from] StoreError),

    /// A business rule rejected the request.
    #[error("Order error: {0}")]
    Order(OrderError),

    /// The caller is authenticated but may not perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
}

impl DomainError {
    /// Short, stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Transaction(_) => "transaction_failure",
            DomainError::Order(err) => err.kind(),
            DomainError::Forbidden(_) => "forbidden",
        }
    }
}

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}
