//! Checkout, order queries and status updates.

mod checkout;
mod service;
mod status;

pub use checkout::{
    CartItemRequest, CartLine, Checkout, CheckoutRequest, DEFAULT_PAYMENT_METHOD,
    MAX_LINE_QUANTITY, MAX_PAYMENT_METHOD_LEN,
};
pub use service::{OrderService, PlacedOrder};
pub use status::{StatusOutcome, StatusUpdateRequest};

use common::{AddressId, OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request was malformed: empty cart, bad identifier or quantity.
    #[error("Invalid order data: {reason}")]
    InvalidOrderData { reason: String },

    /// The shipping address does not exist or belongs to another account.
    #[error("Invalid address: {address_id}")]
    InvalidAddress { address_id: AddressId },

    /// The product does not exist or is no longer sold.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// Not enough stock to cover the requested quantity.
    #[error(
        "Insufficient stock for product ID: {product_id} (requested {requested}, available {available})"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The order does not exist.
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },
}

impl OrderError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        OrderError::InvalidOrderData {
            reason: reason.into(),
        }
    }

    /// The product the error is about, if any.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            OrderError::ProductNotFound { product_id }
            | OrderError::InsufficientStock { product_id, .. } => Some(*product_id),
            _ => None,
        }
    }

    /// Short, stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidOrderData { .. } => "invalid_order_data",
            OrderError::InvalidAddress { .. } => "invalid_address",
            OrderError::ProductNotFound { .. } => "product_not_found",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::OrderNotFound { .. } => "order_not_found",
        }
    }
}
