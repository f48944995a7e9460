//! Domain layer for the storefront order service.
//!
//! This crate provides:
//! - Identity of the authenticated caller, passed explicitly into every call
//! - Validated checkout and status-update input
//! - OrderService: the checkout transaction, order queries and admin status updates

pub mod error;
pub mod identity;
pub mod order;

pub use common::{AddressId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};
pub use error::DomainError;
pub use identity::{Identity, Role};
pub use order::{
    CartItemRequest, CartLine, Checkout, CheckoutRequest, DEFAULT_PAYMENT_METHOD, OrderError,
    OrderService, PlacedOrder, StatusOutcome, StatusUpdateRequest,
};
pub use store::{AddressSummary, CustomerSummary, OrderDetails, OrderLine, OrderRecord, StatusUpdate};
