//! Shared types for the storefront order workspace.

mod ids;
mod money;
mod status;

pub use ids::{AddressId, OrderId, OrderItemId, ProductId, UserId};
pub use money::Money;
pub use status::{OrderStatus, PaymentStatus};
