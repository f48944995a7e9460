//! Rows read from and written to the store.

use chrono::{DateTime, Utc};
use common::{AddressId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};

/// Current price and available stock of an active product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceAndStock {
    pub price: Money,
    pub stock_quantity: u32,
}

/// Order header written at checkout. Status columns take their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub total_amount: Money,
    pub payment_method: String,
}

/// Order line written at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price snapshot, decoupled from later catalog edits.
    pub price_at_purchase: Money,
    pub subtotal: Money,
}

/// A stored order header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub total_amount: Money,
    pub payment_method: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// A stored order line joined with the product's display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub order_item_id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub price_at_purchase: Money,
    pub subtotal: Money,
}

/// Shipping address fields shown alongside an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSummary {
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Account fields shown alongside an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSummary {
    pub username: String,
    pub full_name: String,
    pub email: String,
}

/// An order with its lines, shipping address and owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order: OrderRecord,
    pub customer: CustomerSummary,
    pub shipping: AddressSummary,
    pub items: Vec<OrderLine>,
}

impl OrderDetails {
    /// Sum of the line subtotals, or `None` if it does not fit in `Money`.
    pub fn items_total(&self) -> Option<Money> {
        Money::checked_sum(self.items.iter().map(|line| line.subtotal))
    }
}

/// Columns to change on an order. `None` leaves a column untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl StatusUpdate {
    /// Returns true if the update would not change any column.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_status.is_none()
    }
}
