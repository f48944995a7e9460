//! Checkout input: the loosely typed request body and its validated form.

use std::collections::BTreeMap;

use common::{AddressId, ProductId};
use serde::Deserialize;

use super::OrderError;

/// Payment method recorded when the request names none.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash_on_delivery";

/// Longest accepted payment method label.
pub const MAX_PAYMENT_METHOD_LEN: usize = 50;

/// Largest quantity a single cart line may request.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// Checkout request body as sent by the client.
///
/// Missing fields deserialize to zero or empty so that they are reported as
/// invalid order data rather than as a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub address_id: i64,
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// One cart entry as sent by the client.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CartItemRequest {
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub quantity: i64,
}

/// A validated cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A validated checkout.
///
/// Holds at least one line, one line per product, in ascending product order
/// so that concurrent checkouts lock product rows in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    address_id: AddressId,
    lines: Vec<CartLine>,
    payment_method: String,
}

impl Checkout {
    /// Validates and normalizes a checkout.
    ///
    /// Lines naming the same product are merged by summing their quantities.
    /// A blank or absent payment method becomes [`DEFAULT_PAYMENT_METHOD`].
    pub fn new(
        address_id: AddressId,
        lines: impl IntoIterator<Item = CartLine>,
        payment_method: Option<&str>,
    ) -> Result<Self, OrderError> {
        if !address_id.is_valid() {
            return Err(OrderError::invalid("address_id must be a positive integer"));
        }

        let mut merged: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in lines {
            if !line.product_id.is_valid() {
                return Err(OrderError::invalid("product_id must be a positive integer"));
            }
            if line.quantity == 0 {
                return Err(OrderError::invalid(format!(
                    "quantity for product {} must be greater than 0",
                    line.product_id
                )));
            }
            let quantity = merged.entry(line.product_id).or_insert(0);
            *quantity = quantity
                .checked_add(line.quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or_else(|| {
                    OrderError::invalid(format!(
                        "quantity for product {} exceeds {MAX_LINE_QUANTITY}",
                        line.product_id
                    ))
                })?;
        }

        if merged.is_empty() {
            return Err(OrderError::invalid("cart is empty"));
        }

        let payment_method = match payment_method.map(str::trim) {
            None | Some("") => DEFAULT_PAYMENT_METHOD.to_string(),
            Some(method) if method.chars().count() > MAX_PAYMENT_METHOD_LEN => {
                return Err(OrderError::invalid(format!(
                    "payment_method must be at most {MAX_PAYMENT_METHOD_LEN} characters"
                )));
            }
            Some(method) => method.to_string(),
        };

        Ok(Self {
            address_id,
            lines: merged
                .into_iter()
                .map(|(product_id, quantity)| CartLine::new(product_id, quantity))
                .collect(),
            payment_method,
        })
    }

    pub fn address_id(&self) -> AddressId {
        self.address_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }
}

impl TryFrom<CheckoutRequest> for Checkout {
    type Error = OrderError;

    fn try_from(req: CheckoutRequest) -> Result<Self, Self::Error> {
        let lines = req
            .items
            .iter()
            .map(|item| {
                let quantity = u32::try_from(item.quantity).map_err(|_| {
                    OrderError::invalid(format!(
                        "quantity for product {} must be between 1 and {MAX_LINE_QUANTITY}",
                        item.product_id
                    ))
                })?;
                Ok(CartLine::new(ProductId::new(item.product_id), quantity))
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        Checkout::new(
            AddressId::new(req.address_id),
            lines,
            req.payment_method.as_deref(),
        )
    }
}
