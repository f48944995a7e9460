//! Order service: checkout, order queries and admin status updates.

use std::time::Instant;

use common::{Money, OrderId, ProductId, UserId};
use store::{CatalogStore, NewOrder, NewOrderItem, OrderDetails, Store, StoreTransaction};

use super::{Checkout, OrderError, StatusOutcome, StatusUpdateRequest};
use crate::error::DomainError;
use crate::identity::Identity;

/// A committed checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total_amount: Money,
    pub item_count: usize,
}

/// A cart line priced from a single catalog read.
struct PricedLine {
    product_id: ProductId,
    quantity: u32,
    unit_price: Money,
    subtotal: Money,
}

/// Service for placing and managing orders.
///
/// Every call takes the caller's [`Identity`] explicitly; the service keeps no
/// per-request state.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order for the caller.
    ///
    /// The address must belong to the caller. Stock checks, the order header,
    /// its lines and the stock decrements run in one transaction: on success
    /// everything is committed, on any error nothing is.
    #[tracing::instrument(
        skip(self, identity, checkout),
        fields(user_id = %identity.user_id(), address_id = %checkout.address_id(), lines = checkout.lines().len())
    )]
    pub async fn place_order(
        &self,
        identity: &Identity,
        checkout: &Checkout,
    ) -> Result<PlacedOrder, DomainError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.checkout(identity.user_id(), checkout).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %placed.order_id,
                    total_amount = %placed.total_amount,
                    "order placed"
                );
            }
            Err(err) => {
                metrics::counter!("checkout_failures_total", "reason" => err.kind()).increment(1);
                match err {
                    DomainError::Transaction(_) => tracing::error!(error = %err, "checkout failed"),
                    _ => tracing::info!(reason = err.kind(), error = %err, "checkout rejected"),
                }
            }
        }
        result
    }

    async fn checkout(
        &self,
        user_id: UserId,
        checkout: &Checkout,
    ) -> Result<PlacedOrder, DomainError> {
        let address_id = checkout.address_id();
        if !self.store.belongs_to_user(address_id, user_id).await? {
            return Err(OrderError::InvalidAddress { address_id }.into());
        }

        let mut tx = self.store.begin().await?;
        match Self::write_order(&mut tx, user_id, checkout).await {
            Ok(placed) => {
                tx.commit().await?;
                Ok(placed)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed, dropping transaction");
                }
                Err(err)
            }
        }
    }

    /// Runs the checkout writes inside `tx`. Does not commit.
    async fn write_order(
        tx: &mut S::Tx,
        user_id: UserId,
        checkout: &Checkout,
    ) -> Result<PlacedOrder, DomainError> {
        // Price each line once; the same price feeds the total and the snapshot.
        let mut priced = Vec::with_capacity(checkout.lines().len());
        let mut total_amount = Money::zero();
        for line in checkout.lines() {
            let listing = tx
                .get_price_and_stock(line.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound {
                    product_id: line.product_id,
                })?;

            if listing.stock_quantity < line.quantity {
                return Err(OrderError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: listing.stock_quantity,
                }
                .into());
            }

            let subtotal = listing
                .price
                .checked_multiply(line.quantity)
                .ok_or_else(|| OrderError::invalid("order total is out of range"))?;
            total_amount = total_amount
                .checked_add(subtotal)
                .ok_or_else(|| OrderError::invalid("order total is out of range"))?;

            priced.push(PricedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: listing.price,
                subtotal,
            });
        }

        let order_id = tx
            .insert_order(&NewOrder {
                user_id,
                address_id: checkout.address_id(),
                total_amount,
                payment_method: checkout.payment_method().to_string(),
            })
            .await?;

        for line in &priced {
            tx.insert_order_item(&NewOrderItem {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price_at_purchase: line.unit_price,
                subtotal: line.subtotal,
            })
            .await?;
            tx.decrement_stock(line.product_id, line.quantity).await?;
        }

        Ok(PlacedOrder {
            order_id,
            total_amount,
            item_count: priced.len(),
        })
    }

    /// The caller's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        identity: &Identity,
    ) -> Result<Vec<OrderDetails>, DomainError> {
        Ok(self.store.list_orders_for_user(identity.user_id()).await?)
    }

    /// A single order. Customers may only fetch their own.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(
        &self,
        identity: &Identity,
        order_id: OrderId,
    ) -> Result<OrderDetails, DomainError> {
        let details = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id })?;

        if !identity.can_access(details.order.user_id) {
            return Err(DomainError::Forbidden("view another account's order"));
        }
        Ok(details)
    }

    /// Every account's orders, newest first. Admin only.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(
        &self,
        identity: &Identity,
    ) -> Result<Vec<OrderDetails>, DomainError> {
        identity.require_admin("list all orders")?;
        Ok(self.store.list_all_orders().await?)
    }

    /// Changes an order's status and/or payment status. Admin only.
    ///
    /// Unrecognized values are ignored. If nothing recognizable remains the
    /// store is not touched and [`StatusOutcome::NoOp`] is returned. Any
    /// recognized value may follow any other.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        identity: &Identity,
        request: &StatusUpdateRequest,
    ) -> Result<StatusOutcome, DomainError> {
        identity.require_admin("update order status")?;

        let order_id = request.order_id();
        if !order_id.is_valid() {
            return Err(OrderError::invalid("order_id must be a positive integer").into());
        }

        let update = request.recognized();
        if update.is_empty() {
            tracing::debug!(%order_id, "no recognized status values, nothing to update");
            return Ok(StatusOutcome::NoOp);
        }

        if !self.store.update_order_status(order_id, update).await? {
            return Err(OrderError::OrderNotFound { order_id }.into());
        }

        metrics::counter!("order_status_updates_total").increment(1);
        tracing::info!(
            %order_id,
            status = ?update.status,
            payment_status = ?update.payment_status,
            "order status updated"
        );
        Ok(StatusOutcome::Updated(update))
    }
}
