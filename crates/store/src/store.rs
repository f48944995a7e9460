use async_trait::async_trait;

use crate::{
    AddressId, NewOrder, NewOrderItem, OrderDetails, OrderId, OrderItemId, PriceAndStock,
    ProductId, Result, StatusUpdate, UserId,
};

/// Catalog reads and stock writes performed inside a checkout transaction.
#[async_trait]
pub trait CatalogStore: Send {
    /// Returns the current price and stock of an active product.
    ///
    /// Inactive or missing products yield `None`. The product row stays
    /// locked against concurrent checkouts until the transaction ends.
    async fn get_price_and_stock(&mut self, product_id: ProductId)
    -> Result<Option<PriceAndStock>>;

    /// Decrements a product's stock unconditionally.
    ///
    /// The caller must already have checked that enough stock is available.
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<()>;
}

/// Ownership check for shipping addresses.
#[async_trait]
pub trait AddressValidator: Send + Sync {
    /// Returns true iff the address exists and is owned by the user.
    async fn belongs_to_user(&self, address_id: AddressId, user_id: UserId) -> Result<bool>;
}

/// A unit of work. Writes are visible to others only after [`commit`].
///
/// Dropping a transaction without committing discards its writes.
///
/// [`commit`]: StoreTransaction::commit
#[async_trait]
pub trait StoreTransaction: CatalogStore {
    /// Inserts an order header with pending statuses, returning its ID.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId>;

    /// Inserts an order line, returning its ID.
    async fn insert_order_item(&mut self, item: &NewOrderItem) -> Result<OrderItemId>;

    /// Makes all writes of this transaction durable.
    async fn commit(self) -> Result<()>;

    /// Discards all writes of this transaction.
    async fn rollback(self) -> Result<()>;
}

/// Persistent storage for orders and the rows they reference.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: AddressValidator {
    /// Transaction type handed out by [`Store::begin`].
    type Tx: StoreTransaction + 'static;

    /// Starts a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Orders owned by a user, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetails>>;

    /// Orders of every account, newest first.
    async fn list_all_orders(&self) -> Result<Vec<OrderDetails>>;

    /// A single order, or `None` if it does not exist.
    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>>;

    /// Applies a status change. Returns false if the order does not exist.
    async fn update_order_status(&self, order_id: OrderId, update: StatusUpdate) -> Result<bool>;
}
