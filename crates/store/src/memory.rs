use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    AddressId, AddressSummary, CustomerSummary, Money, NewOrder, NewOrderItem, OrderDetails,
    OrderId, OrderItemId, OrderLine, OrderRecord, OrderStatus, PaymentStatus, PriceAndStock,
    ProductId, Result, StatusUpdate, StoreError, UserId,
    store::{AddressValidator, CatalogStore, Store, StoreTransaction},
};

/// Account to seed into an in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
}

impl NewUser {
    /// Creates an account whose email and full name derive from the username.
    pub fn named(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            email: format!("{username}@example.com"),
            full_name: username.clone(),
            username,
        }
    }
}

/// Address to seed into an in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub user_id: UserId,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

impl NewAddress {
    /// Creates a default address for a user with placeholder postal fields.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            address_line1: "1 Market Street".to_string(),
            address_line2: None,
            city: "Dar es Salaam".to_string(),
            state: "Dar es Salaam".to_string(),
            postal_code: "11101".to_string(),
            country: "Tanzania".to_string(),
            is_default: true,
        }
    }
}

/// Product to seed into an in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub product_name: String,
    pub image_url: Option<String>,
    pub price: Money,
    pub stock_quantity: u32,
    pub is_active: bool,
}

impl NewProduct {
    /// Creates an active product without an image.
    pub fn new(product_name: impl Into<String>, price: Money, stock_quantity: u32) -> Self {
        Self {
            product_name: product_name.into(),
            image_url: None,
            price,
            stock_quantity,
            is_active: true,
        }
    }

    /// Marks the product inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderRow {
    user_id: UserId,
    address_id: AddressId,
    total_amount: Money,
    payment_method: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: u32,
    price_at_purchase: Money,
    subtotal: Money,
}

/// Complete contents of an in-memory store.
///
/// Cloning yields a point-in-time copy, and two copies compare equal only if
/// every row matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    users: BTreeMap<UserId, NewUser>,
    addresses: BTreeMap<AddressId, NewAddress>,
    products: BTreeMap<ProductId, NewProduct>,
    orders: BTreeMap<OrderId, OrderRow>,
    order_items: BTreeMap<OrderItemId, OrderItemRow>,
}

fn next_key<K: Copy + Into<i64>, V>(table: &BTreeMap<K, V>) -> i64 {
    table.keys().next_back().map_or(1, |k| (*k).into() + 1)
}

impl Tables {
    /// Number of stored orders.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Number of stored order lines.
    pub fn order_item_count(&self) -> usize {
        self.order_items.len()
    }

    /// Current stock of a product, active or not.
    pub fn stock_of(&self, product_id: ProductId) -> Option<u32> {
        self.products.get(&product_id).map(|p| p.stock_quantity)
    }

    fn details(&self, order_id: OrderId, row: &OrderRow) -> Result<OrderDetails> {
        let user = self.users.get(&row.user_id).ok_or(StoreError::MissingRow {
            table: "users",
            id: row.user_id.as_i64(),
        })?;
        let address = self
            .addresses
            .get(&row.address_id)
            .ok_or(StoreError::MissingRow {
                table: "addresses",
                id: row.address_id.as_i64(),
            })?;

        let items = self
            .order_items
            .iter()
            .filter(|(_, item)| item.order_id == order_id)
            .map(|(item_id, item)| {
                let product = self
                    .products
                    .get(&item.product_id)
                    .ok_or(StoreError::MissingRow {
                        table: "products",
                        id: item.product_id.as_i64(),
                    })?;
                Ok(OrderLine {
                    order_item_id: *item_id,
                    product_id: item.product_id,
                    product_name: product.product_name.clone(),
                    image_url: product.image_url.clone(),
                    quantity: item.quantity,
                    price_at_purchase: item.price_at_purchase,
                    subtotal: item.subtotal,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderDetails {
            order: OrderRecord {
                order_id,
                user_id: row.user_id,
                address_id: row.address_id,
                total_amount: row.total_amount,
                payment_method: row.payment_method.clone(),
                status: row.status,
                payment_status: row.payment_status,
                created_at: row.created_at,
            },
            customer: CustomerSummary {
                username: user.username.clone(),
                full_name: user.full_name.clone(),
                email: user.email.clone(),
            },
            shipping: AddressSummary {
                address_line1: address.address_line1.clone(),
                address_line2: address.address_line2.clone(),
                city: address.city.clone(),
                state: address.state.clone(),
                postal_code: address.postal_code.clone(),
            },
            items,
        })
    }

    fn newest_first(&self, filter: impl Fn(&OrderRow) -> bool) -> Result<Vec<OrderDetails>> {
        let mut rows: Vec<_> = self.orders.iter().filter(|(_, row)| filter(row)).collect();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at.cmp(&a.created_at).then(b_id.cmp(a_id))
        });
        rows.into_iter()
            .map(|(order_id, row)| self.details(*order_id, row))
            .collect()
    }
}

/// In-memory store for tests and local runs.
///
/// A transaction holds the table lock from `begin` until it is committed or
/// dropped, so checkouts are fully serialized. Writes go to a working copy
/// that replaces the tables only on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current contents.
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    /// Seeds an account.
    pub async fn insert_user(&self, user: NewUser) -> UserId {
        let mut tables = self.tables.lock().await;
        let id = UserId::new(next_key(&tables.users));
        tables.users.insert(id, user);
        id
    }

    /// Seeds an address.
    pub async fn insert_address(&self, address: NewAddress) -> AddressId {
        let mut tables = self.tables.lock().await;
        let id = AddressId::new(next_key(&tables.addresses));
        tables.addresses.insert(id, address);
        id
    }

    /// Seeds a product.
    pub async fn insert_product(&self, product: NewProduct) -> ProductId {
        let mut tables = self.tables.lock().await;
        let id = ProductId::new(next_key(&tables.products));
        tables.products.insert(id, product);
        id
    }

    /// Changes a product's catalog price.
    pub async fn set_product_price(&self, product_id: ProductId, price: Money) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::MissingRow {
                table: "products",
                id: product_id.as_i64(),
            })?;
        product.price = price;
        Ok(())
    }
}

#[async_trait]
impl AddressValidator for InMemoryStore {
    async fn belongs_to_user(&self, address_id: AddressId, user_id: UserId) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .addresses
            .get(&address_id)
            .is_some_and(|a| a.user_id == user_id))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction { guard, working })
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetails>> {
        let tables = self.tables.lock().await;
        tables.newest_first(|row| row.user_id == user_id)
    }

    async fn list_all_orders(&self) -> Result<Vec<OrderDetails>> {
        let tables = self.tables.lock().await;
        tables.newest_first(|_| true)
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let tables = self.tables.lock().await;
        match tables.orders.get(&order_id) {
            Some(row) => Ok(Some(tables.details(order_id, row)?)),
            None => Ok(None),
        }
    }

    async fn update_order_status(&self, order_id: OrderId, update: StatusUpdate) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let Some(row) = tables.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        if let Some(status) = update.status {
            row.status = status;
        }
        if let Some(payment_status) = update.payment_status {
            row.payment_status = payment_status;
        }
        Ok(true)
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl CatalogStore for InMemoryTransaction {
    async fn get_price_and_stock(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<PriceAndStock>> {
        Ok(self
            .working
            .products
            .get(&product_id)
            .filter(|p| p.is_active)
            .map(|p| PriceAndStock {
                price: p.price,
                stock_quantity: p.stock_quantity,
            }))
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<()> {
        let product = self
            .working
            .products
            .get_mut(&product_id)
            .ok_or(StoreError::MissingRow {
                table: "products",
                id: product_id.as_i64(),
            })?;
        product.stock_quantity = product
            .stock_quantity
            .checked_sub(quantity)
            .ok_or(StoreError::NegativeStock { product_id })?;
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId> {
        if !self.working.users.contains_key(&order.user_id) {
            return Err(StoreError::MissingRow {
                table: "users",
                id: order.user_id.as_i64(),
            });
        }
        if !self.working.addresses.contains_key(&order.address_id) {
            return Err(StoreError::MissingRow {
                table: "addresses",
                id: order.address_id.as_i64(),
            });
        }

        let order_id = OrderId::new(next_key(&self.working.orders));
        self.working.orders.insert(
            order_id,
            OrderRow {
                user_id: order.user_id,
                address_id: order.address_id,
                total_amount: order.total_amount,
                payment_method: order.payment_method.clone(),
                status: OrderStatus::default(),
                payment_status: PaymentStatus::default(),
                created_at: Utc::now(),
            },
        );
        Ok(order_id)
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> Result<OrderItemId> {
        if !self.working.orders.contains_key(&item.order_id) {
            return Err(StoreError::MissingRow {
                table: "orders",
                id: item.order_id.as_i64(),
            });
        }
        if !self.working.products.contains_key(&item.product_id) {
            return Err(StoreError::MissingRow {
                table: "products",
                id: item.product_id.as_i64(),
            });
        }

        let item_id = OrderItemId::new(next_key(&self.working.order_items));
        self.working.order_items.insert(
            item_id,
            OrderItemRow {
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_purchase: item.price_at_purchase,
                subtotal: item.subtotal,
            },
        );
        Ok(item_id)
    }

    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
