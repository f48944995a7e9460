use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};

use crate::{
    AddressId, AddressSummary, CustomerSummary, Money, NewOrder, NewOrderItem, OrderDetails,
    OrderId, OrderItemId, OrderLine, OrderRecord, OrderStatus, PaymentStatus, PriceAndStock,
    ProductId, Result, StatusUpdate, StoreError, UserId,
    store::{AddressValidator, CatalogStore, Store, StoreTransaction},
};

const STOCK_CONSTRAINT: &str = "products_stock_non_negative";

const ORDER_COLUMNS: &str = r#"
    SELECT o.order_id, o.user_id, o.address_id, o.total_amount, o.payment_method,
           o.status, o.payment_status, o.created_at,
           u.username, u.full_name, u.email,
           a.address_line1, a.address_line2, a.city, a.state, a.postal_code
    FROM orders o
    JOIN users u ON o.user_id = u.user_id
    JOIN addresses a ON o.address_id = a.address_id
"#;

/// PostgreSQL-backed store.
///
/// Checkouts run at the default READ COMMITTED isolation; product rows are
/// locked with `SELECT ... FOR UPDATE` so concurrent decrements serialize.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn quantity(column: &'static str, value: i32) -> Result<u32> {
        u32::try_from(value).map_err(|_| StoreError::InvalidColumn {
            column,
            value: value.to_string(),
        })
    }

    fn row_to_order(row: &PgRow) -> Result<OrderDetails> {
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;

        Ok(OrderDetails {
            order: OrderRecord {
                order_id: OrderId::new(row.try_get("order_id")?),
                user_id: UserId::new(row.try_get("user_id")?),
                address_id: AddressId::new(row.try_get("address_id")?),
                total_amount: Money::from_minor(row.try_get("total_amount")?),
                payment_method: row.try_get("payment_method")?,
                status: OrderStatus::parse(&status).ok_or(StoreError::InvalidColumn {
                    column: "orders.status",
                    value: status.clone(),
                })?,
                payment_status: PaymentStatus::parse(&payment_status).ok_or(
                    StoreError::InvalidColumn {
                        column: "orders.payment_status",
                        value: payment_status.clone(),
                    },
                )?,
                created_at: row.try_get("created_at")?,
            },
            customer: CustomerSummary {
                username: row.try_get("username")?,
                full_name: row.try_get("full_name")?,
                email: row.try_get("email")?,
            },
            shipping: AddressSummary {
                address_line1: row.try_get("address_line1")?,
                address_line2: row.try_get("address_line2")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                postal_code: row.try_get("postal_code")?,
            },
            items: Vec::new(),
        })
    }

    fn row_to_line(row: &PgRow) -> Result<(OrderId, OrderLine)> {
        let order_id = OrderId::new(row.try_get("order_id")?);
        let line = OrderLine {
            order_item_id: OrderItemId::new(row.try_get("order_item_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            image_url: row.try_get("image_url")?,
            quantity: Self::quantity("order_items.quantity", row.try_get("quantity")?)?,
            price_at_purchase: Money::from_minor(row.try_get("price_at_purchase")?),
            subtotal: Money::from_minor(row.try_get("subtotal")?),
        };
        Ok((order_id, line))
    }

    /// Loads the lines of the given orders in one query and attaches them.
    async fn with_items(&self, rows: Vec<PgRow>) -> Result<Vec<OrderDetails>> {
        let mut orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.order.order_id.as_i64()).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT oi.order_item_id, oi.order_id, oi.product_id, p.product_name, p.image_url,
                   oi.quantity, oi.price_at_purchase, oi.subtotal
            FROM order_items oi
            JOIN products p ON oi.product_id = p.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_item_id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in &item_rows {
            let (order_id, line) = Self::row_to_line(row)?;
            lines.entry(order_id).or_default().push(line);
        }
        for details in &mut orders {
            details.items = lines.remove(&details.order.order_id).unwrap_or_default();
        }
        Ok(orders)
    }
}

#[async_trait]
impl AddressValidator for PostgresStore {
    async fn belongs_to_user(&self, address_id: AddressId, user_id: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM addresses WHERE address_id = $1 AND user_id = $2)",
        )
        .bind(address_id.as_i64())
        .bind(user_id.as_i64())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderDetails>> {
        let sql = format!(
            "{ORDER_COLUMNS} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.order_id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        self.with_items(rows).await
    }

    async fn list_all_orders(&self) -> Result<Vec<OrderDetails>> {
        let sql = format!("{ORDER_COLUMNS} ORDER BY o.created_at DESC, o.order_id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        self.with_items(rows).await
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let sql = format!("{ORDER_COLUMNS} WHERE o.order_id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(order_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_order_status(&self, order_id: OrderId, update: StatusUpdate) -> Result<bool> {
        if update.is_empty() {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE order_id = $1)")
                    .bind(order_id.as_i64())
                    .fetch_one(&self.pool)
                    .await?;
            return Ok(exists);
        }

        let mut assignments = Vec::new();
        let mut param_count = 0;
        if update.status.is_some() {
            param_count += 1;
            assignments.push(format!("status = ${param_count}"));
        }
        if update.payment_status.is_some() {
            param_count += 1;
            assignments.push(format!("payment_status = ${param_count}"));
        }
        param_count += 1;
        let sql = format!(
            "UPDATE orders SET {} WHERE order_id = ${param_count}",
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql);
        if let Some(status) = update.status {
            query = query.bind(status.as_str());
        }
        if let Some(payment_status) = update.payment_status {
            query = query.bind(payment_status.as_str());
        }
        let result = query.bind(order_id.as_i64()).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Transaction over a [`PostgresStore`]. Rolls back if dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogStore for PostgresTransaction {
    async fn get_price_and_stock(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<PriceAndStock>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT price, stock_quantity
            FROM products
            WHERE product_id = $1 AND is_active
            FOR UPDATE
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(Some(PriceAndStock {
                price: Money::from_minor(row.try_get("price")?),
                stock_quantity: PostgresStore::quantity(
                    "products.stock_quantity",
                    row.try_get("stock_quantity")?,
                )?,
            })),
            None => Ok(None),
        }
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $1::INTEGER WHERE product_id = $2",
        )
        .bind(i64::from(quantity))
        .bind(product_id.as_i64())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(STOCK_CONSTRAINT)
            {
                tracing::warn!(%product_id, quantity, "stock decrement rejected by constraint");
                return StoreError::NegativeStock { product_id };
            }
            StoreError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow {
                table: "products",
                id: product_id.as_i64(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId> {
        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, address_id, total_amount, payment_method)
            VALUES ($1, $2, $3, $4)
            RETURNING order_id
            "#,
        )
        .bind(order.user_id.as_i64())
        .bind(order.address_id.as_i64())
        .bind(order.total_amount.minor())
        .bind(&order.payment_method)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(OrderId::new(order_id))
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> Result<OrderItemId> {
        let item_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase, subtotal)
            VALUES ($1, $2, $3::INTEGER, $4, $5)
            RETURNING order_item_id
            "#,
        )
        .bind(item.order_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(i64::from(item.quantity))
        .bind(item.price_at_purchase.minor())
        .bind(item.subtotal.minor())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(OrderItemId::new(item_id))
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
