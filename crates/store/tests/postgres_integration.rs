//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use sqlx::PgPool;
use store::{
    AddressId, AddressValidator, CatalogStore, Money, NewOrder, NewOrderItem, OrderId,
    OrderStatus, PaymentStatus, PostgresStore, ProductId, StatusUpdate, Store, StoreError,
    StoreTransaction, UserId,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, products, addresses, users RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

struct Fixture {
    store: PostgresStore,
    user: UserId,
    address: AddressId,
    product: ProductId,
}

async fn insert_user(pool: &PgPool, username: &str) -> UserId {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, email, full_name) VALUES ($1, $2, $1) RETURNING user_id",
    )
    .bind(username)
    .bind(format!("{username}@example.com"))
    .fetch_one(pool)
    .await
    .unwrap();
    UserId::new(id)
}

async fn insert_address(pool: &PgPool, user: UserId) -> AddressId {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO addresses (user_id, address_line1, city, state, postal_code, country)
        VALUES ($1, '1 Market Street', 'Arusha', 'Arusha', '23101', 'Tanzania')
        RETURNING address_id
        "#,
    )
    .bind(user.as_i64())
    .fetch_one(pool)
    .await
    .unwrap();
    AddressId::new(id)
}

async fn insert_product(pool: &PgPool, name: &str, price: i64, stock: i32, active: bool) -> ProductId {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO products (product_name, price, stock_quantity, is_active)
        VALUES ($1, $2, $3, $4)
        RETURNING product_id
        "#,
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .bind(active)
    .fetch_one(pool)
    .await
    .unwrap();
    ProductId::new(id)
}

async fn fixture() -> Fixture {
    let store = get_test_store().await;
    let user = insert_user(store.pool(), "amina").await;
    let address = insert_address(store.pool(), user).await;
    let product = insert_product(store.pool(), "Headphones", 1000, 5, true).await;
    Fixture {
        store,
        user,
        address,
        product,
    }
}

async fn stock_of(store: &PostgresStore, product: ProductId) -> i32 {
    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE product_id = $1")
        .bind(product.as_i64())
        .fetch_one(store.pool())
        .await
        .unwrap()
}

async fn order_count(store: &PostgresStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

async fn write_order<T: StoreTransaction>(tx: &mut T, f: &Fixture, quantity: u32) -> OrderId {
    let price = Money::from_minor(1000);
    let subtotal = price.checked_multiply(quantity).unwrap();
    let order_id = tx
        .insert_order(&NewOrder {
            user_id: f.user,
            address_id: f.address,
            total_amount: subtotal,
            payment_method: "cash_on_delivery".to_string(),
        })
        .await
        .unwrap();
    tx.insert_order_item(&NewOrderItem {
        order_id,
        product_id: f.product,
        quantity,
        price_at_purchase: price,
        subtotal,
    })
    .await
    .unwrap();
    tx.decrement_stock(f.product, quantity).await.unwrap();
    order_id
}

#[tokio::test]
async fn committed_order_is_readable_with_lines() {
    let f = fixture().await;

    let mut tx = f.store.begin().await.unwrap();
    let order_id = write_order(&mut tx, &f, 3).await;
    tx.commit().await.unwrap();

    assert_eq!(stock_of(&f.store, f.product).await, 2);

    let details = f.store.find_order(order_id).await.unwrap().unwrap();
    assert_eq!(details.order.user_id, f.user);
    assert_eq!(details.order.total_amount, Money::from_minor(3000));
    assert_eq!(details.order.status, OrderStatus::Pending);
    assert_eq!(details.order.payment_status, PaymentStatus::Pending);
    assert_eq!(details.customer.username, "amina");
    assert_eq!(details.shipping.city, "Arusha");
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].product_name, "Headphones");
    assert_eq!(details.items_total(), Some(details.order.total_amount));
}

#[tokio::test]
async fn rollback_leaves_no_rows() {
    let f = fixture().await;

    let mut tx = f.store.begin().await.unwrap();
    write_order(&mut tx, &f, 2).await;
    tx.rollback().await.unwrap();

    assert_eq!(order_count(&f.store).await, 0);
    assert_eq!(stock_of(&f.store, f.product).await, 5);
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let f = fixture().await;

    {
        let mut tx = f.store.begin().await.unwrap();
        write_order(&mut tx, &f, 2).await;
    }

    assert_eq!(order_count(&f.store).await, 0);
    assert_eq!(stock_of(&f.store, f.product).await, 5);
}

#[tokio::test]
async fn inactive_and_missing_products_are_not_found() {
    let f = fixture().await;
    let retired = insert_product(f.store.pool(), "Old Radio", 500, 3, false).await;

    let mut tx = f.store.begin().await.unwrap();
    assert!(tx.get_price_and_stock(retired).await.unwrap().is_none());
    assert!(
        tx.get_price_and_stock(ProductId::new(9999))
            .await
            .unwrap()
            .is_none()
    );

    let listing = tx.get_price_and_stock(f.product).await.unwrap().unwrap();
    assert_eq!(listing.price, Money::from_minor(1000));
    assert_eq!(listing.stock_quantity, 5);
}

#[tokio::test]
async fn stock_constraint_maps_to_negative_stock() {
    let f = fixture().await;

    let mut tx = f.store.begin().await.unwrap();
    let result = tx.decrement_stock(f.product, 6).await;
    assert!(matches!(result, Err(StoreError::NegativeStock { .. })));
}

#[tokio::test]
async fn row_lock_serializes_concurrent_checkouts() {
    let f = fixture().await;

    let mut first = f.store.begin().await.unwrap();
    let listing = first.get_price_and_stock(f.product).await.unwrap().unwrap();
    assert_eq!(listing.stock_quantity, 5);

    // The second reader blocks on the row lock until the first commits.
    let store = f.store.clone();
    let product = f.product;
    let second = tokio::spawn(async move {
        let mut tx = store.begin().await.unwrap();
        let listing = tx.get_price_and_stock(product).await.unwrap().unwrap();
        tx.rollback().await.unwrap();
        listing.stock_quantity
    });

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!second.is_finished());

    first.decrement_stock(f.product, 5).await.unwrap();
    first.commit().await.unwrap();

    assert_eq!(second.await.unwrap(), 0);
}

#[tokio::test]
async fn address_ownership() {
    let f = fixture().await;
    let other = insert_user(f.store.pool(), "baraka").await;

    assert!(f.store.belongs_to_user(f.address, f.user).await.unwrap());
    assert!(!f.store.belongs_to_user(f.address, other).await.unwrap());
    assert!(
        !f.store
            .belongs_to_user(AddressId::new(9999), f.user)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn listings_are_newest_first_and_scoped() {
    let f = fixture().await;
    let other = insert_user(f.store.pool(), "baraka").await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let mut tx = f.store.begin().await.unwrap();
        ids.push(write_order(&mut tx, &f, 1).await);
        tx.commit().await.unwrap();
    }

    let own: Vec<_> = f
        .store
        .list_orders_for_user(f.user)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.order.order_id)
        .collect();
    assert_eq!(own, vec![ids[1], ids[0]]);

    assert!(f.store.list_orders_for_user(other).await.unwrap().is_empty());
    assert_eq!(f.store.list_all_orders().await.unwrap().len(), 2);
    assert!(f.store.find_order(OrderId::new(9999)).await.unwrap().is_none());
}

#[tokio::test]
async fn status_update_changes_only_given_columns() {
    let f = fixture().await;
    let mut tx = f.store.begin().await.unwrap();
    let order_id = write_order(&mut tx, &f, 1).await;
    tx.commit().await.unwrap();

    let updated = f
        .store
        .update_order_status(
            order_id,
            StatusUpdate {
                status: None,
                payment_status: Some(PaymentStatus::Paid),
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let order = f.store.find_order(order_id).await.unwrap().unwrap().order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let missing = f
        .store
        .update_order_status(
            OrderId::new(9999),
            StatusUpdate {
                status: Some(OrderStatus::Shipped),
                payment_status: None,
            },
        )
        .await
        .unwrap();
    assert!(!missing);
}
