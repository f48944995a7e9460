use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored column held a value outside its vocabulary.
    #[error("Unexpected value {value:?} in column {column}")]
    InvalidColumn { column: &'static str, value: String },

    /// A write would have taken a product's stock below zero.
    #[error("Stock for product {product_id} cannot go below zero")]
    NegativeStock { product_id: ProductId },

    /// A write referenced a row that does not exist.
    #[error("Missing {table} row {id}")]
    MissingRow { table: &'static str, id: i64 },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
