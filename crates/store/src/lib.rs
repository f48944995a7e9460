//! Transactional storage for the storefront.
//!
//! The [`Store`] trait is the persistent collaborator behind checkout and order
//! queries. A checkout runs inside one [`StoreTransaction`]; everything written
//! through it becomes visible together on commit or not at all.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{AddressId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction, NewAddress, NewProduct, NewUser, Tables};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use record::{
    AddressSummary, CustomerSummary, NewOrder, NewOrderItem, OrderDetails, OrderLine, OrderRecord,
    PriceAndStock, StatusUpdate,
};
pub use store::{AddressValidator, CatalogStore, Store, StoreTransaction};
