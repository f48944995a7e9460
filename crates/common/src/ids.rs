//! Typed row identifiers.
//!
//! Every table uses a positive 64-bit surrogate key. Wrapping each one in its
//! own type keeps product IDs from being passed where an order ID is expected.

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw key value.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw key value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }

            /// Returns true if the value can name a stored row.
            pub fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identifier of a user account.
    UserId
);
row_id!(
    /// Identifier of a shipping address.
    AddressId
);
row_id!(
    /// Identifier of a catalog product.
    ProductId
);
row_id!(
    /// Identifier of a placed order.
    OrderId
);
row_id!(
    /// Identifier of a single order line.
    OrderItemId
);
