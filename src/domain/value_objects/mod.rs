//! Value Objects for the cart domain

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Identifier of a value the store has not assigned yet.
            pub const TRANSIENT: Self = Self(0);

            pub const fn new(value: i64) -> Self { Self(value) }
            pub const fn get(self) -> i64 { self.0 }
            pub const fn is_set(self) -> bool { self.0 > 0 }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self { Self(value) }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }
    };
}

surrogate_id!(
    /// Store-assigned cart identifier.
    CartId
);
surrogate_id!(
    /// Store-assigned cart line identifier.
    ItemId
);
surrogate_id!(
    /// Catalog identity of a purchasable unit (SKU).
    VariantId
);
surrogate_id!(
    /// Member identifier; zero for anonymous carts.
    BuyerId
);
surrogate_id!(ShopId);
surrogate_id!(VendorId);
surrogate_id!(AddressId);

/// Generates an externally visible cart key.
///
/// UUIDv7 packs a millisecond timestamp with random bits, which keeps keys
/// roughly time ordered and unique across concurrent creations.
pub fn generate_cart_key() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Shelf state of a catalog variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShelfState {
    #[default]
    Off,
    On,
}
