//! Cart domain errors.

use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;

use crate::domain::records::CartItem;
use crate::domain::value_objects::{AddressId, BuyerId, ShopId, VariantId};

#[derive(Error, Debug)]
pub enum CartError {
    #[error("shopping cart is empty")]
    EmptyCart,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    #[error("variant {0} is not on shelves")]
    NotOnShelves(VariantId),

    #[error("variant {0} is out of stock")]
    OutOfStock(VariantId),

    #[error("insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: VariantId,
        requested: u32,
        available: u32,
        /// The existing line, left unmodified.
        line: Option<Box<CartItem>>,
    },

    #[error("cart is already bound to buyer {0}")]
    AlreadyBound(BuyerId),

    #[error("cart has no buyer")]
    NoBuyer,

    #[error("member {0} not found")]
    MemberNotFound(BuyerId),

    #[error("address {0} not found")]
    AddressNotFound(AddressId),

    #[error("invalid delivery address {0}")]
    InvalidAddress(AddressId),

    #[error("shop {0} not found")]
    ShopNotFound(ShopId),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CartError {
    /// Whether the error reflects the catalog state of a single line rather
    /// than a collaborator failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantity
                | Self::VariantNotFound(_)
                | Self::NotOnShelves(_)
                | Self::OutOfStock(_)
                | Self::InsufficientStock { .. }
        )
    }
}

/// Failure of a catalog, member or shop lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("gateway rejected request: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cart not found")]
    NotFound,

    #[error("conflicting cart write")]
    Conflict,

    #[error("corrupt cart row: {0}")]
    Corrupt(String),

    #[error("storage error")]
    Sql(#[source] sqlx::Error),

    #[error("migration failed")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::Conflict,
            Some(_) | None => Self::Sql(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_line_scoped() {
        assert!(CartError::OutOfStock(VariantId::new(1)).is_rejection());
        assert!(CartError::InsufficientStock {
            variant_id: VariantId::new(1),
            requested: 3,
            available: 2,
            line: None,
        }
        .is_rejection());
        assert!(!CartError::EmptyCart.is_rejection());
        assert!(!CartError::from(GatewayError::Unavailable("catalog".into())).is_rejection());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(StoreError::from(sqlx::Error::RowNotFound), StoreError::NotFound));
    }

    #[test]
    fn test_error_messages() {
        let err = CartError::InsufficientStock {
            variant_id: VariantId::new(101),
            requested: 12,
            available: 5,
            line: None,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for variant 101: requested 12, available 5"
        );
    }
}
