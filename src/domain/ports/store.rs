//! Cart Store

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::errors::StoreError;
use crate::domain::records::{CartItem, CartRecord};
use crate::domain::value_objects::{BuyerId, CartId, ItemId};

/// Durable cart persistence.
///
/// Header and line writes are individually atomic; nothing spans them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Upserts the cart header (its `items` are ignored) and returns its id.
    async fn save_cart(&self, cart: &CartRecord) -> Result<CartId, StoreError>;

    /// Upserts a single line and returns its id.
    async fn save_item(&self, item: &CartItem) -> Result<ItemId, StoreError>;

    async fn delete_item(&self, item_id: ItemId) -> Result<(), StoreError>;

    async fn delete_all_items(&self, cart_id: CartId) -> Result<(), StoreError>;

    async fn delete_cart(&self, cart_id: CartId) -> Result<(), StoreError>;

    /// The buyer's most recently updated cart, with its lines.
    async fn find_current_cart_for_buyer(
        &self,
        buyer_id: BuyerId,
    ) -> Result<Option<CartRecord>, StoreError>;

    async fn find_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>, StoreError>;

    async fn find_cart_by_key(&self, key: &str) -> Result<Option<CartRecord>, StoreError>;
}
