//! In-memory adapters, for tests and local development.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::{GatewayError, StoreError};
use crate::domain::ports::{
    CartStore, CatalogGateway, Member, MemberGateway, Shop, ShopGateway, Snapshot,
};
use crate::domain::records::{CartItem, CartRecord};
use crate::domain::value_objects::{BuyerId, CartId, ItemId, ShopId, VariantId};
use crate::domain::CartContext;

#[derive(Debug, Default)]
struct StoreState {
    carts: HashMap<CartId, CartRecord>,
    items: HashMap<ItemId, CartItem>,
    last_cart_id: i64,
    last_item_id: i64,
}

impl StoreState {
    fn assemble(&self, header: &CartRecord) -> CartRecord {
        let mut items: Vec<CartItem> =
            self.items.values().filter(|i| i.cart_id == header.id).cloned().collect();
        items.sort_by_key(|i| i.id);
        CartRecord { items, ..header.clone() }
    }
}

/// Cart store backed by hash maps. Ids are assigned sequentially.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    state: Mutex<StoreState>,
}

impl InMemoryCartStore {
    pub fn new() -> Self { Self::default() }

    pub async fn cart_count(&self) -> usize { self.state.lock().await.carts.len() }

    /// Stored lines of `cart_id`, in insertion order.
    pub async fn items_of(&self, cart_id: CartId) -> Vec<CartItem> {
        let state = self.state.lock().await;
        let mut items: Vec<CartItem> = state.items.values().filter(|i| i.cart_id == cart_id).cloned().collect();
        items.sort_by_key(|i| i.id);
        items
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn save_cart(&self, cart: &CartRecord) -> Result<CartId, StoreError> {
        let mut state = self.state.lock().await;
        let clash = state.carts.values().any(|c| c.key == cart.key && c.id != cart.id);
        if clash {
            return Err(StoreError::Conflict);
        }
        let id = if cart.id.is_set() {
            cart.id
        } else {
            state.last_cart_id += 1;
            CartId::new(state.last_cart_id)
        };
        let header = CartRecord { id, items: vec![], ..cart.clone() };
        state.carts.insert(id, header);
        Ok(id)
    }

    async fn save_item(&self, item: &CartItem) -> Result<ItemId, StoreError> {
        let mut state = self.state.lock().await;
        if !state.carts.contains_key(&item.cart_id) {
            return Err(StoreError::NotFound);
        }
        let duplicate = state
            .items
            .values()
            .any(|i| i.cart_id == item.cart_id && i.variant_id == item.variant_id && i.id != item.id);
        if duplicate {
            return Err(StoreError::Conflict);
        }
        let id = if item.id.is_set() {
            item.id
        } else {
            state.last_item_id += 1;
            ItemId::new(state.last_item_id)
        };
        state.items.insert(id, CartItem { id, ..item.clone() });
        Ok(id)
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<(), StoreError> {
        self.state.lock().await.items.remove(&item_id);
        Ok(())
    }

    async fn delete_all_items(&self, cart_id: CartId) -> Result<(), StoreError> {
        self.state.lock().await.items.retain(|_, i| i.cart_id != cart_id);
        Ok(())
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<(), StoreError> {
        self.state.lock().await.carts.remove(&cart_id);
        Ok(())
    }

    async fn find_current_cart_for_buyer(
        &self,
        buyer_id: BuyerId,
    ) -> Result<Option<CartRecord>, StoreError> {
        if !buyer_id.is_set() {
            return Ok(None);
        }
        let state = self.state.lock().await;
        Ok(state
            .carts
            .values()
            .filter(|c| c.buyer_id == buyer_id)
            .max_by_key(|c| (c.updated_at, c.id))
            .map(|c| state.assemble(c)))
    }

    async fn find_cart(&self, cart_id: CartId) -> Result<Option<CartRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.carts.get(&cart_id).map(|c| state.assemble(c)))
    }

    async fn find_cart_by_key(&self, key: &str) -> Result<Option<CartRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.carts.values().find(|c| c.key == key).map(|c| state.assemble(c)))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    snapshots: Mutex<HashMap<VariantId, Snapshot>>,
    tier_prices: Mutex<HashMap<(VariantId, i32), Decimal>>,
}

impl InMemoryCatalog {
    pub async fn insert(&self, snapshot: Snapshot) {
        self.snapshots.lock().await.insert(snapshot.variant_id, snapshot);
    }

    pub async fn remove(&self, variant_id: VariantId) {
        self.snapshots.lock().await.remove(&variant_id);
    }

    pub async fn set_stock(&self, variant_id: VariantId, stock: u32) {
        if let Some(snapshot) = self.snapshots.lock().await.get_mut(&variant_id) {
            snapshot.stock = stock;
        }
    }

    pub async fn set_tier_price(&self, variant_id: VariantId, tier: i32, price: Decimal) {
        self.tier_prices.lock().await.insert((variant_id, tier), price);
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn get_snapshot(&self, variant_id: VariantId) -> Result<Option<Snapshot>, GatewayError> {
        Ok(self.snapshots.lock().await.get(&variant_id).cloned())
    }

    async fn get_snapshots(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<HashMap<VariantId, Snapshot>, GatewayError> {
        let snapshots = self.snapshots.lock().await;
        Ok(variant_ids
            .iter()
            .filter_map(|id| snapshots.get(id).map(|s| (*id, s.clone())))
            .collect())
    }

    /// Falls back to the regular sale price when no tier price is set.
    async fn get_tier_price(&self, variant_id: VariantId, tier: i32) -> Result<Decimal, GatewayError> {
        if let Some(price) = self.tier_prices.lock().await.get(&(variant_id, tier)) {
            return Ok(*price);
        }
        self.snapshots
            .lock()
            .await
            .get(&variant_id)
            .map(|s| s.sale_price)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown variant {variant_id}")))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMembers {
    members: Mutex<HashMap<BuyerId, Member>>,
}

impl InMemoryMembers {
    pub async fn insert(&self, member: Member) {
        self.members.lock().await.insert(member.id, member);
    }
}

#[async_trait]
impl MemberGateway for InMemoryMembers {
    async fn get_member(&self, buyer_id: BuyerId) -> Result<Option<Member>, GatewayError> {
        Ok(self.members.lock().await.get(&buyer_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryShops {
    shops: Mutex<HashMap<ShopId, Shop>>,
}

impl InMemoryShops {
    pub async fn insert(&self, shop: Shop) {
        self.shops.lock().await.insert(shop.id, shop);
    }
}

#[async_trait]
impl ShopGateway for InMemoryShops {
    async fn get_shop(&self, shop_id: ShopId) -> Result<Option<Shop>, GatewayError> {
        Ok(self.shops.lock().await.get(&shop_id).cloned())
    }
}

/// All in-memory adapters, sharing state across the contexts they hand out.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    pub store: Arc<InMemoryCartStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub members: Arc<InMemoryMembers>,
    pub shops: Arc<InMemoryShops>,
}

impl InMemoryBackend {
    pub fn context(&self) -> CartContext {
        CartContext::new(
            self.store.clone(),
            self.catalog.clone(),
            self.members.clone(),
            self.shops.clone(),
        )
    }
}
