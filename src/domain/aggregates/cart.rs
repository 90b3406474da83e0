//! Cart Aggregate
//!
//! A [`Cart`] wraps one persisted [`CartRecord`] together with the
//! collaborators it needs to validate and enrich its lines. Instances are
//! request scoped: load or create one, run operations, [`Cart::save`].

mod checkout;
mod items;

#[cfg(test)]
mod fixtures;

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

use crate::domain::errors::CartError;
use crate::domain::events::CartEvent;
use crate::domain::ports::{DeliveryAddress, Shop, Snapshot};
use crate::domain::records::{CartItem, CartRecord};
use crate::domain::value_objects::{BuyerId, CartId, ItemId, VariantId};
use crate::domain::CartContext;
use crate::Result;

pub use checkout::{CheckoutLine, Fees, Settlement};
pub use items::MergeOutcome;

#[derive(Debug)]
pub struct Cart {
    value: CartRecord,
    ctx: CartContext,
    /// Snapshots of the current line set, fetched in one batch.
    snapshots: Option<HashMap<VariantId, Snapshot>>,
    summary: Option<String>,
    shop: Option<Shop>,
    delivery: Option<DeliveryAddress>,
    events: Vec<CartEvent>,
}

impl Cart {
    /// A fresh, unsaved cart with a new key.
    pub fn create(ctx: CartContext, buyer_id: BuyerId) -> Self {
        Self::wrap(ctx, CartRecord::fresh(buyer_id))
    }

    /// Wraps a stored cart and refreshes the display data of its lines.
    ///
    /// Stock is not checked here; see [`Cart::validate`].
    pub async fn hydrate(ctx: CartContext, record: CartRecord) -> Result<Self> {
        let mut cart = Self::wrap(ctx, record);
        cart.refresh_display_data().await?;
        Ok(cart)
    }

    pub async fn load(ctx: CartContext, id: CartId) -> Result<Option<Self>> {
        match ctx.store.find_cart(id).await? {
            Some(record) => Ok(Some(Self::hydrate(ctx, record).await?)),
            None => Ok(None),
        }
    }

    pub async fn load_by_key(ctx: CartContext, key: &str) -> Result<Option<Self>> {
        match ctx.store.find_cart_by_key(key).await? {
            Some(record) => Ok(Some(Self::hydrate(ctx, record).await?)),
            None => Ok(None),
        }
    }

    pub async fn load_for_buyer(ctx: CartContext, buyer_id: BuyerId) -> Result<Option<Self>> {
        match ctx.store.find_current_cart_for_buyer(buyer_id).await? {
            Some(record) => Ok(Some(Self::hydrate(ctx, record).await?)),
            None => Ok(None),
        }
    }

    fn wrap(ctx: CartContext, value: CartRecord) -> Self {
        Self { value, ctx, snapshots: None, summary: None, shop: None, delivery: None, events: vec![] }
    }

    pub fn id(&self) -> CartId { self.value.id }
    pub fn key(&self) -> &str { &self.value.key }
    pub fn buyer_id(&self) -> BuyerId { self.value.buyer_id }
    pub fn items(&self) -> &[CartItem] { &self.value.items }
    pub fn item_count(&self) -> usize { self.value.items.len() }
    pub fn is_empty(&self) -> bool { self.value.items.is_empty() }
    pub fn record(&self) -> &CartRecord { &self.value }
    pub fn into_record(self) -> CartRecord { self.value }

    pub fn take_events(&mut self) -> Vec<CartEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: CartEvent) { self.events.push(e); }

    /// Same persisted cart, or the same key for carts not saved yet.
    fn same_root(&self, other: &Cart) -> bool {
        (self.value.id.is_set() && self.value.id == other.value.id) || self.value.key == other.value.key
    }

    /// The only structural access to the line list. Clears every value
    /// derived from the line set.
    fn lines_mut(&mut self) -> &mut Vec<CartItem> {
        self.snapshots = None;
        self.summary = None;
        &mut self.value.items
    }

    /// Line for `variant_id`. The line set stays the same, so snapshots are kept.
    fn line_mut(&mut self, variant_id: VariantId) -> Option<&mut CartItem> {
        self.summary = None;
        self.value.items.iter_mut().find(|i| i.variant_id == variant_id)
    }

    async fn ensure_snapshots(&mut self) -> Result<()> {
        if self.snapshots.is_some() {
            return Ok(());
        }
        let ids: Vec<VariantId> = self.value.items.iter().map(|i| i.variant_id).collect();
        let snapshots = if ids.is_empty() {
            HashMap::new()
        } else {
            self.ctx.catalog.get_snapshots(&ids).await?
        };
        self.snapshots = Some(snapshots);
        Ok(())
    }

    /// Copies current catalog display and price data onto every line.
    ///
    /// Lines whose variant the catalog no longer knows keep their cached data.
    #[instrument(skip(self), fields(cart_key = %self.value.key))]
    pub async fn refresh_display_data(&mut self) -> Result<()> {
        self.ensure_snapshots().await?;
        let ctx = self.ctx.clone();
        let buyer_id = self.value.buyer_id;
        let Some(snapshots) = self.snapshots.as_ref() else {
            return Ok(());
        };

        let mut tier: Option<i32> = None;
        for item in &mut self.value.items {
            let Some(snapshot) = snapshots.get(&item.variant_id) else {
                debug!(variant_id = %item.variant_id, "no snapshot, keeping cached display data");
                continue;
            };
            item.apply_snapshot(snapshot);
            if !snapshot.tier_pricing {
                continue;
            }
            let level = match tier {
                Some(level) => level,
                None => *tier.insert(resolve_tier(&ctx, buyer_id).await),
            };
            if level > 0 {
                match ctx.catalog.get_tier_price(item.variant_id, level).await {
                    Ok(price) => item.sale_price = price,
                    Err(error) => {
                        warn!(variant_id = %item.variant_id, %error, "tier price unavailable, keeping sale price");
                    }
                }
            }
        }
        self.summary = None;
        Ok(())
    }

    /// Checks every checked line against the live catalog: present, on
    /// shelves and stocked for the requested quantity.
    pub async fn validate(&self) -> Result<()> {
        if self.value.items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        for item in self.value.items.iter().filter(|i| i.checked) {
            let snapshot = self
                .ctx
                .catalog
                .get_snapshot(item.variant_id)
                .await?
                .ok_or(CartError::VariantNotFound(item.variant_id))?;
            if !snapshot.is_on_shelves() {
                return Err(CartError::NotOnShelves(item.variant_id));
            }
            if snapshot.stock == 0 {
                return Err(CartError::OutOfStock(item.variant_id));
            }
            if snapshot.stock < item.quantity {
                return Err(CartError::InsufficientStock {
                    variant_id: item.variant_id,
                    requested: item.quantity,
                    available: snapshot.stock,
                    line: None,
                });
            }
        }
        Ok(())
    }

    /// Persists the header, then every line. Zero-quantity lines are deleted.
    ///
    /// A failing line write does not stop the remaining ones; the first such
    /// error is returned once all lines were attempted.
    #[instrument(skip(self), fields(cart_key = %self.value.key))]
    pub async fn save(&mut self) -> Result<CartId> {
        self.value.updated_at = Utc::now();
        let id = self.ctx.store.save_cart(&self.value).await?;
        self.value.id = id;

        let mut first_error: Option<CartError> = None;
        let mut undeleted: HashSet<ItemId> = HashSet::new();
        for item in &mut self.value.items {
            if item.quantity == 0 {
                if !item.id.is_set() {
                    continue;
                }
                if let Err(error) = self.ctx.store.delete_item(item.id).await {
                    warn!(item_id = %item.id, %error, "failed to delete emptied cart line");
                    undeleted.insert(item.id);
                    first_error.get_or_insert(error.into());
                }
                continue;
            }

            item.cart_id = id;
            match self.ctx.store.save_item(item).await {
                Ok(item_id) => item.id = item_id,
                Err(error) => {
                    warn!(variant_id = %item.variant_id, %error, "failed to save cart line");
                    first_error.get_or_insert(error.into());
                }
            }
        }

        if self.value.items.iter().any(|i| i.quantity == 0) {
            self.lines_mut().retain(|i| i.quantity > 0 || undeleted.contains(&i.id));
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                debug!(cart_id = %id, lines = self.value.items.len(), "cart saved");
                Ok(id)
            }
        }
    }

    /// Deletes every line, then the header.
    #[instrument(skip(self), fields(cart_key = %self.value.key))]
    pub async fn destroy(&mut self) -> Result<()> {
        self.snapshots = None;
        self.summary = None;
        if self.value.id.is_set() {
            self.ctx.store.delete_all_items(self.value.id).await?;
            self.ctx.store.delete_cart(self.value.id).await?;
        }
        debug!("cart destroyed");
        Ok(())
    }
}

/// Member tier of `buyer_id`, zero when anonymous or unresolvable.
async fn resolve_tier(ctx: &CartContext, buyer_id: BuyerId) -> i32 {
    if !buyer_id.is_set() {
        return 0;
    }
    match ctx.members.get_member(buyer_id).await {
        Ok(Some(member)) => member.tier(),
        Ok(None) => {
            warn!(%buyer_id, "buyer not found, using base prices");
            0
        }
        Err(error) => {
            warn!(%buyer_id, %error, "tier lookup failed, using base prices");
            0
        }
    }
}
