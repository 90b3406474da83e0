//! Buyer binding, settlement preparation and derived reads.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use super::Cart;
use crate::domain::errors::CartError;
use crate::domain::events::CartEvent;
use crate::domain::ports::{DeliveryAddress, Shop};
use crate::domain::records::CartItem;
use crate::domain::value_objects::{AddressId, BuyerId, ShopId, VariantId};
use crate::Result;

/// Totals over the checked lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Fees {
    /// Sum of `quantity * unit_price`.
    pub total: Decimal,
    /// Sum of `quantity * sale_price`.
    pub sale: Decimal,
}

/// Everything checkout needs besides the lines themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub shop: Option<Shop>,
    pub address: Option<DeliveryAddress>,
    pub payment_option: i32,
    pub delivery_option: i32,
}

/// A checked line as handed to order placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutLine {
    pub variant_id: VariantId,
    pub title: String,
    pub image: String,
    pub quantity: u32,
}

impl Cart {
    /// Claims the cart for `buyer_id` and folds in the buyer's existing cart.
    ///
    /// The binding only sticks once the cart is saved; on failure the cart
    /// is unbound again and the call may be retried.
    #[instrument(skip(self), fields(cart_key = %self.value.key))]
    pub async fn bind_buyer(&mut self, buyer_id: BuyerId) -> Result<()> {
        if self.value.buyer_id.is_set() {
            return Err(CartError::AlreadyBound(self.value.buyer_id));
        }
        if !buyer_id.is_set() {
            return Err(CartError::NoBuyer);
        }

        // Merged lines are priced for the new buyer.
        self.value.buyer_id = buyer_id;
        if let Err(error) = self.absorb_current_and_save(buyer_id).await {
            warn!(%buyer_id, %error, "binding buyer failed, cart left unbound");
            self.value.buyer_id = BuyerId::TRANSIENT;
            return Err(error);
        }

        self.raise_event(CartEvent::BuyerBound { cart_key: self.value.key.clone(), buyer_id });
        info!(%buyer_id, "buyer bound to cart");
        Ok(())
    }

    async fn absorb_current_and_save(&mut self, buyer_id: BuyerId) -> Result<()> {
        if let Some(existing) = self.ctx.store.find_current_cart_for_buyer(buyer_id).await? {
            if existing.key != self.value.key {
                debug!(existing_key = %existing.key, "merging buyer's current cart");
                let existing = Cart::hydrate(self.ctx.clone(), existing).await?;
                self.combine(existing).await?;
            }
        }
        self.save().await?;
        Ok(())
    }

    /// Chooses one of the buyer's saved addresses and saves the cart.
    pub async fn set_delivery_address(&mut self, address_id: AddressId) -> Result<()> {
        let buyer_id = self.value.buyer_id;
        if !buyer_id.is_set() {
            return Err(CartError::NoBuyer);
        }
        let member = self
            .ctx
            .members
            .get_member(buyer_id)
            .await?
            .ok_or(CartError::MemberNotFound(buyer_id))?;
        let address = member
            .addresses()
            .get(address_id)
            .cloned()
            .ok_or(CartError::AddressNotFound(address_id))?;
        self.delivery = Some(address);
        self.store_delivery_address(address_id).await
    }

    async fn store_delivery_address(&mut self, address_id: AddressId) -> Result<()> {
        self.value.delivery_address_id = address_id;
        self.save().await?;
        Ok(())
    }

    /// Records checkout intent. Nothing is saved.
    ///
    /// A nonzero `shop_id` must resolve. The address is only resolved for
    /// bound carts; every lookup happens before anything is changed.
    #[instrument(skip(self), fields(cart_key = %self.value.key))]
    pub async fn prepare_settlement(
        &mut self,
        shop_id: ShopId,
        payment_option: i32,
        delivery_option: i32,
        address_id: Option<AddressId>,
    ) -> Result<()> {
        let shop = if shop_id.is_set() {
            let shop = self.ctx.shops.get_shop(shop_id).await?.ok_or(CartError::ShopNotFound(shop_id))?;
            Some(shop)
        } else {
            None
        };

        let buyer_id = self.value.buyer_id;
        let address = match address_id.filter(|id| id.is_set()) {
            Some(address_id) if buyer_id.is_set() => {
                let member = self
                    .ctx
                    .members
                    .get_member(buyer_id)
                    .await?
                    .ok_or(CartError::MemberNotFound(buyer_id))?;
                let address = member
                    .addresses()
                    .get(address_id)
                    .cloned()
                    .ok_or(CartError::InvalidAddress(address_id))?;
                Some(address)
            }
            _ => None,
        };

        if let Some(shop) = shop {
            self.value.shop_id = shop.id;
            self.shop = Some(shop);
        }
        if let Some(address) = address {
            self.value.delivery_address_id = address.id;
            self.delivery = Some(address);
        }
        self.value.payment_option = payment_option;
        self.value.delivery_option = delivery_option;
        Ok(())
    }

    /// Shop, address and options for checkout.
    ///
    /// Without a chosen address the buyer's default one is used, and that
    /// choice is saved onto the cart.
    pub async fn settlement(&mut self) -> Result<Settlement> {
        if self.value.shop_id.is_set() && self.shop.is_none() {
            self.shop = self.ctx.shops.get_shop(self.value.shop_id).await?;
        }

        let buyer_id = self.value.buyer_id;
        if self.delivery.is_none() && buyer_id.is_set() {
            let member = self
                .ctx
                .members
                .get_member(buyer_id)
                .await?
                .ok_or(CartError::MemberNotFound(buyer_id))?;
            if self.value.delivery_address_id.is_set() {
                self.delivery = member.addresses().get(self.value.delivery_address_id).cloned();
            } else if let Some(address) = member.addresses().default_address().cloned() {
                let address_id = address.id;
                self.delivery = Some(address);
                self.store_delivery_address(address_id).await?;
            }
        }

        Ok(Settlement {
            shop: self.shop.clone(),
            address: self.delivery.clone(),
            payment_option: self.value.payment_option,
            delivery_option: self.value.delivery_option,
        })
    }

    /// Drops the lines an order was just placed for.
    ///
    /// Returns `true` when every line was checked; the cart is then left as
    /// is for the caller to destroy. Otherwise the checked lines are removed
    /// and saved away, and `false` is returned.
    #[instrument(skip(self), fields(cart_key = %self.value.key))]
    pub async fn release(&mut self) -> Result<bool> {
        let settled: Vec<(VariantId, u32)> = self
            .value
            .items
            .iter()
            .filter(|i| i.checked)
            .map(|i| (i.variant_id, i.quantity))
            .collect();

        let fully_settled = settled.len() == self.value.items.len();
        if !fully_settled {
            for (variant_id, quantity) in settled {
                self.remove_item(variant_id, quantity)?;
            }
            self.save().await?;
        }
        debug!(fully_settled, "cart released");
        self.raise_event(CartEvent::Released { cart_key: self.value.key.clone(), fully_settled });
        Ok(fully_settled)
    }

    pub fn total_and_sale_fee(&self) -> Fees {
        self.value.items.iter().filter(|i| i.checked).fold(Fees::default(), |fees, i| Fees {
            total: fees.total + i.line_total(),
            sale: fees.sale + i.line_sale_total(),
        })
    }

    /// One `title(short title)*quantity` row per line, memoized until the
    /// lines change.
    pub fn summary_text(&mut self) -> &str {
        let items = &self.value.items;
        self.summary.get_or_insert_with(|| {
            items
                .iter()
                .filter(|i| i.quantity > 0)
                .map(|i| {
                    if i.short_title.is_empty() {
                        format!("{}*{}", i.title, i.quantity)
                    } else {
                        format!("{}({})*{}", i.title, i.short_title, i.quantity)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    pub fn items_by_variant(&self) -> HashMap<VariantId, &CartItem> {
        self.value.items.iter().map(|i| (i.variant_id, i)).collect()
    }

    pub fn checkout_lines(&self) -> Vec<CheckoutLine> {
        self.value
            .items
            .iter()
            .filter(|i| i.checked && i.quantity > 0)
            .map(|i| CheckoutLine {
                variant_id: i.variant_id,
                title: i.title.clone(),
                image: i.image.clone(),
                quantity: i.quantity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::domain::errors::{GatewayError, StoreError};
    use crate::domain::ports::{CartStore, MockCartStore, MockMemberGateway};
    use crate::domain::value_objects::CartId;
    use std::sync::Arc;

    async fn bound_cart(backend: &Backend, buyer: i64) -> Cart {
        backend.members.insert(member(BuyerId::new(buyer), 0)).await;
        let mut cart = Cart::create(backend.context(), BuyerId::TRANSIENT);
        cart.bind_buyer(BuyerId::new(buyer)).await.unwrap();
        cart
    }

    #[tokio::test]
    async fn test_bind_buyer_twice_fails() {
        let backend = Backend::new();
        let mut cart = bound_cart(&backend, 8).await;
        let result = cart.bind_buyer(BuyerId::new(9)).await;
        assert!(matches!(result, Err(CartError::AlreadyBound(b)) if b == BuyerId::new(8)));
        assert_eq!(cart.buyer_id(), BuyerId::new(8));
        assert!(cart.id().is_set());
    }

    #[tokio::test]
    async fn test_bind_buyer_merges_existing_cart() {
        let backend = Backend::new();
        backend.stock(5, 10).await;

        let mut existing = Cart::create(backend.context(), BuyerId::new(8));
        existing.add_item(VENDOR, SHOP, VariantId::new(5), 2, false).await.unwrap();
        let existing_id = existing.save().await.unwrap();

        let mut anonymous = Cart::create(backend.context(), BuyerId::TRANSIENT);
        anonymous.add_item(VENDOR, SHOP, VariantId::new(5), 1, true).await.unwrap();
        anonymous.bind_buyer(BuyerId::new(8)).await.unwrap();

        assert_eq!(anonymous.items()[0].quantity, 3);
        assert!(backend.store.find_cart(existing_id).await.unwrap().is_none());
        let current = backend.store.find_current_cart_for_buyer(BuyerId::new(8)).await.unwrap().unwrap();
        assert_eq!(current.key, anonymous.key());
        assert_eq!(current.items.len(), 1);
    }

    #[tokio::test]
    async fn test_bind_buyer_failure_leaves_cart_unbound() {
        let mut store = MockCartStore::new();
        store
            .expect_find_current_cart_for_buyer()
            .times(2)
            .returning(|_| Err(StoreError::Conflict));
        let backend = Backend::new();
        let mut cart = Cart::create(backend.context_with_store(Arc::new(store)), BuyerId::TRANSIENT);

        let first = cart.bind_buyer(BuyerId::new(8)).await;
        assert!(matches!(first, Err(CartError::Store(StoreError::Conflict))));
        assert!(!cart.buyer_id().is_set());
        assert!(cart.take_events().is_empty());

        let retry = cart.bind_buyer(BuyerId::new(8)).await;
        assert!(matches!(retry, Err(CartError::Store(StoreError::Conflict))));
    }

    #[tokio::test]
    async fn test_bind_buyer_raises_event_once_saved() {
        let backend = Backend::new();
        let mut cart = bound_cart(&backend, 8).await;
        let events = cart.take_events();
        assert_eq!(
            events,
            vec![CartEvent::BuyerBound { cart_key: cart.key().to_owned(), buyer_id: BuyerId::new(8) }]
        );
        let stored = backend.store.find_cart(cart.id()).await.unwrap().unwrap();
        assert_eq!(stored.buyer_id, BuyerId::new(8));
    }

    #[tokio::test]
    async fn test_set_delivery_address() {
        let backend = Backend::new();
        let mut anonymous = Cart::create(backend.context(), BuyerId::TRANSIENT);
        assert!(matches!(anonymous.set_delivery_address(AddressId::new(1)).await, Err(CartError::NoBuyer)));

        let mut cart = bound_cart(&backend, 8).await;
        assert!(matches!(
            cart.set_delivery_address(AddressId::new(99)).await,
            Err(CartError::AddressNotFound(_))
        ));
        cart.set_delivery_address(AddressId::new(2)).await.unwrap();
        let stored = backend.store.find_cart(cart.id()).await.unwrap().unwrap();
        assert_eq!(stored.delivery_address_id, AddressId::new(2));

        let mut orphan = Cart::create(backend.context(), BuyerId::new(77));
        assert!(matches!(
            orphan.set_delivery_address(AddressId::new(2)).await,
            Err(CartError::MemberNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_prepare_settlement_resolves_shop_and_address() {
        let backend = Backend::new();
        backend.shops.insert(shop(3)).await;
        let mut cart = bound_cart(&backend, 8).await;

        cart.prepare_settlement(ShopId::new(3), 2, 4, Some(AddressId::new(1))).await.unwrap();
        let record = cart.record();
        assert_eq!(record.shop_id, ShopId::new(3));
        assert_eq!(record.delivery_address_id, AddressId::new(1));
        assert_eq!((record.payment_option, record.delivery_option), (2, 4));

        let settlement = cart.settlement().await.unwrap();
        assert_eq!(settlement.shop.map(|s| s.id), Some(ShopId::new(3)));
        assert_eq!(settlement.address.map(|a| a.id), Some(AddressId::new(1)));
    }

    #[tokio::test]
    async fn test_prepare_settlement_failures_leave_cart_unchanged() {
        let backend = Backend::new();
        backend.shops.insert(shop(3)).await;
        let mut cart = bound_cart(&backend, 8).await;

        let unknown_shop = cart.prepare_settlement(ShopId::new(4), 2, 2, None).await;
        assert!(matches!(unknown_shop, Err(CartError::ShopNotFound(_))));
        let bad_address = cart.prepare_settlement(ShopId::new(3), 2, 2, Some(AddressId::new(42))).await;
        assert!(matches!(bad_address, Err(CartError::InvalidAddress(_))));

        let record = cart.record();
        assert_eq!(record.shop_id, ShopId::TRANSIENT);
        assert_eq!((record.payment_option, record.delivery_option), (1, 1));
    }

    #[tokio::test]
    async fn test_prepare_settlement_ignores_address_of_anonymous_cart() {
        let backend = Backend::new();
        let mut cart = Cart::create(backend.context(), BuyerId::TRANSIENT);
        cart.prepare_settlement(ShopId::TRANSIENT, 3, 1, Some(AddressId::new(1))).await.unwrap();
        assert_eq!(cart.record().delivery_address_id, AddressId::TRANSIENT);
        assert_eq!(cart.record().payment_option, 3);
    }

    #[tokio::test]
    async fn test_prepare_settlement_propagates_member_failure() {
        let mut members = MockMemberGateway::new();
        members
            .expect_get_member()
            .returning(|_| Err(GatewayError::Unavailable("members".into())));
        let backend = Backend::new();
        let ctx = backend.context_with(backend.catalog.clone(), Arc::new(members));
        let mut cart = Cart::create(ctx, BuyerId::new(8));

        let result = cart.prepare_settlement(ShopId::TRANSIENT, 1, 1, Some(AddressId::new(1))).await;
        assert!(matches!(result, Err(CartError::Gateway(_))));
    }

    #[tokio::test]
    async fn test_settlement_defaults_to_saved_default_address() {
        let backend = Backend::new();
        let mut cart = bound_cart(&backend, 8).await;

        let settlement = cart.settlement().await.unwrap();
        assert_eq!(settlement.address.map(|a| a.id), Some(AddressId::new(2)));
        assert!(settlement.shop.is_none());
        let stored = backend.store.find_cart(cart.id()).await.unwrap().unwrap();
        assert_eq!(stored.delivery_address_id, AddressId::new(2));
    }

    #[tokio::test]
    async fn test_release_partial_and_full() {
        let backend = Backend::new();
        backend.stock(1, 5).await;
        backend.stock(2, 5).await;

        let mut full = Cart::create(backend.context(), BuyerId::TRANSIENT);
        full.add_item(VENDOR, SHOP, VariantId::new(1), 1, true).await.unwrap();
        full.add_item(VENDOR, SHOP, VariantId::new(2), 1, true).await.unwrap();
        let before = full.items().to_vec();
        assert!(full.release().await.unwrap());
        assert_eq!(full.items(), before.as_slice());
        assert!(!full.id().is_set());

        let mut partial = Cart::create(backend.context(), BuyerId::TRANSIENT);
        partial.add_item(VENDOR, SHOP, VariantId::new(1), 1, true).await.unwrap();
        partial.add_item(VENDOR, SHOP, VariantId::new(2), 2, false).await.unwrap();
        let id: CartId = partial.save().await.unwrap();
        assert!(!partial.release().await.unwrap());
        assert_eq!(partial.item_count(), 1);
        let stored = backend.store.items_of(id).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].variant_id, VariantId::new(2));
    }

    #[tokio::test]
    async fn test_fees_sum_checked_lines_only() {
        let backend = Backend::new();
        backend.stock(1, 5).await;
        backend.stock(2, 5).await;
        let mut cart = Cart::create(backend.context(), BuyerId::TRANSIENT);
        cart.add_item(VENDOR, SHOP, VariantId::new(1), 2, true).await.unwrap();
        cart.add_item(VENDOR, SHOP, VariantId::new(2), 3, true).await.unwrap();

        let fees = cart.total_and_sale_fee();
        assert_eq!(fees.total, Decimal::new(5000, 2));
        assert_eq!(fees.sale, Decimal::new(4000, 2));

        cart.mark_checked(&[VariantId::new(1)]).await.unwrap();
        let fees = cart.total_and_sale_fee();
        assert_eq!(fees.total, Decimal::new(2000, 2));
        assert_eq!(fees.sale, Decimal::new(1600, 2));
        assert_eq!(cart.checkout_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_text_tracks_line_changes() {
        let backend = Backend::new();
        let mut snap = snapshot(1, 5);
        snap.short_title = "Blue".into();
        backend.catalog.insert(snap).await;
        backend.stock(2, 5).await;
        let mut cart = Cart::create(backend.context(), BuyerId::TRANSIENT);
        cart.add_item(VENDOR, SHOP, VariantId::new(1), 2, false).await.unwrap();
        cart.add_item(VENDOR, SHOP, VariantId::new(2), 1, false).await.unwrap();

        assert_eq!(cart.summary_text(), "Variant 1(Blue)*2\nVariant 2*1");
        cart.remove_item(VariantId::new(2), 1).unwrap();
        assert_eq!(cart.summary_text(), "Variant 1(Blue)*2");
        cart.add_item(VENDOR, SHOP, VariantId::new(1), 1, false).await.unwrap();
        assert_eq!(cart.summary_text(), "Variant 1(Blue)*3");
    }
}
