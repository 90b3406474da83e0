//! Line mutations: add, remove, merge, checkout selection.

use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use super::{resolve_tier, Cart};
use crate::domain::errors::CartError;
use crate::domain::events::CartEvent;
use crate::domain::records::CartItem;
use crate::domain::value_objects::{ShopId, VariantId, VendorId};
use crate::Result;

/// What [`Cart::combine`] absorbed from the other cart.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub absorbed: usize,
    /// Variants that could not be added in the quantity merged.
    pub skipped: Vec<VariantId>,
}

impl Cart {
    /// Adds `quantity` units of `variant_id`, or bumps the existing line.
    ///
    /// `mark_checked` only ever sets the checked flag; it never clears it.
    #[instrument(skip(self), fields(cart_key = %self.value.key))]
    pub async fn add_item(
        &mut self,
        vendor_id: VendorId,
        shop_id: ShopId,
        variant_id: VariantId,
        quantity: u32,
        mark_checked: bool,
    ) -> Result<CartItem> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let mut snapshot = self
            .ctx
            .catalog
            .get_snapshot(variant_id)
            .await?
            .ok_or(CartError::VariantNotFound(variant_id))?;
        if !snapshot.is_on_shelves() {
            return Err(CartError::NotOnShelves(variant_id));
        }
        if snapshot.stock == 0 {
            return Err(CartError::OutOfStock(variant_id));
        }

        if let Some(line) = self.line_mut(variant_id) {
            let requested = line.quantity.saturating_add(quantity);
            if requested > snapshot.stock {
                return Err(CartError::InsufficientStock {
                    variant_id,
                    requested,
                    available: snapshot.stock,
                    line: Some(Box::new(line.clone())),
                });
            }
            line.quantity = requested;
            if mark_checked {
                line.checked = true;
            }
            let line = line.clone();
            debug!(quantity = line.quantity, "cart line bumped");
            self.raise_event(CartEvent::ItemAdded {
                cart_key: self.value.key.clone(),
                variant_id,
                quantity,
            });
            return Ok(line);
        }

        if snapshot.tier_pricing {
            let tier = resolve_tier(&self.ctx, self.value.buyer_id).await;
            if tier > 0 {
                snapshot.sale_price = self.ctx.catalog.get_tier_price(variant_id, tier).await?;
            }
        }

        let mut line = CartItem::from_snapshot(self.value.id, vendor_id, shop_id, &snapshot, quantity);
        line.checked = mark_checked;
        self.lines_mut().push(line.clone());
        debug!("cart line added");
        self.raise_event(CartEvent::ItemAdded { cart_key: self.value.key.clone(), variant_id, quantity });
        Ok(line)
    }

    /// Takes `quantity` units of `variant_id` out of the cart.
    ///
    /// The line stays in memory at zero until the next [`Cart::save`]
    /// deletes it. Unknown variants are ignored.
    pub fn remove_item(&mut self, variant_id: VariantId, quantity: u32) -> Result<()> {
        if self.value.items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        let remaining = self
            .lines_mut()
            .iter_mut()
            .find(|i| i.variant_id == variant_id)
            .map(|line| {
                line.quantity = line.quantity.saturating_sub(quantity);
                line.quantity
            });
        if let Some(remaining) = remaining {
            self.raise_event(CartEvent::ItemRemoved {
                cart_key: self.value.key.clone(),
                variant_id,
                remaining,
            });
        }
        Ok(())
    }

    /// Folds `other` into this cart and destroys it.
    ///
    /// Lines that cannot be added, whether rejected by the catalog or lost to
    /// a collaborator failure, are skipped. `other` is destroyed either way.
    #[instrument(skip_all, fields(cart_key = %self.value.key, absorbed_key = %other.value.key))]
    pub async fn combine(&mut self, mut other: Cart) -> Result<MergeOutcome> {
        if self.same_root(&other) {
            debug!("same cart, nothing to merge");
            return Ok(MergeOutcome::default());
        }

        let mut outcome = MergeOutcome::default();
        for line in other.value.items.iter().filter(|l| l.quantity > 0) {
            match self
                .add_item(line.vendor_id, line.shop_id, line.variant_id, line.quantity, line.checked)
                .await
            {
                Ok(_) => outcome.absorbed += 1,
                Err(error) => {
                    if error.is_rejection() {
                        debug!(variant_id = %line.variant_id, %error, "line rejected during merge");
                    } else {
                        warn!(variant_id = %line.variant_id, %error, "skipping line during merge");
                    }
                    outcome.skipped.push(line.variant_id);
                }
            }
        }
        other.destroy().await?;

        self.snapshots = None;
        self.summary = None;
        info!(absorbed = outcome.absorbed, skipped = outcome.skipped.len(), "carts merged");
        self.raise_event(CartEvent::Merged {
            cart_key: self.value.key.clone(),
            absorbed_key: other.value.key.clone(),
            absorbed: outcome.absorbed,
            skipped: outcome.skipped.len(),
        });
        Ok(outcome)
    }

    /// Checks exactly the lines in `variant_ids` and unchecks the rest.
    ///
    /// Saved only when the new selection validates; otherwise the flags stay
    /// changed in memory and the validation error is returned.
    pub async fn mark_checked(&mut self, variant_ids: &[VariantId]) -> Result<()> {
        let selected: HashSet<VariantId> = variant_ids.iter().copied().collect();
        for line in &mut self.value.items {
            line.checked = selected.contains(&line.variant_id);
        }
        self.validate().await?;
        self.save().await?;
        Ok(())
    }
}
