//! Cart Service
//!
//! Resolves the cart a request works on and closes it out after checkout.

use tracing::{debug, info, instrument};

use crate::domain::aggregates::Cart;
use crate::domain::value_objects::BuyerId;
use crate::domain::CartContext;
use crate::Result;

#[derive(Clone, Debug)]
pub struct CartService {
    ctx: CartContext,
}

impl CartService {
    pub fn new(ctx: CartContext) -> Self { Self { ctx } }

    pub fn context(&self) -> &CartContext { &self.ctx }

    /// A fresh cart, not saved until its first [`Cart::save`].
    pub fn create(&self, buyer_id: BuyerId) -> Cart {
        Cart::create(self.ctx.clone(), buyer_id)
    }

    /// The cart for a request carrying an optional cart key and buyer.
    ///
    /// Anonymous requests get the keyed cart, or a fresh one. For a buyer,
    /// an unowned keyed cart is folded into the buyer's current cart (or
    /// claimed when there is none); a keyed cart owned by someone else is
    /// ignored.
    #[instrument(skip(self))]
    pub async fn open(&self, key: Option<&str>, buyer_id: BuyerId) -> Result<Cart> {
        let keyed = match key.filter(|k| !k.is_empty()) {
            Some(key) => Cart::load_by_key(self.ctx.clone(), key).await?,
            None => None,
        };

        if !buyer_id.is_set() {
            return Ok(match keyed {
                Some(cart) => cart,
                None => self.create(BuyerId::TRANSIENT),
            });
        }

        let keyed = keyed.filter(|cart| {
            let owner = cart.buyer_id();
            let claimable = !owner.is_set() || owner == buyer_id;
            if !claimable {
                debug!(cart_key = %cart.key(), %owner, "keyed cart belongs to another buyer");
            }
            claimable
        });
        let current = Cart::load_for_buyer(self.ctx.clone(), buyer_id).await?;

        match (current, keyed) {
            (Some(mut current), Some(keyed)) if keyed.key() != current.key() => {
                let outcome = current.combine(keyed).await?;
                current.save().await?;
                info!(cart_key = %current.key(), absorbed = outcome.absorbed, "anonymous cart merged on login");
                Ok(current)
            }
            (Some(current), _) => Ok(current),
            (None, Some(mut keyed)) => {
                if !keyed.buyer_id().is_set() {
                    keyed.bind_buyer(buyer_id).await?;
                }
                Ok(keyed)
            }
            (None, None) => Ok(self.create(buyer_id)),
        }
    }

    /// Releases the lines of a placed order and destroys the cart once
    /// nothing is left in it. Returns whether the cart was destroyed.
    #[instrument(skip_all, fields(cart_key = %cart.key()))]
    pub async fn finish_checkout(&self, cart: &mut Cart) -> Result<bool> {
        let fully_settled = cart.release().await?;
        if fully_settled {
            cart.destroy().await?;
        }
        Ok(fully_settled)
    }
}
