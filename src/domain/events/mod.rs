//! Domain events
use crate::domain::value_objects::{BuyerId, VariantId};

/// Facts raised by the cart aggregate, drained with
/// [`Cart::take_events`](crate::domain::aggregates::Cart::take_events).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded { cart_key: String, variant_id: VariantId, quantity: u32 },
    ItemRemoved { cart_key: String, variant_id: VariantId, remaining: u32 },
    BuyerBound { cart_key: String, buyer_id: BuyerId },
    Merged { cart_key: String, absorbed_key: String, absorbed: usize, skipped: usize },
    Released { cart_key: String, fully_settled: bool },
}
