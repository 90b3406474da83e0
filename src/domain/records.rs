//! Cart Records
//!
//! Plain persisted values. The [`Cart`](crate::domain::aggregates::Cart)
//! aggregate wraps a [`CartRecord`] and is the only thing that mutates it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ports::Snapshot;
use crate::domain::value_objects::{
    generate_cart_key, AddressId, BuyerId, CartId, ItemId, ShopId, VariantId, VendorId,
};

/// Default payment and delivery option of a fresh cart.
pub const DEFAULT_OPTION: i32 = 1;

/// Cart Record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartId,
    pub key: String,
    pub buyer_id: BuyerId,
    pub shop_id: ShopId,
    pub delivery_address_id: AddressId,
    pub payment_option: i32,
    pub delivery_option: i32,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartRecord {
    /// A fresh, unsaved, empty cart for `buyer_id` (zero for anonymous).
    pub fn fresh(buyer_id: BuyerId) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::TRANSIENT,
            key: generate_cart_key(),
            buyer_id,
            shop_id: ShopId::TRANSIENT,
            delivery_address_id: AddressId::TRANSIENT,
            payment_option: DEFAULT_OPTION,
            delivery_option: DEFAULT_OPTION,
            items: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}

/// CartItem Record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub cart_id: CartId,
    pub vendor_id: VendorId,
    pub shop_id: ShopId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub checked: bool,
    pub unit_price: Decimal,
    pub sale_price: Decimal,
    pub title: String,
    pub short_title: String,
    pub image: String,
    pub product_code: String,
}

impl CartItem {
    /// Builds a new unsaved line with a full copy of the snapshot's display data.
    pub fn from_snapshot(
        cart_id: CartId,
        vendor_id: VendorId,
        shop_id: ShopId,
        snapshot: &Snapshot,
        quantity: u32,
    ) -> Self {
        let mut item = Self {
            id: ItemId::TRANSIENT,
            cart_id,
            vendor_id,
            shop_id,
            variant_id: snapshot.variant_id,
            quantity,
            checked: false,
            unit_price: Decimal::ZERO,
            sale_price: Decimal::ZERO,
            title: String::new(),
            short_title: String::new(),
            image: String::new(),
            product_code: String::new(),
        };
        item.apply_snapshot(snapshot);
        item
    }

    /// Refreshes the denormalized display and price fields.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.title.clone_from(&snapshot.title);
        self.short_title.clone_from(&snapshot.short_title);
        self.image.clone_from(&snapshot.image);
        self.product_code.clone_from(&snapshot.product_code);
        self.unit_price = snapshot.unit_price;
        self.sale_price = snapshot.sale_price;
    }

    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }

    pub fn line_sale_total(&self) -> Decimal { self.sale_price * Decimal::from(self.quantity) }
}
