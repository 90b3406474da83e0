//! Test fixtures for the cart aggregate.

use rust_decimal::Decimal;
use std::ops::Deref;
use std::sync::Arc;

use crate::domain::ports::{
    AddressBook, CartStore, CatalogGateway, DeliveryAddress, Member, MemberGateway, Shop, Snapshot,
};
use crate::domain::records::CartItem;
use crate::domain::value_objects::{
    AddressId, BuyerId, CartId, ItemId, ShelfState, ShopId, VariantId, VendorId,
};
use crate::domain::CartContext;
use crate::infrastructure::memory::InMemoryBackend;

pub(crate) const VENDOR: VendorId = VendorId::new(1);
pub(crate) const SHOP: ShopId = ShopId::new(1);

pub(crate) struct Backend(InMemoryBackend);

impl Deref for Backend {
    type Target = InMemoryBackend;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl Backend {
    pub(crate) fn new() -> Self { Self(InMemoryBackend::default()) }

    pub(crate) fn context_with(
        &self,
        catalog: Arc<dyn CatalogGateway>,
        members: Arc<dyn MemberGateway>,
    ) -> CartContext {
        CartContext::new(self.0.store.clone(), catalog, members, self.0.shops.clone())
    }

    pub(crate) fn context_with_store(&self, store: Arc<dyn CartStore>) -> CartContext {
        CartContext::new(store, self.0.catalog.clone(), self.0.members.clone(), self.0.shops.clone())
    }

    pub(crate) async fn stock(&self, variant: i64, stock: u32) {
        self.0.catalog.insert(snapshot(variant, stock)).await;
    }
}

/// On-shelf snapshot priced 10.00, on sale for 8.00.
pub(crate) fn snapshot(variant: i64, stock: u32) -> Snapshot {
    Snapshot {
        variant_id: VariantId::new(variant),
        stock,
        shelf: ShelfState::On,
        tier_pricing: false,
        unit_price: Decimal::new(1000, 2),
        sale_price: Decimal::new(800, 2),
        title: format!("Variant {variant}"),
        short_title: String::new(),
        image: format!("{variant}.png"),
        product_code: format!("P-{variant}"),
    }
}

/// A persisted-looking line whose display data is out of date.
pub(crate) fn stale_line(variant: i64) -> CartItem {
    CartItem {
        id: ItemId::TRANSIENT,
        cart_id: CartId::TRANSIENT,
        vendor_id: VENDOR,
        shop_id: SHOP,
        variant_id: VariantId::new(variant),
        quantity: 1,
        checked: false,
        unit_price: Decimal::ONE,
        sale_price: Decimal::ONE,
        title: "stale".into(),
        short_title: String::new(),
        image: String::new(),
        product_code: String::new(),
    }
}

pub(crate) fn address(id: i64) -> DeliveryAddress {
    DeliveryAddress {
        id: AddressId::new(id),
        consignee: format!("Consignee {id}"),
        phone: "0800000000".into(),
        province: "Lagos".into(),
        city: "Ikeja".into(),
        district: "Allen".into(),
        detail: format!("{id} Allen Avenue"),
    }
}

/// Member with addresses 1 and 2, the second being the default.
pub(crate) fn member(id: BuyerId, tier: i32) -> Member {
    Member {
        id,
        tier,
        addresses: AddressBook::new(vec![address(1), address(2)], Some(AddressId::new(2))),
    }
}

pub(crate) fn shop(id: i64) -> Shop {
    Shop { id: ShopId::new(id), vendor_id: VENDOR, name: format!("Shop {id}") }
}
