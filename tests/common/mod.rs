//! Shared setup for the integration tests.

use opensase_cart::domain::ports::{AddressBook, DeliveryAddress, Member, Shop, Snapshot};
use opensase_cart::domain::value_objects::{AddressId, BuyerId, ShelfState, ShopId, VariantId, VendorId};
use opensase_cart::infrastructure::InMemoryBackend;
use rust_decimal::Decimal;

pub const VENDOR: VendorId = VendorId::new(1);
pub const SHOP: ShopId = ShopId::new(1);

pub fn variant(id: i64) -> VariantId {
    VariantId::new(id)
}

/// On-shelf variant priced 12.50, on sale for 10.00.
pub fn snapshot(id: i64, stock: u32) -> Snapshot {
    Snapshot {
        variant_id: variant(id),
        stock,
        shelf: ShelfState::On,
        tier_pricing: false,
        unit_price: Decimal::new(1250, 2),
        sale_price: Decimal::new(1000, 2),
        title: format!("Item {id}"),
        short_title: format!("#{id}"),
        image: format!("https://cdn.example.com/{id}.jpg"),
        product_code: format!("SKU-{id}"),
    }
}

/// Backend with variants 5, 101 and 102 in stock, member 42 and shop 1.
pub async fn backend() -> InMemoryBackend {
    opensase_cart::telemetry::init();
    let backend = InMemoryBackend::default();
    for (id, stock) in [(5, 10), (101, 5), (102, 5)] {
        backend.catalog.insert(snapshot(id, stock)).await;
    }
    let home = DeliveryAddress { id: AddressId::new(1), consignee: "Ada".into(), city: "Lagos".into(), ..Default::default() };
    let office = DeliveryAddress { id: AddressId::new(2), consignee: "Ada".into(), city: "Abuja".into(), ..Default::default() };
    backend
        .members
        .insert(Member {
            id: BuyerId::new(42),
            tier: 0,
            addresses: AddressBook::new(vec![home, office], Some(AddressId::new(1))),
        })
        .await;
    backend.shops.insert(Shop { id: SHOP, vendor_id: VENDOR, name: "Main street".into() }).await;
    backend
}
