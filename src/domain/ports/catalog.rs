//! Catalog Gateway

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::errors::GatewayError;
use crate::domain::value_objects::{ShelfState, VariantId};

/// Point-in-time catalog data for one variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub variant_id: VariantId,
    pub stock: u32,
    pub shelf: ShelfState,
    /// Whether member tiers get their own price for this variant.
    pub tier_pricing: bool,
    pub unit_price: Decimal,
    pub sale_price: Decimal,
    pub title: String,
    pub short_title: String,
    pub image: String,
    pub product_code: String,
}

impl Snapshot {
    pub fn is_on_shelves(&self) -> bool { self.shelf == ShelfState::On }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Latest snapshot of a single variant.
    async fn get_snapshot(&self, variant_id: VariantId) -> Result<Option<Snapshot>, GatewayError>;

    /// Batched lookup. Unknown variants are simply absent from the map.
    async fn get_snapshots(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<HashMap<VariantId, Snapshot>, GatewayError>;

    /// Sale price of `variant_id` for members of `tier`.
    async fn get_tier_price(&self, variant_id: VariantId, tier: i32) -> Result<Decimal, GatewayError>;
}
