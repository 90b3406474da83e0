//! Shop Gateway

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::domain::errors::GatewayError;
use crate::domain::value_objects::{ShopId, VendorId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub vendor_id: VendorId,
    pub name: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ShopGateway: Send + Sync {
    async fn get_shop(&self, shop_id: ShopId) -> Result<Option<Shop>, GatewayError>;
}
