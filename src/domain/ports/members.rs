//! Member Gateway

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::domain::errors::GatewayError;
use crate::domain::value_objects::{AddressId, BuyerId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub id: AddressId,
    pub consignee: String,
    pub phone: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub detail: String,
}

/// A member's saved shipping addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    addresses: Vec<DeliveryAddress>,
    default_id: Option<AddressId>,
}

impl AddressBook {
    pub fn new(addresses: Vec<DeliveryAddress>, default_id: Option<AddressId>) -> Self {
        Self { addresses, default_id }
    }

    pub fn get(&self, id: AddressId) -> Option<&DeliveryAddress> {
        self.addresses.iter().find(|a| a.id == id)
    }

    pub fn default_address(&self) -> Option<&DeliveryAddress> {
        self.default_id.and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize { self.addresses.len() }
    pub fn is_empty(&self) -> bool { self.addresses.is_empty() }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: BuyerId,
    pub tier: i32,
    pub addresses: AddressBook,
}

impl Member {
    pub fn tier(&self) -> i32 { self.tier }
    pub fn addresses(&self) -> &AddressBook { &self.addresses }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MemberGateway: Send + Sync {
    async fn get_member(&self, buyer_id: BuyerId) -> Result<Option<Member>, GatewayError>;
}
