//! Collaborator seams of the cart aggregate.
//!
//! Every trait here is consumed, never implemented, by the domain. Concrete
//! adapters live in [`crate::infrastructure`].

mod catalog;
mod members;
mod shops;
mod store;

pub use catalog::{CatalogGateway, Snapshot};
pub use members::{AddressBook, DeliveryAddress, Member, MemberGateway};
pub use shops::{Shop, ShopGateway};
pub use store::CartStore;

#[cfg(test)]
pub use catalog::MockCatalogGateway;
#[cfg(test)]
pub use members::MockMemberGateway;
#[cfg(test)]
pub use shops::MockShopGateway;
#[cfg(test)]
pub use store::MockCartStore;
