//! Cart domain: aggregate, records, collaborator ports and the service that
//! opens carts for a transport layer.

pub mod aggregates;
pub mod errors;
pub mod events;
pub mod ports;
pub mod records;
pub mod service;
pub mod value_objects;

use std::sync::Arc;

use ports::{CartStore, CatalogGateway, MemberGateway, ShopGateway};

/// Handles to the collaborators every cart aggregate talks to.
#[derive(Clone)]
pub struct CartContext {
    pub store: Arc<dyn CartStore>,
    pub catalog: Arc<dyn CatalogGateway>,
    pub members: Arc<dyn MemberGateway>,
    pub shops: Arc<dyn ShopGateway>,
}

impl CartContext {
    pub fn new(
        store: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogGateway>,
        members: Arc<dyn MemberGateway>,
        shops: Arc<dyn ShopGateway>,
    ) -> Self {
        Self { store, catalog, members, shops }
    }
}

impl std::fmt::Debug for CartContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartContext").finish_non_exhaustive()
    }
}
