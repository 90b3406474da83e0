//! OpenSASE Cart
//!
//! Shopping cart aggregate for the OpenSASE e-commerce platform.
//!
//! ## Features
//! - Anonymous and buyer-bound carts keyed by an opaque token
//! - Stock and shelf validation against the product catalog
//! - Member tier pricing
//! - Merging an anonymous cart into the buyer's cart on login
//! - Settlement data and partial release after order placement
//! - PostgreSQL and in-memory storage

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

pub use domain::aggregates::{Cart, CheckoutLine, Fees, MergeOutcome, Settlement};
pub use domain::errors::{CartError, GatewayError, StoreError};
pub use domain::events::CartEvent;
pub use domain::records::{CartItem, CartRecord};
pub use domain::service::CartService;
pub use domain::CartContext;

pub type Result<T> = std::result::Result<T, CartError>;
