//! Adapters for the cart ports.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryBackend;
pub use postgres::PgCartStore;
