//! Aggregates module
pub mod cart;

pub use cart::{Cart, CheckoutLine, Fees, MergeOutcome, Settlement};
