//! # conform-primitives
//!
//! Primitive types shared by every crate of the conformance harness.
//!
//! Everything that crosses the JSON-RPC boundary is hex text, so the types here
//! parse from and serialize to the `0x`-prefixed forms nodes use.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod fixed;
mod address;
mod hash;
pub mod quantity;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};
pub use quantity::QuantityError;

// Re-export primitive-types for U256
pub use primitive_types::U256;
