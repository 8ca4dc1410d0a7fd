//! Contains the data model shared between the signing, verification and
//! tooling crates.

pub mod input;
pub mod payload;
pub mod signature;
pub mod verification;

pub use input::MalformedInput;

/// Numeric EIP-155 chain identifier.
pub type ChainId = u64;
