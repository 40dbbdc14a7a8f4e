//! pump-bundler - bonding-curve market client engine
//!
//! Prices, builds, batches and submits transactions against the pump.fun
//! bonding-curve program: market creation with bundled buys, single buys and
//! sells, account and event decoding, and atomic submission through a Jito
//! relay or sequential submission through an RPC node.
//!
//! Start from [`client::PumpClient`]; the pure pieces ([`curve`]) can be used
//! on their own.

pub mod client;
pub mod config;
pub mod curve;
pub mod errors;
pub mod ledger;
pub mod metadata;
pub mod observability;
pub mod streaming;
pub mod test_utils;
pub mod tx_builder;

#[cfg(test)]
mod tests;

pub use client::PumpClient;
pub use errors::EngineError;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
