//! Jupiter Adapter
//!
//! Client, wire types and price source for the Jupiter DEX aggregator.
//! The swap executor builds on these to turn trade actions into
//! transactions.

mod client;
mod price;
mod quote;
mod swap;

pub use client::{JupiterClient, JupiterConfig};
pub use price::JupiterPriceProvider;
pub use quote::{QuoteRequest, QuoteResponse};
pub use swap::{SwapRequest, SwapResponse};
