//! # Oshin Engine
//! Fan-out of fresh status items and the daily per-destination digest.

pub mod digest;
pub mod report;
pub mod router;

#[cfg(test)]
mod testing;

pub use digest::DigestAggregator;
pub use report::{DeliveryFailure, DigestReport, FanoutReport};
pub use router::{FanoutRouter, PrimaryTarget};
