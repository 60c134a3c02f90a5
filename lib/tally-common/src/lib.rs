//! Common primitives shared across the Tally crates.
#![deny(missing_docs)]

pub mod cache;
pub mod collections;
pub mod hash;
