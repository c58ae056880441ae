//! Deterministic random number generation
//!
//! Uses xorshift64* for fast, deterministic random number generation.
//! CRITICAL: All randomness in the simulator MUST go through this module.

mod streams;
mod xorshift;

pub use streams::{RandomStreams, StreamKey};
pub use xorshift::{derive_seed, RngManager};
