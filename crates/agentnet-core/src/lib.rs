#![deny(missing_docs)]
//! Core value, attribute, randomness and error types shared by the agentnet crates.

pub mod attrs;
pub mod errors;
pub mod rng;
mod value;

pub use attrs::{AttributeRange, Attributes, AttributesScope, RangeKind};
pub use errors::{ErrorInfo, SimError};
pub use rng::{trial_seed, Prg};
pub use value::Value;

/// Largest step horizon accepted by an experiment.
pub const MAX_STEPS: u32 = 100_000_000;
