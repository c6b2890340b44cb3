//! # Algorithms
//!
//! Pure distribution logic.
//!
//! - `allocation`: fee split, pro-rata shares, per-chain grouping
//! - `revert`: EVM revert-data decoding for failure messages

pub mod allocation;
pub mod revert;

pub use allocation::{allocate, compute_fee, proportional_share};
pub use revert::{
    decode_revert_reason, describe_revert, encode_revert_reason, GENERIC_REVERT_MESSAGE,
};
