//! # Minestarters Distribution Test Suite
//!
//! Cross-component flows over the in-memory adapters.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs           # Three-chain deployment, funded treasury
//!     ├── distribution_flow.rs  # Snapshot -> allocate -> bridge -> payout
//!     └── guards.rs             # In-flight, reentrancy and cancel choreography
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ms-tests
//! cargo test -p ms-tests integration::guards::
//! ```

#![allow(dead_code)]

pub mod integration;
