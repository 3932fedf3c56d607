//! # Nock-Bridge Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── flows.rs        # End-to-end session flows against the in-memory ledger
//! │   └── properties.rs   # Cross-module properties (proptest)
//! └── benches/
//!     └── bridge_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p nb-tests
//! cargo test -p nb-tests integration::flows
//! cargo bench -p nb-tests
//! ```

pub mod integration;
