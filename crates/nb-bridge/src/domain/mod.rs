//! # Domain Module
//!
//! Core domain types for the bridge: values, locks, transactions, configuration.

pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod lock;
pub mod value_objects;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use lock::*;
pub use value_objects::*;
