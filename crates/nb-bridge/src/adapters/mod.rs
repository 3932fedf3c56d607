//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits for the bridge core.

mod address_validator;
mod builder;
mod ledger;

pub use address_validator::{DefaultAddressValidator, SOURCE_ADDRESS_BYTES};
pub use builder::NoteTransactionBuilder;
pub use ledger::InMemoryLedger;
