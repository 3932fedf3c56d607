//! # Nock Bridge Core
//!
//! Builds, validates and submits deposits from the Nockchain UTXO ledger to
//! the custodial multisig bridge that mints on Base.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A deposit is an ordinary transaction whose output pays the bridge
//! multisig lock and carries a jam'd noun naming the EVM destination:
//!
//! ```text
//! [version=0 [%base [belt1 [belt2 belt3]]]]
//! ```
//!
//! The 160-bit destination is split into three Goldilocks field elements
//! (belts) so it fits the ledger's native field.
//!
//! ## Safety Checks
//!
//! | Check | Error |
//! |-------|-------|
//! | Output pays the configured multisig | `WrongRecipient` |
//! | Exactly one payload carrier | `MalformedPayload` |
//! | Belts decode to a 160-bit address | `InvalidReconstructedAddress` |
//! | Amount meets the bridge minimum | `BelowMinimum` |
//! | Signed result matches the request | `ValidationMismatch` |
//!
//! The checks run before signing and again on the signer's output.
//!
//! ## Module Structure
//!
//! ```text
//! nb-bridge/
//! ├── domain/          # Values, locks, notes, transactions, config, errors
//! ├── algorithms/      # Noun codec, field codec, selection, assembly, validation
//! ├── ports/           # BridgeApi, NoteSource, TransactionSigner, AddressValidator
//! ├── adapters/        # In-memory ledger, default builder and address checks
//! └── service.rs       # BridgeSession state machine
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{DefaultAddressValidator, InMemoryLedger, NoteTransactionBuilder};
pub use algorithms::{
    assemble, build_metadata, cue, decode, decode_deposits, encode, encode_str,
    ensure_matches_request, jam, parse_metadata, round_trips, select_notes, validate_seeds,
    validate_signed, validate_unsigned, Assembly, AssemblyRequest, BridgeNoun, Noun, Selection,
    ValidationRules,
};
pub use domain::{
    Belt, Belts, BridgeConfig, BridgeDeposit, BridgeError, BridgePreview, BridgeResult,
    BridgeStatus, ChainTag, ErrorCategory, EvmAddress, FeeSchedule, MultisigDescriptor, Nicks,
    Note, PreparedTransaction, RawTx, SignedTx, SpendCondition, SpendableNote,
};
pub use ports::{
    AddressValidator, BridgeApi, ConfirmOutcome, MockSigner, MockSignerMode, NoteSource,
    SignerResponse, TransactionBuilder, TransactionSigner,
};
pub use service::{inspect_bridge_deposits, preview_destination, validate_destination, BridgeSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
