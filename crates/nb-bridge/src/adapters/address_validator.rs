//! Address Validator Adapter
//!
//! Implements `AddressValidator` for the source chain's base58 key hashes and
//! hex destination addresses.

use crate::domain::EvmAddress;
use crate::ports::outbound::AddressValidator;

/// Decoded length of a source-chain public key hash address.
pub const SOURCE_ADDRESS_BYTES: usize = 40;

/// Format-only address checks.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAddressValidator;

impl AddressValidator for DefaultAddressValidator {
    fn is_valid_source_address(&self, address: &str) -> bool {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return false;
        }
        bs58::decode(trimmed)
            .into_vec()
            .map(|bytes| bytes.len() == SOURCE_ADDRESS_BYTES)
            .unwrap_or(false)
    }

    fn is_valid_destination_address(&self, address: &str) -> bool {
        EvmAddress::parse(address.trim()).is_ok()
    }
}
