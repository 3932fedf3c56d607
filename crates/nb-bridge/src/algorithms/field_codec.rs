//! # Field Codec
//!
//! 160-bit destination address to three Goldilocks belts and back.
//!
//! `a = belt1 + belt2·P + belt3·P²`, each belt in `[0, P)`. Since `P³ > 2^160`
//! every address has exactly one representation.

use crate::domain::{Belt, Belts, BridgeError, EvmAddress, GOLDILOCKS_PRIME};
use primitive_types::U256;

fn prime() -> U256 {
    U256::from(GOLDILOCKS_PRIME)
}

/// Encode an address into belts, least significant first.
pub fn encode(address: &EvmAddress) -> Belts {
    let p = prime();
    let a = U256::from_big_endian(address.as_bytes());
    let q1 = a / p;
    let q2 = q1 / p;
    [
        Belt::from_reduced((a % p).low_u64()),
        Belt::from_reduced((q1 % p).low_u64()),
        Belt::from_reduced(q2.low_u64()),
    ]
}

/// Parse and encode a `0x`-prefixed hex address.
pub fn encode_str(address: &str) -> Result<Belts, BridgeError> {
    Ok(encode(&EvmAddress::parse(address)?))
}

/// Recombine belts into an address.
///
/// Fails with `InvalidReconstructedAddress` if the value does not fit 160 bits.
pub fn decode(belts: &Belts) -> Result<EvmAddress, BridgeError> {
    let p = prime();
    let value = U256::from(belts[0].value())
        + U256::from(belts[1].value()) * p
        + U256::from(belts[2].value()) * p * p;

    if value.bits() > 160 {
        return Err(BridgeError::InvalidReconstructedAddress(format!(
            "belts [{}, {}, {}] exceed 160 bits",
            belts[0], belts[1], belts[2]
        )));
    }

    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(EvmAddress::from_bytes(bytes))
}

/// Whether `address` encodes and decodes back to itself.
pub fn round_trips(address: &EvmAddress) -> bool {
    decode(&encode(address)).as_ref() == Ok(address)
}
