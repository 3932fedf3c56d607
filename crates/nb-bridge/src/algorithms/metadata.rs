//! # Bridge Metadata
//!
//! The payload the minting watcher reads from a deposit:
//!
//! ```text
//! [version [chain-tag [belt1 [belt2 belt3]]]]
//! ```
//!
//! jammed into the `%bridge` note-data entry. Parsing is strict; any deviation
//! from this exact shape is `MalformedPayload`.

use super::field_codec::encode;
use super::noun::{cue, jam, Atom, Noun};
use crate::domain::{Belt, Belts, BridgeError, ChainTag, EvmAddress};
use serde::{Deserialize, Serialize};

/// Current payload version.
pub const BRIDGE_NOUN_VERSION: u64 = 0;

/// Decoded bridge payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeNoun {
    /// Payload version.
    pub version: u64,
    /// Destination chain.
    pub chain: ChainTag,
    /// Encoded destination address.
    pub belts: Belts,
}

impl BridgeNoun {
    /// Payload for `address` on `chain`.
    pub fn new(address: &EvmAddress, chain: ChainTag) -> Self {
        Self {
            version: BRIDGE_NOUN_VERSION,
            chain,
            belts: encode(address),
        }
    }

    /// Noun form.
    pub fn to_noun(&self) -> Noun {
        let [b1, b2, b3] = self.belts;
        Noun::cell(
            Noun::atom(self.version),
            Noun::cell(
                Noun::atom(self.chain.value()),
                Noun::cell(
                    Noun::atom(b1.value()),
                    Noun::cell(Noun::atom(b2.value()), Noun::atom(b3.value())),
                ),
            ),
        )
    }
}

/// Build the jammed payload for `address`.
pub fn build(address: &EvmAddress, chain: ChainTag) -> Vec<u8> {
    jam(&BridgeNoun::new(address, chain).to_noun())
}

fn malformed(reason: impl Into<String>) -> BridgeError {
    BridgeError::MalformedPayload(reason.into())
}

fn cell<'a>(noun: &'a Noun, what: &str) -> Result<(&'a Noun, &'a Noun), BridgeError> {
    noun.as_cell()
        .ok_or_else(|| malformed(format!("{} must be a cell, got {}", what, noun)))
}

fn word(noun: &Noun, what: &str) -> Result<u64, BridgeError> {
    noun.as_atom()
        .and_then(Atom::to_u64)
        .ok_or_else(|| malformed(format!("{} must be a 64-bit atom, got {}", what, noun)))
}

/// Parse a jammed payload, requiring `expected_chain`.
pub fn parse(bytes: &[u8], expected_chain: ChainTag) -> Result<BridgeNoun, BridgeError> {
    let noun = cue(bytes).map_err(|e| malformed(e.to_string()))?;

    let (version, rest) = cell(&noun, "payload")?;
    let version = word(version, "version")?;
    if version != BRIDGE_NOUN_VERSION {
        return Err(malformed(format!(
            "unsupported version {}, expected {}",
            version, BRIDGE_NOUN_VERSION
        )));
    }

    let (chain, belts) = cell(rest, "chain section")?;
    let chain = ChainTag::from_raw(word(chain, "chain tag")?);
    if chain != expected_chain {
        return Err(malformed(format!(
            "chain tag {} does not match {}",
            chain, expected_chain
        )));
    }

    let (b1, tail) = cell(belts, "belt section")?;
    let (b2, b3) = cell(tail, "belt tail")?;
    let belts = [
        Belt::try_from(word(b1, "belt1")?)?,
        Belt::try_from(word(b2, "belt2")?)?,
        Belt::try_from(word(b3, "belt3")?)?,
    ];

    Ok(BridgeNoun {
        version,
        chain,
        belts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::field_codec::decode;
    use crate::domain::GOLDILOCKS_PRIME;
    use proptest::prelude::*;

    fn base() -> ChainTag {
        ChainTag::from_ascii("base").unwrap()
    }

    fn address() -> EvmAddress {
        EvmAddress::parse("0x1234567890abcdef1234567890abcdef1234abcd").unwrap()
    }

    fn payload(noun: Noun) -> Vec<u8> {
        jam(&noun)
    }

    #[test]
    fn test_build_parse_round_trip() {
        let parsed = parse(&build(&address(), base()), base()).unwrap();
        assert_eq!(parsed.version, 0);
        assert_eq!(parsed.chain, base());
        assert_eq!(decode(&parsed.belts).unwrap(), address());
    }

    #[test]
    fn test_noun_shape() {
        let noun = BridgeNoun::new(&address(), base()).to_noun();
        let rendered = noun.to_string();
        assert!(rendered.starts_with("[0 [1702060386 ["));
    }

    #[test]
    fn test_wrong_chain_rejected() {
        let bytes = build(&address(), ChainTag::from_ascii("eth").unwrap());
        assert!(matches!(
            parse(&bytes, base()),
            Err(BridgeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut noun = BridgeNoun::new(&address(), base());
        noun.version = 1;
        assert!(matches!(
            parse(&payload(noun.to_noun()), base()),
            Err(BridgeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        // [0 [%base [1 2]]]: only two belts.
        let noun = Noun::cell(
            Noun::atom(0),
            Noun::cell(
                Noun::atom(base().value()),
                Noun::cell(Noun::atom(1), Noun::atom(2)),
            ),
        );
        assert!(parse(&payload(noun), base()).is_err());

        // Bare atom.
        assert!(parse(&payload(Noun::atom(0)), base()).is_err());
    }

    #[test]
    fn test_extra_nesting_rejected() {
        // [0 [%base [1 [2 [3 4]]]]]: belt3 is a cell.
        let noun = Noun::cell(
            Noun::atom(0),
            Noun::cell(
                Noun::atom(base().value()),
                Noun::cell(
                    Noun::atom(1),
                    Noun::cell(Noun::atom(2), Noun::cell(Noun::atom(3), Noun::atom(4))),
                ),
            ),
        );
        assert!(matches!(
            parse(&payload(noun), base()),
            Err(BridgeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_unreduced_belt_rejected() {
        let noun = Noun::cell(
            Noun::atom(0),
            Noun::cell(
                Noun::atom(base().value()),
                Noun::cell(
                    Noun::atom(GOLDILOCKS_PRIME),
                    Noun::cell(Noun::atom(0), Noun::atom(0)),
                ),
            ),
        );
        assert!(matches!(
            parse(&payload(noun), base()),
            Err(BridgeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(parse(&[], base()).is_err());
        assert!(parse(&[0xFF, 0xFF, 0xFF], base()).is_err());
    }

    proptest! {
        #[test]
        fn prop_metadata_round_trip(bytes in proptest::array::uniform20(any::<u8>())) {
            let addr = EvmAddress::from_bytes(bytes);
            let parsed = parse(&build(&addr, base()), base()).unwrap();
            prop_assert_eq!(parsed, BridgeNoun::new(&addr, base()));
            prop_assert_eq!(decode(&parsed.belts).unwrap(), addr);
        }
    }
}
