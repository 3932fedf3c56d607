//! # Domain Value Objects
//!
//! Immutable value types for the bridge core.

use super::errors::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Goldilocks prime: 2^64 - 2^32 + 1.
pub const GOLDILOCKS_PRIME: u64 = 0xFFFF_FFFF_0000_0001;

/// Nicks per whole NOCK.
pub const NICKS_PER_NOCK: u64 = 65_536;

/// Convert whole NOCK to nicks.
pub fn nock_to_nicks(nock: u64) -> Result<u64, BridgeError> {
    nock.checked_mul(NICKS_PER_NOCK)
        .ok_or_else(|| BridgeError::InvalidConfig(format!("{} NOCK overflows nicks", nock)))
}

/// Element of the Goldilocks field, always `< GOLDILOCKS_PRIME`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Belt(u64);

impl Belt {
    /// Create a belt, `None` if the value is not reduced.
    pub fn new(value: u64) -> Option<Self> {
        (value < GOLDILOCKS_PRIME).then_some(Self(value))
    }

    /// Wrap a value the caller has already reduced mod P.
    pub(crate) fn from_reduced(value: u64) -> Self {
        debug_assert!(value < GOLDILOCKS_PRIME);
        Self(value)
    }

    /// Raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Belt {
    type Error = BridgeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Belt::new(value).ok_or_else(|| {
            BridgeError::MalformedPayload(format!("belt {:#x} is not below the field prime", value))
        })
    }
}

impl From<Belt> for u64 {
    fn from(belt: Belt) -> Self {
        belt.0
    }
}

impl fmt::Display for Belt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Three belts, least significant first.
pub type Belts = [Belt; 3];

/// 160-bit destination (EVM) address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvmAddress([u8; 20]);

impl EvmAddress {
    /// Wrap raw bytes (big-endian).
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse `0x` followed by exactly 40 hex digits, any case.
    pub fn parse(s: &str) -> Result<Self, BridgeError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| BridgeError::InvalidDestinationAddress(s.to_string()))?;
        if digits.len() != 40 {
            return Err(BridgeError::InvalidDestinationAddress(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| BridgeError::InvalidDestinationAddress(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// Big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EvmAddress({})", self)
    }
}

impl TryFrom<String> for EvmAddress {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EvmAddress> for String {
    fn from(address: EvmAddress) -> Self {
        address.to_string()
    }
}

/// Destination chain tag: ASCII packed little-endian into an integer.
///
/// `"base"` packs to `0x65736162`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainTag(u64);

impl ChainTag {
    /// Pack an ASCII tag of 1..=8 bytes.
    pub fn from_ascii(tag: &str) -> Result<Self, BridgeError> {
        let bytes = tag.as_bytes();
        if bytes.is_empty() || bytes.len() > 8 || !tag.is_ascii() {
            return Err(BridgeError::InvalidConfig(format!(
                "chain tag must be 1-8 ASCII bytes, got {:?}",
                tag
            )));
        }
        let mut packed = [0u8; 8];
        packed[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(u64::from_le_bytes(packed)))
    }

    /// Wrap an already packed value.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Packed value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_le_bytes();
        let len = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        write!(f, "%{}", String::from_utf8_lossy(&bytes[..len]))
    }
}

macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Lower-case hex rendering.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:02x}{:02x}..)", stringify!($name), self.0[0], self.0[1])
            }
        }
    };
}

hash_newtype!(
    /// Identity of a note, used as the parent reference of the seeds it funds.
    NoteHash
);
hash_newtype!(
    /// Hash of a spend condition; identifies an output destination.
    LockRoot
);
hash_newtype!(
    /// Key under which the note source indexes notes for a spend condition.
    FirstName
);
hash_newtype!(
    /// Transaction identifier.
    TxId
);

/// Bridge session state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeStatus {
    /// Nothing prepared.
    #[default]
    Idle,
    /// Discovering notes and assembling.
    Preparing,
    /// Prepared and validated, waiting for the user.
    Confirming,
    /// Control handed to the signer.
    AwaitingSignature,
    /// Signed, validated, broadcasting.
    Pending,
    /// Broadcast accepted.
    Success,
    /// Flow aborted.
    Error,
}

impl BridgeStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: BridgeStatus) -> bool {
        match (self, next) {
            (Self::Idle, Self::Preparing) => true,
            (Self::Preparing, Self::Confirming) => true,
            (Self::Preparing, Self::Error) => true,
            (Self::Confirming, Self::AwaitingSignature) => true,
            (Self::Confirming, Self::Idle) => true, // User cancels
            (Self::AwaitingSignature, Self::Pending) => true,
            (Self::AwaitingSignature, Self::Confirming) => true, // Signer rejected
            (Self::AwaitingSignature, Self::Error) => true,
            (Self::Pending, Self::Success) => true,
            (Self::Pending, Self::Error) => true,
            (Self::Error, Self::Pending) => true, // Broadcast retry
            (Self::Success, Self::Idle) => true,
            (Self::Error, Self::Idle) => true,
            (Self::Preparing | Self::AwaitingSignature | Self::Pending, Self::Idle) => true, // Interrupted flow abandoned
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Waiting on the note source or the signer.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Preparing | Self::AwaitingSignature | Self::Pending)
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
