//! # Spend Conditions
//!
//! Lock predicates guarding notes and seeds, and the hashes that identify them.
//!
//! A spend condition is a list of primitives that must all hold. Its noun form is
//! a null-terminated list of tagged primitives:
//!
//! ```text
//! [[%pkh [threshold [addr1 addr2 ~]]] [%tim min-relative] ~]
//! ```
//!
//! Text (tags and source-chain addresses) becomes an atom of its UTF-8 bytes,
//! least significant byte first.

use super::value_objects::{FirstName, LockRoot};
use crate::algorithms::noun::{jam, Atom, Noun};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Blocks a coinbase note must age before it can be spent.
pub const COINBASE_TIMELOCK_BLOCKS: u64 = 100;

/// Domain separator for first-name derivation.
const FIRST_NAME_DOMAIN: &[u8] = b"nb:first-name:v1";

fn cord(text: &str) -> Noun {
    Noun::Atom(Atom::from_bytes_le(text.as_bytes()))
}

/// Listing key for outputs paying `lock_root`.
pub fn first_name_of(lock_root: &LockRoot) -> FirstName {
    let mut hasher = Sha256::new();
    hasher.update(FIRST_NAME_DOMAIN);
    hasher.update(lock_root.0);
    FirstName(hasher.finalize().into())
}

/// M-of-N public key hash lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pkh {
    /// Signatures required.
    pub threshold: u64,
    /// Authorized source-chain addresses, order significant.
    pub hashes: Vec<String>,
}

impl Pkh {
    /// Single-key lock.
    pub fn single(address: &str) -> Self {
        Self {
            threshold: 1,
            hashes: vec![address.to_string()],
        }
    }

    fn to_noun(&self) -> Noun {
        let hashes = Noun::list(self.hashes.iter().map(|h| cord(h)).collect());
        Noun::cell(
            cord("pkh"),
            Noun::cell(Noun::atom(self.threshold), hashes),
        )
    }
}

/// Relative block-height lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeLock {
    /// Minimum blocks since the note was created.
    pub relative_min: u64,
}

impl TimeLock {
    /// Maturity lock applied to mining rewards.
    pub fn coinbase() -> Self {
        Self {
            relative_min: COINBASE_TIMELOCK_BLOCKS,
        }
    }

    fn to_noun(&self) -> Noun {
        Noun::cell(cord("tim"), Noun::atom(self.relative_min))
    }
}

/// One clause of a spend condition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockPrimitive {
    /// Key hash lock.
    Pkh(Pkh),
    /// Time lock.
    Tim(TimeLock),
}

impl LockPrimitive {
    fn to_noun(&self) -> Noun {
        match self {
            LockPrimitive::Pkh(pkh) => pkh.to_noun(),
            LockPrimitive::Tim(tim) => tim.to_noun(),
        }
    }
}

/// Conjunction of lock primitives.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpendCondition(pub Vec<LockPrimitive>);

impl SpendCondition {
    /// Spendable by one key.
    pub fn single(address: &str) -> Self {
        Self(vec![LockPrimitive::Pkh(Pkh::single(address))])
    }

    /// Spendable by `threshold` of `addresses`.
    pub fn multisig(threshold: u64, addresses: &[String]) -> Self {
        Self(vec![LockPrimitive::Pkh(Pkh {
            threshold,
            hashes: addresses.to_vec(),
        })])
    }

    /// Single key plus the coinbase maturity lock.
    pub fn coinbase(address: &str) -> Self {
        Self(vec![
            LockPrimitive::Pkh(Pkh::single(address)),
            LockPrimitive::Tim(TimeLock::coinbase()),
        ])
    }

    /// Noun form.
    pub fn to_noun(&self) -> Noun {
        Noun::list(self.0.iter().map(LockPrimitive::to_noun).collect())
    }

    /// Identity of this condition as an output destination.
    pub fn lock_root(&self) -> LockRoot {
        LockRoot(Sha256::digest(jam(&self.to_noun())).into())
    }

    /// Key under which notes locked by this condition are listed.
    pub fn first_name(&self) -> FirstName {
        first_name_of(&self.lock_root())
    }

    /// Signers able to satisfy the key clauses, in order.
    pub fn signers(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flat_map(|p| match p {
            LockPrimitive::Pkh(pkh) => pkh.hashes.iter().map(String::as_str).collect::<Vec<_>>(),
            LockPrimitive::Tim(_) => Vec::new(),
        })
    }
}
