//! # Noun Codec
//!
//! Structured noun values and their canonical binary serialization (jam / cue).
//!
//! A noun is either an atom (unsigned integer of any width) or a cell of two
//! nouns. `jam` writes a bit stream, least significant bit first:
//!
//! | Prefix | Meaning |
//! |--------|---------|
//! | `0` | atom, followed by `mat(atom)` |
//! | `1 0` | cell, followed by head then tail |
//! | `1 1` | back-reference, followed by `mat(bit offset)` |
//!
//! The resulting bit stream is read as a little-endian integer, so the byte
//! output is that integer's little-endian bytes.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Deepest cell nesting accepted by [`cue`].
pub const MAX_CUE_DEPTH: usize = 1024;

/// Length prefixes wider than this many bits cannot describe real input.
const MAX_LENGTH_PREFIX_BITS: usize = 48;

/// Noun decoding errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NounError {
    /// Input ended inside a noun.
    #[error("truncated input at bit {0}")]
    Truncated(usize),

    /// Back-reference points at no earlier noun.
    #[error("dangling back-reference to bit {0}")]
    DanglingBackref(u64),

    /// Length prefix cannot describe real input.
    #[error("length prefix too wide at bit {0}")]
    LengthTooWide(usize),

    /// Atom encoded with a leading zero bit.
    #[error("non-canonical atom at bit {0}")]
    NonCanonical(usize),

    /// Non-zero bits after the top-level noun.
    #[error("trailing bits after bit {0}")]
    TrailingBits(usize),

    /// Cell nesting exceeds [`MAX_CUE_DEPTH`].
    #[error("nesting deeper than {0}")]
    TooDeep(usize),
}

/// Unsigned integer of arbitrary width, stored as trimmed little-endian bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom(Vec<u8>);

impl Atom {
    /// The zero atom.
    pub fn zero() -> Self {
        Self(Vec::new())
    }

    /// Atom from little-endian bytes; high zero bytes are dropped.
    pub fn from_bytes_le(bytes: &[u8]) -> Self {
        let len = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        Self(bytes[..len].to_vec())
    }

    /// Atom from a machine word.
    pub fn from_u64(value: u64) -> Self {
        Self::from_bytes_le(&value.to_le_bytes())
    }

    /// Trimmed little-endian bytes (empty for zero).
    pub fn as_bytes_le(&self) -> &[u8] {
        &self.0
    }

    /// Value as a machine word, `None` if wider than 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.0.len() > 8 {
            return None;
        }
        let mut word = [0u8; 8];
        word[..self.0.len()].copy_from_slice(&self.0);
        Some(u64::from_le_bytes(word))
    }

    /// Number of significant bits (`met 0`).
    pub fn bit_len(&self) -> usize {
        match self.0.last() {
            None => 0,
            Some(top) => (self.0.len() - 1) * 8 + (8 - top.leading_zeros() as usize),
        }
    }

    /// Whether this is the zero atom.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    fn bits(&self) -> &BitSlice<u8, Lsb0> {
        &self.0.view_bits::<Lsb0>()[..self.bit_len()]
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u64() {
            Some(v) => write!(f, "{}", v),
            None => {
                let be: Vec<u8> = self.0.iter().rev().copied().collect();
                write!(f, "0x{}", hex::encode(be))
            }
        }
    }
}

/// Atom or cell.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Noun {
    /// Unsigned integer.
    Atom(Atom),
    /// Ordered pair.
    Cell(Box<Noun>, Box<Noun>),
}

impl Noun {
    /// Atom noun from a machine word.
    pub fn atom(value: u64) -> Self {
        Noun::Atom(Atom::from_u64(value))
    }

    /// Cell noun.
    pub fn cell(head: Noun, tail: Noun) -> Self {
        Noun::Cell(Box::new(head), Box::new(tail))
    }

    /// Right-nested tuple `[a b c ...]`; a single element is returned as is.
    ///
    /// Returns `None` for an empty slice.
    pub fn tuple(items: Vec<Noun>) -> Option<Self> {
        let mut iter = items.into_iter().rev();
        let last = iter.next()?;
        Some(iter.fold(last, |tail, head| Noun::cell(head, tail)))
    }

    /// Null-terminated list `[a b c ~]`.
    pub fn list(items: Vec<Noun>) -> Self {
        items
            .into_iter()
            .rev()
            .fold(Noun::atom(0), |tail, head| Noun::cell(head, tail))
    }

    /// Borrow the atom, if this is one.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Noun::Atom(a) => Some(a),
            Noun::Cell(..) => None,
        }
    }

    /// Borrow head and tail, if this is a cell.
    pub fn as_cell(&self) -> Option<(&Noun, &Noun)> {
        match self {
            Noun::Cell(h, t) => Some((h, t)),
            Noun::Atom(_) => None,
        }
    }
}

impl fmt::Debug for Noun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Noun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Noun::Atom(a) => write!(f, "{}", a),
            Noun::Cell(h, t) => write!(f, "[{} {}]", h, t),
        }
    }
}

// =============================================================================
// jam
// =============================================================================

/// Serialize a noun.
pub fn jam(noun: &Noun) -> Vec<u8> {
    let mut out: BitVec<u8, Lsb0> = BitVec::new();
    let mut seen: HashMap<&Noun, usize> = HashMap::new();
    jam_into(noun, &mut out, &mut seen);

    let mut bytes = out.into_vec();
    let len = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    bytes.truncate(len);
    bytes
}

fn jam_into<'a>(noun: &'a Noun, out: &mut BitVec<u8, Lsb0>, seen: &mut HashMap<&'a Noun, usize>) {
    if let Some(&earlier) = seen.get(noun) {
        match noun {
            // A short atom is cheaper inline than as a reference.
            Noun::Atom(a) if a.bit_len() <= usize_bit_len(earlier) => {
                out.push(false);
                mat(a, out);
            }
            _ => {
                out.push(true);
                out.push(true);
                mat(&Atom::from_u64(earlier as u64), out);
            }
        }
        return;
    }

    seen.insert(noun, out.len());
    match noun {
        Noun::Atom(a) => {
            out.push(false);
            mat(a, out);
        }
        Noun::Cell(head, tail) => {
            out.push(true);
            out.push(false);
            jam_into(head, out, seen);
            jam_into(tail, out, seen);
        }
    }
}

/// Self-delimiting length-prefixed atom encoding.
fn mat(atom: &Atom, out: &mut BitVec<u8, Lsb0>) {
    let b = atom.bit_len();
    if b == 0 {
        out.push(true);
        return;
    }
    let c = usize_bit_len(b);
    for _ in 0..c {
        out.push(false);
    }
    out.push(true);
    for i in 0..c - 1 {
        out.push((b >> i) & 1 == 1);
    }
    out.extend_from_bitslice(atom.bits());
}

fn usize_bit_len(value: usize) -> usize {
    (usize::BITS - value.leading_zeros()) as usize
}

// =============================================================================
// cue
// =============================================================================

/// Deserialize a noun, rejecting anything `jam` would not produce.
pub fn cue(bytes: &[u8]) -> Result<Noun, NounError> {
    let bits = bytes.view_bits::<Lsb0>();
    let mut reader = BitReader { bits, cursor: 0 };
    let mut seen: HashMap<usize, Noun> = HashMap::new();

    let noun = cue_at(&mut reader, &mut seen, 0)?;

    if reader.bits[reader.cursor..].any() {
        return Err(NounError::TrailingBits(reader.cursor));
    }
    Ok(noun)
}

struct BitReader<'a> {
    bits: &'a BitSlice<u8, Lsb0>,
    cursor: usize,
}

impl BitReader<'_> {
    fn read_bit(&mut self) -> Result<bool, NounError> {
        let bit = self
            .bits
            .get(self.cursor)
            .map(|b| *b)
            .ok_or(NounError::Truncated(self.cursor))?;
        self.cursor += 1;
        Ok(bit)
    }

    fn remaining(&self) -> usize {
        self.bits.len() - self.cursor
    }

    /// Inverse of `mat`.
    fn rub(&mut self) -> Result<Atom, NounError> {
        let start = self.cursor;
        let mut c = 0usize;
        while !self.read_bit()? {
            c += 1;
            if c > MAX_LENGTH_PREFIX_BITS {
                return Err(NounError::LengthTooWide(start));
            }
        }
        if c == 0 {
            return Ok(Atom::zero());
        }

        let mut len = 1usize << (c - 1);
        for i in 0..c - 1 {
            if self.read_bit()? {
                len |= 1 << i;
            }
        }
        if len > self.remaining() {
            return Err(NounError::Truncated(self.bits.len()));
        }

        let value = &self.bits[self.cursor..self.cursor + len];
        if !value[len - 1] {
            return Err(NounError::NonCanonical(start));
        }
        let mut bytes = vec![0u8; len.div_ceil(8)];
        bytes.view_bits_mut::<Lsb0>()[..len].copy_from_bitslice(value);
        self.cursor += len;
        Ok(Atom::from_bytes_le(&bytes))
    }
}

fn cue_at(
    reader: &mut BitReader<'_>,
    seen: &mut HashMap<usize, Noun>,
    depth: usize,
) -> Result<Noun, NounError> {
    let start = reader.cursor;

    if !reader.read_bit()? {
        let noun = Noun::Atom(reader.rub()?);
        seen.insert(start, noun.clone());
        return Ok(noun);
    }

    if !reader.read_bit()? {
        if depth >= MAX_CUE_DEPTH {
            return Err(NounError::TooDeep(MAX_CUE_DEPTH));
        }
        let head = cue_at(reader, seen, depth + 1)?;
        let tail = cue_at(reader, seen, depth + 1)?;
        let noun = Noun::cell(head, tail);
        seen.insert(start, noun.clone());
        return Ok(noun);
    }

    let target = reader.rub()?;
    let offset = target.to_u64().ok_or(NounError::LengthTooWide(start))?;
    usize::try_from(offset)
        .ok()
        .and_then(|o| seen.get(&o))
        .cloned()
        .ok_or(NounError::DanglingBackref(offset))
}
