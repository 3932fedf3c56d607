//! # Algorithms Module
//!
//! Pure bridge logic: codecs, selection, assembly, validation.

pub mod assembler;
pub mod field_codec;
pub mod inspect;
pub mod metadata;
pub mod note_selection;
pub mod noun;
pub mod validator;

pub use assembler::{assemble, Assembly, AssemblyRequest};
pub use field_codec::{decode, encode, encode_str, round_trips};
pub use inspect::decode_deposits;
pub use metadata::{build as build_metadata, parse as parse_metadata, BridgeNoun, BRIDGE_NOUN_VERSION};
pub use note_selection::{select_notes, sort_candidates, Selection};
pub use noun::{cue, jam, Atom, Noun, NounError};
pub use validator::{
    ensure_matches_request, validate_seeds, validate_signed, validate_unsigned, ValidationRules,
};
