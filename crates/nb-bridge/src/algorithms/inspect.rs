//! Decoding of deposits already sitting at the bridge lock.

use super::field_codec::decode;
use super::metadata;
use crate::domain::{BridgeDeposit, ChainTag, Note, BRIDGE_NOTE_KEY};

/// Decode the `%bridge` payload of each note.
///
/// Failures are reported per note rather than aborting the listing.
pub fn decode_deposits(notes: &[Note], chain: ChainTag) -> Vec<BridgeDeposit> {
    notes
        .iter()
        .map(|note| {
            let destination = note
                .note_data
                .get(BRIDGE_NOTE_KEY)
                .ok_or_else(|| "no %bridge note data".to_string())
                .and_then(|blob| metadata::parse(blob, chain).map_err(|e| e.to_string()))
                .and_then(|noun| decode(&noun.belts).map_err(|e| e.to_string()));
            BridgeDeposit {
                note: note.hash,
                assets: note.assets,
                destination,
            }
        })
        .collect()
}
