//! # Domain Entities
//!
//! Notes, seeds, transactions and the session-facing snapshots built from them.

use super::errors::{BridgeError, Nicks};
use super::lock::SpendCondition;
use super::value_objects::{Belts, EvmAddress, LockRoot, NoteHash, TxId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Note-data key under which the bridge payload travels.
pub const BRIDGE_NOTE_KEY: &str = "%bridge";

/// One keyed blob attached to a note or seed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDataEntry {
    /// Entry key, e.g. `%bridge`.
    pub key: String,
    /// Jammed noun.
    pub blob: Vec<u8>,
}

/// Metadata attached to a note or seed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData(pub Vec<NoteDataEntry>);

impl NoteData {
    /// No entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single `%bridge` entry.
    pub fn bridge(blob: Vec<u8>) -> Self {
        Self(vec![NoteDataEntry {
            key: BRIDGE_NOTE_KEY.to_string(),
            blob,
        }])
    }

    /// First blob stored under `key`.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.blob.as_slice())
    }

    /// Whether a `%bridge` entry is present.
    pub fn has_bridge(&self) -> bool {
        self.get(BRIDGE_NOTE_KEY).is_some()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total blob bytes, which the fee charges for.
    pub fn byte_len(&self) -> usize {
        self.0.iter().map(|e| e.blob.len()).sum()
    }
}

/// Spendable value record on the source ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Identity, referenced as parent by the seeds this note funds.
    pub hash: NoteHash,
    /// Value in nicks.
    pub assets: Nicks,
    /// Attached metadata.
    pub note_data: NoteData,
}

/// A note together with the condition it is locked under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendableNote {
    /// The note.
    pub note: Note,
    /// Condition discovered alongside it.
    pub spend_condition: SpendCondition,
}

/// Transaction output being created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    /// Destination lock.
    pub lock_root: LockRoot,
    /// Amount in nicks.
    pub gift: Nicks,
    /// Attached metadata.
    pub note_data: NoteData,
    /// Note funding this seed.
    pub parent_hash: NoteHash,
}

/// Consumption of one note.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spend {
    /// Note being consumed.
    pub note: Note,
    /// Condition the signer must satisfy.
    pub spend_condition: SpendCondition,
    /// Outputs funded by this note.
    pub seeds: Vec<Seed>,
    /// Fee share paid from this note.
    pub fee: Nicks,
}

impl Spend {
    /// Sum of seed gifts, `None` on overflow.
    pub fn total_gift(&self) -> Option<Nicks> {
        self.seeds
            .iter()
            .try_fold(0 as Nicks, |acc, s| acc.checked_add(s.gift))
    }

    /// Whether gifts plus fee equal the note value.
    pub fn is_balanced(&self) -> bool {
        self.total_gift()
            .and_then(|gifts| gifts.checked_add(self.fee))
            == Some(self.note.assets)
    }
}

/// Unsigned transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTx {
    /// SHA-256 of the encoded spends.
    pub id: TxId,
    /// Inputs with their outputs.
    pub spends: Vec<Spend>,
    /// Sum of spend fees.
    pub total_fee: Nicks,
}

impl RawTx {
    /// Assemble a transaction, deriving its id and total fee.
    pub fn new(spends: Vec<Spend>) -> Result<Self, BridgeError> {
        let id = Self::compute_id(&spends)?;
        let total_fee = Self::fee_sum(&spends)?;
        Ok(Self {
            id,
            spends,
            total_fee,
        })
    }

    /// Content hash of a spend list.
    pub fn compute_id(spends: &[Spend]) -> Result<TxId, BridgeError> {
        let encoded = bincode::serialize(spends)
            .map_err(|e| BridgeError::TransactionEncoding(e.to_string()))?;
        Ok(TxId(Sha256::digest(encoded).into()))
    }

    fn fee_sum(spends: &[Spend]) -> Result<Nicks, BridgeError> {
        spends
            .iter()
            .try_fold(0 as Nicks, |acc, s| acc.checked_add(s.fee))
            .ok_or_else(|| BridgeError::TransactionEncoding("spend fees overflow".to_string()))
    }

    /// Check that id and total fee describe the spends actually present.
    pub fn verify_integrity(&self) -> Result<(), BridgeError> {
        if Self::compute_id(&self.spends)? != self.id {
            return Err(BridgeError::TransactionEncoding(
                "transaction id does not match its contents".to_string(),
            ));
        }
        let fee = Self::fee_sum(&self.spends)?;
        if fee != self.total_fee {
            return Err(BridgeError::TransactionEncoding(format!(
                "total fee {} does not match spend fees {}",
                self.total_fee, fee
            )));
        }
        Ok(())
    }

    /// Every output, in spend order.
    pub fn seeds(&self) -> impl Iterator<Item = &Seed> {
        self.spends.iter().flat_map(|s| s.seeds.iter())
    }

    /// Owned copy of every output.
    pub fn seed_list(&self) -> Vec<Seed> {
        self.seeds().cloned().collect()
    }
}

/// Signature over one input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// Input being authorized.
    pub note: NoteHash,
    /// Signing source-chain address.
    pub signer: String,
    /// Signature bytes.
    pub signature: Vec<u8>,
}

/// Signed transaction as handed back by the signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    /// Transaction that was signed.
    pub raw: RawTx,
    /// One witness per input.
    pub witnesses: Vec<Witness>,
}

impl SignedTx {
    /// Wire encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BridgeError> {
        bincode::serialize(self).map_err(|e| BridgeError::TransactionEncoding(e.to_string()))
    }

    /// Decode wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BridgeError> {
        bincode::deserialize(bytes).map_err(|e| BridgeError::TransactionEncoding(e.to_string()))
    }
}

/// Input a signer must authorize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInput {
    /// Note being spent.
    pub note: Note,
    /// Its lock.
    pub spend_condition: SpendCondition,
}

/// Ground truth extracted by the validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedBridge {
    /// Coalesced amount paid to the bridge lock.
    pub amount: Nicks,
    /// Destination decoded from the payload.
    pub destination_address: EvmAddress,
    /// Belts carried by the payload.
    pub belts: Belts,
}

/// Snapshot produced by preparation and consumed by confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    /// Transaction to sign.
    pub unsigned_tx: RawTx,
    /// Inputs the signer must authorize.
    pub signer_inputs: Vec<SignerInput>,
    /// Exact fee fixed into the transaction.
    pub computed_fee: Nicks,
    /// Requested destination.
    pub destination_address: EvmAddress,
    /// Encoded destination.
    pub belts: Belts,
    /// Requested amount.
    pub amount: Nicks,
    /// Inputs selected.
    pub notes_used_count: usize,
}

/// What the user is asked to confirm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePreview {
    /// Amount leaving for the bridge, as validated.
    pub amount: Nicks,
    /// Destination, as validated.
    pub destination_address: EvmAddress,
    /// Encoded destination.
    pub belts: Belts,
    /// Transaction fee.
    pub fee: Nicks,
    /// Inputs selected.
    pub notes_used: usize,
}

/// Outcome of a successful broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResult {
    /// Broadcast transaction id.
    pub tx_id: TxId,
    /// Fee paid.
    pub fee: Nicks,
    /// Destination credited.
    pub destination_address: EvmAddress,
    /// Amount bridged.
    pub amount: Nicks,
}

/// A note held at the bridge lock, with its payload decoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDeposit {
    /// Deposit note.
    pub note: NoteHash,
    /// Value in nicks.
    pub assets: Nicks,
    /// Decoded destination or the reason decoding failed.
    pub destination: Result<EvmAddress, String>,
}
