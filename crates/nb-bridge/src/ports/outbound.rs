//! # Outbound Ports
//!
//! Traits for external collaborators (note source, signer, address checks,
//! transaction building).

use crate::algorithms::{Assembly, AssemblyRequest};
use crate::domain::{
    BridgeConfig, BridgeError, FirstName, LockRoot, Nicks, Note, NoteData, RawTx, Seed,
    SignedTx, SignerInput, SpendableNote, Witness, BRIDGE_NOTE_KEY,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source-chain ledger - outbound port.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Notes indexed under a first name, in ledger order.
    async fn get_notes(&self, first_name: &FirstName) -> Result<Vec<Note>, BridgeError>;

    /// Submit signed transaction bytes. Resubmitting an accepted transaction is a no-op.
    async fn broadcast(&self, signed_tx: &[u8]) -> Result<(), BridgeError>;
}

/// Signer reply. Rejection is a user decision, not a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignerResponse {
    /// Signed transaction bytes.
    Signed(Vec<u8>),
    /// User declined to sign.
    Rejected,
    /// Signing could not complete.
    Failed(String),
}

/// Wallet signer - outbound port.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Ask the user to sign `tx`, authorizing `inputs`.
    async fn sign(&self, tx: &RawTx, inputs: &[SignerInput]) -> SignerResponse;
}

/// Address format checks - outbound port.
pub trait AddressValidator: Send + Sync {
    /// Whether `address` is a well-formed source-chain address.
    fn is_valid_source_address(&self, address: &str) -> bool;

    /// Whether `address` is a well-formed destination address.
    fn is_valid_destination_address(&self, address: &str) -> bool;
}

/// Selection plus assembly - outbound port.
pub trait TransactionBuilder: Send + Sync {
    /// Build the unsigned transaction from discovered candidates.
    fn build(
        &self,
        candidates: Vec<SpendableNote>,
        request: &AssemblyRequest,
        config: &BridgeConfig,
    ) -> Result<Assembly, BridgeError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Behaviour of [`MockSigner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockSignerMode {
    /// Sign as asked.
    Approve,
    /// Decline.
    Reject,
    /// Fail with a reason.
    Fail(String),
    /// Sign after redirecting the payload output to another lock.
    Redirect(LockRoot),
    /// Sign after moving part of the payload output to another lock.
    Skim {
        /// Nicks diverted.
        amount: Nicks,
        /// Receiving lock.
        to: LockRoot,
    },
}

/// Mock signer for testing.
pub struct MockSigner {
    mode: Mutex<MockSignerMode>,
    calls: AtomicUsize,
}

impl MockSigner {
    /// Signer with the given behaviour.
    pub fn new(mode: MockSignerMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
        }
    }

    /// Change behaviour for later calls.
    pub fn set_mode(&self, mode: MockSignerMode) {
        *self.mode.lock() = mode;
    }

    /// Number of sign requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tamper(tx: &RawTx, mode: &MockSignerMode) -> Result<RawTx, BridgeError> {
        let mut spends = tx.spends.clone();
        for spend in &mut spends {
            let Some(pos) = spend
                .seeds
                .iter()
                .position(|s| s.note_data.get(BRIDGE_NOTE_KEY).is_some())
            else {
                continue;
            };
            match mode {
                MockSignerMode::Redirect(lock) => spend.seeds[pos].lock_root = *lock,
                MockSignerMode::Skim { amount, to } => {
                    let taken = (*amount).min(spend.seeds[pos].gift);
                    spend.seeds[pos].gift -= taken;
                    let parent_hash = spend.note.hash;
                    spend.seeds.push(Seed {
                        lock_root: *to,
                        gift: taken,
                        note_data: NoteData::empty(),
                        parent_hash,
                    });
                }
                _ => {}
            }
        }
        RawTx::new(spends)
    }

    fn sign_bytes(tx: RawTx, inputs: &[SignerInput]) -> Result<Vec<u8>, BridgeError> {
        let witnesses = inputs
            .iter()
            .map(|input| {
                let signer = input
                    .spend_condition
                    .signers()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let mut hasher = Sha256::new();
                hasher.update(tx.id.0);
                hasher.update(input.note.hash.0);
                hasher.update(signer.as_bytes());
                Witness {
                    note: input.note.hash,
                    signer,
                    signature: hasher.finalize().to_vec(),
                }
            })
            .collect();
        SignedTx { raw: tx, witnesses }.to_bytes()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new(MockSignerMode::Approve)
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    async fn sign(&self, tx: &RawTx, inputs: &[SignerInput]) -> SignerResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().clone();

        let tx = match mode {
            MockSignerMode::Reject => return SignerResponse::Rejected,
            MockSignerMode::Fail(reason) => return SignerResponse::Failed(reason),
            MockSignerMode::Approve => Ok(tx.clone()),
            ref tampering => Self::tamper(tx, tampering),
        };

        match tx.and_then(|tx| Self::sign_bytes(tx, inputs)) {
            Ok(bytes) => SignerResponse::Signed(bytes),
            Err(e) => SignerResponse::Failed(e.to_string()),
        }
    }
}
