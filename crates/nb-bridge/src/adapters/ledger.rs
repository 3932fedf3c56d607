//! In-Memory Ledger Adapter
//!
//! Implements `NoteSource` over maps keyed by first name. Accepted
//! transactions consume their inputs and credit their outputs, one coalesced
//! note per destination lock.

use crate::domain::{
    first_name_of, BridgeError, FirstName, LockRoot, Nicks, Note, NoteData, NoteHash,
    SignedTx, SpendCondition, TxId,
};
use crate::ports::outbound::NoteSource;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// In-memory note source for testing and local tooling.
#[derive(Default)]
pub struct InMemoryLedger {
    notes: RwLock<HashMap<FirstName, Vec<Note>>>,
    accepted: RwLock<Vec<TxId>>,
    queries: AtomicUsize,
    fail_listing: AtomicBool,
    fail_broadcast: AtomicBool,
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a note under `condition`.
    pub fn add_note(&self, condition: &SpendCondition, note: Note) {
        self.notes
            .write()
            .entry(condition.first_name())
            .or_default()
            .push(note);
    }

    /// Place a plain note of `assets` under `condition`, deriving its hash from `seed`.
    pub fn fund(&self, condition: &SpendCondition, assets: Nicks, seed: u64) -> NoteHash {
        let mut hasher = Sha256::new();
        hasher.update(condition.lock_root().0);
        hasher.update(seed.to_le_bytes());
        let hash = NoteHash(hasher.finalize().into());
        self.add_note(
            condition,
            Note {
                hash,
                assets,
                note_data: NoteData::empty(),
            },
        );
        hash
    }

    /// Notes currently held under `condition`.
    pub fn notes_for(&self, condition: &SpendCondition) -> Vec<Note> {
        self.notes
            .read()
            .get(&condition.first_name())
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `get_notes` calls served or refused.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Make listing fail until cleared.
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make broadcast fail until cleared.
    pub fn set_fail_broadcast(&self, fail: bool) {
        self.fail_broadcast.store(fail, Ordering::SeqCst);
    }

    /// Accepted transaction ids, in acceptance order.
    pub fn accepted(&self) -> Vec<TxId> {
        self.accepted.read().clone()
    }

    fn apply(&self, signed: &SignedTx) {
        let mut notes = self.notes.write();

        for spend in &signed.raw.spends {
            for list in notes.values_mut() {
                list.retain(|n| n.hash != spend.note.hash);
            }
        }

        let mut outputs: Vec<(LockRoot, Nicks, NoteData)> = Vec::new();
        for seed in signed.raw.seeds() {
            match outputs.iter_mut().find(|(lock, _, _)| *lock == seed.lock_root) {
                Some((_, total, data)) => {
                    *total = total.saturating_add(seed.gift);
                    if data.is_empty() {
                        *data = seed.note_data.clone();
                    }
                }
                None => outputs.push((seed.lock_root, seed.gift, seed.note_data.clone())),
            }
        }

        for (lock_root, assets, note_data) in outputs {
            let mut hasher = Sha256::new();
            hasher.update(signed.raw.id.0);
            hasher.update(lock_root.0);
            notes.entry(first_name_of(&lock_root)).or_default().push(Note {
                hash: NoteHash(hasher.finalize().into()),
                assets,
                note_data,
            });
        }
    }
}

#[async_trait]
impl NoteSource for InMemoryLedger {
    async fn get_notes(&self, first_name: &FirstName) -> Result<Vec<Note>, BridgeError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(BridgeError::NoteSourceUnavailable(
                "ledger listing disabled".to_string(),
            ));
        }
        let notes = self.notes.read().get(first_name).cloned().unwrap_or_default();
        debug!("[nb-bridge] Listed {} notes for {}", notes.len(), first_name);
        Ok(notes)
    }

    async fn broadcast(&self, signed_tx: &[u8]) -> Result<(), BridgeError> {
        if self.fail_broadcast.load(Ordering::SeqCst) {
            warn!("[nb-bridge] Ledger refused broadcast");
            return Err(BridgeError::BroadcastFailed(
                "ledger unreachable".to_string(),
            ));
        }

        let signed = SignedTx::from_bytes(signed_tx)
            .map_err(|e| BridgeError::BroadcastFailed(format!("rejected by ledger: {}", e)))?;
        let id = signed.raw.id;

        // Held across apply so concurrent duplicates cannot both land.
        let mut accepted = self.accepted.write();
        if accepted.contains(&id) {
            debug!("[nb-bridge] Transaction {} already accepted", id);
            return Ok(());
        }

        self.apply(&signed);
        accepted.push(id);
        drop(accepted);
        info!("[nb-bridge] Ledger accepted transaction {}", id);
        Ok(())
    }
}
