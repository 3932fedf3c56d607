//! # Transaction Assembly
//!
//! Turns selected notes into an unsigned bridge transaction.
//!
//! Each note, in selection order, gives `min(remaining, assets)` to the bridge
//! multisig. Only the first bridge seed carries the `%bridge` payload; the
//! ledger coalesces seeds sharing a lock into one output. Whatever a note does
//! not give is its slack. The exact fee is charged against slack in the same
//! order and the rest of each note's slack is refunded to the owner.

use super::metadata;
use super::note_selection::Selection;
use crate::domain::{
    BridgeConfig, BridgeError, EvmAddress, Nicks, NoteData, RawTx, Seed, SignerInput, Spend,
    SpendCondition, SpendableNote,
};
use tracing::debug;

/// What the owner asked to bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyRequest {
    /// Destination on the receiving chain.
    pub destination: EvmAddress,
    /// Amount to bridge in nicks.
    pub amount: Nicks,
    /// Owner source-chain address, receiver of refunds.
    pub owner: String,
}

/// Unsigned transaction plus the inputs a signer must authorize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembly {
    /// Transaction to sign.
    pub tx: RawTx,
    /// One entry per spend, in spend order.
    pub signer_inputs: Vec<SignerInput>,
}

impl Assembly {
    /// Fee fixed into the transaction.
    pub fn fee(&self) -> Nicks {
        self.tx.total_fee
    }
}

struct Allocation {
    candidate: SpendableNote,
    gift: Nicks,
    slack: Nicks,
}

/// Build the unsigned transaction for `request` from `selection`.
pub fn assemble(
    selection: &Selection,
    request: &AssemblyRequest,
    config: &BridgeConfig,
) -> Result<Assembly, BridgeError> {
    if request.amount == 0 {
        return Err(BridgeError::AmountNotPositive);
    }
    if request.amount < config.minimum_amount {
        return Err(BridgeError::AmountBelowMinimum {
            amount: request.amount,
            minimum: config.minimum_amount,
        });
    }
    if selection.notes.is_empty() {
        return Err(BridgeError::NoSpendableNotes);
    }

    let bridge_lock = config.bridge_lock_root()?;
    let refund_lock = SpendCondition::single(&request.owner).lock_root();
    let payload = metadata::build(&request.destination, config.chain_tag()?);

    let mut remaining = request.amount;
    let allocations: Vec<Allocation> = selection
        .notes
        .iter()
        .map(|candidate| {
            let gift = remaining.min(candidate.note.assets);
            remaining -= gift;
            Allocation {
                candidate: candidate.clone(),
                gift,
                slack: candidate.note.assets - gift,
            }
        })
        .collect();

    let selected_total = selection.total;
    if remaining > 0 {
        return Err(BridgeError::InsufficientBalance {
            selected_count: allocations.len(),
            selected_total,
            required: request.amount,
        });
    }

    // Refund seeds are reserved for every spend with slack.
    let seed_count = allocations
        .iter()
        .map(|a| usize::from(a.gift > 0) + usize::from(a.slack > 0))
        .sum();
    let fee = config
        .fee
        .exact(allocations.len(), seed_count, payload.len());

    let mut unpaid_fee = fee;
    let mut payload = Some(payload);
    let mut spends = Vec::with_capacity(allocations.len());
    let mut signer_inputs = Vec::with_capacity(allocations.len());

    for allocation in allocations {
        let Allocation {
            candidate,
            gift,
            slack,
        } = allocation;
        let fee_share = slack.min(unpaid_fee);
        unpaid_fee -= fee_share;
        let refund = slack - fee_share;

        let mut seeds = Vec::with_capacity(2);
        if gift > 0 {
            let note_data = payload.take().map(NoteData::bridge).unwrap_or_default();
            seeds.push(Seed {
                lock_root: bridge_lock,
                gift,
                note_data,
                parent_hash: candidate.note.hash,
            });
        }
        if refund > 0 {
            seeds.push(Seed {
                lock_root: refund_lock,
                gift: refund,
                note_data: NoteData::empty(),
                parent_hash: candidate.note.hash,
            });
        }

        signer_inputs.push(SignerInput {
            note: candidate.note.clone(),
            spend_condition: candidate.spend_condition.clone(),
        });
        spends.push(Spend {
            note: candidate.note,
            spend_condition: candidate.spend_condition,
            seeds,
            fee: fee_share,
        });
    }

    if unpaid_fee > 0 {
        return Err(BridgeError::InsufficientBalance {
            selected_count: spends.len(),
            selected_total,
            required: request.amount.saturating_add(fee),
        });
    }

    let tx = RawTx::new(spends)?;
    debug!(
        "[nb-bridge] Assembled tx {} with {} inputs, {} outputs, fee {}",
        tx.id,
        tx.spends.len(),
        tx.seeds().count(),
        tx.total_fee
    );

    Ok(Assembly { tx, signer_inputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::note_selection::select_notes;
    use crate::domain::{invariant_value_conserved, FeeSchedule, Note, NoteHash, BRIDGE_NOTE_KEY};

    const OWNER: &str = "owner-address";

    fn config() -> BridgeConfig {
        BridgeConfig {
            fee: FeeSchedule {
                fee_per_word: 1,
                ..FeeSchedule::default()
            },
            minimum_amount: 1_000,
            ..BridgeConfig::default()
        }
    }

    fn notes(values: &[Nicks]) -> Vec<SpendableNote> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SpendableNote {
                note: Note {
                    hash: NoteHash([i as u8 + 1; 32]),
                    assets: *v,
                    note_data: NoteData::empty(),
                },
                spend_condition: SpendCondition::single(OWNER),
            })
            .collect()
    }

    fn request(amount: Nicks) -> AssemblyRequest {
        AssemblyRequest {
            destination: EvmAddress::parse("0x1234567890abcdef1234567890abcdef1234abcd").unwrap(),
            amount,
            owner: OWNER.to_string(),
        }
    }

    fn assemble_from(values: &[Nicks], amount: Nicks) -> Result<Assembly, BridgeError> {
        let config = config();
        let selection = select_notes(notes(values), amount, &config.fee)?;
        assemble(&selection, &request(amount), &config)
    }

    #[test]
    fn test_two_input_layout() {
        let config = config();
        let assembly = assemble_from(&[70_000, 40_000, 10_000], 100_000).unwrap();
        let tx = &assembly.tx;
        let bridge_lock = config.bridge_lock_root().unwrap();
        let refund_lock = SpendCondition::single(OWNER).lock_root();

        assert_eq!(tx.spends.len(), 2);
        assert_eq!(assembly.signer_inputs.len(), 2);

        // First note is fully given, with the payload.
        let first = &tx.spends[0];
        assert_eq!(first.seeds.len(), 1);
        assert_eq!(first.seeds[0].gift, 70_000);
        assert_eq!(first.seeds[0].lock_root, bridge_lock);
        assert!(first.seeds[0].note_data.has_bridge());
        assert_eq!(first.fee, 0);

        // Second gives the rest without payload and refunds after the fee.
        let second = &tx.spends[1];
        assert_eq!(second.seeds[0].gift, 30_000);
        assert_eq!(second.seeds[0].lock_root, bridge_lock);
        assert!(second.seeds[0].note_data.is_empty());
        assert_eq!(second.seeds[1].lock_root, refund_lock);
        assert_eq!(second.seeds[1].gift, 10_000 - tx.total_fee);
        assert_eq!(second.fee, tx.total_fee);
    }

    #[test]
    fn test_exact_fee_matches_shape() {
        let config = config();
        let assembly = assemble_from(&[70_000, 40_000, 10_000], 100_000).unwrap();
        let payload_len = assembly
            .tx
            .seeds()
            .filter_map(|s| s.note_data.get(BRIDGE_NOTE_KEY))
            .map(<[u8]>::len)
            .sum::<usize>();
        assert_eq!(assembly.fee(), config.fee.exact(2, 3, payload_len));
        assert_eq!(
            assembly.fee(),
            20 + 2 * 30 + 3 * 13 + (payload_len as u64).div_ceil(8)
        );
    }

    #[test]
    fn test_value_conserved_and_parent_hashes() {
        let assembly = assemble_from(&[70_000, 40_000, 10_000], 100_000).unwrap();
        assert!(invariant_value_conserved(&assembly.tx.spends));
        for spend in &assembly.tx.spends {
            for seed in &spend.seeds {
                assert_eq!(seed.parent_hash, spend.note.hash);
            }
        }
    }

    #[test]
    fn test_single_payload_seed() {
        let assembly = assemble_from(&[40_000, 40_000, 40_000], 100_000).unwrap();
        let carriers = assembly.tx.seeds().filter(|s| s.note_data.has_bridge()).count();
        assert_eq!(carriers, 1);
        let bridged: Nicks = assembly
            .tx
            .seeds()
            .filter(|s| s.lock_root == config().bridge_lock_root().unwrap())
            .map(|s| s.gift)
            .sum();
        assert_eq!(bridged, 100_000);
    }

    #[test]
    fn test_fee_paid_from_first_slack() {
        // One large note covers everything; fee and refund come from it.
        let assembly = assemble_from(&[500_000], 100_000).unwrap();
        let spend = &assembly.tx.spends[0];
        assert_eq!(spend.seeds.len(), 2);
        assert_eq!(spend.fee, assembly.fee());
        assert!(spend.is_balanced());
    }

    #[test]
    fn test_slack_too_small_for_exact_fee() {
        let config = config();
        // Selection believes 100_084 suffices; exact fee with payload is larger.
        let selection = Selection {
            notes: notes(&[100_001]),
            total: 100_001,
            estimated_fee: 1,
        };
        let err = assemble(&selection, &request(100_000), &config).unwrap_err();
        assert!(matches!(err, BridgeError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_rejects_below_minimum_and_zero() {
        let config = config();
        let selection = select_notes(notes(&[50_000]), 10, &config.fee).unwrap();
        assert!(matches!(
            assemble(&selection, &request(10), &config),
            Err(BridgeError::AmountBelowMinimum { .. })
        ));
        assert_eq!(
            assemble(&selection, &request(0), &config),
            Err(BridgeError::AmountNotPositive)
        );
    }

    #[test]
    fn test_unconfigured_bridge() {
        let config = BridgeConfig {
            multisig: None,
            ..config()
        };
        let selection = select_notes(notes(&[500_000]), 100_000, &config.fee).unwrap();
        assert!(matches!(
            assemble(&selection, &request(100_000), &config),
            Err(BridgeError::BridgeNotConfigured(_))
        ));
    }
}
