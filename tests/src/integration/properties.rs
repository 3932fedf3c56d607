//! # Cross-Module Properties
//!
//! Selection, assembly and validation composed over generated wallets.

#[cfg(test)]
mod tests {
    use nb_bridge::domain::{invariant_value_conserved, NoteData, NoteHash};
    use nb_bridge::{
        assemble, build_metadata, decode, ensure_matches_request, parse_metadata, select_notes,
        validate_unsigned, AssemblyRequest, BridgeConfig, BridgeError, DefaultAddressValidator,
        EvmAddress, FeeSchedule, Note, SpendCondition, SpendableNote, ValidationRules,
    };
    use proptest::prelude::*;

    const OWNER: &str = "4Py91FZ7UqniEDyztahwmEdx7wgfEWn9XuC2GezCbMFzQgAyCMcWRhZ";

    fn config() -> BridgeConfig {
        BridgeConfig {
            fee: FeeSchedule {
                fee_per_word: 3,
                ..FeeSchedule::default()
            },
            minimum_amount: 1_000,
            ..BridgeConfig::default()
        }
    }

    fn wallet(values: &[u64]) -> Vec<SpendableNote> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut hash = [0u8; 32];
                hash[..8].copy_from_slice(&(i as u64).to_le_bytes());
                SpendableNote {
                    note: Note {
                        hash: NoteHash(hash),
                        assets: *v,
                        note_data: NoteData::empty(),
                    },
                    spend_condition: SpendCondition::single(OWNER),
                }
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_payload_recovers_destination(bytes in any::<[u8; 20]>()) {
            let address = EvmAddress::from_bytes(bytes);
            let chain = config().chain_tag().unwrap();
            let noun = parse_metadata(&build_metadata(&address, chain), chain).unwrap();
            prop_assert_eq!(decode(&noun.belts).unwrap(), address);
        }

        #[test]
        fn prop_assembled_tx_passes_validation(
            values in prop::collection::vec(1u64..200_000, 1..8),
            amount in 1_000u64..400_000,
            dest in any::<[u8; 20]>(),
        ) {
            let config = config();
            let destination = EvmAddress::from_bytes(dest);
            let request = AssemblyRequest {
                destination,
                amount,
                owner: OWNER.to_string(),
            };

            let built = select_notes(wallet(&values), amount, &config.fee)
                .and_then(|selection| assemble(&selection, &request, &config));

            match built {
                Ok(assembly) => {
                    let rules = ValidationRules::from_config(&config).unwrap();
                    let validated =
                        validate_unsigned(&assembly.tx, &rules, &DefaultAddressValidator).unwrap();
                    prop_assert_eq!(validated.amount, amount);
                    prop_assert!(ensure_matches_request(
                        &validated,
                        amount,
                        &destination,
                        &nb_bridge::encode(&destination)
                    )
                    .is_ok());
                    prop_assert!(invariant_value_conserved(&assembly.tx.spends));

                    let carriers = assembly.tx.seeds().filter(|s| s.note_data.has_bridge()).count();
                    prop_assert_eq!(carriers, 1);
                }
                Err(BridgeError::InsufficientBalance { required, .. }) => {
                    prop_assert!(required >= amount);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        #[test]
        fn prop_fee_never_exceeds_estimate(
            values in prop::collection::vec(1u64..200_000, 1..8),
            amount in 1_000u64..400_000,
        ) {
            let config = config();
            let request = AssemblyRequest {
                destination: EvmAddress::from_bytes([0x42; 20]),
                amount,
                owner: OWNER.to_string(),
            };
            if let Ok(selection) = select_notes(wallet(&values), amount, &config.fee) {
                // A selection that covers the estimate always assembles.
                let assembly = assemble(&selection, &request, &config);
                prop_assert!(assembly.is_ok(), "selection covered but assembly failed: {:?}", assembly);
                let assembly = assembly.unwrap();
                prop_assert!(assembly.fee() <= selection.estimated_fee);
                prop_assert_eq!(assembly.signer_inputs.len(), selection.notes.len());
            }
        }
    }
}
