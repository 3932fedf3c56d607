//! # Transaction Validation
//!
//! Checks that a transaction actually bridges what it claims, run once before
//! signing and once more on the signed bytes before broadcast.
//!
//! ## Checks, in order
//!
//! 1. Exactly one output carries `%bridge` note data (`NoBridgeOutput`).
//! 2. It pays the multisig lock derived from configuration (`WrongRecipient`).
//! 3. All outputs to that lock sum to at least the minimum (`BelowMinimum`).
//! 4. The payload parses strictly (`MalformedPayload`) and its belts decode to
//!    an address the destination validator accepts (`InvalidReconstructedAddress`).

use super::field_codec::decode;
use super::metadata;
use crate::domain::{
    invariant_minimum_amount, invariant_pays_bridge, invariant_single_bridge_output,
    invariant_value_conserved, Belts, BridgeConfig, BridgeError, ChainTag, EvmAddress, LockRoot,
    Nicks, RawTx, Seed, SignedTx, ValidatedBridge, BRIDGE_NOTE_KEY,
};
use crate::ports::AddressValidator;
use tracing::warn;

/// Everything validation compares against, derived from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationRules {
    /// Lock every bridge deposit must pay.
    pub bridge_lock: LockRoot,
    /// Minimum bridged amount.
    pub minimum_amount: Nicks,
    /// Expected destination chain.
    pub chain: ChainTag,
}

impl ValidationRules {
    /// Derive rules from configuration, never from the transaction.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self {
            bridge_lock: config.bridge_lock_root()?,
            minimum_amount: config.minimum_amount,
            chain: config.chain_tag()?,
        })
    }
}

/// Validate an output list.
pub fn validate_seeds(
    seeds: &[Seed],
    rules: &ValidationRules,
    addresses: &dyn AddressValidator,
) -> Result<ValidatedBridge, BridgeError> {
    let index = invariant_single_bridge_output(seeds)?.ok_or(BridgeError::NoBridgeOutput)?;
    let bridge_seed = &seeds[index];

    invariant_pays_bridge(&bridge_seed.lock_root, &rules.bridge_lock)?;

    let amount = seeds
        .iter()
        .filter(|s| s.lock_root == bridge_seed.lock_root)
        .try_fold(0 as Nicks, |acc, s| acc.checked_add(s.gift))
        .ok_or_else(|| BridgeError::MalformedPayload("bridge amount overflows".into()))?;
    invariant_minimum_amount(amount, rules.minimum_amount)?;

    let blob = bridge_seed
        .note_data
        .get(BRIDGE_NOTE_KEY)
        .ok_or(BridgeError::NoBridgeOutput)?;
    let noun = metadata::parse(blob, rules.chain)?;

    let destination_address = decode(&noun.belts)?;
    let rendered = destination_address.to_string();
    if !addresses.is_valid_destination_address(&rendered) {
        return Err(BridgeError::InvalidReconstructedAddress(rendered));
    }

    Ok(ValidatedBridge {
        amount,
        destination_address,
        belts: noun.belts,
    })
}

fn check_structure(tx: &RawTx) -> Result<(), BridgeError> {
    tx.verify_integrity()?;
    if !invariant_value_conserved(&tx.spends) {
        return Err(BridgeError::TransactionEncoding(
            "a spend does not allocate exactly its note value".into(),
        ));
    }
    Ok(())
}

/// Pre-signing validation of an assembled transaction.
pub fn validate_unsigned(
    tx: &RawTx,
    rules: &ValidationRules,
    addresses: &dyn AddressValidator,
) -> Result<ValidatedBridge, BridgeError> {
    check_structure(tx)?;
    validate_seeds(&tx.seed_list(), rules, addresses).inspect_err(|e| {
        warn!("[nb-bridge] Pre-signing validation failed for {}: {}", tx.id, e);
    })
}

/// Post-signing validation of the exact bytes about to be broadcast.
pub fn validate_signed(
    bytes: &[u8],
    rules: &ValidationRules,
    addresses: &dyn AddressValidator,
) -> Result<(SignedTx, ValidatedBridge), BridgeError> {
    let signed = SignedTx::from_bytes(bytes)?;
    check_structure(&signed.raw)?;

    for spend in &signed.raw.spends {
        if !signed.witnesses.iter().any(|w| w.note == spend.note.hash) {
            return Err(BridgeError::TransactionEncoding(format!(
                "input {} has no witness",
                spend.note.hash
            )));
        }
    }

    let validated = validate_seeds(&signed.raw.seed_list(), rules, addresses).inspect_err(|e| {
        warn!(
            "[nb-bridge] Post-signing validation failed for {}: {}",
            signed.raw.id, e
        );
    })?;
    Ok((signed, validated))
}

/// Compare validated ground truth against what was requested.
pub fn ensure_matches_request(
    validated: &ValidatedBridge,
    amount: Nicks,
    destination: &EvmAddress,
    belts: &Belts,
) -> Result<(), BridgeError> {
    if validated.amount != amount {
        return Err(BridgeError::ValidationMismatch {
            field: "amount".into(),
            expected: amount.to_string(),
            actual: validated.amount.to_string(),
        });
    }
    if &validated.destination_address != destination {
        return Err(BridgeError::ValidationMismatch {
            field: "destination_address".into(),
            expected: destination.to_string(),
            actual: validated.destination_address.to_string(),
        });
    }
    if &validated.belts != belts {
        return Err(BridgeError::ValidationMismatch {
            field: "belts".into(),
            expected: format!("{:?}", belts),
            actual: format!("{:?}", validated.belts),
        });
    }
    Ok(())
}
