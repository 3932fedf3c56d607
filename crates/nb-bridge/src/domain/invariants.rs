//! # Domain Invariants
//!
//! Business rules every assembled bridge transaction must satisfy.

use super::entities::{Seed, Spend};
use super::errors::{BridgeError, Nicks};
use super::value_objects::LockRoot;

/// Invariant: multisig threshold lies in `[1, signers]`.
pub fn invariant_threshold_in_range(threshold: u64, signers: usize) -> Result<(), BridgeError> {
    if threshold == 0 || threshold > signers as u64 {
        return Err(BridgeError::BridgeNotConfigured(format!(
            "threshold {} out of range for {} addresses",
            threshold, signers
        )));
    }
    Ok(())
}

/// Invariant: every spend allocates exactly its note value to gifts and fee.
pub fn invariant_value_conserved(spends: &[Spend]) -> bool {
    spends.iter().all(Spend::is_balanced)
}

/// Invariant: at most one seed carries the bridge payload.
///
/// Returns the index of that seed, `None` if there is none.
pub fn invariant_single_bridge_output(seeds: &[Seed]) -> Result<Option<usize>, BridgeError> {
    let mut carriers = seeds
        .iter()
        .enumerate()
        .filter(|(_, s)| s.note_data.has_bridge())
        .map(|(i, _)| i);
    let first = carriers.next();
    if carriers.next().is_some() {
        return Err(BridgeError::MalformedPayload(
            "more than one output carries %bridge note data".to_string(),
        ));
    }
    Ok(first)
}

/// Invariant: the bridge output pays the configured multisig.
pub fn invariant_pays_bridge(actual: &LockRoot, expected: &LockRoot) -> Result<(), BridgeError> {
    if actual != expected {
        return Err(BridgeError::WrongRecipient {
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(())
}

/// Invariant: the bridge output meets the minimum.
pub fn invariant_minimum_amount(amount: Nicks, minimum: Nicks) -> Result<(), BridgeError> {
    if amount < minimum {
        return Err(BridgeError::BelowMinimum { amount, minimum });
    }
    Ok(())
}
