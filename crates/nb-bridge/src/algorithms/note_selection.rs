//! # Note Selection
//!
//! Largest-first selection covering `amount + fee(n)`, where the fee depends
//! on how many notes end up selected. Each added note re-prices the fee, so
//! the loop runs at most once per candidate.

use crate::domain::{BridgeError, FeeSchedule, Nicks, SpendableNote};
use tracing::debug;

/// Notes chosen to fund a bridge transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Selected notes, largest first.
    pub notes: Vec<SpendableNote>,
    /// Sum of their values.
    pub total: Nicks,
    /// Fee estimate at the final count.
    pub estimated_fee: Nicks,
}

/// Order candidates by value, descending. Equal values keep discovery order.
pub fn sort_candidates(candidates: &mut [SpendableNote]) {
    candidates.sort_by(|a, b| b.note.assets.cmp(&a.note.assets));
}

/// Select the fewest largest notes covering `amount` plus the estimated fee.
pub fn select_notes(
    mut candidates: Vec<SpendableNote>,
    amount: Nicks,
    fee: &FeeSchedule,
) -> Result<Selection, BridgeError> {
    if candidates.is_empty() {
        return Err(BridgeError::NoSpendableNotes);
    }
    sort_candidates(&mut candidates);

    let mut total: Nicks = 0;
    let mut required = amount;
    let mut selected = Vec::new();

    for candidate in candidates {
        total = total.saturating_add(candidate.note.assets);
        selected.push(candidate);

        let estimated_fee = fee.estimate(selected.len());
        required = amount.saturating_add(estimated_fee);
        debug!(
            "[nb-bridge] Selected {} notes totalling {}, need {} (fee {})",
            selected.len(),
            total,
            required,
            estimated_fee
        );

        if total >= required {
            return Ok(Selection {
                notes: selected,
                total,
                estimated_fee,
            });
        }
    }

    Err(BridgeError::InsufficientBalance {
        selected_count: selected.len(),
        selected_total: total,
        required,
    })
}
