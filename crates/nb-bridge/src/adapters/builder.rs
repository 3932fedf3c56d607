//! Transaction Builder Adapter
//!
//! Default `TransactionBuilder`: largest-first selection, then assembly.

use crate::algorithms::{assemble, select_notes, Assembly, AssemblyRequest};
use crate::domain::{BridgeConfig, BridgeError, SpendableNote};
use crate::ports::outbound::TransactionBuilder;

/// Builds bridge transactions from discovered notes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoteTransactionBuilder;

impl TransactionBuilder for NoteTransactionBuilder {
    fn build(
        &self,
        candidates: Vec<SpendableNote>,
        request: &AssemblyRequest,
        config: &BridgeConfig,
    ) -> Result<Assembly, BridgeError> {
        let selection = select_notes(candidates, request.amount, &config.fee)?;
        assemble(&selection, request, config)
    }
}
