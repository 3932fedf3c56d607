//! Bridge Session - orchestration of one deposit flow
//!
//! ```text
//! Idle ─prepare─▶ Preparing ─▶ Confirming ─confirm─▶ AwaitingSignature ─▶ Pending ─▶ Success
//!   ▲                 │          │    ▲                    │                  │
//!   └─────cancel──────┼──────────┘    └──────rejected──────┘                  │
//!                     └──────────────────▶ Error ◀────────────────────────────┘
//! ```
//!
//! Validation runs twice: on the assembled transaction before the signer is
//! asked, and on the signed bytes before broadcast.
//!
//! Futures returned by `prepare`, `confirm` and `retry_broadcast` may be
//! dropped mid-flight. The session is then left in `Preparing`,
//! `AwaitingSignature` or `Pending`, and `reset` abandons the flow.

use crate::adapters::{DefaultAddressValidator, NoteTransactionBuilder};
use crate::algorithms::{
    decode_deposits, encode, ensure_matches_request, round_trips, validate_signed,
    validate_unsigned, AssemblyRequest, ValidationRules,
};
use crate::domain::{
    Belts, BridgeConfig, BridgeDeposit, BridgeError, BridgePreview, BridgeResult, BridgeStatus,
    EvmAddress, Nicks, PreparedTransaction, SignedTx, SpendCondition, SpendableNote,
    ValidatedBridge,
};
use crate::ports::inbound::{BridgeApi, ConfirmOutcome};
use crate::ports::outbound::{
    AddressValidator, NoteSource, SignerResponse, TransactionBuilder, TransactionSigner,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Signed bytes kept for re-broadcast after a transport failure, with the
/// request they must still satisfy.
struct PendingBroadcast {
    bytes: Vec<u8>,
    amount: Nicks,
    destination: EvmAddress,
    belts: Belts,
    result: BridgeResult,
}

/// One user's bridge flow.
pub struct BridgeSession {
    id: Uuid,
    owner: String,
    config: Arc<BridgeConfig>,
    note_source: Arc<dyn NoteSource>,
    signer: Arc<dyn TransactionSigner>,
    addresses: Arc<dyn AddressValidator>,
    builder: Arc<dyn TransactionBuilder>,
    status: BridgeStatus,
    error: Option<BridgeError>,
    preview: Option<BridgePreview>,
    prepared: Option<PreparedTransaction>,
    pending_broadcast: Option<PendingBroadcast>,
}

impl BridgeSession {
    /// Session for `owner` with the default address checks and builder.
    pub fn new(
        owner: impl Into<String>,
        config: Arc<BridgeConfig>,
        note_source: Arc<dyn NoteSource>,
        signer: Arc<dyn TransactionSigner>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            config,
            note_source,
            signer,
            addresses: Arc::new(DefaultAddressValidator),
            builder: Arc::new(NoteTransactionBuilder),
            status: BridgeStatus::Idle,
            error: None,
            preview: None,
            prepared: None,
            pending_broadcast: None,
        }
    }

    /// Replace the address validator.
    pub fn with_address_validator(mut self, addresses: Arc<dyn AddressValidator>) -> Self {
        self.addresses = addresses;
        self
    }

    /// Replace the transaction builder.
    pub fn with_builder(mut self, builder: Arc<dyn TransactionBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Correlation id carried on every log line.
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn invalid_state(&self, operation: &str) -> BridgeError {
        BridgeError::InvalidState {
            from: self.status.to_string(),
            operation: operation.to_string(),
        }
    }

    fn transition(&mut self, next: BridgeStatus) -> Result<(), BridgeError> {
        if !self.status.can_transition_to(next) {
            return Err(self.invalid_state(&format!("move to {}", next)));
        }
        info!(session = %self.id, "[nb-bridge] {} -> {}", self.status, next);
        self.status = next;
        Ok(())
    }

    fn fail(&mut self, err: BridgeError) -> BridgeError {
        match err.category() {
            crate::domain::ErrorCategory::Transport => {
                error!(session = %self.id, "[nb-bridge] {}", err)
            }
            crate::domain::ErrorCategory::Integrity => {
                warn!(session = %self.id, "[nb-bridge] Integrity failure: {}", err)
            }
            _ => info!(session = %self.id, "[nb-bridge] {}", err),
        }
        self.prepared = None;
        self.error = Some(err.clone());
        self.status = BridgeStatus::Error;
        err
    }

    async fn discover(&self) -> Result<Vec<SpendableNote>, BridgeError> {
        let simple = SpendCondition::single(&self.owner);
        let coinbase = SpendCondition::coinbase(&self.owner);
        let simple_name = simple.first_name();
        let coinbase_name = coinbase.first_name();

        let (simple_notes, coinbase_notes) = tokio::try_join!(
            self.note_source.get_notes(&simple_name),
            self.note_source.get_notes(&coinbase_name),
        )?;
        debug!(
            session = %self.id,
            "[nb-bridge] Discovered {} simple and {} coinbase notes",
            simple_notes.len(),
            coinbase_notes.len()
        );

        let tag = |condition: &SpendCondition, notes: Vec<crate::domain::Note>| {
            notes
                .into_iter()
                .map(|note| SpendableNote {
                    note,
                    spend_condition: condition.clone(),
                })
                .collect::<Vec<_>>()
        };
        let mut candidates = tag(&simple, simple_notes);
        candidates.extend(tag(&coinbase, coinbase_notes));
        Ok(candidates)
    }

    async fn build_prepared(
        &self,
        destination: &str,
        amount: Nicks,
    ) -> Result<(PreparedTransaction, BridgePreview), BridgeError> {
        self.config.validate()?;
        if amount == 0 {
            return Err(BridgeError::AmountNotPositive);
        }
        let destination = validate_destination(destination, self.addresses.as_ref())?;
        if amount < self.config.minimum_amount {
            return Err(BridgeError::AmountBelowMinimum {
                amount,
                minimum: self.config.minimum_amount,
            });
        }
        if !self.addresses.is_valid_source_address(&self.owner) {
            return Err(BridgeError::InvalidSourceAddress(self.owner.clone()));
        }

        let candidates = self.discover().await?;
        if candidates.is_empty() {
            return Err(BridgeError::NoSpendableNotes);
        }

        let request = AssemblyRequest {
            destination,
            amount,
            owner: self.owner.clone(),
        };
        let assembly = self.builder.build(candidates, &request, &self.config)?;

        let rules = ValidationRules::from_config(&self.config)?;
        let validated = validate_unsigned(&assembly.tx, &rules, self.addresses.as_ref())?;
        let belts = encode(&destination);
        ensure_matches_request(&validated, amount, &destination, &belts)?;

        let preview = BridgePreview {
            amount: validated.amount,
            destination_address: validated.destination_address,
            belts: validated.belts,
            fee: assembly.fee(),
            notes_used: assembly.signer_inputs.len(),
        };
        let prepared = PreparedTransaction {
            computed_fee: assembly.fee(),
            notes_used_count: assembly.signer_inputs.len(),
            unsigned_tx: assembly.tx,
            signer_inputs: assembly.signer_inputs,
            destination_address: destination,
            belts,
            amount,
        };
        Ok((prepared, preview))
    }

    fn check_signed(
        &self,
        bytes: &[u8],
        amount: Nicks,
        destination: &EvmAddress,
        belts: &Belts,
    ) -> Result<(SignedTx, ValidatedBridge), BridgeError> {
        let rules = ValidationRules::from_config(&self.config)?;
        let (signed, validated) = validate_signed(bytes, &rules, self.addresses.as_ref())?;
        ensure_matches_request(&validated, amount, destination, belts)?;
        Ok((signed, validated))
    }

    async fn broadcast(&mut self, pending: PendingBroadcast) -> Result<BridgeResult, BridgeError> {
        let outcome = self.note_source.broadcast(&pending.bytes).await;
        match outcome {
            Ok(()) => {
                self.transition(BridgeStatus::Success)?;
                info!(
                    session = %self.id,
                    "[nb-bridge] Broadcast {} ({} nicks to {})",
                    pending.result.tx_id,
                    pending.result.amount,
                    pending.result.destination_address
                );
                Ok(pending.result)
            }
            Err(e) => {
                let err = match e {
                    BridgeError::BroadcastFailed(_) => e,
                    other => BridgeError::BroadcastFailed(other.to_string()),
                };
                self.pending_broadcast = Some(pending);
                Err(self.fail(err))
            }
        }
    }
}

#[async_trait]
impl BridgeApi for BridgeSession {
    async fn prepare(
        &mut self,
        destination: &str,
        amount: Nicks,
    ) -> Result<BridgePreview, BridgeError> {
        if self.status != BridgeStatus::Idle {
            return Err(self.invalid_state("prepare"));
        }
        self.transition(BridgeStatus::Preparing)?;

        match self.build_prepared(destination, amount).await {
            Ok((prepared, preview)) => {
                info!(
                    session = %self.id,
                    "[nb-bridge] Prepared {} nicks to {} using {} notes, fee {}",
                    preview.amount,
                    preview.destination_address,
                    preview.notes_used,
                    preview.fee
                );
                self.prepared = Some(prepared);
                self.preview = Some(preview.clone());
                self.error = None;
                self.transition(BridgeStatus::Confirming)?;
                Ok(preview)
            }
            Err(e) => {
                self.preview = None;
                Err(self.fail(e))
            }
        }
    }

    async fn confirm(&mut self) -> Result<ConfirmOutcome, BridgeError> {
        if self.status != BridgeStatus::Confirming {
            return Err(self.invalid_state("confirm"));
        }
        // Stays in the session until signing resolves.
        let prepared = self
            .prepared
            .clone()
            .ok_or(BridgeError::NoPreparedTransaction)?;
        self.transition(BridgeStatus::AwaitingSignature)?;

        let signing = self
            .signer
            .sign(&prepared.unsigned_tx, &prepared.signer_inputs);
        let response = match self.config.signer_timeout_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), signing).await {
                Ok(response) => response,
                Err(_) => SignerResponse::Failed(format!("no answer within {} ms", ms)),
            },
            None => signing.await,
        };

        let bytes = match response {
            SignerResponse::Signed(bytes) => bytes,
            SignerResponse::Rejected => {
                info!(session = %self.id, "[nb-bridge] Signer rejected, back to confirmation");
                self.transition(BridgeStatus::Confirming)?;
                return Ok(ConfirmOutcome::Rejected);
            }
            SignerResponse::Failed(reason) => {
                return Err(self.fail(BridgeError::SigningFailed(reason)));
            }
        };

        let checked = self.check_signed(
            &bytes,
            prepared.amount,
            &prepared.destination_address,
            &prepared.belts,
        );
        let (signed, validated) = match checked {
            Ok(v) => v,
            Err(e) => return Err(self.fail(e)),
        };

        self.prepared = None;
        self.transition(BridgeStatus::Pending)?;
        let pending = PendingBroadcast {
            bytes,
            amount: prepared.amount,
            destination: prepared.destination_address,
            belts: prepared.belts,
            result: BridgeResult {
                tx_id: signed.raw.id,
                fee: signed.raw.total_fee,
                destination_address: validated.destination_address,
                amount: validated.amount,
            },
        };
        self.broadcast(pending).await.map(ConfirmOutcome::Submitted)
    }

    async fn retry_broadcast(&mut self) -> Result<BridgeResult, BridgeError> {
        let retryable = self.status == BridgeStatus::Error
            && matches!(self.error, Some(BridgeError::BroadcastFailed(_)));
        if !retryable {
            return Err(self.invalid_state("retry broadcast"));
        }
        let pending = self
            .pending_broadcast
            .take()
            .ok_or_else(|| self.invalid_state("retry broadcast"))?;

        let checked = self.check_signed(
            &pending.bytes,
            pending.amount,
            &pending.destination,
            &pending.belts,
        );
        if let Err(e) = checked {
            return Err(self.fail(e));
        }

        self.transition(BridgeStatus::Pending)?;
        self.error = None;
        self.broadcast(pending).await
    }

    fn cancel(&mut self) -> Result<(), BridgeError> {
        if self.status != BridgeStatus::Confirming {
            return Err(self.invalid_state("cancel"));
        }
        self.prepared = None;
        self.preview = None;
        self.transition(BridgeStatus::Idle)
    }

    fn reset(&mut self) -> Result<(), BridgeError> {
        if self.status.is_in_flight() {
            warn!(
                session = %self.id,
                "[nb-bridge] Abandoning flow interrupted in {}",
                self.status
            );
        } else if !self.status.is_terminal() {
            return Err(self.invalid_state("reset"));
        }
        self.prepared = None;
        self.preview = None;
        self.error = None;
        self.pending_broadcast = None;
        self.transition(BridgeStatus::Idle)
    }

    fn status(&self) -> BridgeStatus {
        self.status
    }

    fn error(&self) -> Option<&BridgeError> {
        self.error.as_ref()
    }

    fn preview(&self) -> Option<&BridgePreview> {
        self.preview.as_ref()
    }

    fn prepared(&self) -> Option<&PreparedTransaction> {
        self.prepared.as_ref()
    }
}

/// Check a destination before it enters a flow: format, then encoding round-trip.
pub fn validate_destination(
    destination: &str,
    addresses: &dyn AddressValidator,
) -> Result<EvmAddress, BridgeError> {
    let trimmed = destination.trim();
    if !addresses.is_valid_destination_address(trimmed) {
        return Err(BridgeError::InvalidDestinationAddress(destination.to_string()));
    }
    let address = EvmAddress::parse(trimmed)?;
    if !round_trips(&address) {
        return Err(BridgeError::InvalidDestinationAddress(destination.to_string()));
    }
    Ok(address)
}

/// Belts for a destination and whether they decode back to it.
pub fn preview_destination(destination: &str) -> Result<(Belts, bool), BridgeError> {
    let address = EvmAddress::parse(destination.trim())?;
    Ok((encode(&address), round_trips(&address)))
}

/// List deposits held at the bridge lock with their payloads decoded.
pub async fn inspect_bridge_deposits(
    note_source: &dyn NoteSource,
    config: &BridgeConfig,
) -> Result<Vec<BridgeDeposit>, BridgeError> {
    let lock = config.multisig()?.spend_condition();
    let notes = note_source.get_notes(&lock.first_name()).await?;
    Ok(decode_deposits(&notes, config.chain_tag()?))
}
