//! # Integration Test Flows
//!
//! Drives `BridgeSession` end to end against the in-memory ledger and the
//! mock signer: discovery, assembly, both validation passes, signing and
//! broadcast, with the resulting ledger state checked afterwards.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use nb_bridge::algorithms::Assembly;
    use nb_bridge::domain::{FirstName, LockRoot, RawTx, BRIDGE_NOTE_KEY};
    use nb_bridge::{
        inspect_bridge_deposits, parse_metadata, AssemblyRequest, BridgeApi, BridgeConfig,
        BridgeError, BridgeSession, BridgeStatus, ConfirmOutcome, FeeSchedule, InMemoryLedger,
        MockSigner, MockSignerMode, Note, NoteSource, NoteTransactionBuilder, SpendCondition,
        SpendableNote, TransactionBuilder,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const OWNER: &str = "4Py91FZ7UqniEDyztahwmEdx7wgfEWn9XuC2GezCbMFzQgAyCMcWRhZ";
    const DEST: &str = "0x1234567890abcdef1234567890abcdef1234abcd";

    fn config() -> Arc<BridgeConfig> {
        Arc::new(BridgeConfig {
            fee: FeeSchedule {
                fee_per_word: 1,
                ..FeeSchedule::default()
            },
            minimum_amount: 50_000,
            ..BridgeConfig::default()
        })
    }

    fn funded_ledger(values: &[u64]) -> Arc<InMemoryLedger> {
        let ledger = Arc::new(InMemoryLedger::new());
        let owner = SpendCondition::single(OWNER);
        for (i, v) in values.iter().enumerate() {
            ledger.fund(&owner, *v, i as u64);
        }
        ledger
    }

    fn bridge_lock() -> SpendCondition {
        config().multisig().unwrap().spend_condition()
    }

    /// Ledger whose first `failures` broadcasts are refused.
    struct FlakyLedger {
        inner: Arc<InMemoryLedger>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl NoteSource for FlakyLedger {
        async fn get_notes(&self, first_name: &FirstName) -> Result<Vec<Note>, BridgeError> {
            self.inner.get_notes(first_name).await
        }

        async fn broadcast(&self, signed_tx: &[u8]) -> Result<(), BridgeError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(BridgeError::BroadcastFailed("connection reset".into()));
            }
            self.inner.broadcast(signed_tx).await
        }
    }

    /// Builder that points the bridge output at the owner's own lock.
    struct MisdirectingBuilder;

    impl TransactionBuilder for MisdirectingBuilder {
        fn build(
            &self,
            candidates: Vec<SpendableNote>,
            request: &AssemblyRequest,
            config: &BridgeConfig,
        ) -> Result<Assembly, BridgeError> {
            let mut assembly = NoteTransactionBuilder.build(candidates, request, config)?;
            let mut spends = assembly.tx.spends.clone();
            spends[0].seeds[0].lock_root = SpendCondition::single(&request.owner).lock_root();
            assembly.tx = RawTx::new(spends)?;
            Ok(assembly)
        }
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[tokio::test]
    async fn test_two_note_deposit_end_to_end() {
        let ledger = funded_ledger(&[70_000, 40_000, 10_000]);
        let signer = Arc::new(MockSigner::default());
        let mut session = BridgeSession::new(OWNER, config(), ledger.clone(), signer.clone());

        let preview = session.prepare(DEST, 100_000).await.unwrap();
        assert_eq!(preview.notes_used, 2);
        assert_eq!(preview.amount, 100_000);

        let prepared = session.prepared().unwrap().clone();
        let spends = &prepared.unsigned_tx.spends;
        assert_eq!(spends[0].note.assets, 70_000);
        assert_eq!(spends[0].seeds.len(), 1);
        assert_eq!(spends[0].seeds[0].gift, 70_000);
        assert!(spends[0].seeds[0].note_data.get(BRIDGE_NOTE_KEY).is_some());
        assert_eq!(spends[1].seeds[0].gift, 30_000);
        assert!(spends[1].seeds[0].note_data.is_empty());
        assert_eq!(spends[1].seeds[1].gift, 10_000 - preview.fee);

        let ConfirmOutcome::Submitted(result) = session.confirm().await.unwrap() else {
            panic!("expected submission");
        };
        assert_eq!(session.status(), BridgeStatus::Success);
        assert_eq!(result.fee, preview.fee);

        // One coalesced bridge output carrying the payload.
        let at_bridge = ledger.notes_for(&bridge_lock());
        assert_eq!(at_bridge.len(), 1);
        assert_eq!(at_bridge[0].assets, 100_000);
        let payload = at_bridge[0].note_data.get(BRIDGE_NOTE_KEY).unwrap();
        let noun = parse_metadata(payload, config().chain_tag().unwrap()).unwrap();
        assert_eq!(nb_bridge::decode(&noun.belts).unwrap().to_string(), DEST);

        // The untouched 10 000 note plus the refund.
        let mut owner_values: Vec<u64> = ledger
            .notes_for(&SpendCondition::single(OWNER))
            .iter()
            .map(|n| n.assets)
            .collect();
        owner_values.sort_unstable();
        let mut expected = vec![10_000 - preview.fee, 10_000];
        expected.sort_unstable();
        assert_eq!(owner_values, expected);
    }

    #[tokio::test]
    async fn test_below_minimum_never_queries() {
        let ledger = funded_ledger(&[1_000_000]);
        let mut session =
            BridgeSession::new(OWNER, config(), ledger.clone(), Arc::new(MockSigner::default()));

        let err = session.prepare(DEST, 10_000).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::AmountBelowMinimum {
                amount: 10_000,
                minimum: 50_000
            }
        );
        assert_eq!(ledger.query_count(), 0);
        assert_eq!(session.status(), BridgeStatus::Error);
        assert_eq!(session.error(), Some(&err));
    }

    #[tokio::test]
    async fn test_misdirected_assembly_stops_before_confirming() {
        let ledger = funded_ledger(&[500_000]);
        let signer = Arc::new(MockSigner::default());
        let mut session = BridgeSession::new(OWNER, config(), ledger.clone(), signer.clone())
            .with_builder(Arc::new(MisdirectingBuilder));

        let err = session.prepare(DEST, 100_000).await.unwrap_err();
        assert!(matches!(err, BridgeError::WrongRecipient { .. }));
        assert!(err.is_integrity_failure());
        assert_eq!(session.status(), BridgeStatus::Error);
        assert!(session.prepared().is_none());
        assert!(session.preview().is_none());
        assert_eq!(signer.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_then_approval() {
        let ledger = funded_ledger(&[500_000]);
        let signer = Arc::new(MockSigner::new(MockSignerMode::Reject));
        let mut session = BridgeSession::new(OWNER, config(), ledger.clone(), signer.clone());

        let preview = session.prepare(DEST, 100_000).await.unwrap();
        assert_eq!(session.confirm().await.unwrap(), ConfirmOutcome::Rejected);
        assert_eq!(session.status(), BridgeStatus::Confirming);
        assert!(session.error().is_none());
        assert_eq!(session.preview(), Some(&preview));
        assert!(ledger.accepted().is_empty());

        signer.set_mode(MockSignerMode::Approve);
        let outcome = session.confirm().await.unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Submitted(_)));
        assert_eq!(signer.calls(), 2);
        assert_eq!(ledger.accepted().len(), 1);
    }

    // =============================================================================
    // FAILURE HANDLING
    // =============================================================================

    #[tokio::test]
    async fn test_broadcast_retried_without_resigning() {
        let inner = funded_ledger(&[500_000]);
        let flaky = Arc::new(FlakyLedger {
            inner: inner.clone(),
            failures: AtomicUsize::new(2),
        });
        let signer = Arc::new(MockSigner::default());
        let mut session = BridgeSession::new(OWNER, config(), flaky, signer.clone());

        session.prepare(DEST, 100_000).await.unwrap();
        assert!(matches!(
            session.confirm().await,
            Err(BridgeError::BroadcastFailed(_))
        ));
        assert!(session.retry_broadcast().await.is_err());
        assert_eq!(session.status(), BridgeStatus::Error);

        let result = session.retry_broadcast().await.unwrap();
        assert_eq!(session.status(), BridgeStatus::Success);
        assert!(session.error().is_none());
        assert_eq!(inner.accepted(), vec![result.tx_id]);
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn test_tampered_signature_output_not_broadcast() {
        let ledger = funded_ledger(&[500_000]);
        let signer = Arc::new(MockSigner::new(MockSignerMode::Redirect(LockRoot([7; 32]))));
        let mut session = BridgeSession::new(OWNER, config(), ledger.clone(), signer);

        session.prepare(DEST, 100_000).await.unwrap();
        let err = session.confirm().await.unwrap_err();
        assert!(matches!(err, BridgeError::WrongRecipient { .. }));
        assert!(ledger.accepted().is_empty());
        assert_eq!(ledger.notes_for(&SpendCondition::single(OWNER)).len(), 1);

        // Nothing to retry after an integrity failure.
        assert!(matches!(
            session.retry_broadcast().await,
            Err(BridgeError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_sequential_deposits_spend_refunds() {
        let ledger = funded_ledger(&[300_000]);
        let mut session =
            BridgeSession::new(OWNER, config(), ledger.clone(), Arc::new(MockSigner::default()));

        session.prepare(DEST, 100_000).await.unwrap();
        session.confirm().await.unwrap();
        session.reset().unwrap();

        // The only owner note left is the refund from the first deposit.
        let preview = session.prepare(DEST, 100_000).await.unwrap();
        assert_eq!(preview.notes_used, 1);
        session.confirm().await.unwrap();

        let deposits = inspect_bridge_deposits(ledger.as_ref(), &config())
            .await
            .unwrap();
        assert_eq!(deposits.len(), 2);
        assert!(deposits
            .iter()
            .all(|d| d.destination.as_ref().map(|a| a.to_string()) == Ok(DEST.to_string())));
        assert_eq!(ledger.accepted().len(), 2);
    }

    #[tokio::test]
    async fn test_sessions_run_on_spawned_tasks() {
        let ledger = funded_ledger(&[500_000]);
        let session =
            BridgeSession::new(OWNER, config(), ledger.clone(), Arc::new(MockSigner::default()));

        let handle = tokio::spawn(async move {
            let mut session = session;
            session.prepare(DEST, 100_000).await?;
            session.confirm().await
        });
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Submitted(_)));
        assert_eq!(ledger.accepted().len(), 1);
    }
}
