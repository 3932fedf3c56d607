//! # Inbound Ports
//!
//! API trait defining what a bridge session can do.

use crate::domain::{
    BridgeError, BridgePreview, BridgeResult, BridgeStatus, Nicks, PreparedTransaction,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of handing a prepared transaction to the signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmOutcome {
    /// Signed, validated and broadcast.
    Submitted(BridgeResult),
    /// User declined; the session is back in `Confirming`.
    Rejected,
}

/// Bridge session API - inbound port.
///
/// Methods take `&mut self`, so one session can never run two flows at once.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    /// Discover notes, assemble and pre-validate a deposit.
    ///
    /// Valid from `Idle`. Moves to `Confirming` on success, `Error` otherwise.
    async fn prepare(&mut self, destination: &str, amount: Nicks)
        -> Result<BridgePreview, BridgeError>;

    /// Sign, re-validate and broadcast the prepared deposit.
    ///
    /// Valid from `Confirming`.
    async fn confirm(&mut self) -> Result<ConfirmOutcome, BridgeError>;

    /// Re-broadcast after a transport failure.
    ///
    /// Valid from `Error` when the failure was `BroadcastFailed`.
    async fn retry_broadcast(&mut self) -> Result<BridgeResult, BridgeError>;

    /// Discard the prepared deposit. Valid from `Confirming`.
    fn cancel(&mut self) -> Result<(), BridgeError>;

    /// Clear a finished flow. Valid from `Success` or `Error`, and from any
    /// in-flight state whose future was dropped before it resolved.
    fn reset(&mut self) -> Result<(), BridgeError>;

    /// Current state.
    fn status(&self) -> BridgeStatus;

    /// Failure that moved the session to `Error`.
    fn error(&self) -> Option<&BridgeError>;

    /// Values awaiting confirmation.
    fn preview(&self) -> Option<&BridgePreview>;

    /// Prepared transaction awaiting confirmation.
    fn prepared(&self) -> Option<&PreparedTransaction>;
}
