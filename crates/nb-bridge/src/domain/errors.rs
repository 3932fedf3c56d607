//! # Domain Errors
//!
//! Error types for the bridge core.
//!
//! Every failure belongs to one [`ErrorCategory`]. Integrity failures abort the
//! flow unconditionally; only transport failures are worth retrying.

use thiserror::Error;

/// Amount in nicks, the smallest indivisible unit of the bridged token.
pub type Nicks = u64;

/// Bridge error types.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Multisig descriptor is absent or its threshold is out of range.
    #[error("Bridge not configured: {0}")]
    BridgeNotConfigured(String),

    /// Configuration value could not be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Destination address is not a 160-bit hex address.
    #[error("Invalid destination address: {0}")]
    InvalidDestinationAddress(String),

    /// Owner address is not a valid source-chain address.
    #[error("Invalid source address: {0}")]
    InvalidSourceAddress(String),

    /// Requested amount is zero.
    #[error("Amount must be greater than 0")]
    AmountNotPositive,

    /// Requested amount is below the configured bridge minimum.
    #[error("Amount {amount} nicks is below minimum {minimum} nicks")]
    AmountBelowMinimum {
        /// Requested amount
        amount: Nicks,
        /// Configured minimum
        minimum: Nicks,
    },

    /// The wallet holds no notes at all.
    #[error("No spendable notes found in wallet")]
    NoSpendableNotes,

    /// Every candidate note together still does not cover amount + fee.
    #[error("Insufficient balance: selected {selected_count} notes totalling {selected_total} nicks, required {required} nicks")]
    InsufficientBalance {
        /// Number of notes selected
        selected_count: usize,
        /// Sum of selected note values
        selected_total: Nicks,
        /// Amount plus fee that had to be covered
        required: Nicks,
    },

    /// No output carries a bridge payload.
    #[error("No output with %bridge note data found in transaction")]
    NoBridgeOutput,

    /// Bridge output is locked to something other than the bridge multisig.
    #[error("Bridge output goes to wrong lock: expected {expected}, got {actual}")]
    WrongRecipient {
        /// Lock root derived from configuration
        expected: String,
        /// Lock root found in the transaction
        actual: String,
    },

    /// Bridge output amount is below the configured minimum.
    #[error("Bridge output {amount} nicks is below minimum {minimum} nicks")]
    BelowMinimum {
        /// Amount found in the transaction
        amount: Nicks,
        /// Configured minimum
        minimum: Nicks,
    },

    /// Bridge payload does not have the expected shape.
    #[error("Malformed bridge payload: {0}")]
    MalformedPayload(String),

    /// Belts decode to something that is not a destination address.
    #[error("Reconstructed address is invalid: {0}")]
    InvalidReconstructedAddress(String),

    /// Validated transaction disagrees with what was requested.
    #[error("Validation mismatch on {field}: expected {expected}, got {actual}")]
    ValidationMismatch {
        /// Field that diverged
        field: String,
        /// Value the session requested
        expected: String,
        /// Value extracted from the transaction
        actual: String,
    },

    /// Transaction bytes could not be encoded or decoded.
    #[error("Transaction encoding error: {0}")]
    TransactionEncoding(String),

    /// Note source could not list notes.
    #[error("Note source unavailable: {0}")]
    NoteSourceUnavailable(String),

    /// Signer failed for a reason other than user rejection.
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Broadcast of the signed transaction failed.
    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),

    /// Operation is not valid in the current session state.
    #[error("Invalid state: cannot {operation} from {from}")]
    InvalidState {
        /// Current state
        from: String,
        /// Attempted operation
        operation: String,
    },

    /// Confirmation requested without a prepared transaction.
    #[error("No prepared transaction")]
    NoPreparedTransaction,
}

/// Failure taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fatal, no retry.
    Configuration,
    /// Fixed by correcting the request.
    InputValidation,
    /// Fixed by funding the wallet or lowering the amount.
    Resource,
    /// The transaction does not do what it claims.
    Integrity,
    /// Network or collaborator failure, retryable.
    Transport,
    /// Caller misuse of the session API.
    Programming,
}

impl BridgeError {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BridgeNotConfigured(_) | Self::InvalidConfig(_) => ErrorCategory::Configuration,
            Self::InvalidDestinationAddress(_)
            | Self::InvalidSourceAddress(_)
            | Self::AmountNotPositive
            | Self::AmountBelowMinimum { .. } => ErrorCategory::InputValidation,
            Self::NoSpendableNotes | Self::InsufficientBalance { .. } => ErrorCategory::Resource,
            Self::NoBridgeOutput
            | Self::WrongRecipient { .. }
            | Self::BelowMinimum { .. }
            | Self::MalformedPayload(_)
            | Self::InvalidReconstructedAddress(_)
            | Self::ValidationMismatch { .. }
            | Self::TransactionEncoding(_) => ErrorCategory::Integrity,
            Self::NoteSourceUnavailable(_) | Self::SigningFailed(_) | Self::BroadcastFailed(_) => {
                ErrorCategory::Transport
            }
            Self::InvalidState { .. } | Self::NoPreparedTransaction => ErrorCategory::Programming,
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    /// Whether the error means the assembled transaction cannot be trusted.
    pub fn is_integrity_failure(&self) -> bool {
        self.category() == ErrorCategory::Integrity
    }
}
