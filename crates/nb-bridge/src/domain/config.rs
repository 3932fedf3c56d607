//! # Bridge Configuration
//!
//! Loaded once at startup and shared immutably.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NB_FEE_PER_WORD` | `32768` | Nicks charged per transaction word |
//! | `NB_FEE_BASE_WORDS` | `20` | Fixed words per transaction |
//! | `NB_FEE_WORDS_PER_INPUT` | `30` | Words per spent note |
//! | `NB_FEE_WORDS_PER_OUTPUT` | `13` | Words per seed |
//! | `NB_FEE_MARGIN_PERCENT` | `10` | Safety margin on estimates |
//! | `NB_MIN_BRIDGE_AMOUNT_NICKS` | `6553600000` | Minimum bridged amount |
//! | `NB_BRIDGE_THRESHOLD` | `3` | Multisig threshold |
//! | `NB_BRIDGE_ADDRESSES` | operator set | Comma separated multisig addresses |
//! | `NB_CHAIN_TAG` | `base` | Destination chain tag |
//! | `NB_SIGNER_TIMEOUT_MS` | unset | Give up on the signer after this long |

use super::errors::{BridgeError, Nicks};
use super::invariants::invariant_threshold_in_range;
use super::lock::SpendCondition;
use super::value_objects::{ChainTag, LockRoot, NICKS_PER_NOCK};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Minimum bridge deposit in whole NOCK.
pub const DEFAULT_MIN_BRIDGE_NOCK: u64 = 100_000;

/// Default multisig threshold.
pub const DEFAULT_BRIDGE_THRESHOLD: u64 = 3;

/// Published bridge operator addresses.
pub const DEFAULT_BRIDGE_ADDRESSES: [&str; 5] = [
    "AD6Mw1QUnPUrnVpyj2gW2jT6Jd6WsuZQmPn79XpZoFEocuvV12iDkvh",
    "6KrZT5hHLY1fva9AUDeGtZu5Jznm4RDLYfjcGjuU49nWoNym5ZeX5X5",
    "CDLzgKWAKFXYABkuQaMwbttDSTDMh3Wy2Eoq2XiArsyxn7vScNHupBb",
    "7E47xYNVEyt7jGmLsiChUHnyw88AfBvzJfXfEQkPmMo2ZWsdcPudwmV",
    "3xSyK6RQUaYzE8YDUamkpKRHALxaYo8E7eppawwE4sP35c3PASc6koq",
];

/// Transaction size model used to price fees.
///
/// The word counts are calibrated against the ledger's real encoding and
/// should be recalibrated if that encoding changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Nicks per word.
    pub fee_per_word: Nicks,
    /// Fixed words per transaction.
    pub base_words: u64,
    /// Words per input.
    pub words_per_input: u64,
    /// Words per output.
    pub words_per_output: u64,
    /// Margin applied to estimates, in percent.
    pub margin_percent: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            fee_per_word: 32_768,
            base_words: 20,
            words_per_input: 30,
            words_per_output: 13,
            margin_percent: 10,
        }
    }
}

impl FeeSchedule {
    /// Estimated fee for `inputs` notes: one refund output per input plus the
    /// bridge output, with margin, rounded up to a whole word.
    pub fn estimate(&self, inputs: usize) -> Nicks {
        let n = inputs as u64;
        let words = self
            .base_words
            .saturating_add(n.saturating_mul(self.words_per_input))
            .saturating_add(n.saturating_add(1).saturating_mul(self.words_per_output));
        let scaled = words.saturating_mul(100 + self.margin_percent);
        scaled.div_ceil(100).saturating_mul(self.fee_per_word)
    }

    /// Exact fee for an assembled transaction shape.
    pub fn exact(&self, inputs: usize, seeds: usize, metadata_bytes: usize) -> Nicks {
        let words = self
            .base_words
            .saturating_add((inputs as u64).saturating_mul(self.words_per_input))
            .saturating_add((seeds as u64).saturating_mul(self.words_per_output))
            .saturating_add((metadata_bytes as u64).div_ceil(8));
        words.saturating_mul(self.fee_per_word)
    }
}

/// Multisig lock controlling bridge deposits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigDescriptor {
    /// Signatures required.
    pub threshold: u64,
    /// Operator addresses, order significant.
    pub addresses: Vec<String>,
}

impl Default for MultisigDescriptor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BRIDGE_THRESHOLD,
            addresses: DEFAULT_BRIDGE_ADDRESSES.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl MultisigDescriptor {
    /// Spend condition for this descriptor.
    pub fn spend_condition(&self) -> SpendCondition {
        SpendCondition::multisig(self.threshold, &self.addresses)
    }
}

/// Bridge configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Fee model.
    pub fee: FeeSchedule,
    /// Minimum bridged amount in nicks.
    pub minimum_amount: Nicks,
    /// Bridge multisig, `None` when not configured.
    pub multisig: Option<MultisigDescriptor>,
    /// Destination chain tag.
    pub chain_tag: String,
    /// Signer deadline in milliseconds, `None` waits indefinitely.
    pub signer_timeout_ms: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fee: FeeSchedule::default(),
            minimum_amount: DEFAULT_MIN_BRIDGE_NOCK * NICKS_PER_NOCK,
            multisig: Some(MultisigDescriptor::default()),
            chain_tag: "base".to_string(),
            signer_timeout_ms: None,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, BridgeError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| BridgeError::InvalidConfig(format!("{}={:?} is not valid", name, raw))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(BridgeError::InvalidConfig(format!(
            "{} is not valid unicode",
            name
        ))),
    }
}

impl BridgeConfig {
    /// Defaults overlaid with `NB_*` environment variables.
    pub fn from_env() -> Result<Self, BridgeError> {
        let mut config = Self::default();

        if let Some(v) = env_parse("NB_FEE_PER_WORD")? {
            config.fee.fee_per_word = v;
        }
        if let Some(v) = env_parse("NB_FEE_BASE_WORDS")? {
            config.fee.base_words = v;
        }
        if let Some(v) = env_parse("NB_FEE_WORDS_PER_INPUT")? {
            config.fee.words_per_input = v;
        }
        if let Some(v) = env_parse("NB_FEE_WORDS_PER_OUTPUT")? {
            config.fee.words_per_output = v;
        }
        if let Some(v) = env_parse("NB_FEE_MARGIN_PERCENT")? {
            config.fee.margin_percent = v;
        }
        if let Some(v) = env_parse("NB_MIN_BRIDGE_AMOUNT_NICKS")? {
            config.minimum_amount = v;
        }

        let threshold: Option<u64> = env_parse("NB_BRIDGE_THRESHOLD")?;
        let addresses: Option<String> = env_parse("NB_BRIDGE_ADDRESSES")?;
        if threshold.is_some() || addresses.is_some() {
            let mut multisig = config.multisig.take().unwrap_or_default();
            if let Some(t) = threshold {
                multisig.threshold = t;
            }
            if let Some(list) = addresses {
                multisig.addresses = list
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect();
            }
            config.multisig = Some(multisig);
        }

        if let Some(tag) = env_parse::<String>("NB_CHAIN_TAG")? {
            config.chain_tag = tag;
        }
        if let Some(ms) = env_parse("NB_SIGNER_TIMEOUT_MS")? {
            config.signer_timeout_ms = Some(ms);
        }

        Ok(config)
    }

    /// Parse a JSON document; absent fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json).map_err(|e| BridgeError::InvalidConfig(e.to_string()))
    }

    /// Check the configuration can drive a bridge flow.
    pub fn validate(&self) -> Result<(), BridgeError> {
        let multisig = self
            .multisig
            .as_ref()
            .ok_or_else(|| BridgeError::BridgeNotConfigured("multisig descriptor absent".into()))?;
        invariant_threshold_in_range(multisig.threshold, multisig.addresses.len())?;
        ChainTag::from_ascii(&self.chain_tag)?;
        if self.fee.fee_per_word == 0 {
            return Err(BridgeError::InvalidConfig("fee_per_word must be non-zero".into()));
        }
        if self.signer_timeout_ms == Some(0) {
            return Err(BridgeError::InvalidConfig("signer_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }

    /// Validated multisig descriptor.
    pub fn multisig(&self) -> Result<&MultisigDescriptor, BridgeError> {
        self.validate()?;
        self.multisig
            .as_ref()
            .ok_or_else(|| BridgeError::BridgeNotConfigured("multisig descriptor absent".into()))
    }

    /// Lock root every bridge deposit must pay, derived from configuration.
    pub fn bridge_lock_root(&self) -> Result<LockRoot, BridgeError> {
        Ok(self.multisig()?.spend_condition().lock_root())
    }

    /// Packed destination chain tag.
    pub fn chain_tag(&self) -> Result<ChainTag, BridgeError> {
        ChainTag::from_ascii(&self.chain_tag)
    }
}
