//! NB-Inspect: operator tooling for the Nock bridge.
//!
//! Each command returns a serializable report; `main.rs` prints it as JSON.

use anyhow::{Context, Result};
use nb_bridge::domain::{Note, SpendCondition};
use nb_bridge::{
    build_metadata, decode, inspect_bridge_deposits, parse_metadata, validate_destination,
    BridgeConfig, DefaultAddressValidator, EvmAddress, InMemoryLedger, Nicks,
};
use serde::Serialize;

/// Belts and payload for a destination address.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EncodeReport {
    /// Normalized address.
    pub address: String,
    /// Field elements, low limb first.
    pub belts: [u64; 3],
    /// Whether the belts decode back to the address.
    pub round_trips: bool,
    /// Jam'd payload as hex.
    pub metadata_hex: String,
}

/// Contents of a jam'd payload.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DecodeReport {
    /// Payload version.
    pub version: u64,
    /// Chain tag.
    pub chain: String,
    /// Field elements.
    pub belts: [u64; 3],
    /// Reconstructed destination.
    pub address: String,
}

/// Bridge lock derived from configuration.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LockReport {
    /// Signatures required.
    pub threshold: u64,
    /// Operator addresses.
    pub signers: Vec<String>,
    /// Lock root deposits must pay.
    pub lock_root: String,
    /// Ledger key the bridge notes are listed under.
    pub first_name: String,
}

/// Fee figures for a transaction shape.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FeeReport {
    /// Inputs spent.
    pub inputs: usize,
    /// Outputs created.
    pub seeds: usize,
    /// Payload bytes.
    pub metadata_bytes: usize,
    /// Margin-adjusted estimate used during selection.
    pub estimate: Nicks,
    /// Fee charged for exactly this shape.
    pub exact: Nicks,
}

/// One note held at the bridge lock.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DepositReport {
    /// Note hash.
    pub note: String,
    /// Value in nicks.
    pub assets: Nicks,
    /// Decoded destination.
    pub destination: Option<String>,
    /// Why the payload could not be decoded.
    pub error: Option<String>,
}

fn belt_values(belts: &nb_bridge::Belts) -> [u64; 3] {
    [belts[0].value(), belts[1].value(), belts[2].value()]
}

/// Encode a destination address.
pub fn encode_address(address: &str, config: &BridgeConfig) -> Result<EncodeReport> {
    let parsed = validate_destination(address, &DefaultAddressValidator)?;
    let belts = nb_bridge::encode(&parsed);
    Ok(EncodeReport {
        address: parsed.to_string(),
        belts: belt_values(&belts),
        round_trips: nb_bridge::round_trips(&parsed),
        metadata_hex: hex::encode(build_metadata(&parsed, config.chain_tag()?)),
    })
}

/// Decode a hex payload, with or without `0x`.
pub fn decode_payload(payload: &str, config: &BridgeConfig) -> Result<DecodeReport> {
    let trimmed = payload.trim();
    let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .context("payload is not hex")?;
    let noun = parse_metadata(&bytes, config.chain_tag()?)?;
    let address = decode(&noun.belts)?;
    Ok(DecodeReport {
        version: noun.version,
        chain: noun.chain.to_string(),
        belts: belt_values(&noun.belts),
        address: address.to_string(),
    })
}

/// Describe the configured bridge lock.
pub fn lock_report(config: &BridgeConfig) -> Result<LockReport> {
    config.validate()?;
    let multisig = config.multisig()?;
    let condition = multisig.spend_condition();
    Ok(LockReport {
        threshold: multisig.threshold,
        signers: multisig.addresses.clone(),
        lock_root: condition.lock_root().to_hex(),
        first_name: condition.first_name().to_hex(),
    })
}

/// Fee for `inputs` notes. Seeds default to one per input plus the bridge
/// output; payload size defaults to the largest possible payload.
pub fn fee_report(
    config: &BridgeConfig,
    inputs: usize,
    seeds: Option<usize>,
    metadata_bytes: Option<usize>,
) -> Result<FeeReport> {
    let seeds = seeds.unwrap_or(inputs + 1);
    let metadata_bytes = match metadata_bytes {
        Some(n) => n,
        None => build_metadata(&EvmAddress::from_bytes([0xFF; 20]), config.chain_tag()?).len(),
    };
    Ok(FeeReport {
        inputs,
        seeds,
        metadata_bytes,
        estimate: config.fee.estimate(inputs),
        exact: config.fee.exact(inputs, seeds, metadata_bytes),
    })
}

/// Decode deposits from a JSON array of notes held at the bridge lock.
pub async fn deposits_report(notes_json: &str, config: &BridgeConfig) -> Result<Vec<DepositReport>> {
    let notes: Vec<Note> = serde_json::from_str(notes_json).context("invalid note dump")?;
    let lock: SpendCondition = config.multisig()?.spend_condition();

    let ledger = InMemoryLedger::new();
    for note in notes {
        ledger.add_note(&lock, note);
    }

    let deposits = inspect_bridge_deposits(&ledger, config).await?;
    tracing::debug!("[nb-inspect] Decoded {} deposits", deposits.len());
    Ok(deposits
        .into_iter()
        .map(|d| {
            let (destination, error) = match d.destination {
                Ok(addr) => (Some(addr.to_string()), None),
                Err(reason) => (None, Some(reason)),
            };
            DepositReport {
                note: d.note.to_hex(),
                assets: d.assets,
                destination,
                error,
            }
        })
        .collect())
}
