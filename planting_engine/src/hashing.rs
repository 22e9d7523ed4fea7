/// Planting Engine — Canonical Hashing
///
/// Deterministic canonical serialization + SHA-256 hashing.
/// Produces byte-identical output across platforms.
///
/// Rules:
///   - engine_version is always the first field
///   - struct fields in declaration order, maps sorted by key
///   - UTF-8 JSON, no whitespace, no float, no platform newline

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::PlanError;
use crate::events::DailyState;
use crate::state::PlanState;
use crate::ENGINE_VERSION;

/// Canonical bytes of one ledger record.
pub fn canonical_serialize_day(record: &DailyState) -> Result<Vec<u8>, PlanError> {
    canonical_bytes("day", record)
}

/// Canonical bytes of a plan state.
pub fn canonical_state_bytes(state: &PlanState) -> Result<Vec<u8>, PlanError> {
    canonical_bytes("state", state)
}

/// SHA-256 of the canonical state. Lowercase hex.
pub fn state_hash(state: &PlanState) -> Result<String, PlanError> {
    Ok(hex_digest(&canonical_state_bytes(state)?))
}

/// SHA-256 of a single day record. Lowercase hex.
pub fn day_hash(record: &DailyState) -> Result<String, PlanError> {
    Ok(hex_digest(&canonical_serialize_day(record)?))
}

/// SHA-256 over every canonical day record in order, newline-separated.
pub fn ledger_hash(ledger: &[DailyState]) -> Result<String, PlanError> {
    let mut hasher = Sha256::new();
    for record in ledger {
        hasher.update(canonical_serialize_day(record)?);
        hasher.update(b"\n");
    }
    Ok(to_hex(&hasher.finalize()))
}

pub fn hex_digest(bytes: &[u8]) -> String {
    to_hex(&Sha256::digest(bytes))
}

fn to_hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// `{"engine_version":N,"<label>":{...}}` with no whitespace.
fn canonical_bytes<T: Serialize>(label: &str, value: &T) -> Result<Vec<u8>, PlanError> {
    let body = serde_json::to_value(value).map_err(serialization_error)?;
    let mut root = Map::new();
    root.insert(
        "engine_version".to_string(),
        Value::Number(u64::from(ENGINE_VERSION).into()),
    );
    root.insert(label.to_string(), body);
    serde_json::to_vec(&Value::Object(root)).map_err(serialization_error)
}

fn serialization_error(err: serde_json::Error) -> PlanError {
    PlanError::InvariantViolation(format!("canonical serialization failed: {}", err))
}
