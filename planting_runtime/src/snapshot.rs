//! Snapshot layer — deterministic plan-state snapshots.
//!
//! A snapshot holds the engine's canonical state JSON, its SHA-256 and the
//! engine version. No timestamps in snapshot content (determinism).
//!
//! - `encode_snapshot`:  PlanState → Snapshot
//! - `decode_snapshot`:  Snapshot → PlanState (hash-checked, strict, no defaults)
//! - `restore_snapshot`: decode + invariant validation against a config
//! - `save_snapshot` / `load_snapshot` / `load_latest_snapshot`: file I/O

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use planting_engine::hashing::{canonical_state_bytes, hex_digest};
use planting_engine::invariants::collect_violations;
use planting_engine::{PlanConfig, PlanState, ENGINE_VERSION};

use crate::error::RuntimeError;

/// Snapshot on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Next day the saved state would simulate.
    pub day: u32,
    /// Canonical JSON of the state (UTF-8).
    pub canonical_json: String,
    /// SHA-256 of the canonical JSON.
    pub hash: String,
    pub engine_version: u32,
}

fn snapshot_path(dir: &Path, day: u32) -> PathBuf {
    dir.join(format!("snapshot_{:06}.json", day))
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

pub fn encode_snapshot(state: &PlanState) -> Result<Snapshot, RuntimeError> {
    let bytes = canonical_state_bytes(state)?;
    let hash = hex_digest(&bytes);
    let canonical_json = String::from_utf8(bytes)
        .map_err(|e| RuntimeError::Corrupt(format!("canonical JSON is not UTF-8: {}", e)))?;
    Ok(Snapshot {
        day: state.day,
        canonical_json,
        hash,
        engine_version: ENGINE_VERSION,
    })
}

/// Verify a snapshot's internal hash consistency.
pub fn verify_snapshot_hash(snap: &Snapshot) -> Result<(), RuntimeError> {
    let computed = hex_digest(snap.canonical_json.as_bytes());
    if computed != snap.hash {
        return Err(RuntimeError::SnapshotHashMismatch {
            stored: snap.hash.clone(),
            computed,
        });
    }
    Ok(())
}

/// Decode the state inside a snapshot.
///
/// Strict: `deny_unknown_fields` on all types rejects unexpected fields and
/// missing fields fail. No invariant validation; see `restore_snapshot`.
pub fn decode_snapshot(snap: &Snapshot) -> Result<PlanState, RuntimeError> {
    verify_snapshot_hash(snap)?;
    if snap.engine_version != ENGINE_VERSION {
        return Err(RuntimeError::Corrupt(format!(
            "snapshot from engine v{}, running v{}",
            snap.engine_version, ENGINE_VERSION
        )));
    }
    let mut root: Value = serde_json::from_str(&snap.canonical_json)?;
    let embedded = root.get("engine_version").and_then(Value::as_u64);
    if embedded != Some(u64::from(ENGINE_VERSION)) {
        return Err(RuntimeError::Corrupt(format!(
            "canonical JSON carries engine version {:?}",
            embedded
        )));
    }
    let body = root
        .get_mut("state")
        .map(Value::take)
        .ok_or_else(|| RuntimeError::Corrupt("snapshot has no state".to_string()))?;
    let state: PlanState = serde_json::from_value(body)?;
    if state.day != snap.day {
        return Err(RuntimeError::Corrupt(format!(
            "snapshot labelled day {} holds state for day {}",
            snap.day, state.day
        )));
    }
    Ok(state)
}

/// Decode and validate invariants immediately. Every breach is reported.
pub fn restore_snapshot(snap: &Snapshot, config: &PlanConfig) -> Result<PlanState, RuntimeError> {
    let state = decode_snapshot(snap)?;
    let violations = collect_violations(&state, config);
    if !violations.is_empty() {
        return Err(RuntimeError::Corrupt(format!(
            "snapshot for day {}: {}",
            snap.day,
            violations.join("; ")
        )));
    }
    Ok(state)
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Save a deterministic snapshot of the current state.
pub fn save_snapshot(dir: &Path, state: &PlanState) -> Result<PathBuf, RuntimeError> {
    fs::create_dir_all(dir)?;
    let snap = encode_snapshot(state)?;
    let path = snapshot_path(dir, snap.day);
    let content = serde_json::to_string(&snap)?;

    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    tracing::debug!(day = snap.day, path = %path.display(), "snapshot saved");
    Ok(path)
}

/// Load the snapshot taken before `day`, if one exists.
pub fn load_snapshot(dir: &Path, day: u32) -> Result<Option<Snapshot>, RuntimeError> {
    let path = snapshot_path(dir, day);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Load the latest snapshot in a directory.
/// Scans for snapshot_NNNNNN.json files and returns the highest day.
pub fn load_latest_snapshot(dir: &Path) -> Result<Option<Snapshot>, RuntimeError> {
    if !dir.exists() {
        return Ok(None);
    }
    let mut best: Option<u32> = None;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let day = name
            .to_str()
            .and_then(|n| n.strip_prefix("snapshot_"))
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(day) = day {
            best = Some(best.map_or(day, |b| b.max(day)));
        }
    }
    match best {
        Some(day) => load_snapshot(dir, day),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use planting_engine::state::create_initial_state;

    #[test]
    fn test_encode_decode_preserves_state() {
        let mut state = create_initial_state(&PlanConfig::default());
        state.day = 12;
        state.pipeline.receive(4, 30, 11);
        let snap = encode_snapshot(&state).unwrap();
        assert_eq!(snap.day, 12);
        assert_eq!(decode_snapshot(&snap).unwrap(), state);
    }

    #[test]
    fn test_encoding_is_byte_identical() {
        let state = create_initial_state(&PlanConfig::default());
        let a = encode_snapshot(&state).unwrap();
        let b = encode_snapshot(&state.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tampered_json_is_rejected() {
        let state = create_initial_state(&PlanConfig::default());
        let mut snap = encode_snapshot(&state).unwrap();
        snap.canonical_json = snap.canonical_json.replace("\"day\":0", "\"day\":1");
        assert!(matches!(
            decode_snapshot(&snap),
            Err(RuntimeError::SnapshotHashMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let state = create_initial_state(&PlanConfig::default());
        let mut snap = encode_snapshot(&state).unwrap();
        snap.canonical_json = snap
            .canonical_json
            .replacen("\"day\":0", "\"day\":0,\"bonus\":1", 1);
        snap.hash = hex_digest(snap.canonical_json.as_bytes());
        assert!(matches!(decode_snapshot(&snap), Err(RuntimeError::Json(_))));
    }

    #[test]
    fn test_restore_rejects_overfull_state() {
        let config = PlanConfig {
            warehouse_capacity: 5,
            ..PlanConfig::default()
        };
        let mut state = create_initial_state(&config);
        state.pipeline.receive(1, 6, 0);
        let snap = encode_snapshot(&state).unwrap();
        match restore_snapshot(&snap, &config) {
            Err(RuntimeError::Corrupt(msg)) => assert!(msg.contains("[INVARIANT:")),
            other => panic!("expected corrupt snapshot, got {:?}", other),
        }
    }
}
