//! # Statefile — Persisted Scan State
//!
//! CLI invocations are separate processes, so the search cursor and the
//! cooldown deadline live in a small JSON file between runs (default
//! `~/.bidreach/scan.json`). The file carries a SHA-256 checksum and is
//! written atomically (temp file, then rename) so a mid-write crash never
//! leaves a half-written cursor behind. A corrupted file is detected and
//! discarded — the controller falls back to a fresh state rather than
//! trusting bad data.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scan::ScanState;

/// Wrapper that includes a SHA-256 checksum for integrity verification.
#[derive(Serialize, Deserialize)]
struct StateEnvelope {
    checksum: String,
    data: serde_json::Value,
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Default state file location: `~/.bidreach/scan.json`.
pub fn default_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".bidreach").join("scan.json"))
}

/// Save the scan state atomically with an integrity checksum.
pub fn save(path: &Path, state: &ScanState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_value(state)?;
    let data_str = serde_json::to_string_pretty(&data)?;
    let envelope = StateEnvelope {
        checksum: sha256_hex(&data_str),
        data,
    };
    let json = serde_json::to_string_pretty(&envelope)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the scan state, returning `None` for a missing, unreadable, or
/// corrupted file.
pub fn load(path: &Path) -> Option<ScanState> {
    let raw = fs::read_to_string(path).ok()?;
    let envelope: StateEnvelope = serde_json::from_str(&raw).ok()?;

    let data_str = serde_json::to_string_pretty(&envelope.data).ok()?;
    if sha256_hex(&data_str) != envelope.checksum {
        tracing::warn!(path = %path.display(), "scan state integrity check failed, discarding");
        return None;
    }

    serde_json::from_value(envelope.data).ok()
}

/// Load the scan state or start fresh.
pub fn load_or_default(path: &Path) -> ScanState {
    load(path).unwrap_or_default()
}

/// Remove the state file (and any leftover temp file).
pub fn clear(path: &Path) {
    let _ = fs::remove_file(path);
    let _ = fs::remove_file(path.with_extension("tmp"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{BatchReport, Direction};
    use chrono::{TimeZone, Utc};

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");

        let mut state = ScanState::new();
        state.record_batch(
            &BatchReport {
                start_id: 1000,
                last_checked_id: 1049,
                total_found: 20,
                direction: Direction::Forward,
            },
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        save(&path, &state).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        assert!(load(&path).is_none());
        assert_eq!(load_or_default(&path), ScanState::new());
    }

    #[test]
    fn corrupted_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");

        let mut state = ScanState::new();
        state.record_lookup(123, true);
        save(&path, &state).unwrap();

        // Flip the stored cursor without updating the checksum.
        let raw = fs::read_to_string(&path).unwrap().replace("123", "999");
        fs::write(&path, raw).unwrap();

        assert!(load(&path).is_none());
        assert_eq!(load_or_default(&path), ScanState::new());
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        save(&path, &ScanState::new()).unwrap();
        clear(&path);
        assert!(load(&path).is_none());
    }
}
