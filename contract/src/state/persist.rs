//! # Single-File Persistence
//!
//! The store mirrors to one JSON file after every committed mutation. The
//! format is pretty-printed `{"vaults": {...}}` plus a trailing newline, so
//! an operator can open the file and read it. The
//! replica cross-check digest never touches this file — it is computed from
//! canonical bytes — so pretty-printing costs nothing in determinism.
//!
//! Startup semantics are strict: a missing file means a fresh replica and
//! an empty store; a present-but-unparsable file means the replica's view
//! of history is broken and the process must refuse to start. Silently
//! reinitializing over a corrupt file would fork the cluster.
//!
//! Writes go through a temp file followed by a rename, so a crash mid-write
//! leaves the previous state intact.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::store::VaultStore;
use crate::state::types::Vault;

/// Errors during state load/save.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file exists but does not parse. Fatal at startup.
    #[error("state file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// On-disk shape of the state file.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    vaults: BTreeMap<String, Vault>,
}

/// Load the store from `path`.
///
/// Missing file → empty store. Unparsable file → [`PersistError::Corrupt`],
/// which callers must treat as fatal.
pub fn load(path: &Path) -> Result<VaultStore, PersistError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no state file, starting empty");
            return Ok(VaultStore::new());
        }
        Err(e) => return Err(e.into()),
    };

    let file: StateFile = serde_json::from_str(&raw)?;
    tracing::info!(path = %path.display(), vaults = file.vaults.len(), "state loaded");
    Ok(VaultStore::from_vaults(file.vaults))
}

/// Write the store to `path`, creating parent directories as needed.
///
/// The write lands in `<path>.tmp` first and is renamed into place, so
/// readers never observe a truncated file.
pub fn save(path: &Path, store: &VaultStore) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = StateFile {
        vaults: store.snapshot(),
    };
    let mut contents = serde_json::to_string_pretty(&file)?;
    contents.push('\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
