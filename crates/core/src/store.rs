//! Persisted session state across process restarts.
//!
//! The snapshot wraps whatever cookie blob the browser layer produced; the
//! store never inspects it. A corrupt or missing file reads as absent so a
//! bad snapshot degrades to a fresh login instead of killing the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Serialized authentication state: opaque cookie blob plus bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	pub schema: u32,
	/// Cookie/storage snapshot as produced by the browser layer. Opaque here.
	pub cookies: serde_json::Value,
	pub saved_at: u64,
}

impl SessionSnapshot {
	pub fn new(cookies: serde_json::Value) -> Self {
		Self {
			schema: SNAPSHOT_SCHEMA_VERSION,
			cookies,
			saved_at: now_ts(),
		}
	}
}

/// File-backed store for the session snapshot.
#[derive(Debug, Clone)]
pub struct SessionStore {
	path: PathBuf,
}

impl SessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Loads the persisted snapshot. Any read or parse failure is reported
	/// as absent, never as an error.
	pub fn load(&self) -> Option<SessionSnapshot> {
		let content = fs::read_to_string(&self.path).ok()?;
		match serde_json::from_str::<SessionSnapshot>(&content) {
			Ok(snapshot) if snapshot.schema == SNAPSHOT_SCHEMA_VERSION => Some(snapshot),
			Ok(snapshot) => {
				warn!(target = "prenota.store", schema = snapshot.schema, "session snapshot schema mismatch; ignoring");
				None
			}
			Err(err) => {
				warn!(target = "prenota.store", path = %self.path.display(), error = %err, "corrupt session snapshot; ignoring");
				None
			}
		}
	}

	pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}
		let json = serde_json::to_string_pretty(snapshot)?;
		fs::write(&self.path, json)?;
		debug!(target = "prenota.store", path = %self.path.display(), "session snapshot saved");
		Ok(())
	}

	/// Removes the snapshot file if present. Returns whether a file existed.
	pub fn clear(&self) -> Result<bool> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}
}

fn now_ts() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
