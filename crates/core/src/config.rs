//! Run configuration, consumed read-only by the engine.
//!
//! Loading this from disk (and any CLI overrides) is the caller's concern;
//! the core only defines the shape and the defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::policy::RetryPolicy;
use crate::types::{Credentials, Locale};

fn default_service_id() -> String {
	// Passport booking service; overridable per run.
	"4996".to_string()
}

fn default_session_path() -> PathBuf {
	PathBuf::from("session.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
	#[serde(flatten)]
	pub credentials: Credentials,

	/// Numeric id of the service to book, as it appears in the booking URL.
	#[serde(default = "default_service_id")]
	pub service_id: String,

	/// Target UI language before scanning locale-sensitive slot labels.
	#[serde(default, rename = "language")]
	pub locale: Locale,

	/// Headful by default: the manual CAPTCHA step needs a visible browser.
	#[serde(default)]
	pub headless: bool,

	/// Explicit browser binary; auto-detected when absent.
	#[serde(default)]
	pub browser_path: Option<PathBuf>,

	/// Where the serialized session snapshot is persisted between runs.
	#[serde(default = "default_session_path")]
	pub session_path: PathBuf,

	/// Optional bound on the manual CAPTCHA wait; unbounded by default.
	#[serde(default)]
	pub manual_timeout_secs: Option<u64>,

	#[serde(default, rename = "retry")]
	pub policy: RetryPolicy,
}

impl BotConfig {
	pub fn manual_timeout(&self) -> Option<Duration> {
		self.manual_timeout_secs.map(Duration::from_secs)
	}
}
