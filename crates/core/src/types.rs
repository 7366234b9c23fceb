//! Core data model: credentials, slot candidates, attempt outcomes.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::error::BotError;

/// Login credentials, consumed read-only. Never persisted by the engine.
#[derive(Clone, Deserialize)]
pub struct Credentials {
	pub email: String,
	pub password: String,
	/// Saved TOTP secret for accounts with 2FA enabled.
	#[serde(default)]
	pub totp_secret: Option<String>,
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.field("totp_secret", &self.totp_secret.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// UI language of the portal, keyed by its internal language id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
	Italian,
	#[default]
	English,
}

impl Locale {
	/// Language id used by the portal's `ChangeLanguage` endpoint.
	pub fn lang_id(self) -> u8 {
		match self {
			Self::Italian => 1,
			Self::English => 2,
		}
	}

	pub fn parse(code: &str) -> Option<Self> {
		let code = code.to_ascii_lowercase();
		if code.starts_with("it") {
			Some(Self::Italian)
		} else if code.starts_with("en") {
			Some(Self::English)
		} else {
			None
		}
	}
}

impl<'de> Deserialize<'de> for Locale {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let code = String::deserialize(deserializer)?;
		Locale::parse(&code).ok_or_else(|| serde::de::Error::custom(format!("unsupported locale: {code}")))
	}
}

impl fmt::Display for Locale {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Italian => write!(f, "it"),
			Self::English => write!(f, "en"),
		}
	}
}

/// One bookable slot discovered during a scan.
///
/// Ephemeral by design: availability is volatile, so candidates are
/// recomputed on every scan and never cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotCandidate {
	pub date: NaiveDate,
	pub time: NaiveTime,
	pub office: String,
	pub service: String,
	/// Opaque site-internal identifier required to claim the slot.
	pub booking_ref: String,
}

/// Outcome of a single booking attempt. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
	Success { confirmation: String },
	/// Someone else claimed the slot between scan and submit.
	SlotTaken,
	Transient { reason: String },
	Fatal { reason: String },
}

/// Terminal result of a run, mapped to process exit codes by the CLI.
#[derive(Debug)]
pub enum RunOutcome {
	Booked { slot: SlotCandidate, confirmation: String },
	/// Stop condition reached without claiming a slot.
	Exhausted { attempts: u32 },
	Fatal { error: BotError },
	Cancelled,
}

impl RunOutcome {
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::Booked { .. } => 0,
			Self::Exhausted { .. } => 2,
			Self::Fatal { .. } => 3,
			Self::Cancelled => 130,
		}
	}
}
