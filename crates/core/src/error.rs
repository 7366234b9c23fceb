//! Error taxonomy for the booking engine.
//!
//! Three tiers drive the retry logic: transient errors are retried within
//! policy bounds, [`BotError::SessionExpired`] triggers one re-authentication
//! cycle, and fatal errors terminate the run immediately.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
	/// Recoverable failure: network hiccup, slot race, flaky markup.
	#[error("transient failure: {reason}")]
	Transient { reason: String },

	/// The portal redirected to login mid-run; the session must be rebuilt.
	#[error("session expired: portal redirected to login")]
	SessionExpired,

	#[error("invalid credentials: portal rejected the login")]
	InvalidCredentials,

	#[error("manual CAPTCHA step timed out")]
	CaptchaTimeout,

	#[error("account blocked or suspended by the portal")]
	AccountBlocked,

	/// The portal rendered a page the engine cannot interpret.
	#[error("unexpected page state: {reason}")]
	UnexpectedPage { reason: String },

	#[error("run cancelled by operator")]
	Cancelled,

	#[error("browser launch failed: {0}")]
	BrowserLaunch(String),

	#[error("navigation to {url} failed")]
	Navigation {
		url: String,
		#[source]
		source: anyhow::Error,
	},

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Json(#[from] serde_json::Error),
}

impl BotError {
	/// Shorthand for a transient failure with a formatted reason.
	pub fn transient(reason: impl Into<String>) -> Self {
		Self::Transient { reason: reason.into() }
	}

	/// True for failures the scheduler may retry within policy bounds.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transient { .. } | Self::Navigation { .. } | Self::Io(_))
	}

	/// True for failures that must terminate the run without further retries.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::InvalidCredentials
				| Self::CaptchaTimeout
				| Self::AccountBlocked
				| Self::UnexpectedPage { .. }
				| Self::BrowserLaunch(_)
		)
	}
}

impl From<chromiumoxide::error::CdpError> for BotError {
	fn from(err: chromiumoxide::error::CdpError) -> Self {
		// CDP failures are overwhelmingly connection/timeout noise; anything
		// genuinely unrecoverable surfaces later as an unexpected page state.
		Self::Transient { reason: err.to_string() }
	}
}
