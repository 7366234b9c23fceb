//! Login state machine, including the human-in-the-loop CAPTCHA step.
//!
//! `Unauthenticated → AwaitingManualStep → Authenticated → Expired`.
//! Silent restore from the session store is always tried first; a fresh
//! login falls back to a bounded retry loop around the portal's login form.
//! The CAPTCHA is never solved here; the run suspends on [`ManualGate`]
//! until an operator signals that the challenge was completed in the
//! visible browser.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::driver::PageDriver;
use crate::error::{BotError, Result};
use crate::portal;
use crate::store::{SessionSnapshot, SessionStore};
use crate::types::Credentials;

const MAX_LOGIN_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
	Unauthenticated,
	/// Suspended on the operator: a CAPTCHA is on screen in the browser.
	AwaitingManualStep,
	Authenticated,
	/// The portal rejected the session; next use re-enters `Unauthenticated`.
	Expired,
}

/// External resume signal for the manual CAPTCHA step.
///
/// A resume issued before the engine starts waiting is not lost; the permit
/// is held until consumed.
#[derive(Clone, Default)]
pub struct ManualGate {
	notify: Arc<Notify>,
}

impl ManualGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Signals that the operator completed the on-screen challenge.
	pub fn resume(&self) {
		self.notify.notify_one();
	}

	pub async fn wait(&self) {
		self.notify.notified().await;
	}
}

pub struct Authenticator {
	driver: Arc<dyn PageDriver>,
	store: SessionStore,
	credentials: Credentials,
	gate: ManualGate,
	manual_timeout: Option<Duration>,
	state: AuthState,
}

impl Authenticator {
	pub fn new(
		driver: Arc<dyn PageDriver>,
		store: SessionStore,
		credentials: Credentials,
		gate: ManualGate,
		manual_timeout: Option<Duration>,
	) -> Self {
		Self {
			driver,
			store,
			credentials,
			gate,
			manual_timeout,
			state: AuthState::Unauthenticated,
		}
	}

	pub fn state(&self) -> AuthState {
		self.state
	}

	/// Records that the portal rejected the session mid-run.
	pub fn mark_expired(&mut self) {
		self.state = AuthState::Expired;
	}

	/// Drives the state machine until `Authenticated`, or fails with a
	/// non-retryable error. A no-op while already authenticated.
	pub async fn ensure_authenticated(&mut self, cancel: &CancellationToken) -> Result<()> {
		if self.state == AuthState::Authenticated {
			return Ok(());
		}
		self.authenticate(cancel).await
	}

	/// Full re-authentication after an expiry: the stale snapshot is
	/// dropped so the restore path cannot resurrect rejected cookies.
	pub async fn reauthenticate(&mut self, cancel: &CancellationToken) -> Result<()> {
		if let Err(err) = self.store.clear() {
			warn!(target = "prenota.auth", error = %err, "failed to drop stale session snapshot");
		}
		self.state = AuthState::Unauthenticated;
		self.authenticate(cancel).await
	}

	async fn authenticate(&mut self, cancel: &CancellationToken) -> Result<()> {
		self.state = AuthState::Unauthenticated;
		if self.try_restore().await? {
			info!(target = "prenota.auth", "session restored from snapshot");
			return self.finish().await;
		}
		self.fresh_login(cancel).await
	}

	/// Silent restore: inject the persisted cookies and probe with a
	/// lightweight navigation. Any failure reads as "no session".
	async fn try_restore(&self) -> Result<bool> {
		let Some(snapshot) = self.store.load() else {
			return Ok(false);
		};
		if let Err(err) = self.driver.restore_cookies(&snapshot.cookies).await {
			warn!(target = "prenota.auth", error = %err, "cookie restore failed; falling back to fresh login");
			return Ok(false);
		}
		self.driver.goto(portal::LOGIN_URL).await?;
		self.is_logged_in().await
	}

	async fn fresh_login(&mut self, cancel: &CancellationToken) -> Result<()> {
		for attempt in 1..=MAX_LOGIN_ATTEMPTS {
			if cancel.is_cancelled() {
				self.state = AuthState::Unauthenticated;
				return Err(BotError::Cancelled);
			}
			debug!(target = "prenota.auth", attempt, "login attempt");

			// First attempt navigates; later ones reload the page already on
			// screen so a half-submitted form state is discarded.
			let nav = if attempt == 1 {
				self.driver.goto(portal::LOGIN_URL).await
			} else {
				self.driver.reload().await
			};
			if let Err(err) = nav {
				if err.is_transient() {
					warn!(target = "prenota.auth", attempt, error = %err, "login page failed to load");
					continue;
				}
				return Err(err);
			}

			// Cookies may have survived in the live context.
			if self.is_logged_in().await? {
				return self.finish().await;
			}
			if self.driver.exists(portal::ACCOUNT_BLOCKED).await? {
				return Err(BotError::AccountBlocked);
			}

			if let Err(err) = self.submit_credentials().await {
				if err.is_transient() {
					warn!(target = "prenota.auth", attempt, error = %err, "login form submission failed");
					continue;
				}
				return Err(err);
			}

			if self.is_logged_in().await? {
				return self.finish().await;
			}
			if self.driver.exists(portal::LOGIN_ERROR).await? {
				return Err(BotError::InvalidCredentials);
			}

			// Not logged in and no rejection: a CAPTCHA is on screen.
			self.await_manual(cancel).await?;

			if self.is_logged_in().await? {
				return self.finish().await;
			}
			if self.driver.exists(portal::LOGIN_ERROR).await? {
				return Err(BotError::InvalidCredentials);
			}
			warn!(target = "prenota.auth", attempt, "login attempt unresolved; retrying");
		}

		Err(BotError::transient(format!("login failed after {MAX_LOGIN_ATTEMPTS} attempts")))
	}

	async fn submit_credentials(&self) -> Result<()> {
		self.driver.fill(portal::LOGIN_EMAIL, &self.credentials.email).await?;
		self.driver.fill(portal::LOGIN_PASSWORD, &self.credentials.password).await?;
		self.driver.click(portal::LOGIN_SUBMIT).await
	}

	/// Blocks until the operator resumes, the optional timeout elapses, or
	/// the run is cancelled. The machine always leaves `AwaitingManualStep`
	/// before this returns; only a later `finish` promotes to
	/// `Authenticated`.
	async fn await_manual(&mut self, cancel: &CancellationToken) -> Result<()> {
		self.state = AuthState::AwaitingManualStep;
		info!(target = "prenota.auth", "CAPTCHA pending; solve it in the browser, then signal continue");

		let gate = self.gate.clone();
		let result = match self.manual_timeout {
			Some(limit) => tokio::select! {
				_ = cancel.cancelled() => Err(BotError::Cancelled),
				outcome = tokio::time::timeout(limit, gate.wait()) => outcome.map_err(|_| BotError::CaptchaTimeout),
			},
			None => tokio::select! {
				_ = cancel.cancelled() => Err(BotError::Cancelled),
				_ = gate.wait() => Ok(()),
			},
		};

		self.state = AuthState::Unauthenticated;
		result
	}

	async fn is_logged_in(&self) -> Result<bool> {
		let class = self.driver.attribute("body", "class").await?.unwrap_or_default();
		Ok(class.split_whitespace().any(|c| c == portal::LOGGED_IN_MARKER))
	}

	async fn finish(&mut self) -> Result<()> {
		self.state = AuthState::Authenticated;
		info!(target = "prenota.auth", "authenticated");
		match self.driver.cookie_snapshot().await {
			Ok(blob) => {
				if let Err(err) = self.store.save(&SessionSnapshot::new(blob)) {
					warn!(target = "prenota.auth", error = %err, "failed to persist session snapshot");
				}
			}
			Err(err) => warn!(target = "prenota.auth", error = %err, "failed to capture session snapshot"),
		}
		Ok(())
	}
}
