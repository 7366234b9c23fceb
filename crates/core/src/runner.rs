//! Wires the components into a [`Portal`] and owns the run lifecycle.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::{Authenticator, ManualGate};
use crate::book::BookingAttempt;
use crate::config::BotConfig;
use crate::driver::PageDriver;
use crate::error::Result;
use crate::locale::LocaleSwitcher;
use crate::scan::SlotScanner;
use crate::scheduler::{Portal, RetryScheduler};
use crate::session::{BrowserSession, LaunchOptions};
use crate::store::SessionStore;
use crate::types::{AttemptResult, Locale, RunOutcome, SlotCandidate};

/// Production [`Portal`]: one authenticated browsing context driving the
/// real site.
pub struct PortalSession {
	auth: Authenticator,
	locale: LocaleSwitcher,
	scanner: SlotScanner,
	booking: BookingAttempt,
	target_locale: Locale,
	cancel: CancellationToken,
}

impl PortalSession {
	pub fn new(driver: Arc<dyn PageDriver>, config: &BotConfig, gate: ManualGate, cancel: CancellationToken) -> Self {
		let store = SessionStore::new(&config.session_path);
		Self {
			auth: Authenticator::new(
				driver.clone(),
				store,
				config.credentials.clone(),
				gate,
				config.manual_timeout(),
			),
			locale: LocaleSwitcher::new(driver.clone()),
			scanner: SlotScanner::new(driver.clone(), config.service_id.clone()),
			booking: BookingAttempt::new(driver),
			target_locale: config.locale,
			cancel,
		}
	}
}

#[async_trait::async_trait]
impl Portal for PortalSession {
	async fn ensure_authenticated(&mut self) -> Result<()> {
		self.auth.ensure_authenticated(&self.cancel).await
	}

	async fn reauthenticate(&mut self) -> Result<()> {
		self.auth.mark_expired();
		self.auth.reauthenticate(&self.cancel).await
	}

	async fn scan(&mut self) -> Result<Vec<SlotCandidate>> {
		// Slot labels are locale-sensitive; align the UI language first.
		self.locale.ensure(self.target_locale).await?;
		self.scanner.scan().await
	}

	async fn attempt(&mut self, slot: &SlotCandidate) -> Result<AttemptResult> {
		self.booking.attempt(slot).await
	}
}

/// Runs the engine end to end: acquire the browser, drive the retry loop,
/// and release the browser on every exit path, including fatal errors and
/// cancellation.
pub async fn run(config: &BotConfig, gate: ManualGate, cancel: CancellationToken) -> RunOutcome {
	let launch = LaunchOptions {
		headless: config.headless,
		browser_path: config.browser_path.clone(),
	};
	let session = match BrowserSession::launch(&launch).await {
		Ok(session) => session,
		Err(error) => return RunOutcome::Fatal { error },
	};

	let mut portal = PortalSession::new(session.driver(), config, gate, cancel.clone());
	let scheduler = RetryScheduler::new(config.policy.clone(), cancel);
	let outcome = scheduler.run(&mut portal).await;

	info!(target = "prenota.runner", outcome = ?outcome_tag(&outcome), "run finished; releasing browser");
	if let Err(err) = session.close().await {
		warn!(target = "prenota.runner", error = %err, "browser teardown failed");
	}
	outcome
}

fn outcome_tag(outcome: &RunOutcome) -> &'static str {
	match outcome {
		RunOutcome::Booked { .. } => "booked",
		RunOutcome::Exhausted { .. } => "exhausted",
		RunOutcome::Fatal { .. } => "fatal",
		RunOutcome::Cancelled => "cancelled",
	}
}
