//! Scan/attempt retry loop with backoff, bounded by the retry policy.

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{BotError, Result};
use crate::policy::RetryPolicy;
use crate::types::{AttemptResult, RunOutcome, SlotCandidate};

/// Everything the scheduler needs from the portal, as one seam.
///
/// The production implementation wires the authenticator, locale switcher,
/// scanner and booking form together; tests script the responses.
#[async_trait]
pub trait Portal: Send {
	async fn ensure_authenticated(&mut self) -> Result<()>;

	/// Full re-authentication after the portal rejected the session.
	async fn reauthenticate(&mut self) -> Result<()>;

	async fn scan(&mut self) -> Result<Vec<SlotCandidate>>;

	async fn attempt(&mut self, slot: &SlotCandidate) -> Result<AttemptResult>;
}

pub struct RetryScheduler {
	policy: RetryPolicy,
	cancel: CancellationToken,
}

impl RetryScheduler {
	pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
		Self { policy, cancel }
	}

	/// Runs scan/attempt cycles until a booking succeeds, the policy is
	/// exhausted, or a fatal error surfaces.
	///
	/// Cancellation is honored at the loop top and during backoff sleeps,
	/// never in the middle of a submission. A session expiry triggers one
	/// re-authentication and a single retry; a second consecutive expiry
	/// escalates to a fatal outcome.
	pub async fn run(&self, portal: &mut dyn Portal) -> RunOutcome {
		let deadline = Instant::now() + self.policy.max_duration;
		let mut attempts = 0u32;
		let mut expired_streak = 0u32;

		loop {
			if self.cancel.is_cancelled() {
				return RunOutcome::Cancelled;
			}
			if attempts >= self.policy.max_attempts || Instant::now() >= deadline {
				info!(target = "prenota.scheduler", attempts, "stop condition reached");
				return RunOutcome::Exhausted { attempts };
			}

			if let Err(err) = portal.ensure_authenticated().await {
				match self.classify(err) {
					Flow::Terminal(outcome) => return outcome,
					Flow::Retry(reason) => {
						warn!(target = "prenota.scheduler", %reason, "authentication failed; backing off");
						attempts += 1;
						if self.backoff(attempts).await.is_err() {
							return RunOutcome::Cancelled;
						}
						continue;
					}
				}
			}

			let candidates = match portal.scan().await {
				Ok(candidates) => {
					expired_streak = 0;
					candidates
				}
				Err(BotError::SessionExpired) => {
					expired_streak += 1;
					if expired_streak > 1 {
						return RunOutcome::Fatal {
							error: BotError::UnexpectedPage {
								reason: "session expired twice in a row; portal is rejecting the account".into(),
							},
						};
					}
					warn!(target = "prenota.scheduler", "session expired during scan; re-authenticating");
					if let Err(err) = portal.reauthenticate().await {
						if let Flow::Terminal(outcome) = self.classify(err) {
							return outcome;
						}
					}
					continue;
				}
				Err(err) if err.is_transient() => {
					// Broken markup or maintenance page reads as an empty
					// scan; the run must not abort on it.
					debug!(target = "prenota.scheduler", error = %err, "scan degraded; treating as empty");
					Vec::new()
				}
				Err(err) => match self.classify(err) {
					Flow::Terminal(outcome) => return outcome,
					Flow::Retry(_) => Vec::new(),
				},
			};

			for candidate in &candidates {
				match self.attempt_with_reauth(portal, candidate, &mut expired_streak).await {
					Ok(AttemptResult::Success { confirmation }) => {
						info!(target = "prenota.scheduler", %confirmation, "slot booked");
						return RunOutcome::Booked {
							slot: candidate.clone(),
							confirmation,
						};
					}
					Ok(AttemptResult::SlotTaken) => {
						debug!(target = "prenota.scheduler", slot = %candidate.booking_ref, "slot taken; next candidate");
					}
					Ok(AttemptResult::Transient { reason }) => {
						debug!(target = "prenota.scheduler", %reason, "attempt failed transiently; next candidate");
					}
					Ok(AttemptResult::Fatal { reason }) => {
						return RunOutcome::Fatal {
							error: BotError::UnexpectedPage { reason },
						};
					}
					Err(flow) => match flow {
						Flow::Terminal(outcome) => return outcome,
						Flow::Retry(reason) => {
							debug!(target = "prenota.scheduler", %reason, "attempt errored; next candidate");
						}
					},
				}
			}

			attempts += 1;
			if self.backoff(attempts).await.is_err() {
				return RunOutcome::Cancelled;
			}
		}
	}

	/// One booking attempt, absorbing a single session expiry by
	/// re-authenticating and retrying the same candidate once.
	async fn attempt_with_reauth(
		&self,
		portal: &mut dyn Portal,
		candidate: &SlotCandidate,
		expired_streak: &mut u32,
	) -> std::result::Result<AttemptResult, Flow> {
		for retry in 0..2 {
			match portal.attempt(candidate).await {
				Ok(result) => {
					*expired_streak = 0;
					return Ok(result);
				}
				Err(BotError::SessionExpired) => {
					*expired_streak += 1;
					if *expired_streak > 1 || retry == 1 {
						return Err(Flow::Terminal(RunOutcome::Fatal {
							error: BotError::UnexpectedPage {
								reason: "session expired twice in a row; portal is rejecting the account".into(),
							},
						}));
					}
					warn!(target = "prenota.scheduler", "session expired during attempt; re-authenticating");
					portal.reauthenticate().await.map_err(|err| self.classify(err))?;
				}
				Err(err) => return Err(self.classify(err)),
			}
		}
		unreachable!("attempt retry loop always returns within two iterations")
	}

	fn classify(&self, err: BotError) -> Flow {
		match err {
			BotError::Cancelled => Flow::Terminal(RunOutcome::Cancelled),
			err if err.is_fatal() => Flow::Terminal(RunOutcome::Fatal { error: err }),
			err => Flow::Retry(err.to_string()),
		}
	}

	/// Sleeps for the policy backoff, bailing out early on cancellation.
	async fn backoff(&self, attempts: u32) -> std::result::Result<(), ()> {
		let delay = self.policy.backoff_delay(attempts);
		debug!(target = "prenota.scheduler", attempts, delay_ms = delay.as_millis() as u64, "backing off");
		tokio::select! {
			_ = self.cancel.cancelled() => Err(()),
			_ = tokio::time::sleep(delay) => Ok(()),
		}
	}
}

enum Flow {
	Terminal(RunOutcome),
	Retry(String),
}
